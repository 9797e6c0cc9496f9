use serde::{Deserialize, Serialize};

/// Vertical anchor of the caption block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Top,
    Center,
    #[default]
    Bottom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    #[default]
    Standard,
    /// Only the currently spoken word is shown.
    SingleWord,
}

/// Presentation parameters shared by every cue of a render.
///
/// Lengths are authored against the 1920x1080 reference canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Style {
    pub font_name: String,
    pub font_size: f64,
    /// CSS-like weight: `normal`, `bold` or a number.
    pub font_weight: String,
    pub primary_color: String,
    pub outline_color: String,
    pub background_color: String,
    pub stroke_color: String,
    pub shadow_color: String,
    pub highlight_color: String,
    pub outline_width: f64,
    pub stroke_width: f64,
    pub shadow_blur: f64,
    pub shadow_offset_x: f64,
    pub shadow_offset_y: f64,
    pub position: Position,
    pub margin_v: f64,
    /// Gap between words in word-scope layouts.
    pub highlight_gap: f64,
    pub highlight_opacity: f64,
    pub letter_spacing: f64,
    /// Effect preset id (or legacy alias).
    pub effect: String,
    pub display_mode: DisplayMode,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_owned(),
            font_size: 24.0,
            font_weight: "normal".to_owned(),
            primary_color: "#FFFFFF".to_owned(),
            outline_color: "#000000".to_owned(),
            background_color: "#00000080".to_owned(),
            stroke_color: "#000000".to_owned(),
            shadow_color: "#000000".to_owned(),
            highlight_color: "#FFFFFF".to_owned(),
            outline_width: 2.0,
            stroke_width: 0.0,
            shadow_blur: 0.0,
            shadow_offset_x: 0.0,
            shadow_offset_y: 0.0,
            position: Position::Bottom,
            margin_v: 100.0,
            highlight_gap: 16.0,
            highlight_opacity: 0.25,
            letter_spacing: 0.0,
            effect: "none".to_owned(),
            display_mode: DisplayMode::Standard,
        }
    }
}

impl Style {
    /// Effective style for one cue.
    pub fn merged(&self, o: Option<&StyleOverride>) -> Style {
        let mut out = self.clone();
        if let Some(o) = o {
            o.apply_to(&mut out);
        }
        out
    }

    /// Numeric font weight (`normal` = 400, `bold` = 700).
    pub fn weight_value(&self) -> f32 {
        let w = self.font_weight.trim();
        match w.to_ascii_lowercase().as_str() {
            "normal" | "regular" | "" => 400.0,
            "bold" => 700.0,
            "bolder" | "black" | "heavy" => 900.0,
            "lighter" | "light" => 300.0,
            "medium" => 500.0,
            "semibold" => 600.0,
            _ => w
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .map_or(400.0, |v| v.clamp(1.0, 1000.0)),
        }
    }

    pub fn is_single_word(&self) -> bool {
        self.display_mode == DisplayMode::SingleWord
    }
}

macro_rules! style_override {
    ($($field:ident: $ty:ty),* $(,)?) => {
        /// Per-cue partial [`Style`]; absent fields inherit the render style.
        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase", default)]
        pub struct StyleOverride {
            $(
                #[serde(skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
        }

        impl StyleOverride {
            fn apply_to(&self, style: &mut Style) {
                $(
                    if let Some(v) = self.$field.as_ref() {
                        style.$field = v.clone();
                    }
                )*
            }
        }
    };
}

style_override! {
    font_name: String,
    font_size: f64,
    font_weight: String,
    primary_color: String,
    outline_color: String,
    background_color: String,
    stroke_color: String,
    shadow_color: String,
    highlight_color: String,
    outline_width: f64,
    stroke_width: f64,
    shadow_blur: f64,
    shadow_offset_x: f64,
    shadow_offset_y: f64,
    position: Position,
    margin_v: f64,
    highlight_gap: f64,
    highlight_opacity: f64,
    letter_spacing: f64,
    effect: String,
    display_mode: DisplayMode,
}

#[cfg(test)]
#[path = "../../tests/unit/model/style.rs"]
mod tests;
