use serde::{Deserialize, Serialize};

/// Straight-alpha color with normalized `0..=1` channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Rgba = Rgba::rgba(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Rgba = Rgba::rgba(0.0, 0.0, 0.0, 0.0);
    /// Highlight fallback used when a highlight color is unparsable.
    pub const YELLOW: Rgba = Rgba::rgba(1.0, 1.0, 0.0, 1.0);
    /// Glow fallback when neither the shadow nor the primary color resolves.
    pub const CYAN: Rgba = Rgba::rgba(0.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a CSS-like color string.
    ///
    /// Accepted: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA` (alpha byte / 255), `rgb(..)`,
    /// `rgba(..)`, `hsl(..)`, `hsla(..)`, `transparent` and a handful of named colors.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty color string".to_owned());
        }
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = s.to_ascii_lowercase();
        if let Some((func, args)) = lower.split_once('(') {
            let args = args
                .strip_suffix(')')
                .ok_or_else(|| format!("unterminated color function \"{s}\""))?;
            return parse_function(func.trim(), args);
        }
        named(&lower).ok_or_else(|| format!("unknown color \"{s}\""))
    }

    /// Parse `s`, falling back to `default` when it is malformed.
    pub fn parse_or(s: &str, default: Rgba) -> Rgba {
        match Self::parse(s) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(color = s, error = %e, "unparsable color, using fallback");
                default
            }
        }
    }

    /// Parse an optional color string, falling back to `default`.
    pub fn parse_opt_or(s: Option<&str>, default: Rgba) -> Rgba {
        s.map_or(default, |s| Self::parse_or(s, default))
    }

    /// Componentwise linear blend.
    pub fn lerp(self, to: Rgba, t: f64) -> Rgba {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Rgba::rgba(
            mix(self.r, to.r),
            mix(self.g, to.g),
            mix(self.b, to.b),
            mix(self.a, to.a),
        )
    }

    /// Multiply alpha by `k`.
    pub fn fade(self, k: f64) -> Rgba {
        Rgba {
            a: (self.a * k).clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn is_transparent(self) -> bool {
        self.a <= 0.0
    }

    /// Straight-alpha RGBA8.
    pub fn to_rgba8(self) -> [u8; 4] {
        fn to_u8(x: f64) -> u8 {
            (x.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        [to_u8(self.r), to_u8(self.g), to_u8(self.b), to_u8(self.a)]
    }

    pub(crate) fn to_paint(self) -> vello_cpu::peniko::Color {
        let [r, g, b, a] = self.to_rgba8();
        vello_cpu::peniko::Color::from_rgba8(r, g, b, a)
    }
}

fn parse_hex(s: &str) -> Result<Rgba, String> {
    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }
    fn hex_nibble(c: &str) -> Result<u8, String> {
        let v = u8::from_str_radix(c, 16).map_err(|_| format!("invalid hex digit \"{c}\""))?;
        Ok(v * 17)
    }

    if !s.is_ascii() {
        return Err("hex color must be ASCII".to_owned());
    }
    let (r, g, b, a) = match s.len() {
        3 | 4 => {
            let r = hex_nibble(&s[0..1])?;
            let g = hex_nibble(&s[1..2])?;
            let b = hex_nibble(&s[2..3])?;
            let a = if s.len() == 4 {
                hex_nibble(&s[3..4])?
            } else {
                255
            };
            (r, g, b, a)
        }
        6 => {
            let r = hex_byte(&s[0..2])?;
            let g = hex_byte(&s[2..4])?;
            let b = hex_byte(&s[4..6])?;
            (r, g, b, 255)
        }
        8 => {
            let r = hex_byte(&s[0..2])?;
            let g = hex_byte(&s[2..4])?;
            let b = hex_byte(&s[4..6])?;
            let a = hex_byte(&s[6..8])?;
            (r, g, b, a)
        }
        _ => {
            return Err("hex color must be #RGB, #RGBA, #RRGGBB or #RRGGBBAA".to_owned());
        }
    };

    Ok(Rgba::rgba(
        f64::from(r) / 255.0,
        f64::from(g) / 255.0,
        f64::from(b) / 255.0,
        f64::from(a) / 255.0,
    ))
}

fn parse_function(func: &str, args: &str) -> Result<Rgba, String> {
    let parts = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>();
    if parts.len() < 3 || parts.len() > 4 {
        return Err(format!("{func}() expects 3 or 4 components"));
    }

    let alpha = match parts.get(3) {
        Some(p) => parse_unit_or_percent(p)?,
        None => 1.0,
    };

    match func {
        "rgb" | "rgba" => {
            let channel = |p: &str| -> Result<f64, String> {
                if let Some(pct) = p.strip_suffix('%') {
                    let v = pct
                        .parse::<f64>()
                        .map_err(|_| format!("invalid channel \"{p}\""))?;
                    return Ok((v / 100.0).clamp(0.0, 1.0));
                }
                let v = p
                    .parse::<f64>()
                    .map_err(|_| format!("invalid channel \"{p}\""))?;
                Ok((v / 255.0).clamp(0.0, 1.0))
            };
            Ok(Rgba::rgba(
                channel(parts[0])?,
                channel(parts[1])?,
                channel(parts[2])?,
                alpha,
            ))
        }
        "hsl" | "hsla" => {
            let h = parts[0]
                .trim_end_matches("deg")
                .parse::<f64>()
                .map_err(|_| format!("invalid hue \"{}\"", parts[0]))?;
            let s = parse_unit_or_percent(parts[1])?;
            let l = parse_unit_or_percent(parts[2])?;
            Ok(hsla_to_rgba(h, s, l, alpha))
        }
        other => Err(format!("unsupported color function \"{other}\"")),
    }
}

fn parse_unit_or_percent(p: &str) -> Result<f64, String> {
    let v = if let Some(pct) = p.strip_suffix('%') {
        pct.parse::<f64>()
            .map_err(|_| format!("invalid percentage \"{p}\""))?
            / 100.0
    } else {
        p.parse::<f64>()
            .map_err(|_| format!("invalid number \"{p}\""))?
    };
    Ok(v.clamp(0.0, 1.0))
}

fn named(s: &str) -> Option<Rgba> {
    let c = match s {
        "transparent" => Rgba::TRANSPARENT,
        "white" => Rgba::WHITE,
        "black" => Rgba::BLACK,
        "red" => Rgba::rgba(1.0, 0.0, 0.0, 1.0),
        "lime" => Rgba::rgba(0.0, 1.0, 0.0, 1.0),
        "green" => Rgba::rgba(0.0, 128.0 / 255.0, 0.0, 1.0),
        "blue" => Rgba::rgba(0.0, 0.0, 1.0, 1.0),
        "yellow" => Rgba::YELLOW,
        "cyan" | "aqua" => Rgba::CYAN,
        "magenta" | "fuchsia" => Rgba::rgba(1.0, 0.0, 1.0, 1.0),
        "gray" | "grey" => Rgba::rgba(128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0, 1.0),
        _ => return None,
    };
    Some(c)
}

fn hsla_to_rgba(h: f64, s: f64, l: f64, a: f64) -> Rgba {
    let h = (h % 360.0 + 360.0) % 360.0 / 360.0;
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    if s == 0.0 {
        return Rgba::rgba(l, l, l, a);
    }

    fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            return p + (q - p) * 6.0 * t;
        }
        if t < 1.0 / 2.0 {
            return q;
        }
        if t < 2.0 / 3.0 {
            return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
        }
        p
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;

    Rgba::rgba(
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
        a,
    )
}

#[cfg(test)]
#[path = "../../tests/unit/model/color.rs"]
mod tests;
