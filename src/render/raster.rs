//! Single-frame caption rasterizer.
//!
//! Rendering a cue happens in two steps. [`Rasterizer::plan_cue`] resolves the cue's mode,
//! animation state and geometry without touching pixels; [`Rasterizer::draw_plan`] turns the
//! plan into layers on a [`Surface`].

use std::sync::Arc;

use crate::animation::ease::Ease;
use crate::animation::motion::{
    LineAnimation, MotionState, clip_reveal_rect, default_fade_alpha, line_animation,
    word_active_state, word_inactive_state, word_motion_progress,
};
use crate::animation::shadow::{DEFAULT_SHADOW_COLOR, ShadowSpec};
use crate::foundation::core::{Affine, Canvas, Point, Rect, Vec2};
use crate::foundation::error::CaptionResult;
use crate::model::color::Rgba;
use crate::model::cue::{Cue, word_progress};
use crate::model::style::Style;
use crate::preset::catalog::PresetCatalog;
use crate::preset::model::{EffectPreset, ToggleDecor, WordActive};
use crate::render::decor::{
    self, DEFAULT_INACTIVE_OPACITY, DecorContext, Highlight, migrating_highlight,
};
use crate::render::layout::{
    BlockLayout, Metrics, ShapeParams, WordBox, WordLayout, anchor, layout_block, layout_words,
    wrap_text,
};
use crate::render::surface::{Join, LayerStyle, Painter, Surface};
use crate::text::engine::{ShapedLine, TextEngine};
use crate::text::fonts::FontBook;

/// Preset id that switches a cue to the typing reveal.
pub const TYPEWRITER_ID: &str = "typewriter";
/// Shadow blur above which text switches to the multi-pass glow.
pub const GLOW_BLUR_THRESHOLD: f64 = 15.0;
const DEFAULT_GLOW_BLUR: f64 = 20.0;
/// Blur multipliers and whether the pass uses white instead of the glow color.
const GLOW_PASSES: [(f64, bool); 4] = [(0.4, true), (1.0, false), (2.5, false), (4.5, false)];
const BACKGROUND_RADIUS: f64 = 8.0;
const QUOTE_MARK: &str = "\u{201C}";

/// How a cue is laid out and animated. Modes are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CueMode {
    /// Only the spoken word is shown.
    SingleWord,
    /// Characters appear over the cue's lifetime.
    Typewriter,
    /// The whole cue moves as one block.
    Line,
    /// Words are laid out individually and the spoken one is highlighted.
    Word,
}

impl CueMode {
    pub fn select(style: &Style, preset: Option<&EffectPreset>) -> Self {
        if style.is_single_word() {
            return Self::SingleWord;
        }
        match preset {
            Some(p) if p.id == TYPEWRITER_ID => Self::Typewriter,
            Some(p) if p.is_word_scope() => Self::Word,
            _ => Self::Line,
        }
    }
}

/// Time-dependent state of a cue that needs no text layout.
#[derive(Clone, Debug, PartialEq)]
pub struct CueClock {
    pub mode: CueMode,
    /// Overall cue opacity in `[0, 1]`.
    pub alpha: f64,
    /// Block motion for line, typewriter and single-word modes; rest in word mode.
    pub line: LineAnimation,
    /// `true` when the cue's pixels depend on `time` beyond what the other fields capture.
    pub animating: bool,
    /// Characters shown by the typing reveal.
    pub visible_chars: Option<usize>,
}

/// Resolve the mode and animation clock of `cue` at `time`. `style` is the merged style.
pub fn cue_clock(
    cue: &Cue,
    style: &Style,
    preset: Option<&EffectPreset>,
    time: f64,
    reference_font_px: f64,
) -> CueClock {
    let mode = CueMode::select(style, preset);
    let word_scope = preset.is_some_and(EffectPreset::is_word_scope);
    let fade = if word_scope {
        default_fade_alpha(time - cue.start_time, cue.end_time - time)
    } else {
        1.0
    };
    let block_motion = |start: f64| {
        preset.map_or_else(LineAnimation::rest, |p| {
            line_animation(
                p.entry.as_ref(),
                p.exit.as_ref(),
                start,
                cue.end_time,
                time,
                reference_font_px,
            )
        })
    };

    match mode {
        CueMode::Line => {
            let line = block_motion(cue.start_time);
            CueClock {
                mode,
                alpha: line.motion.alpha() * fade,
                animating: line.animating,
                line,
                visible_chars: None,
            }
        }
        CueMode::Typewriter => {
            let line = block_motion(cue.start_time);
            let total = cue.text.chars().count();
            let visible = ((cue.progress_at(time) * total as f64).floor() as usize).min(total);
            CueClock {
                mode,
                alpha: line.motion.alpha() * fade,
                animating: line.animating,
                line,
                visible_chars: Some(visible),
            }
        }
        CueMode::Word => CueClock {
            mode,
            alpha: fade,
            line: LineAnimation::rest(),
            animating: true,
            visible_chars: None,
        },
        CueMode::SingleWord => {
            let timings = cue.word_timings();
            let active = cue.active_word_index(&timings, time);
            let line = match (preset, active) {
                (Some(p), Some(i)) if word_scope => match p.active.as_ref() {
                    Some(WordActive::WordMotion(m)) => {
                        let raw = word_motion_progress(m, &timings[i], time);
                        let eased = Ease::from_transition(m.transition.as_ref()).apply(raw);
                        LineAnimation {
                            motion: word_active_state(
                                m,
                                p.inactive.as_ref(),
                                eased,
                                reference_font_px,
                            ),
                            clip: None,
                            animating: true,
                        }
                    }
                    _ => LineAnimation::rest(),
                },
                (Some(_), Some(i)) => block_motion(timings[i].start),
                _ => LineAnimation::rest(),
            };
            CueClock {
                mode,
                alpha: line.motion.alpha() * fade,
                line,
                animating: true,
                visible_chars: None,
            }
        }
    }
}

/// Per-word state in a word-scope plan, aligned with [`WordLayout::words`].
#[derive(Clone, Debug)]
pub struct WordState {
    pub motion: MotionState,
    /// 1 for spoken words, the word's own progress for the active one, 0 for the rest.
    pub progress: f64,
    pub is_active: bool,
    /// Extra opacity factor from dimming.
    pub dim: f64,
    /// Glyphs to draw; reshaped when the motion changes tracking.
    pub shaped: Arc<ShapedLine>,
}

#[derive(Clone, Debug)]
pub struct WordPlan {
    pub layout: WordLayout,
    pub active: usize,
    pub states: Vec<WordState>,
    pub highlight: Option<Highlight>,
    pub active_spec: Option<WordActive>,
    pub quote: Option<Arc<ShapedLine>>,
}

#[derive(Clone, Debug)]
pub enum PlanContent {
    Block(BlockLayout),
    Words(WordPlan),
}

/// Everything needed to draw one cue at one instant.
#[derive(Clone, Debug)]
pub struct CuePlan {
    pub mode: CueMode,
    pub style: Style,
    pub metrics: Metrics,
    pub alpha: f64,
    pub line: LineAnimation,
    pub animating: bool,
    pub content: PlanContent,
}

/// Draws caption cues onto a surface. One per render unit.
pub struct Rasterizer {
    engine: TextEngine,
    catalog: &'static PresetCatalog,
}

impl Rasterizer {
    pub fn new(book: &FontBook) -> CaptionResult<Self> {
        Self::with_catalog(book, PresetCatalog::builtin())
    }

    pub fn with_catalog(book: &FontBook, catalog: &'static PresetCatalog) -> CaptionResult<Self> {
        Ok(Self {
            engine: TextEngine::new(book)?,
            catalog,
        })
    }

    pub fn catalog(&self) -> &'static PresetCatalog {
        self.catalog
    }

    pub fn engine(&self) -> &TextEngine {
        &self.engine
    }

    /// Draw every cue active at `time` on top of `surface`, in input order.
    ///
    /// Returns the number of cues drawn. The surface is not cleared.
    pub fn render(
        &mut self,
        surface: &mut Surface,
        cues: &[Cue],
        style: &Style,
        time: f64,
    ) -> CaptionResult<usize> {
        let canvas = surface.canvas();
        let catalog = self.catalog;
        let mut drawn = 0;
        for cue in cues.iter().filter(|c| c.is_active_at(time)) {
            let merged = style.merged(cue.style_override.as_ref());
            let preset = catalog.lookup(&merged.effect);
            if let Some(plan) = self.plan_cue(cue, style, time, preset, canvas)? {
                self.draw_plan(surface, &plan)?;
                drawn += 1;
            }
        }
        Ok(drawn)
    }

    /// Resolve `cue` at `time` into a plan, or `None` when it draws nothing.
    ///
    /// `style` is the render style; the cue's override is merged here.
    pub fn plan_cue(
        &mut self,
        cue: &Cue,
        style: &Style,
        time: f64,
        preset: Option<&EffectPreset>,
        canvas: Canvas,
    ) -> CaptionResult<Option<CuePlan>> {
        if !cue.is_active_at(time) {
            return Ok(None);
        }
        let style = style.merged(cue.style_override.as_ref());
        let metrics = Metrics::new(canvas, &style);
        let clock = cue_clock(cue, &style, preset, time, metrics.reference_font_px);
        let params = ShapeParams {
            face: self.engine.select_face(&style.font_name, style.weight_value()),
            size_px: metrics.font_px as f32,
            spacing: 0.0,
        };
        let block_params = params.with_spacing(
            style.letter_spacing * metrics.unit
                + clock.line.motion.letter_spacing * metrics.responsive,
        );

        let content = match clock.mode {
            CueMode::Line => {
                let lines = wrap_text(&mut self.engine, &cue.text, block_params, metrics.max_width)?;
                if lines.is_empty() {
                    return Ok(None);
                }
                let at = anchor(canvas, &style, &metrics, lines.len());
                PlanContent::Block(layout_block(
                    &mut self.engine,
                    &lines,
                    block_params,
                    at,
                    metrics.line_height,
                )?)
            }
            CueMode::Typewriter => {
                let lines = wrap_text(&mut self.engine, &cue.text, block_params, metrics.max_width)?;
                if lines.is_empty() {
                    return Ok(None);
                }
                let visible = clock.visible_chars.unwrap_or(0);
                let prefix: String = cue.text.chars().take(visible).collect();
                let shown = reveal_lines(&lines, &prefix);
                let at = anchor(canvas, &style, &metrics, lines.len());
                PlanContent::Block(layout_block(
                    &mut self.engine,
                    &shown,
                    block_params,
                    at,
                    metrics.line_height,
                )?)
            }
            CueMode::SingleWord => {
                let timings = cue.word_timings();
                let Some(i) = cue.active_word_index(&timings, time) else {
                    return Ok(None);
                };
                let lines = vec![timings[i].word.clone()];
                let at = anchor(canvas, &style, &metrics, 1);
                PlanContent::Block(layout_block(
                    &mut self.engine,
                    &lines,
                    block_params,
                    at,
                    metrics.line_height,
                )?)
            }
            CueMode::Word => {
                match self.plan_words(cue, &style, &metrics, params, preset, time, canvas, clock.alpha)? {
                    Some(words) => PlanContent::Words(words),
                    None => return Ok(None),
                }
            }
        };

        Ok(Some(CuePlan {
            mode: clock.mode,
            style,
            metrics,
            alpha: clock.alpha,
            line: clock.line,
            animating: clock.animating,
            content,
        }))
    }

    #[allow(clippy::too_many_arguments)]
    fn plan_words(
        &mut self,
        cue: &Cue,
        style: &Style,
        metrics: &Metrics,
        params: ShapeParams,
        preset: Option<&EffectPreset>,
        time: f64,
        canvas: Canvas,
        alpha: f64,
    ) -> CaptionResult<Option<WordPlan>> {
        let tokens = cue.tokens();
        if tokens.is_empty() {
            return Ok(None);
        }
        let timings = cue.word_timings();
        let active = cue.active_word_index(&timings, time).unwrap_or(0);
        let base_spacing = style.letter_spacing * metrics.unit;
        let word_params = params.with_spacing(base_spacing);
        let layout = layout_words(
            &mut self.engine,
            &tokens,
            word_params,
            style.highlight_gap * metrics.responsive,
            canvas,
            style,
            metrics,
        )?;

        let active_spec = preset.and_then(|p| p.active.clone());
        let inactive = preset.and_then(|p| p.inactive.as_ref());
        let rest = word_inactive_state(inactive, metrics.reference_font_px);
        let dim = match active_spec.as_ref() {
            Some(WordActive::WordDecorToggle(d)) if d.decor == ToggleDecor::DimOthers => {
                d.inactive_opacity.unwrap_or(DEFAULT_INACTIVE_OPACITY)
            }
            _ => 1.0,
        };

        let mut states = Vec::with_capacity(layout.words.len());
        for word in &layout.words {
            let i = word.index;
            let timing = &timings[i];
            let progress = match i.cmp(&active) {
                std::cmp::Ordering::Less => 1.0,
                std::cmp::Ordering::Equal => word_progress(timing, time),
                std::cmp::Ordering::Greater => 0.0,
            };
            let motion = match active_spec.as_ref() {
                Some(WordActive::WordMotion(m)) if i == active => {
                    let raw = word_motion_progress(m, timing, time);
                    let eased = Ease::from_transition(m.transition.as_ref()).apply(raw);
                    word_active_state(m, inactive, eased, metrics.reference_font_px)
                }
                _ => rest.clone(),
            };
            let shaped = if motion.letter_spacing != 0.0 {
                let spacing = base_spacing + motion.letter_spacing * metrics.responsive;
                self.engine
                    .shape(&word.text, params.face, params.size_px, spacing as f32)?
            } else {
                Arc::clone(&word.shaped)
            };
            states.push(WordState {
                motion,
                progress,
                is_active: i == active,
                dim: if i == active { 1.0 } else { dim },
                shaped,
            });
        }

        let highlight_color = Rgba::parse_or(&style.highlight_color, Rgba::YELLOW);
        let highlight = match active_spec.as_ref() {
            Some(WordActive::WordDecorToggle(d)) if d.decor.migrates() => migrating_highlight(
                &layout,
                &timings,
                active,
                time,
                d,
                metrics,
                highlight_color,
                style.highlight_opacity * alpha,
            ),
            _ => None,
        };
        let quote = match active_spec.as_ref() {
            Some(WordActive::WordDecorToggle(d)) if d.decor == ToggleDecor::Quotes => Some(
                self.engine
                    .shape(QUOTE_MARK, params.face, params.size_px * 0.8, 0.0)?,
            ),
            _ => None,
        };

        Ok(Some(WordPlan {
            layout,
            active,
            states,
            highlight,
            active_spec,
            quote,
        }))
    }

    /// Draw a resolved plan.
    pub fn draw_plan(&mut self, surface: &mut Surface, plan: &CuePlan) -> CaptionResult<()> {
        if plan.alpha.is_nan() || plan.alpha <= 0.0 {
            return Ok(());
        }
        match &plan.content {
            PlanContent::Block(block) => draw_block(surface, plan, block),
            PlanContent::Words(words) => draw_words(surface, plan, words),
        }
    }
}

/// Split the revealed `prefix` of a cue over its final wrapped `lines`.
///
/// Lines keep their final positions; a partly typed word shows its typed characters.
pub fn reveal_lines(lines: &[String], prefix: &str) -> Vec<String> {
    let mut typed = prefix.split_whitespace();
    let mut out = Vec::with_capacity(lines.len());
    let mut exhausted = false;
    for line in lines {
        let mut shown = Vec::new();
        if !exhausted {
            for _ in line.split_whitespace() {
                match typed.next() {
                    Some(w) => shown.push(w),
                    None => {
                        exhausted = true;
                        break;
                    }
                }
            }
        }
        out.push(shown.join(" "));
    }
    out
}

fn about(pivot: Point, motion: &MotionState, offset_scale: f64) -> Affine {
    let c = pivot.to_vec2();
    Affine::translate(c) * motion.affine(offset_scale) * Affine::translate(-c)
}

fn blur_sigma(blur_px: f64, responsive: f64) -> f64 {
    if blur_px.is_finite() && blur_px > 0.0 {
        blur_px * responsive / 2.0
    } else {
        0.0
    }
}

fn combine_sigma(a: f64, b: f64) -> f32 {
    (a * a + b * b).sqrt() as f32
}

fn draw_block(surface: &mut Surface, plan: &CuePlan, block: &BlockLayout) -> CaptionResult<()> {
    if block.is_empty() {
        return Ok(());
    }
    let m = &plan.metrics;
    let motion = &plan.line.motion;
    let tf = about(block.center(), motion, m.responsive);
    let sigma = blur_sigma(motion.blur, m.responsive);
    let clip = plan.line.clip.map(|c| {
        let area = block
            .background_rect(m.font_px)
            .inflate(m.font_px * 0.25, m.font_px * 0.25);
        clip_reveal_rect(area, c.direction, c.visible, c.entering)
    });

    let bg = Rgba::parse_or(&plan.style.background_color, Rgba::TRANSPARENT);
    if !bg.is_transparent() {
        let rect = block.background_rect(m.font_px);
        let radius = BACKGROUND_RADIUS * m.responsive;
        surface.layer(
            LayerStyle::with_opacity(plan.alpha as f32).blurred(sigma as f32),
            |p| {
                if let Some(c) = clip {
                    p.push_clip(c);
                }
                p.set_transform(tf);
                p.fill_rounded_rect(rect, radius, bg);
                Ok(())
            },
        )?;
    }

    let runs: Vec<(Arc<ShapedLine>, Point)> = block
        .lines
        .iter()
        .map(|l| (Arc::clone(&l.shaped), l.origin()))
        .collect();
    let paint = TextPaint::for_block(&plan.style, m, motion.shadow);
    draw_text(surface, &runs, tf, clip, &paint, plan.alpha, sigma)
}

fn draw_words(surface: &mut Surface, plan: &CuePlan, words: &WordPlan) -> CaptionResult<()> {
    let m = &plan.metrics;
    let style = &plan.style;
    if let Some(h) = words.highlight.as_ref() {
        decor::draw_highlight(surface, h)?;
    }

    let highlight_color = Rgba::parse_or(&style.highlight_color, Rgba::YELLOW);
    let style_shadow = match words.active_spec.as_ref() {
        Some(WordActive::WordMotion(_)) => None,
        _ => style_word_shadow(style),
    };

    for (word, state) in words.layout.words.iter().zip(&words.states) {
        let opacity = plan.alpha * state.motion.alpha() * state.dim;
        if opacity <= 0.0 {
            continue;
        }
        let tf = about(word.center, &state.motion, m.responsive);
        let sigma = blur_sigma(state.motion.blur, m.responsive);
        let placed = WordBox {
            shaped: Arc::clone(&state.shaped),
            ..word.clone()
        };
        let cx = DecorContext {
            word: &placed,
            metrics: m,
            transform: tf,
            color: highlight_color,
            opacity,
            progress: state.progress,
            highlight_alpha: style.highlight_opacity,
            quote: words.quote.clone(),
        };

        if state.is_active {
            match words.active_spec.as_ref() {
                Some(WordActive::WordDecorToggle(d)) if decor::toggle_is_behind(d.decor) => {
                    decor::draw_toggle_decor(surface, d, &cx)?;
                }
                Some(WordActive::WordProgressDecor(d)) if decor::progress_is_behind(d.decor) => {
                    decor::draw_progress_decor(surface, d, &cx)?;
                }
                _ => {}
            }
        }

        let origin = Point::new(
            word.center.x - state.shaped.width / 2.0,
            word.center.y + state.shaped.middle_to_baseline(),
        );
        let shadow = state.motion.shadow.or(style_shadow);
        let paint = TextPaint::for_word(style, m, shadow);
        draw_text(
            surface,
            &[(Arc::clone(&state.shaped), origin)],
            tf,
            None,
            &paint,
            opacity,
            sigma,
        )?;

        match words.active_spec.as_ref() {
            Some(WordActive::WordProgressFill(f)) if state.progress > 0.0 => {
                decor::draw_progress_fill(surface, f.direction, &cx)?;
            }
            Some(WordActive::WordDecorToggle(d))
                if state.is_active && !decor::toggle_is_behind(d.decor) =>
            {
                decor::draw_toggle_decor(surface, d, &cx)?;
            }
            Some(WordActive::WordProgressDecor(d))
                if state.is_active && !decor::progress_is_behind(d.decor) =>
            {
                decor::draw_progress_decor(surface, d, &cx)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Shadow configured on the style, in style units. The vertical offset defaults to 2.
fn style_word_shadow(style: &Style) -> Option<ShadowSpec> {
    if !(style.shadow_blur.is_finite() && style.shadow_blur > 0.0) {
        return None;
    }
    Some(ShadowSpec {
        offset_x: style.shadow_offset_x,
        offset_y: if style.shadow_offset_y == 0.0 {
            2.0
        } else {
            style.shadow_offset_y
        },
        blur: style.shadow_blur,
        color: Rgba::parse_or(&style.shadow_color, DEFAULT_SHADOW_COLOR),
    })
}

/// Glow color when neither a shadow nor the style names one.
fn style_glow_color(style: &Style) -> Rgba {
    let primary = Rgba::parse_or(&style.primary_color, Rgba::CYAN);
    if style.shadow_color.trim().is_empty() {
        primary
    } else {
        Rgba::parse_or(&style.shadow_color, primary)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Glow {
    offset: Vec2,
    /// Base blur radius in canvas pixels.
    blur: f64,
    color: Rgba,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct DropShadow {
    offset: Vec2,
    blur: f64,
    color: Rgba,
}

/// Colors and passes for one piece of text.
#[derive(Clone, Copy, Debug, PartialEq)]
struct TextPaint {
    fill: Rgba,
    outline: Option<(Rgba, f64)>,
    stroke: Option<(Rgba, f64)>,
    glow: Option<Glow>,
    drop: Option<DropShadow>,
}

impl TextPaint {
    /// Paint for line-scope text. `shadow` is the resolved motion shadow, in reference px.
    fn for_block(style: &Style, m: &Metrics, shadow: Option<ShadowSpec>) -> Self {
        let shadow = shadow.filter(|s| !s.is_invisible());
        let mut paint = Self::strokes(style, m);
        if is_neon(style, shadow) {
            let blur = shadow
                .map(|s| s.blur)
                .filter(|b| *b > 0.0)
                .or_else(|| (style.shadow_blur > 0.0).then_some(style.shadow_blur))
                .unwrap_or(DEFAULT_GLOW_BLUR);
            let (ox, oy) = shadow.map_or((style.shadow_offset_x, style.shadow_offset_y), |s| {
                (s.offset_x, s.offset_y)
            });
            paint.glow = Some(Glow {
                offset: Vec2::new(ox * m.unit, oy * m.unit),
                blur: blur * m.responsive,
                color: shadow.map_or_else(|| style_glow_color(style), |s| s.color),
            });
            paint.into_neon(style, m)
        } else {
            paint.drop = match shadow {
                Some(s) => Some(DropShadow {
                    offset: Vec2::new(s.offset_x * m.unit, s.offset_y * m.unit),
                    blur: s.blur * m.unit,
                    color: s.color,
                }),
                None => style_word_shadow(style).map(|s| DropShadow {
                    offset: Vec2::new(s.offset_x * m.unit, s.offset_y * m.unit),
                    blur: s.blur * m.unit,
                    color: s.color,
                }),
            };
            paint
        }
    }

    /// Paint for one word. `shadow` is the motion or style shadow, scaled by `responsive`.
    fn for_word(style: &Style, m: &Metrics, shadow: Option<ShadowSpec>) -> Self {
        let shadow = shadow.filter(|s| !s.is_invisible());
        let mut paint = Self::strokes(style, m);
        let neon = style.effect.trim() == "neon"
            || shadow.is_some_and(|s| s.blur > GLOW_BLUR_THRESHOLD);
        if neon {
            let s = shadow.unwrap_or(ShadowSpec {
                offset_x: 0.0,
                offset_y: 0.0,
                blur: DEFAULT_GLOW_BLUR,
                color: style_glow_color(style),
            });
            paint.glow = Some(Glow {
                offset: Vec2::new(s.offset_x * m.responsive, s.offset_y * m.responsive),
                blur: s.blur.max(f64::EPSILON) * m.responsive,
                color: s.color,
            });
            paint.into_neon(style, m)
        } else {
            paint.drop = shadow.map(|s| DropShadow {
                offset: Vec2::new(s.offset_x * m.responsive, s.offset_y * m.responsive),
                blur: s.blur * m.responsive,
                color: s.color,
            });
            paint
        }
    }

    fn strokes(style: &Style, m: &Metrics) -> Self {
        let outline = positive(style.outline_width);
        let stroke = positive(style.stroke_width);
        Self {
            fill: Rgba::parse_or(&style.primary_color, Rgba::WHITE),
            outline: (outline > 0.0).then(|| {
                (
                    Rgba::parse_or(&style.outline_color, Rgba::BLACK),
                    (outline + stroke) * 2.0 * m.unit,
                )
            }),
            stroke: (stroke > 0.0).then(|| {
                (
                    Rgba::parse_or(&style.stroke_color, Rgba::BLACK),
                    stroke * 2.0 * m.unit,
                )
            }),
            glow: None,
            drop: None,
        }
    }

    /// Glowing text has no outline; its stroke sits on top of the fill, white by default.
    fn into_neon(mut self, style: &Style, m: &Metrics) -> Self {
        let stroke = positive(style.stroke_width);
        self.outline = None;
        self.drop = None;
        self.stroke = (stroke > 0.0).then(|| {
            (
                Rgba::parse_or(&style.stroke_color, Rgba::WHITE),
                stroke * 2.0 * m.unit,
            )
        });
        self
    }
}

fn positive(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}

fn is_neon(style: &Style, shadow: Option<ShadowSpec>) -> bool {
    style.effect.trim() == "neon"
        || style.shadow_blur > GLOW_BLUR_THRESHOLD
        || shadow.is_some_and(|s| s.blur > GLOW_BLUR_THRESHOLD)
}

fn begin(p: &mut Painter<'_>, clip: Option<Rect>, transform: Affine) {
    if let Some(c) = clip {
        p.push_clip(c);
    }
    p.set_transform(transform);
}

/// Draw glyph runs with every pass of `paint`, each pass in its own layer.
fn draw_text(
    surface: &mut Surface,
    runs: &[(Arc<ShapedLine>, Point)],
    transform: Affine,
    clip: Option<Rect>,
    paint: &TextPaint,
    opacity: f64,
    sigma: f64,
) -> CaptionResult<()> {
    if runs.iter().all(|(s, _)| s.is_empty()) {
        return Ok(());
    }
    let opacity = opacity as f32;

    if let Some(glow) = paint.glow {
        let shifted = Affine::translate(glow.offset) * transform;
        for (mult, white) in GLOW_PASSES {
            let color = if white { Rgba::WHITE } else { glow.color };
            let style = LayerStyle::with_opacity(opacity)
                .blurred(combine_sigma(glow.blur * mult / 2.0, sigma))
                .screen();
            surface.layer(style, |p| {
                begin(p, clip, shifted);
                for (shaped, origin) in runs {
                    p.fill_glyphs(shaped, *origin, color);
                }
                Ok(())
            })?;
        }
    }

    if let Some(drop) = paint.drop {
        let shifted = Affine::translate(drop.offset) * transform;
        let style = LayerStyle::with_opacity(opacity).blurred(combine_sigma(drop.blur / 2.0, sigma));
        surface.layer(style, |p| {
            begin(p, clip, shifted);
            for (shaped, origin) in runs {
                if let Some((_, width)) = paint.outline {
                    p.stroke_glyphs(shaped, *origin, drop.color, width, Join::Round);
                }
                p.fill_glyphs(shaped, *origin, drop.color);
            }
            Ok(())
        })?;
    }

    let style = LayerStyle::with_opacity(opacity).blurred(sigma as f32);
    surface.layer(style, |p| {
        begin(p, clip, transform);
        for (shaped, origin) in runs {
            if paint.glow.is_some() {
                p.fill_glyphs(shaped, *origin, paint.fill);
                if let Some((color, width)) = paint.stroke {
                    p.stroke_glyphs(shaped, *origin, color, width, Join::Miter);
                }
            } else {
                if let Some((color, width)) = paint.outline {
                    p.stroke_glyphs(shaped, *origin, color, width, Join::Round);
                }
                if let Some((color, width)) = paint.stroke {
                    p.stroke_glyphs(shaped, *origin, color, width, Join::Miter);
                }
                p.fill_glyphs(shaped, *origin, paint.fill);
            }
        }
        Ok(())
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
