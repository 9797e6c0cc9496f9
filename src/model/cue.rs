use serde::{Deserialize, Serialize};

use crate::foundation::math::clamp01;
use crate::model::style::StyleOverride;

/// Cue identifier. Inputs use either JSON numbers or strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CueId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for CueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for CueId {
    fn from(v: i64) -> Self {
        Self::Number(v)
    }
}

impl From<i32> for CueId {
    fn from(v: i32) -> Self {
        Self::Number(i64::from(v))
    }
}

impl From<&str> for CueId {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

/// Timing of one whitespace-delimited token, in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl WordTiming {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A timed text unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cue {
    pub id: CueId,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordTiming>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_override: Option<StyleOverride>,
}

impl Cue {
    pub fn new(id: impl Into<CueId>, start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time,
            text: text.into(),
            words: None,
            style_override: None,
        }
    }

    pub fn with_words(mut self, words: Vec<WordTiming>) -> Self {
        self.words = Some(words);
        self
    }

    pub fn with_style_override(mut self, o: StyleOverride) -> Self {
        self.style_override = Some(o);
        self
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// `endTime <= startTime` (or non-finite bounds).
    pub fn is_degenerate(&self) -> bool {
        let d = self.duration();
        !d.is_finite() || d <= 0.0
    }

    /// Active iff `time` lies in the closed interval `[startTime, endTime]`.
    pub fn is_active_at(&self, time: f64) -> bool {
        time >= self.start_time && time <= self.end_time
    }

    /// Fraction of the cue elapsed at `time`, clamped to `[0, 1]`. Degenerate cues report 0.
    pub fn progress_at(&self, time: f64) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        clamp01((time - self.start_time) / self.duration())
    }

    pub fn tokens(&self) -> Vec<&str> {
        self.text.split_whitespace().collect()
    }

    /// Per-token timings.
    ///
    /// Supplied timings are used only when they cover every token; their intervals are clamped
    /// into the cue. Otherwise the cue duration is divided evenly across the tokens.
    pub fn word_timings(&self) -> Vec<WordTiming> {
        let tokens = self.tokens();
        let n = tokens.len();

        if let Some(words) = self.words.as_ref() {
            if words.len() == n {
                let (lo, hi) = (self.start_time, self.end_time.max(self.start_time));
                return words
                    .iter()
                    .zip(tokens)
                    .map(|(w, token)| {
                        let start = w.start.clamp(lo, hi);
                        let end = w.end.clamp(start, hi);
                        WordTiming {
                            word: token.to_owned(),
                            start,
                            end,
                        }
                    })
                    .collect();
            }
            tracing::debug!(
                cue = %self.id,
                supplied = words.len(),
                tokens = n,
                "word timings do not match token count, synthesizing"
            );
        }

        let step = if n > 0 && !self.is_degenerate() {
            self.duration() / n as f64
        } else {
            0.0
        };
        tokens
            .into_iter()
            .enumerate()
            .map(|(i, token)| {
                let start = self.start_time + i as f64 * step;
                WordTiming {
                    word: token.to_owned(),
                    start,
                    end: start + step,
                }
            })
            .collect()
    }

    /// Index of the word spoken at `time`, or `None` when the cue has no tokens.
    ///
    /// Word intervals are half-open except the last, which includes the cue end. When no
    /// interval contains `time` the index is `floor(progress * n)`.
    pub fn active_word_index(&self, timings: &[WordTiming], time: f64) -> Option<usize> {
        let n = timings.len();
        if n == 0 {
            return None;
        }
        let hit = timings.iter().enumerate().position(|(i, w)| {
            let closed = i + 1 == n;
            time >= w.start && (time < w.end || (closed && time <= w.end))
        });
        Some(hit.unwrap_or_else(|| {
            let p = self.progress_at(time);
            ((p * n as f64).floor() as usize).min(n - 1)
        }))
    }
}

/// Fraction of `w` elapsed at `time`, clamped to `[0, 1]`; zero-length words report 0.
pub fn word_progress(w: &WordTiming, time: f64) -> f64 {
    let d = w.duration();
    if !d.is_finite() || d <= 0.0 {
        return 0.0;
    }
    clamp01((time - w.start) / d)
}

#[cfg(test)]
#[path = "../../tests/unit/model/cue.rs"]
mod tests;
