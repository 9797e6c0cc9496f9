pub type CaptionResult<T> = Result<T, CaptionError>;

#[derive(thiserror::Error, Debug)]
pub enum CaptionError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("worker error: {0}")]
    Worker(String),

    #[error("sink error during {stage}{}: {message}", frame_suffix(.frame))]
    Sink {
        stage: &'static str,
        frame: Option<u64>,
        message: String,
    },

    #[error("render cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CaptionError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn worker(msg: impl Into<String>) -> Self {
        Self::Worker(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    pub fn sink(stage: &'static str, frame: Option<u64>, msg: impl Into<String>) -> Self {
        Self::Sink {
            stage,
            frame,
            message: msg.into(),
        }
    }

    /// `true` for the caller-requested cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

fn frame_suffix(frame: &Option<u64>) -> String {
    match frame {
        Some(f) => format!(" (frame {f})"),
        None => String::new(),
    }
}
