use serde::Serialize;
use thiserror::Error;

/// Configuration problems detected before any timing work starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("{field} must be greater than zero")]
    NonPositiveDuration { field: &'static str },

    #[error("{field}: minimum {min}s exceeds maximum {max}s")]
    InvertedBounds {
        field: &'static str,
        min: u32,
        max: u32,
    },

    #[error("{field}: wrap width must be at least one column")]
    ZeroWrapWidth { field: &'static str },

    #[error("{field} must allow at least one")]
    ZeroLimit { field: &'static str },

    #[error("audio_pad_seconds must be a finite, non-negative number (got {0})")]
    InvalidPad(f64),
}

/// Conditions that degrade a render without failing it. Callers surface these
/// as quality warnings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimingWarning {
    /// The target duration cannot hold every segment minimum.
    UnderCapacity { required: u32, available: u32 },

    /// Body pages had to go below their per-page floor to fit the body time.
    BodyPagesCompressed { body_seconds: u32, pages: usize },

    /// Measured narration could not be used; the whole timeline is word-timed.
    AudioFallback { reason: String },
}

impl std::fmt::Display for TimingWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimingWarning::UnderCapacity {
                required,
                available,
            } => write!(
                f,
                "segment minimums need {required}s but only {available}s are available"
            ),
            TimingWarning::BodyPagesCompressed {
                body_seconds,
                pages,
            } => write!(
                f,
                "{pages} body pages squeezed below their floor into {body_seconds}s"
            ),
            TimingWarning::AudioFallback { reason } => {
                write!(f, "narration timing unavailable ({reason}); using word timing")
            }
        }
    }
}
