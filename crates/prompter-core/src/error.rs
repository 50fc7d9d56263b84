use thiserror::Error;

/// Errors that reach the user-facing status surface.
///
/// Everything else the core meets (no transcript match, empty fragments,
/// "no speech" from the engine) is recovered where it is detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrompterError {
    #[error("speech recognition is not supported in this environment")]
    InputUnavailable,

    #[error("microphone access denied; allow it in the system settings")]
    PermissionDenied,

    #[error("script contains no text")]
    EmptyScript,

    #[error("recognition engine failed to start: {0}")]
    EngineStart(String),
}

impl PrompterError {
    /// Fatal errors end every voice-driven mode and are never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InputUnavailable | Self::PermissionDenied)
    }
}

pub type Result<T> = std::result::Result<T, PrompterError>;
