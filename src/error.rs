// src/error.rs
// Error types for the harness, channel and configuration layers

use thiserror::Error;

/// Main error type for the inertion library
///
/// Assertion failures are never errors: they are recorded as failing facts.
/// The variants here are either programmer errors surfaced at the call site
/// or ambient failures (config, I/O).
#[derive(Error, Debug)]
pub enum InertionError {
    #[error(
        "attempted assertion after end of test \"{description}\" - \
         please check your code for missing await statements"
    )]
    AssertionAfterEnd { description: String },

    #[error(
        "late value: pushed into a channel after its emitter completed - \
         please check your code for missing await statements"
    )]
    LateValue,

    #[error("unknown assertion method: {0}")]
    UnknownMethod(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience type alias for Result using InertionError
pub type Result<T> = std::result::Result<T, InertionError>;

impl InertionError {
    /// True for misuse that indicates a bug in the calling spec
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            InertionError::AssertionAfterEnd { .. }
                | InertionError::LateValue
                | InertionError::UnknownMethod(_)
        )
    }
}
