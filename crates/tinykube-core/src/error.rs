use thiserror::Error;

/// Core error type for TinyKube operations.
///
/// Registry operations never fail; this type only covers configuration,
/// transport and protocol-level rejections.
#[derive(Error, Debug)]
pub enum TinykubeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Registration rejected: {0}")]
    Rejected(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for TinykubeError {
    fn from(e: serde_json::Error) -> Self {
        TinykubeError::Serialization(e.to_string())
    }
}

/// Result type alias using TinykubeError.
pub type Result<T> = std::result::Result<T, TinykubeError>;
