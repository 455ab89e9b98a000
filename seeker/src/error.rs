use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeekerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Stream error: {0}")]
    StreamError(#[from] webm_seek::Error),

    #[error("IO error: {0}")]
    IoError(String),
}
