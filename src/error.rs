use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThruError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Port unavailable: {0}")]
    PortUnavailable(String),

    #[error("Communication error: {0}")]
    Communication(String),

    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Output error: {0}")]
    Output(String),
}

pub type ThruResult<T> = std::result::Result<T, ThruError>;
