use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Input unavailable: {0}")]
    InputUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Algorithm error: {0}")]
    AlgorithmError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn input_unavailable(what: impl Into<String>) -> Self {
        Self::InputUnavailable(what.into())
    }

    pub fn invalid_input(what: impl Into<String>) -> Self {
        Self::InvalidInput(what.into())
    }
}
