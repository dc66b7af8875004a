use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("insufficient data: {0}")]
    InsufficientData(&'static str),

    #[error("invalid battery configuration: {0}")]
    InvalidBattery(String),

    #[error("timestamp {0} is out of the representable range")]
    InvalidTimestamp(i64),
}

pub type Result<T> = std::result::Result<T, EngineError>;
