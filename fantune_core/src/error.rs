use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum FanError {
    #[error("device error: {0}")]
    Device(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid commanded power for overshoot measurement: {0}")]
    InvalidPower(f32),
    #[error("io error: {0}")]
    Io(String),
    #[error("telemetry logger failed: {0}")]
    Logger(String),
    #[error("sweep cancelled")]
    Cancelled,
}

impl From<std::io::Error> for FanError {
    fn from(e: std::io::Error) -> Self {
        FanError::Io(e.to_string())
    }
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
