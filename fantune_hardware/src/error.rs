use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("serial link error: {0}")]
    Serial(String),
    #[error("device disconnected")]
    Disconnected,
    #[error("invalid fan power command: {0}")]
    InvalidCommand(f32),
    #[error("device state lock poisoned")]
    Poisoned,
}
