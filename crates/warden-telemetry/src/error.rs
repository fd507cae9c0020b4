use thiserror::Error;

pub type TelemetryResult<T> = Result<T, TelemetryError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TelemetryError {
    #[error("urgency must be within 1..=5, got {0}")]
    InvalidUrgency(u8),

    #[error("battery level must be within 0..=100, got {0}")]
    InvalidBatteryLevel(u8),

    #[error("decision confidence must be within [0, 1], got {0}")]
    InvalidConfidence(f64),
}
