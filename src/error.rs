use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("No projects match the selection (phase: {phase:?}, year: {year:?})")]
    EmptySelection {
        phase: Option<String>,
        year: Option<i32>,
    },

    #[error("Invalid month {0}: must be between 1 and 12")]
    InvalidMonth(u32),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AllocationError>;
