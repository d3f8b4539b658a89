//! Error types for slot-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid time slot: start {start} is not before end {end}")]
    InvalidSlot { start: String, end: String },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid day rule: {0}")]
    InvalidRule(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
