//! GTP codec error types

use thiserror::Error;

/// GTP codec error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GtpError {
    /// Buffer too short for operation
    #[error("Buffer too short: need {needed} bytes, have {available}")]
    BufferTooShort { needed: usize, available: usize },

    /// Invalid GTP version
    #[error("Invalid GTP version: {0}")]
    InvalidVersion(u8),

    /// Invalid message type
    #[error("Invalid message type: {0}")]
    InvalidMessageType(u8),

    /// Invalid IE type
    #[error("Invalid IE type: {0}")]
    InvalidIeType(u8),

    /// Typed accessor applied to an IE of a different type
    #[error("Unexpected IE type: expected {expected}, got {actual}")]
    UnexpectedIeType { expected: u8, actual: u8 },

    /// Invalid IE length
    #[error("Invalid IE length: expected {expected}, got {actual}")]
    InvalidIeLength { expected: usize, actual: usize },

    /// IE payload does not form a valid nested IE sequence
    #[error("IE type {0} is not a grouped IE")]
    NotGrouped(u8),

    /// Invalid header
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Invalid message format
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    /// Resource exhausted
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),
}

/// GTP codec result type
pub type GtpResult<T> = Result<T, GtpError>;
