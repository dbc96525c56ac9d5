//! Error types for the core crate.

use thiserror::Error;

/// Errors that can occur in the signal system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// The connection ID is invalid or has already been disconnected.
    #[error("invalid or disconnected connection ID")]
    InvalidConnection,

    /// The signal has been dropped and is no longer available.
    #[error("signal has been dropped")]
    SignalDropped,
}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, SignalError>;
