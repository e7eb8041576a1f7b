//! Error types for machine setup and lifecycle operations.

/// Result type for machine operations.
pub type Result<T> = std::result::Result<T, MachineError>;

/// Errors that can occur while configuring or operating the machine.
///
/// Runtime anomalies inside the cycle loop are logged, not returned; these
/// errors only come out of setup and explicit lifecycle calls.
#[derive(thiserror::Error, Debug)]
pub enum MachineError {
    /// Invalid machine configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Sound chip rejected its configuration
    #[error("YM2151: {0}")]
    Chip(#[from] ym2151::Ym2151Error),

    /// IO error while writing a dump
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
