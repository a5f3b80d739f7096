use thiserror::Error;

/// Supervisor error types covering setup, configuration, and platform failures.
///
/// The poll loop itself never fails; these only surface while wiring the
/// supervisor to a platform.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SupervisorError {
    /// Configuration or initialization error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Platform service failed (pin setup, clock, interrupt controller).
    #[error("platform error: {0}")]
    Platform(String),

    /// The requested pin cannot deliver edge interrupts.
    #[error("pin {pin} cannot deliver falling-edge interrupts")]
    InterruptUnavailable {
        /// Pin number that was requested.
        pin: u8,
    },

    /// Invalid kill state transition attempted.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Source state.
        from: String,
        /// Attempted target state.
        to: String,
    },
}

/// Convenience type alias for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;

impl From<crate::config::ConfigError> for SupervisorError {
    fn from(err: crate::config::ConfigError) -> Self {
        SupervisorError::Config(err.to_string())
    }
}
