use thiserror::Error;

/// Errors raised by the canvas interaction state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    /// Attempted to transition between incompatible states
    #[error("cannot transition from {from} to {to}")]
    InvalidStateTransition {
        from: &'static str,
        to: &'static str,
    },
}
