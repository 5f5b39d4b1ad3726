//! Error types for fallible state transitions

use thiserror::Error;

/// Outcome of a [`try_update_state`](crate::StoreContext::try_update_state)
/// that did not publish synchronously.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UpdateError<E> {
    /// The transform refused the transition. The previous state is intact.
    #[error("state transition rejected: {0:?}")]
    Rejected(E),

    /// Called from inside a running publish on the same thread. The
    /// transform was queued and runs once the current publish completes.
    #[error("state transition deferred until the in-flight publish completes")]
    Deferred,
}

impl<E> UpdateError<E> {
    /// The rejection reason, if the transform refused the transition.
    pub fn into_rejected(self) -> Option<E> {
        match self {
            UpdateError::Rejected(err) => Some(err),
            UpdateError::Deferred => None,
        }
    }

    /// Returns true if the transform was queued rather than run.
    pub fn is_deferred(&self) -> bool {
        matches!(self, UpdateError::Deferred)
    }
}
