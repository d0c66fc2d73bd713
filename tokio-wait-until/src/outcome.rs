// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Terminal results of a wait.

/// The terminal result of a wait call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use = "a wait outcome should be checked; a timeout usually means failure"]
pub enum WaitOutcome {
    /// The predicate returned `true` before the timeout elapsed.
    Fulfilled,
    /// The timeout elapsed without the predicate ever returning `true`.
    TimedOut,
    /// The attached [`WaitCancel`](crate::cancel::WaitCancel) was cancelled.
    ///
    /// Never produced by waiters without a cancellation token, except by
    /// [`PredicateWaiter::wait_on()`](crate::waiter::PredicateWaiter::wait_on)
    /// when the runtime cancels the spawned wait.
    Cancelled,
}

/// A wait that did not end with the predicate fulfilled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::thiserror::Error)]
pub enum WaitError {
    /// The timeout elapsed without the predicate ever returning `true`.
    #[error("timed out waiting for predicate")]
    TimedOut,
    /// The wait was cancelled before the predicate returned `true`.
    #[error("wait for predicate was cancelled")]
    Cancelled,
}

impl WaitOutcome {
    /// Returns `true` if the outcome is [`Fulfilled`](Self::Fulfilled).
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, WaitOutcome::Fulfilled)
    }

    /// Returns `true` if the outcome is [`TimedOut`](Self::TimedOut).
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut)
    }

    /// Returns `true` if the outcome is [`Cancelled`](Self::Cancelled).
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WaitOutcome::Cancelled)
    }

    /// Converts the outcome into a [`Result`], so that a timeout can be
    /// propagated with `?`.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::TimedOut`] or [`WaitError::Cancelled`] for the
    /// corresponding outcomes.
    pub fn into_result(self) -> Result<(), WaitError> {
        match self {
            WaitOutcome::Fulfilled => Ok(()),
            WaitOutcome::TimedOut => Err(WaitError::TimedOut),
            WaitOutcome::Cancelled => Err(WaitError::Cancelled),
        }
    }
}

impl From<WaitError> for WaitOutcome {
    fn from(error: WaitError) -> Self {
        match error {
            WaitError::TimedOut => WaitOutcome::TimedOut,
            WaitError::Cancelled => WaitOutcome::Cancelled,
        }
    }
}

impl<T> From<Result<T, WaitError>> for WaitOutcome {
    fn from(result: Result<T, WaitError>) -> Self {
        match result {
            Ok(_) => WaitOutcome::Fulfilled,
            Err(error) => error.into(),
        }
    }
}
