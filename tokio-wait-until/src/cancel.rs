// SPDX-License-Identifier: Apache-2.0 OR MIT

use ::std::future::pending;
use ::std::sync::{Arc, Condvar, Mutex};
use ::std::time::Duration;

use ::tokio::sync::watch;

/// Creates a new cancellation channel, returning the handle and token pair.
///
/// The returned [`WaitCancel`] starts in the not-cancelled state. Attach it
/// to a waiter with
/// [`PredicateWaiter::with_cancel()`](crate::waiter::PredicateWaiter::with_cancel).
#[must_use]
pub fn channel() -> (WaitCancelHandle, WaitCancel) {
    let handle = WaitCancelHandle::default();
    let cancel = handle.subscribe();

    (handle, cancel)
}

/// The signalling side of a cancellation channel.
///
/// Use [`cancel()`](Self::cancel) to make every associated [`WaitCancel`]
/// observe cancellation. Cancellation is sticky: once signalled, the channel
/// never returns to the not-cancelled state.
///
/// Cloning the handle creates another handle backed by the same channel.
#[derive(Clone, Debug)]
pub struct WaitCancelHandle {
    sender: watch::Sender<bool>,
    parked: Arc<ParkedThreads>,
}

/// The observing side of a cancellation channel.
///
/// A `WaitCancel` is attached to a
/// [`PredicateWaiter`](crate::waiter::PredicateWaiter). Waits started by that
/// waiter return [`WaitOutcome::Cancelled`](crate::WaitOutcome::Cancelled)
/// as soon as the associated [`WaitCancelHandle`] is cancelled.
#[derive(Clone, Debug)]
pub struct WaitCancel {
    receiver: watch::Receiver<bool>,
    parked: Arc<ParkedThreads>,
}

/// Wakes threads sleeping in a blocking wait when the channel is cancelled.
#[derive(Debug, Default)]
struct ParkedThreads {
    lock: Mutex<()>,
    condvar: Condvar,
}

impl Default for WaitCancelHandle {
    fn default() -> Self {
        Self {
            sender: watch::Sender::new(false),
            parked: Arc::default(),
        }
    }
}

impl WaitCancelHandle {
    /// Creates a new [`WaitCancel`] that observes this handle.
    ///
    /// If the handle was already cancelled, the new token is cancelled too.
    #[must_use]
    pub fn subscribe(&self) -> WaitCancel {
        WaitCancel {
            receiver: self.sender.subscribe(),
            parked: self.parked.clone(),
        }
    }

    /// Cancels every associated [`WaitCancel`].
    ///
    /// Calling this more than once has no further effect.
    pub fn cancel(&self) {
        self.sender.send_replace(true);

        // Taking the lock orders this notification after any parked thread's
        // last look at the flag.
        let _guard = self
            .parked
            .lock
            .lock()
            .expect("Failed to lock cancel parking lot: poisoned by panic in another thread");
        self.parked.condvar.notify_all();
    }

    /// Returns `true` if [`cancel()`](Self::cancel) was called on this
    /// channel.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Returns `true` if `self` and `other` refer to the same underlying
    /// cancellation channel.
    #[must_use]
    pub fn same_channel(&self, other: &Self) -> bool {
        self.sender.same_channel(&other.sender)
    }
}

impl WaitCancel {
    /// Returns `true` if the channel has been cancelled.
    ///
    /// This is a non-blocking check. A cancellation sent before every
    /// [`WaitCancelHandle`] was dropped stays visible.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Asynchronously waits until the channel is cancelled.
    ///
    /// If all associated [`WaitCancelHandle`] have been dropped without
    /// cancelling (meaning cancellation can never arrive), this future will
    /// wait forever.
    pub async fn cancelled(&mut self) {
        let closed = self
            .receiver
            .wait_for(|cancelled| *cancelled)
            .await
            .is_err();
        if closed {
            pending::<()>().await;
        }
    }

    /// Blocks the calling thread for up to `duration`, returning early with
    /// `true` as soon as the channel is cancelled.
    pub(crate) fn park_timeout(&self, duration: Duration) -> bool {
        let guard = self
            .parked
            .lock
            .lock()
            .expect("Failed to lock cancel parking lot: poisoned by panic in another thread");
        let _guard = self
            .parked
            .condvar
            .wait_timeout_while(guard, duration, |_| !self.is_cancelled())
            .expect("Failed to wait on cancel parking lot: poisoned by panic in another thread");
        self.is_cancelled()
    }

    /// Returns `true` if `self` and `other` are associated with the same
    /// underlying cancellation channel.
    #[must_use]
    pub fn same_channel(&self, other: &Self) -> bool {
        self.receiver.same_channel(&other.receiver)
    }
}
