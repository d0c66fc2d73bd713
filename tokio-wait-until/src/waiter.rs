// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Predicate waiter: poll a condition until it holds or a timeout elapses.
//!
//! A [`PredicateWaiter`] holds the configuration of a wait (timeout, poll
//! interval and an optional [`WaitCancel`] token). The predicate itself is
//! passed to one of the `wait*` methods and is only borrowed for the duration
//! of that call, so one waiter can be reused for any number of waits.

use ::std::thread::sleep as thread_sleep;
use ::std::time::{Duration, Instant};

use ::tokio::select;
use ::tokio::time::{Instant as TokioInstant, sleep};
use ::tracing::{debug, trace};

use crate::cancel::WaitCancel;
use crate::{AsyncRuntime, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, WaitError, WaitOutcome};

/// Repeatedly evaluates a predicate until it returns `true` or a timeout
/// elapses.
///
/// The predicate is evaluated once immediately. If it does not hold, the
/// waiter suspends for [`poll_interval()`](Self::poll_interval) and evaluates
/// it again, until it returns `true`
/// ([`Fulfilled`](WaitOutcome::Fulfilled)) or the time elapsed since the call
/// began reaches [`timeout()`](Self::timeout)
/// ([`TimedOut`](WaitOutcome::TimedOut)). The last suspension is clipped to
/// the deadline and the predicate gets one final evaluation there, so a wait
/// always ends within `timeout + poll_interval` (plus the time the predicate
/// itself takes).
///
/// Evaluations never overlap. A predicate that panics aborts the wait and the
/// panic propagates to the caller unchanged.
///
/// If a [`WaitCancel`] is attached with [`with_cancel()`](Self::with_cancel),
/// it is checked before every evaluation and waits end with
/// [`Cancelled`](WaitOutcome::Cancelled) once it fires.
#[derive(Clone, Debug)]
pub struct PredicateWaiter {
    timeout: Duration,
    poll_interval: Duration,
    cancel: Option<WaitCancel>,
}

impl Default for PredicateWaiter {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: None,
        }
    }
}

impl PredicateWaiter {
    /// Creates a waiter with the given timeout and
    /// [`DEFAULT_POLL_INTERVAL`].
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self::default().with_timeout(timeout)
    }

    /// Sets the timeout. A zero timeout still evaluates the predicate once.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the delay between successive evaluations.
    ///
    /// # Panics
    ///
    /// Panics if `poll_interval` is zero.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        assert!(
            !poll_interval.is_zero(),
            "PredicateWaiter poll interval must be greater than zero"
        );
        self.poll_interval = poll_interval;
        self
    }

    /// Attaches a cancellation token, replacing any previous one.
    #[must_use]
    pub fn with_cancel(mut self, cancel: WaitCancel) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Detaches the cancellation token, if any.
    #[must_use]
    pub fn without_cancel(mut self) -> Self {
        self.cancel = None;
        self
    }

    /// Time after which a wait gives up with [`WaitOutcome::TimedOut`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Delay between successive predicate evaluations.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// The attached cancellation token, if any.
    #[must_use]
    pub fn cancel(&self) -> Option<&WaitCancel> {
        self.cancel.as_ref()
    }

    /// Waits asynchronously until `predicate` returns `true`.
    ///
    /// The calling task is suspended on the Tokio timer between evaluations.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime with the time driver
    /// enabled. Panics raised by `predicate` propagate unchanged.
    pub async fn wait<P>(&self, mut predicate: P) -> WaitOutcome
    where
        P: FnMut() -> bool,
    {
        self.wait_for_value(|| predicate().then_some(())).await.into()
    }

    /// Waits asynchronously until `probe` returns `Some`, and returns that
    /// value.
    ///
    /// Follows the same schedule as [`wait()`](Self::wait).
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::TimedOut`] if the timeout elapses first, or
    /// [`WaitError::Cancelled`] if the attached token fires first.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime with the time driver
    /// enabled. Panics raised by `probe` propagate unchanged.
    pub async fn wait_for_value<T, F>(&self, mut probe: F) -> Result<T, WaitError>
    where
        F: FnMut() -> Option<T>,
    {
        let start = TokioInstant::now();
        let mut cancel = self.cancel.clone();
        let mut evaluations: u64 = 0;

        loop {
            if cancel.as_ref().is_some_and(WaitCancel::is_cancelled) {
                return Err(self.finish(WaitError::Cancelled, evaluations, start.elapsed()));
            }

            evaluations += 1;
            trace!(evaluations, "evaluating predicate");
            if let Some(value) = probe() {
                self.fulfilled(evaluations, start.elapsed());
                return Ok(value);
            }

            let Some(delay) = self.next_delay(start.elapsed()) else {
                return Err(self.finish(WaitError::TimedOut, evaluations, start.elapsed()));
            };

            if let Some(cancel) = cancel.as_mut() {
                select! {
                    biased;

                    () = cancel.cancelled() => {
                        return Err(self.finish(WaitError::Cancelled, evaluations, start.elapsed()));
                    }

                    () = sleep(delay) => {}
                }
            } else {
                sleep(delay).await;
            }
        }
    }

    /// Waits until `predicate` returns `true`, blocking the calling thread.
    ///
    /// The thread sleeps between evaluations; no runtime is needed. A thread
    /// sleeping with a [`WaitCancel`] attached is woken as soon as the handle
    /// cancels, so the wait returns without finishing the current interval.
    ///
    /// Do not call this from inside an async task: it blocks the worker
    /// thread. Use [`wait()`](Self::wait) there instead.
    ///
    /// # Panics
    ///
    /// Panics raised by `predicate` propagate unchanged.
    pub fn wait_blocking<P>(&self, mut predicate: P) -> WaitOutcome
    where
        P: FnMut() -> bool,
    {
        self.wait_for_value_blocking(|| predicate().then_some(())).into()
    }

    /// Blocking counterpart of [`wait_for_value()`](Self::wait_for_value).
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::TimedOut`] if the timeout elapses first, or
    /// [`WaitError::Cancelled`] if the attached token fires first.
    ///
    /// # Panics
    ///
    /// Panics raised by `probe` propagate unchanged.
    pub fn wait_for_value_blocking<T, F>(&self, mut probe: F) -> Result<T, WaitError>
    where
        F: FnMut() -> Option<T>,
    {
        let start = Instant::now();
        let mut evaluations: u64 = 0;

        loop {
            if self.cancel.as_ref().is_some_and(WaitCancel::is_cancelled) {
                return Err(self.finish(WaitError::Cancelled, evaluations, start.elapsed()));
            }

            evaluations += 1;
            trace!(evaluations, "evaluating predicate");
            if let Some(value) = probe() {
                self.fulfilled(evaluations, start.elapsed());
                return Ok(value);
            }

            let Some(delay) = self.next_delay(start.elapsed()) else {
                return Err(self.finish(WaitError::TimedOut, evaluations, start.elapsed()));
            };

            if let Some(cancel) = self.cancel.as_ref() {
                if cancel.park_timeout(delay) {
                    return Err(self.finish(WaitError::Cancelled, evaluations, start.elapsed()));
                }
            } else {
                thread_sleep(delay);
            }
        }
    }

    /// Spawns the wait onto `runtime` and blocks the calling thread until it
    /// resolves.
    ///
    /// Returns [`Cancelled`](WaitOutcome::Cancelled) if the spawned task is
    /// cancelled, e.g. because the runtime is shutting down.
    ///
    /// # Panics
    ///
    /// Panics if runtime access preconditions are not met by the selected
    /// [`AsyncRuntime`] implementation, or if called from inside an async
    /// context.
    ///
    /// Re-raises panics from `predicate` in the calling thread with their
    /// original payload.
    pub fn wait_on<A, P>(&self, runtime: &mut A, predicate: P) -> WaitOutcome
    where
        A: AsyncRuntime,
        P: 'static + Send + FnMut() -> bool,
    {
        let waiter = self.clone();
        let join_handle = runtime.spawn(async move { waiter.wait(predicate).await });
        runtime.block_on(join_handle).unwrap_or(WaitOutcome::Cancelled)
    }

    /// Returns how long to suspend before the next evaluation, or `None` once
    /// the deadline has been reached.
    fn next_delay(&self, elapsed: Duration) -> Option<Duration> {
        let remaining = self
            .timeout
            .checked_sub(elapsed)
            .filter(|remaining| !remaining.is_zero())?;
        Some(remaining.min(self.poll_interval))
    }

    fn fulfilled(&self, evaluations: u64, elapsed: Duration) {
        debug!(
            evaluations,
            ?elapsed,
            timeout = ?self.timeout,
            "predicate fulfilled"
        );
    }

    fn finish(&self, error: WaitError, evaluations: u64, elapsed: Duration) -> WaitError {
        debug!(
            evaluations,
            ?elapsed,
            timeout = ?self.timeout,
            poll_interval = ?self.poll_interval,
            %error,
            "predicate not fulfilled"
        );
        error
    }
}
