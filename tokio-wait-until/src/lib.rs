// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wait for a condition by polling a predicate until it holds or a timeout
//! elapses.
//!
//! The [`waiter`] module contains [`PredicateWaiter`], which evaluates a
//! plain `FnMut() -> bool` closure once immediately and then once per poll
//! interval, resolving to [`WaitOutcome::Fulfilled`] as soon as it returns
//! `true` or to [`WaitOutcome::TimedOut`] once the timeout has elapsed.
//! Waits can run on a Tokio task ([`PredicateWaiter::wait`]), on a plain
//! thread ([`PredicateWaiter::wait_blocking`]), or be driven on a runtime
//! from synchronous code ([`PredicateWaiter::wait_on`]).
//!
//! The [`cancel`] module provides an optional cancellation channel; a waiter
//! carrying a [`WaitCancel`](cancel::WaitCancel) ends with
//! [`WaitOutcome::Cancelled`] once the matching handle fires.
//!
//! For one-off waits with the default poll interval use the free functions
//! [`wait()`] and [`wait_blocking()`].
//!
//! ## Feature flags
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(
    feature = "document-features",
    cfg_attr(doc, doc = ::document_features::document_features!())
)]
//
// Clippy lints.
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![warn(clippy::undocumented_unsafe_blocks)]

use ::std::panic::resume_unwind;
use ::std::time::Duration;

use ::tokio::runtime::Handle;
use ::tokio::task::JoinHandle;

/// Re-export `tokio` crate.
pub use ::tokio;

/// Cancellation channel for in-flight waits.
pub mod cancel;
/// Terminal results of a wait.
pub mod outcome;
/// Predicate waiter: poll a condition until it holds or a timeout elapses.
pub mod waiter;

pub use outcome::{WaitError, WaitOutcome};
pub use waiter::PredicateWaiter;

/// Timeout used by [`PredicateWaiter::default()`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Delay between successive predicate evaluations unless configured with
/// [`PredicateWaiter::with_poll_interval()`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Waits asynchronously until `predicate` returns `true` or `timeout`
/// elapses, polling every [`DEFAULT_POLL_INTERVAL`].
///
/// Shorthand for `PredicateWaiter::new(timeout).wait(predicate)`.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime with the time driver enabled.
/// Panics raised by `predicate` propagate unchanged.
pub async fn wait<P>(predicate: P, timeout: Duration) -> WaitOutcome
where
    P: FnMut() -> bool,
{
    PredicateWaiter::new(timeout).wait(predicate).await
}

/// Blocks the calling thread until `predicate` returns `true` or `timeout`
/// elapses, polling every [`DEFAULT_POLL_INTERVAL`].
///
/// Shorthand for `PredicateWaiter::new(timeout).wait_blocking(predicate)`.
///
/// # Panics
///
/// Panics raised by `predicate` propagate unchanged.
pub fn wait_blocking<P>(predicate: P, timeout: Duration) -> WaitOutcome
where
    P: FnMut() -> bool,
{
    PredicateWaiter::new(timeout).wait_blocking(predicate)
}

/// Runtime that [`PredicateWaiter::wait_on()`] hands its wait to.
///
/// Synchronous callers (a `#[test]` function, a fixture loader) use this to
/// run an async wait to completion on a Tokio runtime they own or have
/// entered. [`AsyncCurrentRuntime`] picks up the runtime entered on the
/// calling thread; a [`Handle`] names one explicitly.
pub trait AsyncRuntime {
    /// Starts the wait task on the runtime's workers.
    ///
    /// # Panics
    ///
    /// May panic when the runtime is not reachable from the calling thread.
    fn spawn<Fut, T>(&mut self, future: Fut) -> JoinHandle<T>
    where
        Fut: 'static + Send + Future<Output = T>,
        T: 'static + Send;

    /// Parks the calling thread until the wait task resolves.
    ///
    /// Yields `None` when the runtime dropped the task before it finished
    /// (for example after a shutdown), which `wait_on` reports as
    /// [`WaitOutcome::Cancelled`].
    ///
    /// # Panics
    ///
    /// May panic when the runtime is not reachable from the calling thread,
    /// or when called from inside an async context. A panic raised by the
    /// predicate inside the task is resumed here with its original payload.
    fn block_on<T>(&mut self, join_handle: JoinHandle<T>) -> Option<T>
    where
        T: 'static + Send;
}

/// [`AsyncRuntime`] backed by whichever Tokio runtime the calling thread has
/// entered with [`Runtime::enter()`](tokio::runtime::Runtime::enter).
///
/// Panics on use if no runtime has been entered; pass a [`Handle`] then.
#[derive(Clone, Copy, Debug, Default)]
pub struct AsyncCurrentRuntime;

impl AsyncRuntime for AsyncCurrentRuntime {
    fn spawn<Fut, T>(&mut self, future: Fut) -> JoinHandle<T>
    where
        Fut: 'static + Send + Future<Output = T>,
        T: 'static + Send,
    {
        tokio::spawn(future)
    }

    fn block_on<T>(&mut self, join_handle: JoinHandle<T>) -> Option<T>
    where
        T: 'static + Send,
    {
        join(&Handle::current(), join_handle)
    }
}

impl AsyncRuntime for Handle {
    fn spawn<Fut, T>(&mut self, future: Fut) -> JoinHandle<T>
    where
        Fut: 'static + Send + Future<Output = T>,
        T: 'static + Send,
    {
        Handle::spawn(self, future)
    }

    fn block_on<T>(&mut self, join_handle: JoinHandle<T>) -> Option<T>
    where
        T: 'static + Send,
    {
        join(self, join_handle)
    }
}

/// Blocks on `join_handle`, mapping a cancelled task to `None` and resuming a
/// panicked one.
fn join<T>(handle: &Handle, join_handle: JoinHandle<T>) -> Option<T>
where
    T: 'static + Send,
{
    match handle.block_on(join_handle) {
        Ok(value) => Some(value),

        Err(error) => {
            if error.is_cancelled() {
                None
            } else {
                resume_unwind(error.into_panic());
            }
        }
    }
}
