// SPDX-License-Identifier: Apache-2.0 OR MIT

use ::std::thread::{sleep as thread_sleep, spawn as thread_spawn};
use ::std::time::{Duration, Instant as StdInstant};

use ::tokio::time::{Instant, sleep, timeout};
use ::tokio_wait_until::cancel;
use ::tokio_wait_until::{PredicateWaiter, WaitError, WaitOutcome};

const SHORT_TIMEOUT: Duration = Duration::from_millis(50);

#[test]
fn channel_starts_not_cancelled() {
    let (handle, cancel) = cancel::channel();
    assert!(!handle.is_cancelled());
    assert!(!cancel.is_cancelled());
}

#[test]
fn cancel_is_visible_to_every_subscriber() {
    let (handle, cancel) = cancel::channel();
    let subscribed = handle.subscribe();
    let cloned = cancel.clone();

    handle.cancel();

    assert!(handle.is_cancelled());
    assert!(cancel.is_cancelled());
    assert!(subscribed.is_cancelled());
    assert!(cloned.is_cancelled());
}

#[test]
fn subscribe_after_cancel_starts_cancelled() {
    let handle = cancel::WaitCancelHandle::default();
    handle.cancel();

    assert!(handle.subscribe().is_cancelled());
}

#[test]
fn cancellation_survives_dropped_handle() {
    let (handle, cancel) = cancel::channel();
    handle.cancel();
    drop(handle);

    assert!(cancel.is_cancelled());
}

#[test]
fn same_channel_distinguishes_channels() {
    let (handle, cancel) = cancel::channel();
    let (other_handle, other_cancel) = cancel::channel();

    assert!(handle.same_channel(&handle.clone()));
    assert!(!handle.same_channel(&other_handle));
    assert!(cancel.same_channel(&handle.subscribe()));
    assert!(!cancel.same_channel(&other_cancel));
}

#[tokio::test]
async fn cancelled_completes_immediately_when_already_cancelled() {
    let (handle, mut cancel) = cancel::channel();
    handle.cancel();

    timeout(SHORT_TIMEOUT, cancel.cancelled())
        .await
        .expect("cancelled() should complete immediately when already cancelled");
}

#[tokio::test]
async fn cancelled_hangs_forever_after_handle_dropped() {
    let (handle, mut cancel) = cancel::channel();
    drop(handle);

    let result = timeout(SHORT_TIMEOUT, cancel.cancelled()).await;
    assert!(
        result.is_err(),
        "cancelled() should hang forever after handle is dropped"
    );
}

#[tokio::test(start_paused = true)]
async fn pre_cancelled_wait_never_evaluates_predicate() {
    let (handle, cancel) = cancel::channel();
    handle.cancel();
    let mut calls = 0_usize;

    let outcome = PredicateWaiter::new(Duration::from_secs(1))
        .with_cancel(cancel)
        .wait(|| {
            calls += 1;
            true
        })
        .await;

    assert_eq!(outcome, WaitOutcome::Cancelled);
    assert_eq!(calls, 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_interrupts_sleep_between_ticks() {
    let (handle, cancel) = cancel::channel();
    let cancel_after = Duration::from_millis(25);
    let poll_interval = Duration::from_secs(1);
    let canceller = tokio::spawn(async move {
        sleep(cancel_after).await;
        handle.cancel();
    });
    let start = Instant::now();

    let outcome = PredicateWaiter::new(Duration::from_secs(10))
        .with_poll_interval(poll_interval)
        .with_cancel(cancel)
        .wait(|| false)
        .await;

    let elapsed = start.elapsed();
    canceller.await.expect("canceller task should finish");
    assert_eq!(outcome, WaitOutcome::Cancelled);
    assert!(elapsed >= cancel_after);
    assert!(elapsed < poll_interval, "cancellation waited for the next tick");
}

#[tokio::test(start_paused = true)]
async fn dropped_handle_does_not_cancel_wait() {
    let (handle, cancel) = cancel::channel();
    drop(handle);

    let outcome = PredicateWaiter::new(Duration::from_millis(30))
        .with_cancel(cancel)
        .wait(|| false)
        .await;

    assert_eq!(outcome, WaitOutcome::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn detached_cancel_is_ignored() {
    let (handle, cancel) = cancel::channel();
    handle.cancel();

    let waiter = PredicateWaiter::default().with_cancel(cancel).without_cancel();
    assert!(waiter.cancel().is_none());
    assert_eq!(waiter.wait(|| true).await, WaitOutcome::Fulfilled);
}

#[tokio::test(start_paused = true)]
async fn cancelled_wait_for_value_reports_error() {
    let (handle, cancel) = cancel::channel();
    handle.cancel();

    let result = PredicateWaiter::default()
        .with_cancel(cancel)
        .wait_for_value(|| Some(1_u8))
        .await;

    assert_eq!(result, Err(WaitError::Cancelled));
}

#[test]
fn blocking_wait_wakes_up_on_cancel_mid_interval() {
    let (handle, cancel) = cancel::channel();
    let cancel_after = Duration::from_millis(20);
    let poll_interval = Duration::from_secs(1);
    let canceller = thread_spawn(move || {
        thread_sleep(cancel_after);
        handle.cancel();
    });
    let start = StdInstant::now();

    let outcome = PredicateWaiter::new(Duration::from_secs(5))
        .with_poll_interval(poll_interval)
        .with_cancel(cancel)
        .wait_blocking(|| false);

    let elapsed = start.elapsed();
    canceller.join().expect("canceller thread should finish");
    assert_eq!(outcome, WaitOutcome::Cancelled);
    assert!(elapsed >= cancel_after);
    assert!(
        elapsed < poll_interval / 2,
        "cancellation waited for the next tick: {elapsed:?}"
    );
}

#[test]
fn pre_cancelled_blocking_wait_never_evaluates_predicate() {
    let (handle, cancel) = cancel::channel();
    handle.cancel();
    let mut calls = 0_usize;

    let result = PredicateWaiter::new(Duration::from_secs(1))
        .with_cancel(cancel)
        .wait_for_value_blocking(|| {
            calls += 1;
            Some(())
        });

    assert_eq!(result, Err(WaitError::Cancelled));
    assert_eq!(calls, 0);
}

#[test]
fn blocking_wait_with_idle_cancel_still_times_out() {
    let (_handle, cancel) = cancel::channel();
    let timeout = Duration::from_millis(30);
    let start = StdInstant::now();

    let outcome = PredicateWaiter::new(timeout)
        .with_cancel(cancel)
        .wait_blocking(|| false);

    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert!(start.elapsed() >= timeout);
}
