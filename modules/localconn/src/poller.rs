//! Self-rescheduling poll task.
//!
//! Sleeps for the interval, runs one tick to completion, then sleeps again.
//! A slow tick stretches the period rather than overlapping the next one.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Handle to a running poll task. Dropping it aborts the task; call
/// [`PollHandle::stop`] to wait for an in-flight tick instead.
pub struct PollHandle {
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

/// Spawn a poll loop on the current tokio runtime.
pub fn spawn<F, Fut>(interval: Duration, mut tick: F) -> PollHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            if *stop_rx.borrow() {
                break;
            }
            tick().await;
        }
    });

    PollHandle {
        stop_tx,
        task: Some(task),
    }
}

impl PollHandle {
    /// Signal the loop and wait for it to exit. A tick already running
    /// finishes first; no tick starts afterwards.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!(error = %e, "Poll task panicked");
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
