//! Process-wide cancellation signal shared by the background loops.

use std::future::Future;

use tokio::sync::watch;

use crate::errors::{FeederError, FeederResult};

/// Raises the shutdown signal. Dropping it without calling [`trigger`]
/// also releases every waiter.
///
/// [`trigger`]: ShutdownTrigger::trigger
pub struct ShutdownTrigger {
    sender: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

/// Cloneable view of the shutdown signal
#[derive(Clone)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> (ShutdownTrigger, Shutdown) {
        let (sender, receiver) = watch::channel(false);
        (ShutdownTrigger { sender }, Shutdown { receiver })
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the signal is raised (or its trigger is gone)
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // Err means the trigger was dropped, which only happens on teardown
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }

    /// Runs `work` on its own task and waits for it unless shutdown comes first.
    ///
    /// On shutdown the task is detached rather than aborted: it may still run
    /// to completion in the background and its output is discarded.
    pub async fn run_detached<F, T>(&self, work: F) -> FeederResult<T>
    where
        F: Future<Output = FeederResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        if self.is_triggered() {
            return Err(FeederError::Cancelled);
        }

        let handle = tokio::spawn(work);

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(FeederError::Cancelled),
            joined = handle => joined?,
        }
    }

    /// Awaits `work` in place, giving up as soon as shutdown is raised
    pub async fn guard<F, T>(&self, work: F) -> FeederResult<T>
    where
        F: Future<Output = FeederResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(FeederError::Cancelled),
            result = work => result,
        }
    }
}
