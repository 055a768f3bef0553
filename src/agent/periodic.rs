//! Cancellable background work on a fixed interval.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// A task running a callback every `period` until stopped.
///
/// The first run happens one full period after spawning. A callback that is
/// already running when the task is stopped finishes before the task exits.
#[derive(Debug)]
pub struct PeriodicTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn onto the current tokio runtime.
    ///
    /// The task also stops when `parent` is cancelled, so passing the agent's
    /// token ties the task to the agent's lifetime.
    pub fn spawn<F, Fut>(period: Duration, parent: &CancellationToken, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = parent.child_token();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }
                tick().await;
            }
            tracing::debug!(target: "snmp_mib_agent::agent", "periodic task stopped");
        });

        Self { cancel, handle }
    }

    /// Cancel the task and wait for it to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await
            && e.is_panic()
        {
            tracing::warn!(target: "snmp_mib_agent::agent", { error = %e }, "periodic task panicked");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_runs_every_period_until_stopped() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);
        let task = PeriodicTask::spawn(Duration::from_secs(3), &CancellationToken::new(), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        task.stop().await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        // nothing runs after stop
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancel_stops_task() {
        let parent = CancellationToken::new();
        let task = PeriodicTask::spawn(Duration::from_secs(1), &parent, || async {});

        parent.cancel();
        tokio::time::timeout(Duration::from_secs(1), async {
            while !task.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        task.stop().await;
    }
}
