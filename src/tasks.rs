use crate::collector::{collect_latest_reports, DayCollector};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestTask {
    pub amount: usize,
}

/// Fire-and-forget queue of deferred report runs, drained by one worker.
#[derive(Clone)]
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<LatestTask>,
}

impl TaskQueue {
    /// Spawns the worker. Runs share `run_lock` with synchronous requests.
    pub fn spawn(
        collector: Arc<dyn DayCollector>,
        run_lock: Arc<Mutex<()>>,
        start_weight: Option<f64>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(receiver, collector, run_lock, start_weight));
        Self { sender }
    }

    /// Returns false once the worker is gone.
    pub fn enqueue(&self, task: LatestTask) -> bool {
        self.sender.send(task).is_ok()
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<LatestTask>,
    collector: Arc<dyn DayCollector>,
    run_lock: Arc<Mutex<()>>,
    start_weight: Option<f64>,
) {
    while let Some(task) = receiver.recv().await {
        info!("running deferred task for {} report(s)", task.amount);
        let _guard = run_lock.lock().await;
        match collect_latest_reports(collector.as_ref(), task.amount, start_weight).await {
            Ok(reports) => {
                for report in &reports {
                    info!("deferred report:\n{}", report.report);
                }
                info!("deferred task produced {} report(s)", reports.len());
            }
            Err(err) => error!("deferred task failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ScrapeError;
    use crate::models::DayRecord;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedSender;

    struct SignallingCollector {
        done: UnboundedSender<usize>,
    }

    #[async_trait]
    impl DayCollector for SignallingCollector {
        async fn collect_days(&self, num_days: usize) -> Result<Vec<DayRecord>, ScrapeError> {
            let _ = self.done.send(num_days);
            Err(ScrapeError::ElementNotFound("diary".into()))
        }
    }

    #[tokio::test]
    async fn worker_runs_tasks_in_order_and_survives_failures() {
        let (done, mut seen) = mpsc::unbounded_channel();
        let queue = TaskQueue::spawn(
            Arc::new(SignallingCollector { done }),
            Arc::new(Mutex::new(())),
            None,
        );

        assert!(queue.enqueue(LatestTask { amount: 1 }));
        assert!(queue.enqueue(LatestTask { amount: 3 }));

        let first = tokio::time::timeout(Duration::from_secs(2), seen.recv()).await.unwrap();
        let second = tokio::time::timeout(Duration::from_secs(2), seen.recv()).await.unwrap();
        assert_eq!(first, Some(2));
        assert_eq!(second, Some(4));
    }

    #[tokio::test]
    async fn overflowing_task_does_not_stop_the_worker() {
        let (done, mut seen) = mpsc::unbounded_channel();
        let queue = TaskQueue::spawn(
            Arc::new(SignallingCollector { done }),
            Arc::new(Mutex::new(())),
            None,
        );

        assert!(queue.enqueue(LatestTask { amount: usize::MAX }));
        assert!(queue.enqueue(LatestTask { amount: 1 }));

        let next = tokio::time::timeout(Duration::from_secs(2), seen.recv()).await.unwrap();
        assert_eq!(next, Some(2));
    }
}
