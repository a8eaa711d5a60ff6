//! FIFO job queue with sentinel shutdown and a join barrier.
//!
//! Every item put on the queue, job or sentinel, counts as unfinished until
//! the consumer that took it calls [`JobQueue::task_done`]. [`JobQueue::join`]
//! waits for that count to reach zero, which is what lets
//! [`JobQueue::shutdown`] double as a drain.

use tokio::sync::{mpsc, watch, Mutex};
use tracing::debug;

use crate::job::Job;

/// An item handed to a worker.
#[derive(Debug)]
pub enum QueueItem {
    Job(Box<Job>),
    /// Tells the receiving worker to exit.
    Shutdown,
}

/// Unbounded FIFO queue shared by the workers of one pool.
pub struct JobQueue {
    tx: mpsc::UnboundedSender<QueueItem>,
    rx: Mutex<mpsc::UnboundedReceiver<QueueItem>>,
    unfinished: watch::Sender<usize>,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (unfinished, _) = watch::channel(0);
        Self {
            tx,
            rx: Mutex::new(rx),
            unfinished,
        }
    }

    /// Appends a job to the tail. Never blocks.
    pub fn enqueue(&self, job: Job) {
        debug!(job_id = %job.id, seq = job.sequence_index, "Enqueued job");
        self.push(QueueItem::Job(Box::new(job)));
    }

    fn push(&self, item: QueueItem) {
        self.unfinished.send_modify(|n| *n += 1);
        // The receiver lives as long as `self`, so the channel cannot be closed.
        if self.tx.send(item).is_err() {
            self.unfinished.send_modify(|n| *n -= 1);
        }
    }

    /// Waits for the next item in FIFO order.
    ///
    /// Consumers queue up on the receiver lock in arrival order, so each item
    /// is handed to exactly one of them.
    pub async fn dequeue(&self) -> QueueItem {
        let mut rx = self.rx.lock().await;
        rx.recv().await.unwrap_or(QueueItem::Shutdown)
    }

    /// Acknowledges that an item returned by [`dequeue`](Self::dequeue) has
    /// been fully processed.
    pub fn task_done(&self) {
        self.unfinished.send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Number of items enqueued but not yet acknowledged.
    pub fn unfinished(&self) -> usize {
        *self.unfinished.borrow()
    }

    /// Waits until every enqueued item has been acknowledged.
    pub async fn join(&self) {
        let mut rx = self.unfinished.subscribe();
        // The sender is owned by `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Enqueues one sentinel per worker, then waits for the queue to drain.
    pub async fn shutdown(&self, workers: usize) {
        debug!(workers, "Enqueuing shutdown sentinels");
        for _ in 0..workers {
            self.push(QueueItem::Shutdown);
        }
        self.join().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobKind;
    use std::sync::Arc;
    use std::time::Duration;

    fn job(seq: usize) -> Job {
        Job::new("batch", format!("https://x.test/{seq}.pdf"), seq, 10, "dest", JobKind::Plain)
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = JobQueue::new();
        for seq in 1..=5 {
            queue.enqueue(job(seq));
        }

        let mut seen = Vec::new();
        for _ in 0..5 {
            match queue.dequeue().await {
                QueueItem::Job(job) => seen.push(job.sequence_index),
                QueueItem::Shutdown => panic!("unexpected sentinel"),
            }
            queue.task_done();
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(queue.unfinished(), 0);
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_item() {
        let queue = Arc::new(JobQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.dequeue().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        queue.enqueue(job(1));
        let item = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer should wake")
            .unwrap();
        assert!(matches!(item, QueueItem::Job(j) if j.sequence_index == 1));
    }

    #[tokio::test]
    async fn test_join_waits_for_acknowledgement() {
        let queue = Arc::new(JobQueue::new());
        queue.enqueue(job(1));
        let _item = queue.dequeue().await;

        let joiner = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.join().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!joiner.is_finished());

        queue.task_done();
        tokio::time::timeout(Duration::from_secs(1), joiner)
            .await
            .expect("join should return once acknowledged")
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_sends_one_sentinel_per_worker() {
        let queue = Arc::new(JobQueue::new());
        queue.enqueue(job(1));

        let mut consumers = Vec::new();
        for _ in 0..3 {
            let queue = Arc::clone(&queue);
            consumers.push(tokio::spawn(async move {
                let mut jobs = 0;
                loop {
                    let item = queue.dequeue().await;
                    let stop = matches!(item, QueueItem::Shutdown);
                    if !stop {
                        jobs += 1;
                    }
                    queue.task_done();
                    if stop {
                        return jobs;
                    }
                }
            }));
        }

        tokio::time::timeout(Duration::from_secs(1), queue.shutdown(3))
            .await
            .expect("shutdown should not deadlock");

        let mut total = 0;
        for consumer in consumers {
            total += consumer.await.unwrap();
        }
        assert_eq!(total, 1);
        assert_eq!(queue.unfinished(), 0);
    }

    #[tokio::test]
    async fn test_join_on_empty_queue_returns() {
        let queue = JobQueue::new();
        tokio_test::assert_ready!(tokio_test::task::spawn(queue.join()).poll());
    }
}
