//! Bounded inbound job queue
//!
//! Enqueueing never waits: a full queue is reported to the caller. The queue
//! also counts jobs that were accepted but not yet finished so callers can
//! wait for the crawl to go idle.

use crate::crawler::job::CrawlJob;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};

/// Errors returned when a job cannot be queued
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Job queue is full ({capacity} jobs waiting)")]
    Full { capacity: usize },

    #[error("Job queue is closed")]
    Closed,
}

#[derive(Debug, Default)]
struct Pending {
    count: AtomicUsize,
    idle: Notify,
}

/// Producer side of the job queue
#[derive(Debug, Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<CrawlJob>,
    capacity: usize,
    pending: Arc<Pending>,
}

impl JobQueue {
    /// Creates a queue and the receiver the dispatcher drains
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<CrawlJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let queue = Self {
            sender,
            capacity: capacity.max(1),
            pending: Arc::new(Pending::default()),
        };
        (queue, receiver)
    }

    /// Queues a job without waiting
    pub fn enqueue(&self, job: CrawlJob) -> Result<(), QueueError> {
        self.pending.count.fetch_add(1, Ordering::SeqCst);
        match self.sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.complete();
                Err(QueueError::Full {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Closed(_)) => {
                self.complete();
                Err(QueueError::Closed)
            }
        }
    }

    /// Queues every job or none of them
    ///
    /// All slots are reserved before the first job is sent, so a queue
    /// without room for the whole batch rejects it untouched.
    pub fn enqueue_all(&self, jobs: Vec<CrawlJob>) -> Result<(), QueueError> {
        if jobs.is_empty() {
            return Ok(());
        }
        let permits = match self.sender.try_reserve_many(jobs.len()) {
            Ok(permits) => permits,
            Err(TrySendError::Full(())) => {
                return Err(QueueError::Full {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Closed(())) => return Err(QueueError::Closed),
        };

        self.pending.count.fetch_add(jobs.len(), Ordering::SeqCst);
        for (permit, job) in permits.zip(jobs) {
            permit.send(job);
        }
        Ok(())
    }

    /// Marks one accepted job as finished
    pub fn complete(&self) {
        let previous = self
            .pending
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if previous == Ok(1) {
            self.pending.idle.notify_waiters();
        }
    }

    /// Jobs accepted and not yet finished
    pub fn pending(&self) -> usize {
        self.pending.count.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Jobs sitting in the queue that the dispatcher has not taken yet
    pub fn queued(&self) -> usize {
        self.capacity.saturating_sub(self.sender.capacity())
    }

    /// Resolves once no accepted job is left
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.pending.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::catalog::DataSource;
    use crate::crawler::job::JobKind;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn job() -> CrawlJob {
        let source = Arc::new(DataSource {
            name: "article".to_string(),
            path: "https://api.example.org/abstract/{_id_}".to_string(),
            keys: Vec::new(),
            paginated: false,
        });
        CrawlJob::new(JobKind::Article, source, Some("1".to_string()), BTreeMap::new())
    }

    #[test]
    fn test_full_queue_rejects() {
        let (queue, _receiver) = JobQueue::new(2);
        queue.enqueue(job()).unwrap();
        queue.enqueue(job()).unwrap();

        assert_eq!(queue.enqueue(job()), Err(QueueError::Full { capacity: 2 }));
        assert_eq!(queue.pending(), 2);
    }

    #[test]
    fn test_batch_rejected_whole_when_short_of_room() {
        let (queue, mut receiver) = JobQueue::new(3);
        queue.enqueue(job()).unwrap();

        let batch = vec![job(), job(), job()];
        assert_eq!(queue.enqueue_all(batch), Err(QueueError::Full { capacity: 3 }));
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.queued(), 1);

        queue.enqueue_all(vec![job(), job()]).unwrap();
        assert_eq!(queue.pending(), 3);
        assert_eq!(queue.queued(), 3);
        for _ in 0..3 {
            assert!(receiver.try_recv().is_ok());
        }
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_batch_larger_than_queue_rejected() {
        let (queue, _receiver) = JobQueue::new(2);
        let batch = vec![job(), job(), job()];

        assert_eq!(queue.enqueue_all(batch), Err(QueueError::Full { capacity: 2 }));
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.queued(), 0);
    }

    #[test]
    fn test_closed_queue_rejects() {
        let (queue, receiver) = JobQueue::new(2);
        drop(receiver);

        assert_eq!(queue.enqueue(job()), Err(QueueError::Closed));
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_complete_never_underflows() {
        let (queue, _receiver) = JobQueue::new(1);
        queue.complete();
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_wait_idle_resolves_after_completion() {
        let (queue, mut receiver) = JobQueue::new(4);
        queue.enqueue(job()).unwrap();

        let worker_queue = queue.clone();
        tokio::spawn(async move {
            let _job = receiver.recv().await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            worker_queue.complete();
        });

        tokio::time::timeout(Duration::from_secs(2), queue.wait_idle())
            .await
            .expect("queue should go idle");
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_wait_idle_on_empty_queue() {
        let (queue, _receiver) = JobQueue::new(1);
        tokio::time::timeout(Duration::from_millis(100), queue.wait_idle())
            .await
            .expect("empty queue is idle");
    }
}
