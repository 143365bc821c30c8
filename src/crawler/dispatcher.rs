//! Routes queued jobs to idle workers
//!
//! Workers advertise their intake on a shared channel whenever they are idle.
//! The dispatcher pairs each queued job with the next advertised intake. At
//! most one handoff per worker is in flight, so draining never outruns the
//! pool by more than the pool size.

use crate::crawler::job::CrawlJob;
use crate::crawler::queue::JobQueue;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinHandle;

/// Sending half of a worker's single-slot intake
pub type WorkerIntake = mpsc::Sender<CrawlJob>;

pub struct Dispatcher {
    inbound: mpsc::Receiver<CrawlJob>,
    available: Arc<Mutex<mpsc::Receiver<WorkerIntake>>>,
    handoffs: Arc<Semaphore>,
    queue: JobQueue,
}

impl Dispatcher {
    pub fn new(
        inbound: mpsc::Receiver<CrawlJob>,
        available: mpsc::Receiver<WorkerIntake>,
        max_handoffs: usize,
        queue: JobQueue,
    ) -> Self {
        Self {
            inbound,
            available: Arc::new(Mutex::new(available)),
            handoffs: Arc::new(Semaphore::new(max_handoffs.max(1))),
            queue,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        while let Some(job) = self.inbound.recv().await {
            let permit = match Arc::clone(&self.handoffs).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    self.queue.complete();
                    break;
                }
            };

            let available = Arc::clone(&self.available);
            let queue = self.queue.clone();
            tokio::spawn(async move {
                let intake = available.lock().await.recv().await;
                let delivered = match intake {
                    Some(intake) => intake.send(job).await.is_ok(),
                    None => false,
                };
                if !delivered {
                    tracing::warn!("No worker left to take a job");
                    queue.complete();
                }
                drop(permit);
            });
        }
        tracing::debug!("Job queue closed, dispatcher stopping");
    }
}
