//! Crawl workers
//!
//! A worker takes one job at a time: it advertises its intake, waits for a
//! job and runs it through the processor. Job errors are logged and the
//! worker moves on.

use crate::crawler::dispatcher::WorkerIntake;
use crate::crawler::job::CrawlJob;
use crate::crawler::processor::JobProcessor;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct Worker {
    id: usize,
    intake: mpsc::Receiver<CrawlJob>,
    intake_tx: WorkerIntake,
    available: mpsc::Sender<WorkerIntake>,
    processor: JobProcessor,
}

impl Worker {
    pub fn new(id: usize, available: mpsc::Sender<WorkerIntake>, processor: JobProcessor) -> Self {
        let (intake_tx, intake) = mpsc::channel(1);
        Self {
            id,
            intake,
            intake_tx,
            available,
            processor,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        tracing::debug!("Worker {} started", self.id);
        loop {
            if self.available.send(self.intake_tx.clone()).await.is_err() {
                break;
            }
            let Some(job) = self.intake.recv().await else {
                break;
            };

            let description = job.to_string();
            if let Err(e) = self.processor.process(job).await {
                tracing::error!("Worker {} abandoned {}: {}", self.id, description, e);
            }
            self.processor.context().queue.complete();
        }
        tracing::debug!("Worker {} stopped", self.id);
    }
}
