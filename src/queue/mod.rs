
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::pipeline::Pipeline;
use crate::{QaError, Result};

const DEFAULT_QUEUE_CAPACITY: usize = 64;

struct Job {
    url: String,
    question: String,
    reply: oneshot::Sender<Result<String>>,
}

/// Handle to a submitted question; resolves to the pipeline's result.
pub struct TaskHandle {
    receiver: oneshot::Receiver<Result<String>>,
}

impl TaskHandle {
    /// Wait for the pipeline invocation to finish.
    #[inline]
    pub async fn wait(self) -> Result<String> {
        self.receiver
            .await
            .map_err(|_| QaError::Other(anyhow::anyhow!("Worker dropped the task")))?
    }
}

/// Task queue dispatching `(url, question)` jobs to a pool of workers.
///
/// Workers own the blocking and suspending calls; submitters only await
/// the returned handle. Jobs are independent and run concurrently with
/// no ordering guarantee between them.
pub struct TaskQueue {
    sender: mpsc::Sender<Job>,
}

impl TaskQueue {
    /// Spawn `workers` workers over a shared queue.
    #[inline]
    pub fn start(pipeline: Arc<Pipeline>, workers: usize) -> Self {
        assert!(workers > 0, "worker pool must have at least one worker");

        let (sender, receiver) = mpsc::channel::<Job>(DEFAULT_QUEUE_CAPACITY);
        let receiver = Arc::new(Mutex::new(receiver));

        for worker_id in 0..workers {
            let receiver = Arc::clone(&receiver);
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut receiver = receiver.lock().await;
                        receiver.recv().await
                    };
                    let Some(job) = job else {
                        debug!("Worker {} shutting down: queue closed", worker_id);
                        break;
                    };

                    debug!("Worker {} processing {}", worker_id, job.url);
                    let result = pipeline.ask_question(&job.url, &job.question).await;

                    if job.reply.send(result).is_err() {
                        warn!(
                            "Worker {} finished a task nobody is waiting for",
                            worker_id
                        );
                    }
                }
            });
        }

        info!("Task queue started with {} workers", workers);
        Self { sender }
    }

    /// Submit a question about a URL; the returned handle resolves to the
    /// orchestrator's final result.
    #[inline]
    pub async fn submit(&self, url: &str, question: &str) -> Result<TaskHandle> {
        let (reply, receiver) = oneshot::channel();
        let job = Job {
            url: url.to_string(),
            question: question.to_string(),
            reply,
        };

        self.sender
            .send(job)
            .await
            .map_err(|_| QaError::Other(anyhow::anyhow!("Task queue is shut down")))?;

        Ok(TaskHandle { receiver })
    }
}
