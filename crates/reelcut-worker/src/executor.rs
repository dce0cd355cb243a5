//! Job executor.
//!
//! Jobs arrive over a bounded in-process queue and run on spawned tasks,
//! at most `max_concurrent_jobs` at a time.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reelcut_models::JobId;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{watch, Semaphore};
use tracing::{info, warn};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::{JobOutcome, Pipeline};

/// A job waiting to be processed.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub job_id: JobId,
    pub source_path: PathBuf,
}

/// Enqueues jobs without waiting.
#[derive(Debug, Clone)]
pub struct JobSubmitter {
    tx: mpsc::Sender<JobRequest>,
    capacity: usize,
}

impl JobSubmitter {
    /// Enqueue a job. Fails fast when the queue is full or the executor is gone.
    pub fn submit(&self, job_id: JobId, source_path: PathBuf) -> WorkerResult<()> {
        match self.tx.try_send(JobRequest { job_id, source_path }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(request)) => {
                warn!("Job queue full, refusing job {}", request.job_id);
                Err(WorkerError::QueueFull(self.capacity))
            }
            Err(TrySendError::Closed(_)) => Err(WorkerError::ShutDown),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Triggers executor shutdown from outside `run`.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Signal shutdown. Running FFmpeg children subscribed to the cancel signal are killed.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// Job executor that processes queued jobs.
pub struct JobExecutor {
    config: WorkerConfig,
    job_semaphore: Arc<Semaphore>,
    shutdown: Arc<watch::Sender<bool>>,
    tx: mpsc::Sender<JobRequest>,
    rx: mpsc::Receiver<JobRequest>,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        let (shutdown, _) = watch::channel(false);
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));

        Self {
            config,
            job_semaphore,
            shutdown: Arc::new(shutdown),
            tx,
            rx,
        }
    }

    pub fn submitter(&self) -> JobSubmitter {
        JobSubmitter {
            tx: self.tx.clone(),
            capacity: self.config.queue_capacity.max(1),
        }
    }

    /// Receiver that flips to `true` on shutdown; hand it to the media tool.
    pub fn cancel_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown),
        }
    }

    /// Run until shutdown is signalled or every submitter is dropped.
    ///
    /// After a shutdown signal, in-flight jobs get `shutdown_timeout` to
    /// finish; jobs still queued are not started and stay `uploaded`.
    /// When the submitters close instead, the queue is drained normally.
    pub async fn run(self, pipeline: Arc<Pipeline>) -> WorkerResult<()> {
        let JobExecutor {
            config,
            job_semaphore,
            shutdown,
            tx,
            mut rx,
        } = self;
        drop(tx);

        let max_jobs = config.max_concurrent_jobs.max(1);
        info!("Starting job executor with {} max concurrent jobs", max_jobs);

        let mut shutdown_rx = shutdown.subscribe();
        let mut cancelled = *shutdown_rx.borrow();

        while !cancelled {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        cancelled = true;
                    }
                }
                request = rx.recv() => {
                    let Some(request) = request else {
                        info!("All submitters closed, draining in-flight jobs");
                        break;
                    };

                    let permit = tokio::select! {
                        permit = Arc::clone(&job_semaphore).acquire_owned() => {
                            permit.map_err(|_| WorkerError::internal("Job semaphore closed"))?
                        }
                        _ = wait_for_shutdown(shutdown.subscribe()) => {
                            warn!("Shutdown while job {} was waiting for a slot", request.job_id);
                            cancelled = true;
                            continue;
                        }
                    };

                    let pipeline = Arc::clone(&pipeline);
                    tokio::spawn(async move {
                        let _permit = permit;
                        execute_job(pipeline, request).await;
                    });
                }
            }
        }

        if cancelled {
            rx.close();
            let mut abandoned = 0usize;
            while let Ok(request) = rx.try_recv() {
                warn!("Job {} not started before shutdown; it stays uploaded", request.job_id);
                abandoned += 1;
            }
            if abandoned > 0 {
                warn!("{} queued jobs were not started", abandoned);
            }

            info!("Waiting up to {:?} for in-flight jobs...", config.shutdown_timeout);
            if tokio::time::timeout(config.shutdown_timeout, wait_for_jobs(&job_semaphore, max_jobs))
                .await
                .is_err()
            {
                warn!("Shutdown timeout elapsed with jobs still running");
            }
        } else {
            wait_for_jobs(&job_semaphore, max_jobs).await;
        }

        info!("Job executor stopped");
        Ok(())
    }
}

async fn execute_job(pipeline: Arc<Pipeline>, request: JobRequest) {
    info!("Executing job {}", request.job_id);
    match pipeline.process_job(&request.job_id, &request.source_path).await {
        JobOutcome::Completed { clips } => {
            info!("Job {} completed with {} clips", request.job_id, clips)
        }
        JobOutcome::Failed { error_kind, .. } => {
            warn!("Job {} failed ({})", request.job_id, error_kind)
        }
    }
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            // Sender gone: nothing can signal shutdown any more
            std::future::pending::<()>().await;
        }
    }
}

/// Wait for all in-flight jobs to complete.
async fn wait_for_jobs(semaphore: &Semaphore, max_jobs: usize) {
    loop {
        if semaphore.available_permits() == max_jobs {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
