//! Clip pipeline worker.
//!
//! This crate provides:
//! - The per-job clip pipeline (audio, analysis, cut, crop, persist)
//! - A bounded job executor with graceful shutdown
//! - Structured job logging and segment retry

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod pipeline;
pub mod retry;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{JobExecutor, JobRequest, JobSubmitter, ShutdownHandle};
pub use logging::JobLogger;
pub use pipeline::{JobOutcome, Pipeline};
pub use retry::{retry_async, RetryConfig, RetryResult};
