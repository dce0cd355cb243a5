//! Job and clip persistence.
//!
//! The pipeline only sees the [`JobStore`] trait. Each method is a single
//! atomic write (or read) keyed by job id.

pub mod error;
pub mod memory;

use std::path::PathBuf;

use async_trait::async_trait;
use reelcut_models::{Clip, ErrorKind, Job, JobId, JobStatus, NewClip};

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryJobStore;

/// Persistence for jobs and their clips.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a job in `uploaded` status; the store assigns the id.
    async fn create_job(
        &self,
        source_file_path: PathBuf,
        original_name: Option<String>,
    ) -> StoreResult<Job>;

    async fn get_job(&self, job_id: &JobId) -> StoreResult<Option<Job>>;

    /// All jobs, newest first.
    async fn list_jobs(&self) -> StoreResult<Vec<Job>>;

    /// Move a job to `status`. Illegal transitions are rejected.
    async fn update_job_status(&self, job_id: &JobId, status: JobStatus) -> StoreResult<()>;

    async fn update_transcript(&self, job_id: &JobId, transcript: &str) -> StoreResult<()>;

    /// Move a non-terminal job to `failed`, recording the error.
    async fn mark_failed(&self, job_id: &JobId, kind: ErrorKind, message: &str) -> StoreResult<()>;

    async fn create_clip(&self, clip: NewClip) -> StoreResult<Clip>;

    /// Clips of a job in creation order.
    async fn list_clips(&self, job_id: &JobId) -> StoreResult<Vec<Clip>>;
}
