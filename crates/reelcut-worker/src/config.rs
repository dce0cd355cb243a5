//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use reelcut_models::timecode::DEFAULT_MAX_SEGMENT_SECS;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Jobs that may wait for a free slot before submissions are refused
    pub queue_capacity: usize,
    /// Wall-clock limit for one job
    pub job_timeout: Duration,
    /// How long shutdown waits for in-flight jobs
    pub shutdown_timeout: Duration,
    /// Segments rendered concurrently within one job (1 = sequential)
    pub segment_parallelism: usize,
    /// Extra attempts for a segment whose FFmpeg run failed
    pub segment_retries: u32,
    /// Base delay between segment attempts
    pub segment_retry_delay: Duration,
    /// Longest clip produced; longer proposals are shortened
    pub max_segment_secs: f64,
    /// Where clip artifacts are written
    pub clips_dir: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            queue_capacity: 64,
            job_timeout: Duration::from_secs(3600), // 1 hour
            shutdown_timeout: Duration::from_secs(30),
            segment_parallelism: 1,
            segment_retries: 1,
            segment_retry_delay: Duration::from_millis(500),
            max_segment_secs: DEFAULT_MAX_SEGMENT_SECS,
            clips_dir: PathBuf::from("public/clips"),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            queue_capacity: std::env::var("WORKER_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.queue_capacity),
            job_timeout: std::env::var("WORKER_JOB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_timeout),
            shutdown_timeout: std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
            segment_parallelism: std::env::var("WORKER_SEGMENT_PARALLEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.segment_parallelism),
            segment_retries: std::env::var("WORKER_SEGMENT_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.segment_retries),
            max_segment_secs: std::env::var("WORKER_MAX_SEGMENT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &f64| *n > 0.0)
                .unwrap_or(defaults.max_segment_secs),
            clips_dir: std::env::var("CLIPS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.clips_dir),
            ..defaults
        }
    }
}
