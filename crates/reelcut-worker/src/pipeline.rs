//! Clip pipeline orchestration.
//!
//! One job takes an uploaded video through:
//! 1. preflight (media tool + AI credential), before any status change
//! 2. `uploaded -> processing`
//! 3. audio extraction and AI analysis, transcript persisted
//! 4. per segment: window validation, horizontal cut, vertical crop, clip record
//! 5. `completed`, or `failed` with a categorized error on the first failure
//!
//! The extracted audio is removed on every path.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt, TryStreamExt};
use reelcut_ai::{AnalysisInput, TranscriptExtractor};
use reelcut_media::{ensure_dir, remove_file_best_effort, MediaError, MediaResult, MediaTool};
use reelcut_models::{
    artifact_file_name, sanitize_title, validate_window, Clip, ErrorKind, JobId, JobStatus,
    NewClip, Rendition, SegmentLimits, SegmentProposal, SegmentWindow,
};
use reelcut_store::JobStore;
use serde::Serialize;
use tracing::Instrument;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::retry::{retry_async, RetryConfig};

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed {
        clips: usize,
    },
    Failed {
        error_kind: ErrorKind,
        error_message: String,
    },
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }
}

/// Drives jobs through the clip pipeline.
pub struct Pipeline {
    config: WorkerConfig,
    store: Arc<dyn JobStore>,
    media: Arc<dyn MediaTool>,
    extractor: Arc<dyn TranscriptExtractor>,
}

impl Pipeline {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn JobStore>,
        media: Arc<dyn MediaTool>,
        extractor: Arc<dyn TranscriptExtractor>,
    ) -> Self {
        Self {
            config,
            store,
            media,
            extractor,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Process one job to a terminal status.
    ///
    /// Never returns an error: every failure is logged and written to the
    /// job as `failed` with its category and message.
    pub async fn process_job(&self, job_id: &JobId, source: &Path) -> JobOutcome {
        let logger = JobLogger::new(job_id, "process_video");
        let span = logger.create_span();
        self.process_job_logged(job_id, source, &logger)
            .instrument(span)
            .await
    }

    async fn process_job_logged(&self, job_id: &JobId, source: &Path, logger: &JobLogger) -> JobOutcome {
        let started = Instant::now();
        logger.log_start(&format!("source {}", source.display()));

        let mut audio = None;
        let job_timeout = self.config.job_timeout;
        // Dropping the run future on timeout kills any running FFmpeg child
        let result = match tokio::time::timeout(job_timeout, self.run(job_id, source, &mut audio, logger)).await {
            Ok(result) => result,
            Err(_) => Err(WorkerError::Timeout(job_timeout)),
        };

        if let Some(audio) = audio {
            remove_file_best_effort(&audio).await;
        }

        let outcome = match result {
            Ok(clips) => {
                logger.log_completion(&format!("{} clips generated", clips));
                JobOutcome::Completed { clips }
            }
            Err(e) => {
                let error_kind = e.kind();
                let error_message = e.diagnostic();
                logger.log_error(&format!("[{}] {}", error_kind, e));

                if let Err(store_err) = self.store.mark_failed(job_id, error_kind, &error_message).await {
                    logger.log_error(&format!("Could not record failure: {}", store_err));
                }
                JobOutcome::Failed {
                    error_kind,
                    error_message,
                }
            }
        };

        let status = if outcome.is_completed() { "completed" } else { "failed" };
        metrics::counter!("reelcut_jobs_total", "status" => status).increment(1);
        metrics::histogram!("reelcut_job_duration_seconds").record(started.elapsed().as_secs_f64());

        outcome
    }

    async fn run(
        &self,
        job_id: &JobId,
        source: &Path,
        audio: &mut Option<PathBuf>,
        logger: &JobLogger,
    ) -> WorkerResult<usize> {
        self.media.check_available().await?;
        self.extractor.check_credentials()?;

        self.store.update_job_status(job_id, JobStatus::Processing).await?;

        let source_duration = self.media.probe_duration(source).await;
        // Claim the path first so a partial file is removed on failure or timeout
        *audio = Some(self.media.audio_path_for(source));
        let audio_path = self.media.extract_audio(source).await?;
        *audio = Some(audio_path.clone());
        logger.log_progress(&format!("Audio extracted to {}", audio_path.display()));

        let analysis = self.extractor.analyze(AnalysisInput::audio(&audio_path)).await?;
        self.store.update_transcript(job_id, &analysis.transcript).await?;
        logger.log_progress(&format!("{} segments proposed", analysis.segments.len()));

        if !analysis.segments.is_empty() {
            ensure_dir(&self.config.clips_dir).await?;
        }

        let limits = SegmentLimits::new(self.config.max_segment_secs).with_source_duration(source_duration);

        let renders: Vec<_> = analysis
            .segments
            .iter()
            .enumerate()
            .map(|(i, proposal)| self.render_segment(job_id, source, i + 1, proposal, &limits, logger))
            .collect();

        // buffered(1) keeps segments strictly sequential. Results come back in
        // segment order, so clips are persisted in that order too and nothing
        // after the first failure is recorded.
        let mut rendered = stream::iter(renders).buffered(self.config.segment_parallelism.max(1));
        let mut clips: Vec<Clip> = Vec::new();
        while let Some(new_clip) = rendered.try_next().await? {
            let title = new_clip.title.clone();
            clips.push(self.store.create_clip(new_clip).await?);
            logger.log_progress(&format!("Segment #{} '{}' rendered", clips.len(), title));
        }

        self.store.update_job_status(job_id, JobStatus::Completed).await?;
        Ok(clips.len())
    }

    async fn render_segment(
        &self,
        job_id: &JobId,
        source: &Path,
        index: usize,
        proposal: &SegmentProposal,
        limits: &SegmentLimits,
        logger: &JobLogger,
    ) -> WorkerResult<NewClip> {
        let window = validate_window(&proposal.start, &proposal.end, limits).map_err(|source| {
            WorkerError::InvalidSegment {
                index,
                start: proposal.start.clone(),
                end: proposal.end.clone(),
                source,
            }
        })?;
        if window.clamped {
            logger.log_warning(&format!(
                "Segment #{} ({} - {}) shortened to {:.1}s",
                index,
                proposal.start,
                proposal.end,
                window.duration()
            ));
        }

        let safe_title = sanitize_title(&proposal.title);
        let horizontal = self
            .config
            .clips_dir
            .join(artifact_file_name(job_id, &safe_title, Rendition::Horizontal, "mp4"));
        let vertical = self
            .config
            .clips_dir
            .join(artifact_file_name(job_id, &safe_title, Rendition::Vertical, "mp4"));

        let retry = RetryConfig::new(format!("Segment #{} of job {}", index, job_id))
            .with_max_retries(self.config.segment_retries)
            .with_base_delay(self.config.segment_retry_delay);
        retry_async(
            &retry,
            || self.cut_and_crop(source, &window, &horizontal, &vertical),
            MediaError::is_retryable,
        )
        .await
        .into_result()?;

        Ok(NewClip {
            video_id: job_id.clone(),
            start_seconds: window.start_secs,
            end_seconds: window.end_secs,
            title: proposal.title.clone(),
            topic: proposal.topic.clone(),
            horizontal_path: horizontal,
            vertical_path: vertical,
        })
    }

    /// Horizontal cut from the source, then the vertical crop of that cut.
    async fn cut_and_crop(
        &self,
        source: &Path,
        window: &SegmentWindow,
        horizontal: &Path,
        vertical: &Path,
    ) -> MediaResult<()> {
        self.media
            .cut_segment(source, window.start_secs, window.duration(), horizontal)
            .await?;
        self.media.crop_to_vertical(horizontal, vertical).await
    }
}
