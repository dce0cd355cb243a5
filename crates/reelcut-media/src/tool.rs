//! The media tool seam used by the pipeline, and its FFmpeg implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info};

use crate::command::{spawn_error, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::FILTER_VERTICAL_CENTER_CROP;
use crate::fs_utils::audio_path_for;
use crate::probe::probe_media;

/// Operations the clip pipeline needs from a media toolchain.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Fail fast with [`MediaError::ToolNotFound`] when the toolchain is missing.
    async fn check_available(&self) -> MediaResult<()>;

    /// Where [`MediaTool::extract_audio`] writes the audio of `video`.
    ///
    /// Known before extraction starts, so a partial file can be cleaned up.
    fn audio_path_for(&self, video: &Path) -> PathBuf {
        audio_path_for(video)
    }

    /// Extract the audio track to [`MediaTool::audio_path_for`].
    async fn extract_audio(&self, video: &Path) -> MediaResult<PathBuf>;

    /// Cut `[start, start + duration)` from `video` into a horizontal clip.
    async fn cut_segment(
        &self,
        video: &Path,
        start_secs: f64,
        duration_secs: f64,
        output: &Path,
    ) -> MediaResult<()>;

    /// Center-crop `input` to 9:16.
    async fn crop_to_vertical(&self, input: &Path, output: &Path) -> MediaResult<()>;

    /// Source duration in seconds; `None` when it cannot be determined.
    async fn probe_duration(&self, path: &Path) -> Option<f64>;
}

/// FFmpeg configuration.
#[derive(Debug, Clone)]
pub struct FfmpegConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_bitrate: String,
    /// Per-invocation timeout
    pub timeout_secs: Option<u64>,
    /// Concurrent FFmpeg processes across all jobs
    pub max_processes: usize,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "veryfast".to_string(),
            crf: 23,
            audio_bitrate: "128k".to_string(),
            timeout_secs: Some(900),
            max_processes: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2),
        }
    }
}

impl FfmpegConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ffmpeg_path: std::env::var("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_path),
            ffprobe_path: std::env::var("FFPROBE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffprobe_path),
            timeout_secs: match std::env::var("FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
            {
                Some(0) => None,
                Some(secs) => Some(secs),
                None => defaults.timeout_secs,
            },
            max_processes: std::env::var("WORKER_MAX_FFMPEG")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_processes),
            ..defaults
        }
    }
}

/// [`MediaTool`] backed by the `ffmpeg`/`ffprobe` binaries.
///
/// Every FFmpeg invocation holds a permit from a shared semaphore, so the
/// number of concurrent encoder processes stays bounded across jobs.
#[derive(Clone)]
pub struct FfmpegTool {
    config: FfmpegConfig,
    permits: Arc<Semaphore>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl FfmpegTool {
    pub fn new(config: FfmpegConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_processes.max(1)));
        Self {
            config,
            permits,
            cancel_rx: None,
        }
    }

    /// Kill in-flight invocations when `cancel_rx` turns `true`.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn config(&self) -> &FfmpegConfig {
        &self.config
    }

    fn runner(&self, operation: &str) -> FfmpegRunner {
        let mut runner = FfmpegRunner::new(&self.config.ffmpeg_path, operation);
        if let Some(secs) = self.config.timeout_secs {
            runner = runner.with_timeout(secs);
        }
        if let Some(rx) = &self.cancel_rx {
            runner = runner.with_cancel(rx.clone());
        }
        runner
    }

    /// Encoder settings shared by both renditions.
    fn encode(&self, cmd: FfmpegCommand) -> FfmpegCommand {
        cmd.video_codec(&self.config.video_codec)
            .preset(&self.config.preset)
            .crf(self.config.crf)
            .output_args(["-movflags", "+faststart"])
    }

    async fn run(&self, operation: &'static str, cmd: FfmpegCommand) -> MediaResult<()> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| MediaError::internal("FFmpeg permit pool closed"))?;

        let output = cmd.output().display().to_string();
        let result = self
            .runner(operation)
            .run_with_progress(&cmd, move |p| {
                debug!(output = %output, out_time_ms = p.out_time_ms, speed = p.speed, "FFmpeg progress");
            })
            .await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::counter!(
            "reelcut_ffmpeg_invocations_total",
            "operation" => operation,
            "result" => outcome
        )
        .increment(1);

        result
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn check_available(&self) -> MediaResult<()> {
        let ffmpeg = which::which(&self.config.ffmpeg_path)
            .map_err(|_| MediaError::tool_not_found(self.config.ffmpeg_path.display().to_string()))?;

        let output = Command::new(&ffmpeg)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_error(&ffmpeg, e))?;

        if !output.status.success() {
            return Err(MediaError::tool_failed(
                "version",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        debug!(
            "Using {} ({})",
            ffmpeg.display(),
            version.lines().next().unwrap_or_default()
        );
        Ok(())
    }

    async fn extract_audio(&self, video: &Path) -> MediaResult<PathBuf> {
        if !video.exists() {
            return Err(MediaError::FileNotFound(video.to_path_buf()));
        }

        let audio = self.audio_path_for(video);

        let cmd = FfmpegCommand::new(video, &audio)
            .no_video()
            .audio_codec("libmp3lame");
        self.run("extract_audio", cmd).await?;

        info!("Extracted audio to {}", audio.display());
        Ok(audio)
    }

    async fn cut_segment(
        &self,
        video: &Path,
        start_secs: f64,
        duration_secs: f64,
        output: &Path,
    ) -> MediaResult<()> {
        if !(start_secs >= 0.0) || !(duration_secs > 0.0) {
            return Err(MediaError::invalid_argument(format!(
                "segment start {:.3}s / duration {:.3}s",
                start_secs, duration_secs
            )));
        }

        let cmd = FfmpegCommand::new(video, output)
            .seek(start_secs)
            .duration(duration_secs);
        let cmd = self
            .encode(cmd)
            .audio_codec(&self.config.audio_codec)
            .audio_bitrate(&self.config.audio_bitrate);

        self.run("cut", cmd).await
    }

    async fn crop_to_vertical(&self, input: &Path, output: &Path) -> MediaResult<()> {
        let cmd = FfmpegCommand::new(input, output).video_filter(FILTER_VERTICAL_CENTER_CROP);
        let cmd = self.encode(cmd).audio_codec("copy");

        self.run("crop", cmd).await
    }

    async fn probe_duration(&self, path: &Path) -> Option<f64> {
        match probe_media(&self.config.ffprobe_path, path).await {
            Ok(info) => info.duration,
            Err(e) => {
                debug!("Could not probe {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_tool() -> FfmpegTool {
        FfmpegTool::new(FfmpegConfig {
            ffmpeg_path: PathBuf::from("/nonexistent/reelcut-ffmpeg"),
            ffprobe_path: PathBuf::from("/nonexistent/reelcut-ffprobe"),
            ..FfmpegConfig::default()
        })
    }

    #[test]
    fn test_default_config() {
        let config = FfmpegConfig::default();
        assert_eq!(config.video_codec, "libx264");
        assert_eq!(config.audio_codec, "aac");
        assert!(config.max_processes >= 1);
    }

    #[tokio::test]
    async fn test_check_available_reports_missing_binary() {
        let err = missing_tool().check_available().await.unwrap_err();
        match err {
            MediaError::ToolNotFound { tool, guidance } => {
                assert!(tool.contains("reelcut-ffmpeg"));
                assert!(!guidance.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cut_rejects_non_positive_duration() {
        let err = missing_tool()
            .cut_segment(Path::new("in.mp4"), 10.0, 0.0, Path::new("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_missing_tool_surfaces_on_invocation() {
        let tmp = tempfile::tempdir().unwrap();
        let video = tmp.path().join("talk.mp4");
        tokio::fs::write(&video, b"not really a video").await.unwrap();

        let err = missing_tool().extract_audio(&video).await.unwrap_err();
        assert!(matches!(err, MediaError::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_probe_duration_is_non_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let video = tmp.path().join("talk.mp4");
        tokio::fs::write(&video, b"x").await.unwrap();

        assert_eq!(missing_tool().probe_duration(&video).await, None);
    }
}
