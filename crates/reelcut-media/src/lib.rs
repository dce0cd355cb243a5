//! FFmpeg CLI wrapper for the Reelcut pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - A process runner with timeout, cancellation and kill-on-drop
//! - Typed tool errors (missing binary vs. non-zero exit)
//! - The [`MediaTool`] trait and its FFmpeg implementation

pub mod command;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod tool;

pub use command::{FfmpegCommand, FfmpegRunner};
pub use error::{install_guidance, MediaError, MediaResult};
pub use fs_utils::{audio_path_for, ensure_dir, remove_file_best_effort};
pub use probe::{probe_media, MediaInfo};
pub use progress::FfmpegProgress;
pub use tool::{FfmpegConfig, FfmpegTool, MediaTool};
