//! Shared data models for the Reelcut clip pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs (uploaded videos) and their status state machine
//! - Clip records and artifact naming
//! - AI segment proposals and analysis results
//! - Timecode parsing and segment window validation

pub mod clip;
pub mod job;
pub mod segment;
pub mod timecode;

// Re-export common types
pub use clip::{artifact_file_name, sanitize_title, Clip, ClipId, NewClip, Rendition};
pub use job::{ErrorKind, Job, JobId, JobStatus};
pub use segment::{AnalysisResult, SegmentProposal, NO_TRANSCRIPT};
pub use timecode::{
    duration, format_timecode, parse_timecode, validate_window, SegmentLimits, SegmentWindow,
    TimecodeError,
};
