//! Clip records and artifact naming.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::JobId;

/// Unique identifier for a clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl ClipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output rendition of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Rendition {
    /// 16:9, cut straight from the source
    Horizontal,
    /// 9:16 center crop of the horizontal cut
    Vertical,
}

impl Rendition {
    /// Suffix used in artifact file names.
    pub fn suffix(&self) -> &'static str {
        match self {
            Rendition::Horizontal => "16_9",
            Rendition::Vertical => "9_16",
        }
    }
}

/// A persisted clip: both renditions of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Clip {
    pub id: ClipId,
    pub video_id: JobId,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub title: String,
    #[serde(default)]
    pub topic: String,
    pub horizontal_path: PathBuf,
    pub vertical_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Clip data handed to the store once both renditions exist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClip {
    pub video_id: JobId,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub title: String,
    pub topic: String,
    pub horizontal_path: PathBuf,
    pub vertical_path: PathBuf,
}

impl NewClip {
    pub fn into_clip(self) -> Clip {
        Clip {
            id: ClipId::new(),
            video_id: self.video_id,
            start_seconds: self.start_seconds,
            end_seconds: self.end_seconds,
            title: self.title,
            topic: self.topic,
            horizontal_path: self.horizontal_path,
            vertical_path: self.vertical_path,
            created_at: Utc::now(),
        }
    }
}

/// Turn a proposed title into a filesystem-safe token.
///
/// Every non-ASCII-alphanumeric character becomes `_`, the result is
/// lowercased, and an empty title becomes `clip`. Distinct titles may map to
/// the same token.
pub fn sanitize_title(title: &str) -> String {
    if title.is_empty() {
        return "clip".to_string();
    }
    title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Artifact file name: `v{job_id}_{safe_title}_{suffix}.{ext}`.
pub fn artifact_file_name(job_id: &JobId, safe_title: &str, rendition: Rendition, ext: &str) -> String {
    format!("v{}_{}_{}.{}", job_id, safe_title, rendition.suffix(), ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("Best Moment"), "best_moment");
        assert_eq!(sanitize_title("Q&A: Part 2!"), "q_a__part_2_");
        assert_eq!(sanitize_title("Café"), "caf_");
        assert_eq!(sanitize_title(""), "clip");
    }

    #[test]
    fn test_sanitize_title_collisions_are_not_deduplicated() {
        assert_eq!(sanitize_title("a b"), sanitize_title("a-b"));
    }

    #[test]
    fn test_artifact_file_name() {
        let job = JobId::from_string("42");
        assert_eq!(
            artifact_file_name(&job, "best_moment", Rendition::Horizontal, "mp4"),
            "v42_best_moment_16_9.mp4"
        );
        assert_eq!(
            artifact_file_name(&job, "best_moment", Rendition::Vertical, "mp4"),
            "v42_best_moment_9_16.mp4"
        );
    }

    #[test]
    fn test_new_clip_into_clip() {
        let clip = NewClip {
            video_id: JobId::from_string("7"),
            start_seconds: 60.0,
            end_seconds: 105.0,
            title: "Best Moment".into(),
            topic: "intro".into(),
            horizontal_path: "clips/a.mp4".into(),
            vertical_path: "clips/b.mp4".into(),
        }
        .into_clip();

        assert_eq!(clip.video_id.as_str(), "7");
        assert_eq!(clip.end_seconds - clip.start_seconds, 45.0);
        assert!(!clip.id.as_str().is_empty());
    }
}
