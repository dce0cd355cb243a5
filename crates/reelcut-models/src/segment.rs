//! AI segment proposals and analysis results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Transcript stored when the model returned none.
pub const NO_TRANSCRIPT: &str = "No transcript generated";

/// A highlight window proposed by the AI backend.
///
/// Timecodes are kept as text; they are parsed and validated right before
/// the segment is cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentProposal {
    #[serde(alias = "start_time", alias = "startTime")]
    pub start: String,

    #[serde(alias = "end_time", alias = "endTime")]
    pub end: String,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub topic: String,
}

fn default_title() -> String {
    "clip".to_string()
}

impl SegmentProposal {
    pub fn new(start: impl Into<String>, end: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            title: title.into(),
            topic: String::new(),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }
}

/// Transcript and segment list returned by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    pub transcript: String,
    #[serde(default)]
    pub segments: Vec<SegmentProposal>,
}

impl AnalysisResult {
    pub fn new(transcript: Option<String>, segments: Vec<SegmentProposal>) -> Self {
        let transcript = transcript
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| NO_TRANSCRIPT.to_string());
        Self { transcript, segments }
    }
}
