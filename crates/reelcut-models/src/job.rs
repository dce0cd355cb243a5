//! Job (uploaded video) records and the status state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing status of a job.
///
/// Moves forward only: `uploaded -> processing -> completed`. Any
/// non-terminal status may jump to `failed`. Terminal statuses never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Stored, not yet picked up
    #[default]
    Uploaded,
    /// Pipeline is running
    Processing,
    /// All clips were generated
    Completed,
    /// Pipeline aborted; see the error fields
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uploaded => "uploaded",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Uploaded, Processing) => true,
            (Processing, Completed) => true,
            (Uploaded | Processing, Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure category recorded on a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ToolNotFound,
    CredentialMissing,
    ToolExecution,
    AiRequest,
    ResponseParse,
    Validation,
    Timeout,
    Cancelled,
    Store,
    Io,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ToolNotFound => "tool_not_found",
            ErrorKind::CredentialMissing => "credential_missing",
            ErrorKind::ToolExecution => "tool_execution",
            ErrorKind::AiRequest => "ai_request",
            ErrorKind::ResponseParse => "response_parse",
            ErrorKind::Validation => "validation",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Store => "store",
            ErrorKind::Io => "io",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A job record: one uploaded video moving through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    pub id: JobId,

    /// Location of the uploaded media. Immutable after creation.
    pub source_file_path: PathBuf,

    /// Filename as sent by the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,

    pub status: JobStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job in `uploaded` status.
    pub fn new(source_file_path: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            source_file_path: source_file_path.into(),
            original_name: None,
            status: JobStatus::Uploaded,
            transcript: None,
            error_kind: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_original_name(mut self, name: impl Into<String>) -> Self {
        self.original_name = Some(name.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_generation() {
        let a = JobId::new();
        let b = JobId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_status_transitions() {
        use JobStatus::*;

        assert!(Uploaded.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Uploaded.can_transition_to(Failed));
        assert!(Processing.can_transition_to(Failed));

        assert!(!Uploaded.can_transition_to(Completed));
        assert!(!Processing.can_transition_to(Uploaded));
        assert!(!Processing.can_transition_to(Processing));
        for next in [Uploaded, Processing, Completed, Failed] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Failed.can_transition_to(next));
        }
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&JobStatus::Processing).unwrap(), "\"processing\"");
        assert_eq!(
            serde_json::to_string(&ErrorKind::ToolNotFound).unwrap(),
            "\"tool_not_found\""
        );
        assert_eq!(ErrorKind::ResponseParse.to_string(), "response_parse");
    }

    #[test]
    fn test_new_job_defaults() {
        let job = Job::new("/uploads/1_talk.mp4").with_original_name("talk.mp4");
        assert_eq!(job.status, JobStatus::Uploaded);
        assert!(!job.is_terminal());
        assert!(job.transcript.is_none());
        assert!(job.error_kind.is_none());
        assert_eq!(job.original_name.as_deref(), Some("talk.mp4"));

        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "uploaded");
        assert!(json.get("error_message").is_none());
    }
}
