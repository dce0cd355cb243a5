//! Worker error types.

use std::time::Duration;

use reelcut_ai::AiError;
use reelcut_media::MediaError;
use reelcut_models::{ErrorKind, TimecodeError};
use reelcut_store::StoreError;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid segment #{index} ({start} - {end}): {source}")]
    InvalidSegment {
        index: usize,
        start: String,
        end: String,
        source: TimecodeError,
    },

    #[error("Job timed out after {0:?}")]
    Timeout(Duration),

    #[error("Job queue is full ({0} jobs waiting)")]
    QueueFull(usize),

    #[error("Executor is shut down")]
    ShutDown,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Category recorded on the failed job.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::Media(e) => match e {
                MediaError::ToolNotFound { .. } => ErrorKind::ToolNotFound,
                MediaError::Timeout(_) => ErrorKind::Timeout,
                MediaError::Cancelled => ErrorKind::Cancelled,
                MediaError::InvalidArgument(_) => ErrorKind::Validation,
                MediaError::FileNotFound(_) | MediaError::Io(_) => ErrorKind::Io,
                MediaError::Internal(_) => ErrorKind::Internal,
                MediaError::ToolFailed { .. }
                | MediaError::ProbeFailed { .. }
                | MediaError::JsonParse(_) => ErrorKind::ToolExecution,
            },
            WorkerError::Ai(e) => match e {
                AiError::CredentialMissing(_) => ErrorKind::CredentialMissing,
                AiError::ResponseParse { .. } => ErrorKind::ResponseParse,
                AiError::Io(_) => ErrorKind::Io,
                AiError::InvalidInput(_) => ErrorKind::Validation,
                AiError::Http { .. }
                | AiError::Network(_)
                | AiError::EmptyResponse(_)
                | AiError::Json(_) => ErrorKind::AiRequest,
            },
            WorkerError::Store(_) => ErrorKind::Store,
            WorkerError::InvalidSegment { .. } => ErrorKind::Validation,
            WorkerError::Timeout(_) => ErrorKind::Timeout,
            WorkerError::Io(_) => ErrorKind::Io,
            WorkerError::QueueFull(_) | WorkerError::ShutDown | WorkerError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Message stored on the failed job. Parse failures carry the raw model output.
    pub fn diagnostic(&self) -> String {
        match self {
            WorkerError::Ai(e) => match e.raw_response() {
                Some(raw) => format!("{}\n--- raw model output ---\n{}", self, raw),
                None => self.to_string(),
            },
            _ => self.to_string(),
        }
    }
}
