//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving FFmpeg/FFprobe.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{tool} not found. {guidance}")]
    ToolNotFound { tool: String, guidance: String },

    #[error("FFmpeg {operation} failed (exit code {}): {}", display_code(.exit_code), .stderr.trim())]
    ToolFailed {
        operation: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("FFprobe failed: {message}")]
    ProbeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "none".to_string())
}

impl MediaError {
    /// Create a tool-not-found error with platform install guidance.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound {
            tool: tool.into(),
            guidance: install_guidance().to_string(),
        }
    }

    /// Create a non-zero exit error.
    pub fn tool_failed(
        operation: impl Into<String>,
        exit_code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::ToolFailed {
            operation: operation.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether running the same invocation again could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MediaError::ToolFailed { .. } | MediaError::Io(_))
    }
}

/// Install hint for the current platform.
pub fn install_guidance() -> &'static str {
    if cfg!(target_os = "windows") {
        "Install FFmpeg with `winget install ffmpeg` or `choco install ffmpeg`, or set FFMPEG_PATH"
    } else if cfg!(target_os = "macos") {
        "Install FFmpeg with `brew install ffmpeg`, or set FFMPEG_PATH"
    } else {
        "Install FFmpeg with your package manager (e.g. `sudo apt install ffmpeg`), or set FFMPEG_PATH"
    }
}
