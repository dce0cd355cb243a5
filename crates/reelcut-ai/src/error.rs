//! AI client error types.

use thiserror::Error;

pub type AiResult<T> = Result<T, AiError>;

/// Raw model output kept on parse errors is cut to this many bytes.
const MAX_RAW_LEN: usize = 4000;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI credential missing: {0}")]
    CredentialMissing(String),

    #[error("Gemini API returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Empty response from model {0}")]
    EmptyResponse(String),

    #[error("Failed to parse AI response: {message}")]
    ResponseParse { message: String, raw: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AiError {
    pub fn credential_missing(message: impl Into<String>) -> Self {
        Self::CredentialMissing(message.into())
    }

    /// Create a parse error, keeping a bounded copy of the raw output.
    pub fn response_parse(message: impl Into<String>, raw: &str) -> Self {
        Self::ResponseParse {
            message: message.into(),
            raw: truncate(raw, MAX_RAW_LEN).to_string(),
        }
    }

    /// Transient failures worth retrying against the same model.
    pub fn is_retryable(&self) -> bool {
        match self {
            AiError::Network(_) => true,
            AiError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Whether another model might succeed where this one failed.
    ///
    /// Auth and request errors (401, 403, 400) fail the same way on every model.
    pub fn allows_fallback(&self) -> bool {
        match self {
            AiError::Network(_) | AiError::EmptyResponse(_) => true,
            AiError::Http { status, .. } => matches!(*status, 404 | 429) || *status >= 500,
            _ => false,
        }
    }

    /// Raw model output, for parse failures.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            AiError::ResponseParse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Cut `s` to at most `max` bytes on a char boundary.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        let http = |status| AiError::Http {
            status,
            body: String::new(),
        };
        assert!(http(429).is_retryable());
        assert!(http(500).is_retryable());
        assert!(http(503).is_retryable());
        assert!(!http(400).is_retryable());
        assert!(!http(403).is_retryable());
        assert!(!AiError::response_parse("bad", "{").is_retryable());
        assert!(!AiError::credential_missing("GEMINI_API_KEY").is_retryable());
    }

    #[test]
    fn test_fallback_statuses() {
        let http = |status| AiError::Http {
            status,
            body: String::new(),
        };
        assert!(http(404).allows_fallback());
        assert!(http(429).allows_fallback());
        assert!(http(502).allows_fallback());
        assert!(!http(400).allows_fallback());
        assert!(!http(401).allows_fallback());
        assert!(!http(403).allows_fallback());
        assert!(AiError::EmptyResponse("m".into()).allows_fallback());
    }

    #[test]
    fn test_parse_error_keeps_bounded_raw() {
        let raw = "é".repeat(MAX_RAW_LEN);
        let err = AiError::response_parse("no JSON", &raw);
        let kept = err.raw_response().unwrap();
        assert!(kept.len() <= MAX_RAW_LEN);
        assert!(kept.chars().all(|c| c == 'é'));
        assert!(!err.allows_fallback());
    }
}
