//! Gemini client for transcript and highlight extraction.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reelcut_models::AnalysisResult;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::{truncate, AiError, AiResult};
use crate::parse::parse_analysis;
use crate::types::{
    AnalysisInput, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    InlineData, Part,
};

/// Produces a transcript and highlight segments from media or text.
#[async_trait]
pub trait TranscriptExtractor: Send + Sync {
    /// Fail with [`AiError::CredentialMissing`] when the backend cannot be called.
    fn check_credentials(&self) -> AiResult<()>;

    async fn analyze(&self, input: AnalysisInput) -> AiResult<AnalysisResult>;
}

/// Configuration for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    /// Tried in order when the primary model fails with a transport or HTTP error
    pub fallback_models: Vec<String>,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    /// First backoff delay; doubles per attempt
    pub retry_base_delay: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            fallback_models: Vec::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout: Duration::from_secs(300),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            fallback_models: std::env::var("GEMINI_FALLBACK_MODELS")
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            timeout: std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: std::env::var("GEMINI_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_base_delay: defaults.retry_base_delay,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Primary model followed by the fallbacks.
    fn models(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(self.model.as_str()).chain(
            self.fallback_models
                .iter()
                .map(String::as_str)
                .filter(move |m| *m != self.model),
        )
    }
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> AiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AiError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> AiResult<Self> {
        Self::new(GeminiConfig::from_env())
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    async fn build_request(&self, input: &AnalysisInput) -> AiResult<GenerateContentRequest> {
        let parts = match input {
            AnalysisInput::Audio { path, mime_type } => {
                let bytes = tokio::fs::read(path).await?;
                if bytes.is_empty() {
                    return Err(AiError::InvalidInput(format!(
                        "audio file {} is empty",
                        path.display()
                    )));
                }
                debug!("Sending {} bytes of {} inline", bytes.len(), mime_type);
                vec![
                    Part::Text {
                        text: build_prompt(None),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.clone(),
                            data: base64::engine::general_purpose::STANDARD.encode(bytes),
                        },
                    },
                ]
            }
            AnalysisInput::Transcript(transcript) => vec![Part::Text {
                text: build_prompt(Some(transcript)),
            }],
        };

        Ok(GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        })
    }

    /// One `generateContent` call; returns the model's text.
    async fn generate(&self, model: &str, request: &GenerateContentRequest) -> AiResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AiError::credential_missing("GEMINI_API_KEY is not set"))?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Http {
                status: status.as_u16(),
                body: truncate(&body, 1000).to_string(),
            });
        }

        // Decode separately so a malformed envelope is a Json error, not a retried Network one
        let text = response.text().await?;
        let body: GenerateContentResponse = serde_json::from_str(&text)?;
        body.text()
            .ok_or_else(|| AiError::EmptyResponse(model.to_string()))
    }

    /// Execute with retry on transient errors.
    async fn with_retry<F, Fut, T>(&self, model: &str, operation: F) -> AiResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = AiResult<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_base_delay * 2u32.saturating_pow(attempt);
                    warn!(
                        model,
                        "Gemini request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl TranscriptExtractor for GeminiClient {
    fn check_credentials(&self) -> AiResult<()> {
        match &self.config.api_key {
            Some(_) => Ok(()),
            None => Err(AiError::credential_missing("GEMINI_API_KEY is not set")),
        }
    }

    async fn analyze(&self, input: AnalysisInput) -> AiResult<AnalysisResult> {
        self.check_credentials()?;
        let request = self.build_request(&input).await?;

        let mut last_error = None;
        for model in self.config.models() {
            info!("Requesting analysis from {}", model);
            match self.with_retry(model, || self.generate(model, &request)).await {
                Ok(text) => {
                    record_request(model, "success");
                    let result = parse_analysis(&text);
                    if let Ok(analysis) = &result {
                        info!(
                            "Got {} segments from {} ({} transcript chars)",
                            analysis.segments.len(),
                            model,
                            analysis.transcript.len()
                        );
                    }
                    return result;
                }
                Err(e) if e.allows_fallback() => {
                    record_request(model, "error");
                    warn!("Model {} failed: {}", model, e);
                    last_error = Some(e);
                }
                Err(e) => {
                    record_request(model, "error");
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AiError::EmptyResponse(self.config.model.clone())))
    }
}

fn record_request(model: &str, result: &'static str) {
    metrics::counter!(
        "reelcut_ai_requests_total",
        "model" => model.to_string(),
        "result" => result
    )
    .increment(1);
}

/// Prompt asking for a transcript plus 3-5 highlight segments.
pub fn build_prompt(transcript: Option<&str>) -> String {
    let source = match transcript {
        Some(t) => format!(
            "Here is the transcript of a video, with timestamps where available.\n\nTRANSCRIPT:\n{t}\n\nRepeat the transcript verbatim in the \"transcript\" field."
        ),
        None => "The attached file is the audio track of a video. Transcribe it verbatim into the \"transcript\" field.".to_string(),
    };

    format!(
        r#"{source}

Then identify the 3 to 5 most engaging moments that would work as standalone short clips.
Each clip should ideally be 30 to 90 seconds long.

Return ONLY a single JSON object with this schema:
{{
  "transcript": "full verbatim transcript",
  "segments": [
    {{
      "start": "HH:MM:SS",
      "end": "HH:MM:SS",
      "title": "Short catchy title",
      "topic": "What the clip is about"
    }}
  ]
}}

Rules:
- Timestamps are offsets from the start of the media in "HH:MM:SS" format.
- "end" must be after "start".
- Do not wrap the JSON in markdown."#
    )
}
