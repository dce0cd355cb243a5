//! Application state.

use std::sync::Arc;

use reelcut_ai::TranscriptExtractor;
use reelcut_media::MediaTool;
use reelcut_store::JobStore;
use reelcut_worker::JobSubmitter;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn JobStore>,
    pub submitter: JobSubmitter,
    /// Readiness probes only; jobs use the pipeline's own handles
    pub media: Arc<dyn MediaTool>,
    pub extractor: Arc<dyn TranscriptExtractor>,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn JobStore>,
        submitter: JobSubmitter,
        media: Arc<dyn MediaTool>,
        extractor: Arc<dyn TranscriptExtractor>,
    ) -> Self {
        Self {
            config,
            store,
            submitter,
            media,
            extractor,
        }
    }
}
