//! Video upload handler.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use futures::{Stream, StreamExt};
use reelcut_media::remove_file_best_effort;
use reelcut_models::{ErrorKind, JobId};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub video_id: JobId,
}

/// Stored name for an upload: `{unix_millis}_{name}` with whitespace replaced.
///
/// Any directory components the client sent are dropped.
pub fn stored_file_name(original: &str, unix_millis: i64) -> String {
    let base = Path::new(original)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{}_{}", unix_millis, cleaned)
}

/// Stream `chunks` into a new file at `path`.
///
/// On any read or write error the partial file is removed.
pub async fn save_upload<S, E>(chunks: S, path: &Path) -> ApiResult<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    match write_chunks(chunks, path).await {
        Ok(written) => Ok(written),
        Err(e) => {
            warn!("Upload to {} failed: {}", path.display(), e);
            remove_file_best_effort(path).await;
            Err(e)
        }
    }
}

async fn write_chunks<S, E>(chunks: S, path: &Path) -> ApiResult<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| ApiError::bad_request(format!("Upload interrupted: {}", e)))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Accept a video (multipart field `file`), create its job and queue it.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut saved: Option<(PathBuf, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

        tokio::fs::create_dir_all(&state.config.upload_dir).await?;
        let path = state
            .config
            .upload_dir
            .join(stored_file_name(&original, Utc::now().timestamp_millis()));

        let written = save_upload(field, &path).await?;
        info!("Stored upload {} ({} bytes)", path.display(), written);

        saved = Some((path, original));
        break;
    }

    let (path, original) = saved.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    let job = state.store.create_job(path.clone(), Some(original)).await?;

    if let Err(e) = state.submitter.submit(job.id.clone(), path) {
        warn!("Could not queue job {}: {}", job.id, e);
        state
            .store
            .mark_failed(&job.id, ErrorKind::Internal, &e.to_string())
            .await?;
        return Err(e.into());
    }

    metrics::record_job_enqueued();
    info!("Queued job {} for {}", job.id, job.source_file_path.display());

    Ok(Json(UploadResponse {
        success: true,
        video_id: job.id,
    }))
}
