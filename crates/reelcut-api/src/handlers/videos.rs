//! Job listing handlers.

use axum::extract::{Path, State};
use axum::Json;
use reelcut_models::{Clip, Job, JobId};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// A clip with the URLs its files are served under.
#[derive(Serialize)]
pub struct ClipView {
    #[serde(flatten)]
    pub clip: Clip,
    pub horizontal_url: Option<String>,
    pub vertical_url: Option<String>,
}

impl From<Clip> for ClipView {
    fn from(clip: Clip) -> Self {
        let url = |path: &std::path::Path| {
            path.file_name()
                .map(|name| format!("/clips/{}", name.to_string_lossy()))
        };
        Self {
            horizontal_url: url(&clip.horizontal_path),
            vertical_url: url(&clip.vertical_path),
            clip,
        }
    }
}

#[derive(Serialize)]
pub struct VideoResponse {
    #[serde(flatten)]
    pub job: Job,
    pub clips: Vec<ClipView>,
}

#[derive(Serialize)]
pub struct VideoListResponse {
    pub videos: Vec<VideoResponse>,
}

async fn with_clips(state: &AppState, job: Job) -> ApiResult<VideoResponse> {
    let clips = state.store.list_clips(&job.id).await?;
    Ok(VideoResponse {
        job,
        clips: clips.into_iter().map(ClipView::from).collect(),
    })
}

/// All jobs, newest first, each with its clips.
pub async fn list_videos(State(state): State<AppState>) -> ApiResult<Json<VideoListResponse>> {
    let jobs = state.store.list_jobs().await?;
    let mut videos = Vec::with_capacity(jobs.len());
    for job in jobs {
        videos.push(with_clips(&state, job).await?);
    }
    Ok(Json(VideoListResponse { videos }))
}

pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoResponse>> {
    let job = state
        .store
        .get_job(&JobId::from_string(video_id.clone()))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Video {} not found", video_id)))?;
    Ok(Json(with_clips(&state, job).await?))
}
