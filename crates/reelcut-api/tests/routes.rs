//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use reelcut_ai::{AiError, AiResult, AnalysisInput, TranscriptExtractor};
use reelcut_api::{create_router, ApiConfig, AppState};
use reelcut_media::{MediaError, MediaResult, MediaTool};
use reelcut_models::{AnalysisResult, JobStatus, NewClip};
use reelcut_store::{InMemoryJobStore, JobStore};
use reelcut_worker::{JobExecutor, WorkerConfig};

const BOUNDARY: &str = "reelcut-test-boundary";

struct StubMedia {
    installed: bool,
}

#[async_trait]
impl MediaTool for StubMedia {
    async fn check_available(&self) -> MediaResult<()> {
        if self.installed {
            Ok(())
        } else {
            Err(MediaError::tool_not_found("ffmpeg"))
        }
    }

    async fn extract_audio(&self, video: &Path) -> MediaResult<PathBuf> {
        Ok(video.with_extension("mp3"))
    }

    async fn cut_segment(&self, _: &Path, _: f64, _: f64, _: &Path) -> MediaResult<()> {
        Ok(())
    }

    async fn crop_to_vertical(&self, _: &Path, _: &Path) -> MediaResult<()> {
        Ok(())
    }

    async fn probe_duration(&self, _: &Path) -> Option<f64> {
        None
    }
}

struct StubExtractor;

#[async_trait]
impl TranscriptExtractor for StubExtractor {
    fn check_credentials(&self) -> AiResult<()> {
        Ok(())
    }

    async fn analyze(&self, _: AnalysisInput) -> AiResult<AnalysisResult> {
        Err(AiError::credential_missing("not used"))
    }
}

struct TestApp {
    dir: TempDir,
    store: Arc<dyn JobStore>,
    router: Router,
    // Keeps the job queue open
    _executor: JobExecutor,
}

impl TestApp {
    fn new(queue_capacity: usize, ffmpeg_installed: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let config = ApiConfig {
            upload_dir: dir.path().join("uploads"),
            clips_dir: dir.path().join("clips"),
            ..ApiConfig::default()
        };
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let executor = JobExecutor::new(WorkerConfig {
            queue_capacity,
            ..WorkerConfig::default()
        });
        let state = AppState::new(
            config,
            Arc::clone(&store),
            executor.submitter(),
            Arc::new(StubMedia {
                installed: ffmpeg_installed,
            }),
            Arc::new(StubExtractor),
        );

        Self {
            dir,
            store,
            router: create_router(state, None),
            _executor: executor,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn upload(&self, field: &str, filename: &str) -> (StatusCode, Value) {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: video/mp4\r\n\r\nfake video bytes\r\n--{b}--\r\n",
            b = BOUNDARY,
            field = field,
            filename = filename,
        );
        let request = Request::post("/api/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new(4, true);
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_reports_missing_ffmpeg() {
    let app = TestApp::new(4, false);
    let (status, body) = app.get("/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["checks"]["ffmpeg"]["status"], "error");
    assert_eq!(body["checks"]["gemini_credentials"]["status"], "ok");

    let app = TestApp::new(4, true);
    let (status, body) = app.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_upload_creates_uploaded_job() {
    let app = TestApp::new(4, true);
    let (status, body) = app.upload("file", "my talk.mp4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let video_id = body["video_id"].as_str().unwrap().to_string();
    let (status, video) = app.get(&format!("/api/videos/{}", video_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(video["id"], video_id.as_str());
    assert_eq!(video["status"], "uploaded");
    assert_eq!(video["original_name"], "my talk.mp4");
    assert_eq!(video["clips"].as_array().unwrap().len(), 0);

    let stored = PathBuf::from(video["source_file_path"].as_str().unwrap());
    assert!(stored.starts_with(app.dir.path().join("uploads")));
    let name = stored.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.ends_with("_my_talk.mp4"), "unexpected stored name {}", name);
    assert_eq!(std::fs::read(&stored).unwrap(), b"fake video bytes");
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let app = TestApp::new(4, true);
    let (status, body) = app.upload("attachment", "talk.mp4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("No file uploaded"));
    assert!(app.store.list_jobs().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_truncated_upload_leaves_nothing_behind() {
    let app = TestApp::new(4, true);
    // Body ends mid-field, without the closing boundary
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"talk.mp4\"\r\n\
         Content-Type: video/mp4\r\n\r\nfirst half of the vid",
        b = BOUNDARY,
    );
    let request = Request::post("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uploads = app.dir.path().join("uploads");
    let leftovers = std::fs::read_dir(&uploads)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
    assert!(app.store.list_jobs().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_when_queue_full() {
    let app = TestApp::new(1, true);
    let (status, _) = app.upload("file", "first.mp4").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.upload("file", "second.mp4").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // The refused job is not left looking queued
    let jobs = app.store.list_jobs().await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert_eq!(jobs[1].status, JobStatus::Uploaded);
}

#[tokio::test]
async fn test_unknown_video_is_404() {
    let app = TestApp::new(4, true);
    let (status, body) = app.get("/api/videos/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("does-not-exist"));
}

#[tokio::test]
async fn test_list_videos_includes_clip_urls() {
    let app = TestApp::new(4, true);
    let job = app
        .store
        .create_job(PathBuf::from("uploads/1_talk.mp4"), None)
        .await
        .unwrap();
    let clips_dir = app.dir.path().join("clips");
    app.store
        .create_clip(NewClip {
            video_id: job.id.clone(),
            start_seconds: 60.0,
            end_seconds: 105.0,
            title: "Best Moment".to_string(),
            topic: String::new(),
            horizontal_path: clips_dir.join(format!("v{}_best_moment_16_9.mp4", job.id)),
            vertical_path: clips_dir.join(format!("v{}_best_moment_9_16.mp4", job.id)),
        })
        .await
        .unwrap();

    let (status, body) = app.get("/api/videos").await;
    assert_eq!(status, StatusCode::OK);
    let videos = body["videos"].as_array().unwrap();
    assert_eq!(videos.len(), 1);

    let clip = &videos[0]["clips"][0];
    assert_eq!(clip["title"], "Best Moment");
    assert_eq!(clip["start_seconds"], 60.0);
    assert_eq!(
        clip["vertical_url"],
        format!("/clips/v{}_best_moment_9_16.mp4", job.id).as_str()
    );
}

#[tokio::test]
async fn test_clips_are_served_statically() {
    let app = TestApp::new(4, true);
    let clips_dir = app.dir.path().join("clips");
    std::fs::create_dir_all(&clips_dir).unwrap();
    std::fs::write(clips_dir.join("va_hook_16_9.mp4"), b"mp4").unwrap();

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/clips/va_hook_16_9.mp4").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"mp4");
}
