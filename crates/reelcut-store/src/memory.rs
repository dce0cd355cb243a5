//! In-memory [`JobStore`].

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use reelcut_models::{Clip, ErrorKind, Job, JobId, JobStatus, NewClip};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::JobStore;

#[derive(Default)]
struct State {
    jobs: HashMap<JobId, Job>,
    /// Job ids in creation order
    order: Vec<JobId>,
    clips: HashMap<JobId, Vec<Clip>>,
}

/// Process-local store; contents are lost on restart.
#[derive(Default)]
pub struct InMemoryJobStore {
    state: RwLock<State>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn transition(job: &mut Job, to: JobStatus) -> StoreResult<()> {
    if !job.status.can_transition_to(to) {
        return Err(StoreError::InvalidTransition {
            job_id: job.id.clone(),
            from: job.status,
            to,
        });
    }
    job.status = to;
    job.updated_at = Utc::now();
    Ok(())
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create_job(
        &self,
        source_file_path: PathBuf,
        original_name: Option<String>,
    ) -> StoreResult<Job> {
        let mut job = Job::new(source_file_path);
        job.original_name = original_name;

        let mut state = self.state.write().await;
        state.order.push(job.id.clone());
        state.jobs.insert(job.id.clone(), job.clone());

        info!("Created job record: {}", job.id);
        Ok(job)
    }

    async fn get_job(&self, job_id: &JobId) -> StoreResult<Option<Job>> {
        Ok(self.state.read().await.jobs.get(job_id).cloned())
    }

    async fn list_jobs(&self) -> StoreResult<Vec<Job>> {
        let state = self.state.read().await;
        Ok(state
            .order
            .iter()
            .rev()
            .filter_map(|id| state.jobs.get(id).cloned())
            .collect())
    }

    async fn update_job_status(&self, job_id: &JobId, status: JobStatus) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::not_found(job_id))?;
        transition(job, status)?;

        info!("Updated job {} status to {}", job_id, status);
        Ok(())
    }

    async fn update_transcript(&self, job_id: &JobId, transcript: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::not_found(job_id))?;
        job.transcript = Some(transcript.to_string());
        job.updated_at = Utc::now();

        debug!("Stored transcript for job {} ({} chars)", job_id, transcript.len());
        Ok(())
    }

    async fn mark_failed(&self, job_id: &JobId, kind: ErrorKind, message: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::not_found(job_id))?;
        transition(job, JobStatus::Failed)?;
        job.error_kind = Some(kind);
        job.error_message = Some(message.to_string());

        info!("Marked job {} failed ({})", job_id, kind);
        Ok(())
    }

    async fn create_clip(&self, clip: NewClip) -> StoreResult<Clip> {
        let mut state = self.state.write().await;
        if !state.jobs.contains_key(&clip.video_id) {
            return Err(StoreError::not_found(&clip.video_id));
        }

        let clip = clip.into_clip();
        state
            .clips
            .entry(clip.video_id.clone())
            .or_default()
            .push(clip.clone());

        info!("Created clip record: {} for job {}", clip.id, clip.video_id);
        Ok(clip)
    }

    async fn list_clips(&self, job_id: &JobId) -> StoreResult<Vec<Clip>> {
        Ok(self
            .state
            .read()
            .await
            .clips
            .get(job_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_clip(job_id: &JobId, title: &str) -> NewClip {
        NewClip {
            video_id: job_id.clone(),
            start_seconds: 60.0,
            end_seconds: 105.0,
            title: title.to_string(),
            topic: String::new(),
            horizontal_path: PathBuf::from(format!("clips/{title}_16_9.mp4")),
            vertical_path: PathBuf::from(format!("clips/{title}_9_16.mp4")),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_job() {
        let store = InMemoryJobStore::new();
        let job = store
            .create_job("uploads/1_talk.mp4".into(), Some("talk.mp4".into()))
            .await
            .unwrap();

        let fetched = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Uploaded);
        assert_eq!(fetched.original_name.as_deref(), Some("talk.mp4"));
        assert!(store.get_job(&JobId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_jobs_newest_first() {
        let store = InMemoryJobStore::new();
        let first = store.create_job("a.mp4".into(), None).await.unwrap();
        let second = store.create_job("b.mp4".into(), None).await.unwrap();

        let ids: Vec<JobId> = store.list_jobs().await.unwrap().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_status_is_monotonic() {
        let store = InMemoryJobStore::new();
        let job = store.create_job("a.mp4".into(), None).await.unwrap();

        assert!(matches!(
            store.update_job_status(&job.id, JobStatus::Completed).await,
            Err(StoreError::InvalidTransition { .. })
        ));

        store.update_job_status(&job.id, JobStatus::Processing).await.unwrap();
        store.update_job_status(&job.id, JobStatus::Completed).await.unwrap();

        assert!(store
            .mark_failed(&job.id, ErrorKind::Internal, "late failure")
            .await
            .is_err());
        let job = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.error_kind.is_none());
    }

    #[tokio::test]
    async fn test_mark_failed_sets_error_fields_only() {
        let store = InMemoryJobStore::new();
        let job = store.create_job("a.mp4".into(), None).await.unwrap();

        store
            .mark_failed(&job.id, ErrorKind::ToolNotFound, "ffmpeg not found")
            .await
            .unwrap();

        let job = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_kind, Some(ErrorKind::ToolNotFound));
        assert_eq!(job.error_message.as_deref(), Some("ffmpeg not found"));
        assert!(job.transcript.is_none());
    }

    #[tokio::test]
    async fn test_clips_are_kept_per_job_in_order() {
        let store = InMemoryJobStore::new();
        let job = store.create_job("a.mp4".into(), None).await.unwrap();
        let other = store.create_job("b.mp4".into(), None).await.unwrap();

        store.create_clip(new_clip(&job.id, "one")).await.unwrap();
        store.create_clip(new_clip(&job.id, "two")).await.unwrap();

        let titles: Vec<String> = store
            .list_clips(&job.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["one", "two"]);
        assert!(store.list_clips(&other.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_job_errors() {
        let store = InMemoryJobStore::new();
        let missing = JobId::new();

        assert!(matches!(
            store.update_transcript(&missing, "t").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.create_clip(new_clip(&missing, "x")).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
