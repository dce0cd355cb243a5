//! Clip worker binary: runs the pipeline over local video files.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelcut_ai::GeminiClient;
use reelcut_media::{FfmpegConfig, FfmpegTool};
use reelcut_models::JobId;
use reelcut_store::{InMemoryJobStore, JobStore};
use reelcut_worker::{JobExecutor, Pipeline, WorkerConfig};

#[derive(Debug, Parser)]
#[command(name = "reelcut-worker", version, about = "Cut highlight clips out of local videos")]
struct Cli {
    /// Videos to process
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Where clip artifacts are written
    #[arg(long, env = "CLIPS_DIR")]
    clips_dir: Option<PathBuf>,

    /// Jobs processed concurrently
    #[arg(long)]
    max_jobs: Option<usize>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing();
    info!("Starting reelcut-worker");

    let mut config = WorkerConfig::from_env();
    if let Some(dir) = cli.clips_dir {
        config.clips_dir = dir;
    }
    if let Some(max_jobs) = cli.max_jobs.filter(|n| *n > 0) {
        config.max_concurrent_jobs = max_jobs;
    }
    // Every file given on the command line must fit in the queue
    config.queue_capacity = config.queue_capacity.max(cli.files.len());
    info!("Worker config: {:?}", config);

    let extractor = match GeminiClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create Gemini client: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let executor = JobExecutor::new(config.clone());
    let media = FfmpegTool::new(FfmpegConfig::from_env()).with_cancel(executor.cancel_signal());
    let pipeline = Arc::new(Pipeline::new(
        config,
        Arc::clone(&store),
        Arc::new(media),
        Arc::new(extractor),
    ));

    let submitter = executor.submitter();
    let mut job_ids: Vec<JobId> = Vec::new();
    let mut rejected = 0usize;
    for file in cli.files {
        if !file.is_file() {
            warn!("Skipping {}: not a file", file.display());
            rejected += 1;
            continue;
        }
        let original_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        let job = match store.create_job(file.clone(), original_name).await {
            Ok(job) => job,
            Err(e) => {
                error!("Failed to create job for {}: {}", file.display(), e);
                rejected += 1;
                continue;
            }
        };
        match submitter.submit(job.id.clone(), file) {
            Ok(()) => job_ids.push(job.id),
            Err(e) => {
                error!("Failed to submit job {}: {}", job.id, e);
                rejected += 1;
            }
        }
    }
    // Executor drains the queue and returns once every submitter is gone
    drop(submitter);

    let shutdown = executor.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            shutdown.shutdown();
        }
    });

    if let Err(e) = executor.run(pipeline).await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    let mut summary = Vec::with_capacity(job_ids.len());
    let mut all_completed = rejected == 0;
    for job_id in &job_ids {
        match (store.get_job(job_id).await, store.list_clips(job_id).await) {
            (Ok(Some(job)), Ok(clips)) => {
                all_completed &= job.status == reelcut_models::JobStatus::Completed;
                summary.push(serde_json::json!({ "job": job, "clips": clips }));
            }
            _ => {
                all_completed = false;
                error!("Job {} missing from store", job_id);
            }
        }
    }

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to render summary: {}", e),
    }

    info!("Worker shutdown complete");
    if !all_completed {
        std::process::exit(1);
    }
}

fn init_tracing() {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,reelcut=info"));

    // Logs go to stderr so stdout carries only the JSON summary
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
