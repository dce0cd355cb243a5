use std::path::Path;

use reelcut_ai::GeminiConfig;
use reelcut_media::{FfmpegConfig, FfmpegTool, MediaTool};
use reelcut_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with clips_dir={}",
        config.clips_dir.display()
    );
    ensure_clips_dir(&config.clips_dir).await?;
    ensure_ffmpeg().await?;
    ensure_gemini_key()?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_clips_dir(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path).await?;
    let probe = path.join(".selfcheck");
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("clips dir {} not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

async fn ensure_ffmpeg() -> anyhow::Result<()> {
    FfmpegTool::new(FfmpegConfig::from_env())
        .check_available()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))
}

fn ensure_gemini_key() -> anyhow::Result<()> {
    if GeminiConfig::from_env().api_key.is_none() {
        return Err(anyhow::anyhow!("missing required env var GEMINI_API_KEY"));
    }
    Ok(())
}
