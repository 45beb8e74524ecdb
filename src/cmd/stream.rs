use std::time::Instant;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use livelay::{Config, StreamError, StreamLifecycleController};

use super::{backend, on_ctrl_c};

pub async fn cmd_start(config: &Config, source: &str) -> Result<()> {
    let client = backend(config)?;
    let controller = StreamLifecycleController::new(client, &config.api.base_url, &config.polling);

    let cancel = CancellationToken::new();
    let guard = on_ctrl_c({
        let cancel = cancel.clone();
        move || cancel.cancel()
    });

    eprintln!("🎬 Starting: {source}");
    eprintln!("   Waiting for the manifest (Ctrl-C to cancel)");
    let started_at = Instant::now();
    let result = controller.start(source, &cancel).await;
    guard.abort();

    match result {
        Ok(started) => {
            eprintln!("✅ Ready in {:.1}s", started_at.elapsed().as_secs_f64());
            println!("{}\t{}", started.stream_id, started.playable_url);
            Ok(())
        }
        Err(StreamError::Cancelled) => {
            eprintln!("Start cancelled");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn cmd_streams(config: &Config) -> Result<()> {
    let client = backend(config)?;
    let mut controller =
        StreamLifecycleController::new(client, &config.api.base_url, &config.polling);

    let streams = controller.list().await?;
    if streams.is_empty() {
        println!("No streams");
        return Ok(());
    }

    println!("{:<38} {:<8} URL", "STREAM", "STATE");
    for stream in &streams {
        let state = if stream.running { "running" } else { "paused" };
        let url = livelay::stream::playable_url(controller.origin(), &stream.manifest_path);
        println!("{:<38} {state:<8} {url}", stream.stream_id);
    }
    println!("\n({} streams)", streams.len());
    Ok(())
}

/// `stop`, `pause` or `resume`.
pub async fn cmd_control(config: &Config, action: &str, stream_id: &str) -> Result<()> {
    let client = backend(config)?;
    let mut controller =
        StreamLifecycleController::new(client, &config.api.base_url, &config.polling);

    match action {
        "stop" => controller.stop(stream_id).await?,
        "pause" => controller.pause(stream_id).await?,
        "resume" => controller.resume(stream_id).await?,
        other => anyhow::bail!("unknown stream action: {other}"),
    }
    println!("✅ {action}: {stream_id}");
    Ok(())
}

pub async fn cmd_health(config: &Config) -> Result<()> {
    let client = backend(config)?;
    let health = client
        .health()
        .await
        .with_context(|| format!("backend at {} is unreachable", config.api.base_url))?;
    println!("{}: {}", config.api.base_url, health.status);
    Ok(())
}
