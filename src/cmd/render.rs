use std::process::Stdio;

use anyhow::{anyhow, Result};
use tokio::process::Command;
use tracing::debug;

use livelay::overlay::{compose, filter_graph, OverlayStore};
use livelay::{Config, OverlayApi, StreamLifecycleController};

use super::backend;

pub async fn cmd_render(
    config: &Config,
    stream: &str,
    input: Option<&str>,
    output: Option<&str>,
) -> Result<()> {
    let client = backend(config)?;

    let mut store = OverlayStore::new();
    store.replace_all(client.list_overlays(stream).await?);
    let graph = filter_graph(&compose(&store));

    let input = match input {
        Some(input) => input.to_string(),
        None => {
            let mut controller =
                StreamLifecycleController::new(client, &config.api.base_url, &config.polling);
            controller.list().await?;
            controller.select(stream)?.playable_url
        }
    };

    let Some(output) = output else {
        eprintln!("🎨 {} overlays on {stream}", store.len());
        println!("{}", shell_line(&graph.ffmpeg_args(&input, "out.mp4")));
        return Ok(());
    };

    let args = graph.ffmpeg_args(&input, output);
    debug!("ffmpeg args: {:?}", args);
    eprintln!("🎬 Burning {} overlays into {output}", store.len());

    let status = Command::new("ffmpeg")
        .args(&args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| anyhow!("failed to run ffmpeg: {e}"))?;
    if !status.success() {
        return Err(anyhow!("ffmpeg exited with status: {status}"));
    }

    eprintln!("✅ Wrote {output}");
    Ok(())
}

/// Render an argument list as a copy-pastable shell command.
fn shell_line(args: &[String]) -> String {
    let mut line = String::from("ffmpeg");
    for arg in args {
        line.push(' ');
        if arg.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:=+,".contains(c)) {
            line.push_str(arg);
        } else {
            line.push('\'');
            line.push_str(&arg.replace('\'', r"'\''"));
            line.push('\'');
        }
    }
    line
}
