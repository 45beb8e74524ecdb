use anyhow::{Context, Result};

use livelay::overlay::{presets, Overlay, OverlayContent};
use livelay::{Config, Geometry, NewOverlay, OverlayApi, OverlaySyncAdapter};

use super::backend;

/// Adapter with `stream`'s overlays loaded.
async fn adapter_for(config: &Config, stream: &str) -> Result<OverlaySyncAdapter> {
    let client = backend(config)?;
    let mut adapter = OverlaySyncAdapter::new(client);
    adapter.load_for_stream(stream).await?;
    Ok(adapter)
}

fn describe(overlay: &Overlay) -> String {
    match &overlay.content {
        OverlayContent::Text { text, style } => format!("\"{text}\" ({style})", style = style.as_str()),
        OverlayContent::Image { image_url } => image_url.clone(),
        OverlayContent::AlertCard { data } => {
            let alerts = data.stats.iter().filter(|s| s.alert_flag).count();
            format!("{} [{} stats, {alerts} alerting]", data.title, data.stats.len())
        }
    }
}

pub async fn cmd_overlays(config: &Config, stream: &str, json: bool) -> Result<()> {
    let client = backend(config)?;
    let overlays = client.list_overlays(stream).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&overlays)?);
        return Ok(());
    }
    if overlays.is_empty() {
        println!("No overlays on {stream}");
        return Ok(());
    }

    println!("{:<38} {:<11} {:>16} {:>5}  CONTENT", "ID", "TYPE", "RECT", "Z");
    for overlay in &overlays {
        let g = overlay.geometry;
        let rect = format!("{}x{}+{}+{}", g.width, g.height, g.x, g.y);
        println!(
            "{:<38} {:<11} {rect:>16} {:>5}  {}",
            overlay.id,
            overlay.kind(),
            overlay.z_index,
            describe(overlay)
        );
    }
    Ok(())
}

pub async fn cmd_add(config: &Config, stream: &str, new: NewOverlay) -> Result<()> {
    let mut adapter = adapter_for(config, stream).await?;
    let created = adapter.add(new).await?;
    eprintln!("✅ Added {} overlay: {}", created.kind(), describe(&created));
    println!("{}", created.id);
    Ok(())
}

pub async fn cmd_move(config: &Config, stream: &str, id: &str, x: f64, y: f64) -> Result<()> {
    let mut adapter = adapter_for(config, stream).await?;
    if adapter.store().get(id).is_none() {
        anyhow::bail!("no overlay {id} on stream {stream}");
    }
    adapter.move_to(id, x, y).await?;
    println!("✅ Moved {id} to ({x}, {y})");
    Ok(())
}

pub async fn cmd_resize(
    config: &Config,
    stream: &str,
    id: &str,
    position: (Option<f64>, Option<f64>),
    width: f64,
    height: f64,
) -> Result<()> {
    let mut adapter = adapter_for(config, stream).await?;
    let current = adapter
        .store()
        .get(id)
        .map(|o| o.geometry)
        .with_context(|| format!("no overlay {id} on stream {stream}"))?;

    let geometry = Geometry::new(
        position.0.unwrap_or(current.x),
        position.1.unwrap_or(current.y),
        width,
        height,
    );
    if !geometry.has_area() {
        anyhow::bail!("width and height must be positive");
    }
    adapter.resize(id, geometry).await?;
    println!("✅ Resized {id} to {width}x{height}");
    Ok(())
}

pub async fn cmd_delete(config: &Config, stream: &str, id: &str) -> Result<()> {
    let mut adapter = adapter_for(config, stream).await?;
    if adapter.store().get(id).is_none() {
        anyhow::bail!("no overlay {id} on stream {stream}");
    }
    adapter.delete(id).await?;
    println!("🗑️  Deleted {id}");
    Ok(())
}

pub fn cmd_presets() {
    println!("{:<16} {:<28} DESCRIPTION", "ID", "NAME");
    for preset in presets::all() {
        println!("{:<16} {:<28} {}", preset.id(), preset.name(), preset.description());
    }
}
