use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};

use livelay::playback::{EngineEvent, HeadlessBackend};
use livelay::{format_clock, CompositionSurface, Config, PlaybackState, SurfaceEvent};

use super::{on_ctrl_c, print_notices};

/// Reattach attempts after recoverable errors before giving up.
const MAX_REATTACH: u32 = 3;

const REATTACH_DELAY: Duration = Duration::from_secs(1);

pub enum WatchTarget {
    Stream(String),
    Source(String),
}

pub async fn cmd_probe(url: &str) -> Result<()> {
    let backend = HeadlessBackend::new()?;
    let (media_url, playlist) = backend.probe(url).await?;

    if media_url != url {
        println!("Variant:   {media_url}");
    }
    println!("Segments:  {}", playlist.segments.len());
    println!("Target:    {:.1}s", playlist.target_duration);
    match playlist.reported_duration() {
        Some(duration) => println!("Duration:  {} (finite)", format_clock(duration)),
        None => println!("Duration:  LIVE (window {})", format_clock(playlist.total_duration())),
    }
    Ok(())
}

pub async fn cmd_watch(config: &Config, target: WatchTarget, duration: Option<u64>) -> Result<()> {
    let mut surface = CompositionSurface::connect(config, HeadlessBackend::new()?)?;
    let mut events = surface
        .take_engine_events()
        .context("engine events already taken")?;

    let first = match target {
        WatchTarget::Source(source_url) => {
            eprintln!("🎬 Starting: {source_url} (Ctrl-C to cancel)");
            SurfaceEvent::StartStream { source_url }
        }
        WatchTarget::Stream(stream_id) => SurfaceEvent::SelectStream { stream_id },
    };
    let guard = on_ctrl_c({
        let canceller = surface.canceller();
        move || canceller.cancel()
    });
    surface.dispatch(first).await;
    guard.abort();

    let failed = print_notices(&surface.take_notices());
    let Some(active) = surface.active_stream() else {
        if failed {
            anyhow::bail!("no stream to watch");
        }
        return Ok(());
    };
    eprintln!("📺 Watching {} ({})", active.stream_id, active.playable_url);
    eprintln!("   {} overlays", surface.overlays().len());

    let limit = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(limit);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut reattached = 0u32;

    if keep_alive(&mut surface, &mut reattached).await {
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                () = &mut limit => break,
                Some(tagged) = events.recv() => {
                    let ended = tagged.event == EngineEvent::Ended;
                    surface.dispatch(SurfaceEvent::Engine(tagged)).await;
                    print_notices(&surface.take_notices());
                    if !keep_alive(&mut surface, &mut reattached).await || ended {
                        break;
                    }
                }
                _ = ticker.tick() => status_line(&surface),
            }
        }
    }

    eprintln!();
    let snapshot = surface.playback();
    if let Some(error) = snapshot.error {
        anyhow::bail!(error);
    }
    eprintln!("⏹️  Stopped at {}", format_clock(snapshot.elapsed));
    Ok(())
}

/// Reattach after recoverable errors, up to [`MAX_REATTACH`] times in
/// total. Returns `false` once playback cannot continue.
async fn keep_alive(
    surface: &mut CompositionSurface<HeadlessBackend>,
    reattached: &mut u32,
) -> bool {
    loop {
        match surface.playback().state {
            PlaybackState::ErrorFatal => return false,
            PlaybackState::ErrorRecoverable if *reattached < MAX_REATTACH => {
                *reattached += 1;
                eprintln!("🔁 Reattaching ({reattached}/{MAX_REATTACH})");
                tokio::time::sleep(REATTACH_DELAY).await;
                surface.dispatch(SurfaceEvent::Reattach).await;
                print_notices(&surface.take_notices());
            }
            PlaybackState::ErrorRecoverable => return false,
            _ => return true,
        }
    }
}

fn status_line(surface: &CompositionSurface<HeadlessBackend>) {
    let s = surface.playback();
    let icon = match s.state {
        PlaybackState::Playing => "▶",
        PlaybackState::Paused => "⏸",
        PlaybackState::Attaching => "…",
        PlaybackState::Idle => "■",
        PlaybackState::ErrorRecoverable | PlaybackState::ErrorFatal => "✖",
    };
    let volume = if s.muted { "muted".to_string() } else { format!("vol {}", s.volume) };
    let degraded = if s.degraded { " (direct)" } else { "" };
    eprint!(
        "\r{icon} {} / {}  {volume}  {} overlays{degraded}   ",
        format_clock(s.elapsed),
        s.content.display(),
        surface.overlays().len()
    );
    let _ = std::io::stderr().flush();
}
