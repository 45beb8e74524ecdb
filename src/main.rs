//! `Livelay` CLI - start, watch and annotate live streams

mod cmd;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use livelay::{Config, Geometry, TextStyle};

#[derive(Parser)]
#[command(name = "livelay")]
#[command(about = "Live stream playback with repositionable overlays")]
#[command(version)]
struct Cli {
    /// API base URL (overrides config file and LIVELAY_API_URL)
    #[arg(long, global = true)]
    api: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a stream from a source URL and wait until it is playable
    Start {
        /// Source URL (e.g. rtsp://camera.local/feed)
        source: String,
    },

    /// List streams known to the backend
    Streams,

    /// Stop a stream
    Stop {
        /// Stream ID
        id: String,
    },

    /// Pause a stream
    Pause {
        /// Stream ID
        id: String,
    },

    /// Resume a paused stream
    Resume {
        /// Stream ID
        id: String,
    },

    /// Check backend health
    Health,

    /// List overlays of a stream
    Overlays {
        /// Stream ID
        stream: String,

        /// Print raw JSON records
        #[arg(long)]
        json: bool,
    },

    /// Create, move, resize or delete overlays
    Overlay {
        #[command(subcommand)]
        action: OverlayAction,
    },

    /// List built-in overlay presets
    Presets,

    /// Compile a stream's overlays into an ffmpeg filter graph
    Render {
        /// Stream ID
        stream: String,

        /// Video input (defaults to the stream's playable URL)
        #[arg(short, long)]
        input: Option<String>,

        /// Burn overlays into this file by running ffmpeg
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Fetch an HLS manifest and report live/finite classification
    Probe {
        /// Manifest URL
        url: String,
    },

    /// Attach to a stream and report playback until it ends or Ctrl-C
    Watch {
        /// Stream ID of an existing stream
        #[arg(required_unless_present = "source", conflicts_with = "source")]
        stream: Option<String>,

        /// Start a new stream from this source first
        #[arg(long)]
        source: Option<String>,

        /// Stop watching after this many seconds
        #[arg(short, long)]
        duration: Option<u64>,
    },
}

#[derive(Subcommand)]
enum OverlayAction {
    /// Add a text label
    AddText {
        /// Stream ID
        stream: String,
        /// Label text
        text: String,
        /// alert, warning, safe or live
        #[arg(short, long, default_value = "alert")]
        style: TextStyle,
        #[command(flatten)]
        geometry: GeometryArgs,
    },

    /// Add an image
    AddImage {
        /// Stream ID
        stream: String,
        /// Image URL
        image_url: String,
        #[command(flatten)]
        geometry: GeometryArgs,
    },

    /// Add an overlay from a built-in preset (see `livelay presets`)
    AddPreset {
        /// Stream ID
        stream: String,
        /// Preset ID
        preset: String,
        #[command(flatten)]
        geometry: GeometryArgs,
    },

    /// Move an overlay
    Move {
        /// Stream ID
        stream: String,
        /// Overlay ID
        id: String,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },

    /// Resize (and optionally move) an overlay
    Resize {
        /// Stream ID
        stream: String,
        /// Overlay ID
        id: String,
        width: f64,
        height: f64,
        #[arg(long, allow_negative_numbers = true)]
        x: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        y: Option<f64>,
    },

    /// Delete an overlay
    Delete {
        /// Stream ID
        stream: String,
        /// Overlay ID
        id: String,
    },
}

/// Placement overrides for new overlays.
#[derive(Args, Clone, Copy)]
struct GeometryArgs {
    #[arg(long, allow_negative_numbers = true)]
    x: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    y: Option<f64>,
    #[arg(long)]
    width: Option<f64>,
    #[arg(long)]
    height: Option<f64>,
    /// Paint order; higher is on top
    #[arg(long)]
    z_index: Option<i32>,
}

impl GeometryArgs {
    fn apply(self, base: Geometry) -> Geometry {
        Geometry::new(
            self.x.unwrap_or(base.x),
            self.y.unwrap_or(base.y),
            self.width.unwrap_or(base.width),
            self.height.unwrap_or(base.height),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "livelay=debug" } else { "livelay=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut config = Config::load()?;
    if let Some(api) = cli.api {
        config.api.base_url = api;
    }

    match cli.command {
        Commands::Start { source } => cmd::stream::cmd_start(&config, &source).await?,
        Commands::Streams => cmd::stream::cmd_streams(&config).await?,
        Commands::Stop { id } => cmd::stream::cmd_control(&config, "stop", &id).await?,
        Commands::Pause { id } => cmd::stream::cmd_control(&config, "pause", &id).await?,
        Commands::Resume { id } => cmd::stream::cmd_control(&config, "resume", &id).await?,
        Commands::Health => cmd::stream::cmd_health(&config).await?,
        Commands::Overlays { stream, json } => {
            cmd::overlay::cmd_overlays(&config, &stream, json).await?;
        }
        Commands::Overlay { action } => run_overlay_action(&config, action).await?,
        Commands::Presets => cmd::overlay::cmd_presets(),
        Commands::Render {
            stream,
            input,
            output,
        } => cmd::render::cmd_render(&config, &stream, input.as_deref(), output.as_deref()).await?,
        Commands::Probe { url } => cmd::watch::cmd_probe(&url).await?,
        Commands::Watch {
            stream,
            source,
            duration,
        } => {
            let target = match (stream, source) {
                (_, Some(source)) => cmd::watch::WatchTarget::Source(source),
                (Some(stream), None) => cmd::watch::WatchTarget::Stream(stream),
                (None, None) => anyhow::bail!("either a stream ID or --source is required"),
            };
            cmd::watch::cmd_watch(&config, target, duration).await?;
        }
    }

    Ok(())
}

async fn run_overlay_action(config: &Config, action: OverlayAction) -> Result<()> {
    use cmd::overlay::{cmd_add, cmd_delete, cmd_move, cmd_resize};
    use livelay::overlay::presets;
    use livelay::NewOverlay;

    match action {
        OverlayAction::AddText {
            stream,
            text,
            style,
            geometry,
        } => cmd_add(config, &stream, with_placement(NewOverlay::text(text, style), geometry)).await,
        OverlayAction::AddImage {
            stream,
            image_url,
            geometry,
        } => cmd_add(config, &stream, with_placement(NewOverlay::image(image_url), geometry)).await,
        OverlayAction::AddPreset {
            stream,
            preset,
            geometry,
        } => {
            let Some(found) = presets::find(&preset) else {
                anyhow::bail!("unknown preset: {preset} (see `livelay presets`)");
            };
            cmd_add(config, &stream, with_placement(found.instantiate(), geometry)).await
        }
        OverlayAction::Move { stream, id, x, y } => cmd_move(config, &stream, &id, x, y).await,
        OverlayAction::Resize {
            stream,
            id,
            width,
            height,
            x,
            y,
        } => cmd_resize(config, &stream, &id, (x, y), width, height).await,
        OverlayAction::Delete { stream, id } => cmd_delete(config, &stream, &id).await,
    }
}

fn with_placement(new: livelay::NewOverlay, args: GeometryArgs) -> livelay::NewOverlay {
    let geometry = args.apply(new.geometry);
    let new = new.with_geometry(geometry);
    match args.z_index {
        Some(z) => new.with_z_index(z),
        None => new,
    }
}
