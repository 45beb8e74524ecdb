//! `Livelay` - live stream playback with repositionable overlays
//!
//! # Features
//!
//! - **Stream lifecycle**: submit a source URL, poll until the HLS manifest is ready, cancel at any time
//! - **Playback**: attach/detach state machine with recoverable vs fatal error handling
//! - **Overlays**: text labels, images and alert cards, persisted per stream with optimistic writes
//! - **Rendering**: one exhaustive render site compiling overlays to an ffmpeg filter graph
//!
//! # Example
//!
//! ```rust,no_run
//! use livelay::{CompositionSurface, Config, HeadlessBackend, SurfaceEvent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let mut surface = CompositionSurface::connect(&config, HeadlessBackend::new()?)?;
//!     surface
//!         .dispatch(SurfaceEvent::StartStream {
//!             source_url: "rtsp://camera.local/feed".to_string(),
//!         })
//!         .await;
//!     if let Some(active) = surface.active_stream() {
//!         println!("Playing {}", active.playable_url);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod overlay;
pub mod playback;
pub mod stream;
pub mod surface;

pub use api::{ApiError, BackendClient, OverlayApi, StreamApi};
pub use config::Config;
pub use overlay::{
    Geometry, NewOverlay, Overlay, OverlayContent, OverlayStore, OverlaySyncAdapter, SyncError,
    TextStyle,
};
pub use playback::{
    format_clock, HeadlessBackend, MediaBackend, PlaybackError, PlaybackSession, PlaybackSnapshot,
    PlaybackState,
};
pub use stream::{StartedStream, Stream, StreamError, StreamLifecycleController};
pub use surface::{CompositionSurface, Notice, NoticeLevel, StartCanceller, SurfaceEvent};

/// Version of livelay
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
