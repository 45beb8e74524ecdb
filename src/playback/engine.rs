//! Seam between [`PlaybackSession`](super::PlaybackSession) and the media
//! element / adaptive-streaming library that actually decodes video.
//!
//! A [`MediaBackend`] owns the single media endpoint. When it supports
//! adaptive streaming natively it hands out one [`StreamEngine`] per
//! attachment; engines report lifecycle signals through an [`EventSink`]
//! tagged with the attachment they belong to.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::PlaybackError;

/// Monotonic identifier of one `attach` call within a session.
pub type AttachmentId = u64;

/// Error category reported by the streaming engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Manifest/segment loading failed.
    Network,
    /// Decoding or buffer append failed.
    Media,
    /// Remuxing failed.
    Mux,
    /// DRM/key acquisition failed.
    KeySystem,
    Other,
}

impl ErrorCategory {
    /// Network and media errors can be recovered without discarding the
    /// session; everything else is fatal.
    #[must_use]
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::Network | Self::Media)
    }
}

/// Lifecycle signal from the engine or media element.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The manifest was loaded and playback can begin.
    ManifestParsed,
    /// Media metadata is known. `None` or a non-finite value means the
    /// content has no bounded duration (live).
    MetadataLoaded { duration: Option<f64> },
    /// Playback position in seconds.
    TimeUpdate { position: f64 },
    /// Finite content reached its end.
    Ended,
    Error {
        category: ErrorCategory,
        details: String,
    },
}

/// An [`EngineEvent`] tagged with the attachment that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEvent {
    pub attachment: AttachmentId,
    pub event: EngineEvent,
}

/// Where an engine publishes its events.
#[derive(Debug, Clone)]
pub struct EventSink {
    attachment: AttachmentId,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl EventSink {
    pub(crate) fn new(attachment: AttachmentId, tx: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self { attachment, tx }
    }

    #[must_use]
    pub fn attachment(&self) -> AttachmentId {
        self.attachment
    }

    /// Publish an event. Returns `false` once the session is gone.
    pub fn emit(&self, event: EngineEvent) -> bool {
        self.tx
            .send(TaggedEvent {
                attachment: self.attachment,
                event,
            })
            .is_ok()
    }
}

/// One streaming-engine instance bound to one playable URL.
pub trait StreamEngine: Send {
    /// Ask the engine to recover from a media error in place.
    fn recover_media_error(&mut self);

    /// Release all decode resources. The engine is unusable afterwards.
    fn destroy(&mut self);
}

/// The media endpoint a session drives.
#[async_trait]
pub trait MediaBackend: Send {
    /// Whether adaptive streaming is available; otherwise the session falls
    /// back to [`assign_source`](Self::assign_source).
    fn supports_adaptive(&self) -> bool;

    /// Load `url` into a new engine attached to the media endpoint.
    async fn create_engine(
        &mut self,
        url: &str,
        events: EventSink,
    ) -> Result<Box<dyn StreamEngine>, PlaybackError>;

    /// Point the media endpoint straight at `url` (degraded fallback).
    fn assign_source(&mut self, url: &str, events: EventSink);

    /// Drop any directly assigned source.
    fn clear_source(&mut self);

    fn play(&mut self);

    fn pause(&mut self);

    fn set_muted(&mut self, muted: bool);

    /// `volume` in 0.0..=1.0
    fn set_volume(&mut self, volume: f64);

    /// Jump to `position` seconds.
    fn seek(&mut self, position: f64);
}
