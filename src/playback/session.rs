//! Playback session state machine.
//!
//! ```text
//! Idle ─attach─► Attaching ─ManifestParsed─► Playing ⇄ Paused
//!                    │                         │
//!                    └──────── errors ─────────┴─► ErrorRecoverable | ErrorFatal
//! ```
//!
//! Live/finite classification is orthogonal and is decided once metadata
//! loads. The session owns the media endpoint exclusively; `attach` takes
//! `&mut self`, so two attaches can never overlap on one session.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::engine::{
    AttachmentId, EngineEvent, ErrorCategory, EventSink, MediaBackend, StreamEngine, TaggedEvent,
};
use super::PlaybackError;
use crate::config::PlaybackConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Attaching,
    Playing,
    Paused,
    ErrorRecoverable,
    ErrorFatal,
}

/// Live vs finite classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContentKind {
    /// Metadata not loaded yet.
    Unknown,
    /// Unbounded duration; seeking is disabled.
    Live,
    Finite { duration: f64 },
}

impl ContentKind {
    fn from_duration(duration: Option<f64>) -> Self {
        match duration {
            Some(d) if d.is_finite() && d > 0.0 => Self::Finite { duration: d },
            Some(d) if d.is_finite() => Self::Unknown,
            _ => Self::Live,
        }
    }

    /// `m:ss`, `LIVE`, or `--:--` before metadata.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Unknown => "--:--".to_string(),
            Self::Live => "LIVE".to_string(),
            Self::Finite { duration } => format_clock(*duration),
        }
    }
}

/// Observable outputs of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub playing: bool,
    pub muted: bool,
    /// 0..=100
    pub volume: u8,
    /// Seconds.
    pub elapsed: f64,
    pub content: ContentKind,
    pub error: Option<String>,
    /// Playing through direct source assignment instead of the adaptive engine.
    pub degraded: bool,
}

/// Format seconds as `m:ss`.
#[must_use]
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

pub struct PlaybackSession<B: MediaBackend> {
    backend: B,
    engine: Option<Box<dyn StreamEngine>>,
    attachment: AttachmentId,
    source: Option<String>,
    state: PlaybackState,
    content: ContentKind,
    muted: bool,
    volume: u8,
    position: f64,
    error: Option<String>,
    media_recovery_attempted: bool,
    degraded: bool,
    attach_timeout: Duration,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<TaggedEvent>>,
}

impl<B: MediaBackend> PlaybackSession<B> {
    pub fn new(mut backend: B, config: &PlaybackConfig) -> Self {
        let volume = config.initial_volume.min(100);
        backend.set_volume(f64::from(volume) / 100.0);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            engine: None,
            attachment: 0,
            source: None,
            state: PlaybackState::Idle,
            content: ContentKind::Unknown,
            muted: false,
            volume,
            position: 0.0,
            error: None,
            media_recovery_attempted: false,
            degraded: false,
            attach_timeout: config.attach_timeout(),
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Receiver for engine events; feed each one back into
    /// [`handle_event`](Self::handle_event). Can be taken once.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<TaggedEvent>> {
        self.events_rx.take()
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn current_attachment(&self) -> AttachmentId {
        self.attachment
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Tear down whatever is attached and attach `url`.
    ///
    /// The previous engine is destroyed before the next one is created.
    pub async fn attach(&mut self, url: &str) -> Result<AttachmentId, PlaybackError> {
        self.release();

        self.attachment += 1;
        let attachment = self.attachment;
        self.source = Some(url.to_string());
        self.state = PlaybackState::Attaching;
        self.content = ContentKind::Unknown;
        self.position = 0.0;
        self.error = None;
        self.media_recovery_attempted = false;
        self.degraded = false;

        let sink = EventSink::new(attachment, self.events_tx.clone());

        if !self.backend.supports_adaptive() {
            warn!(attachment, url, "adaptive streaming unavailable, assigning source directly");
            self.degraded = true;
            self.backend.assign_source(url, sink);
            return Ok(attachment);
        }

        let created =
            tokio::time::timeout(self.attach_timeout, self.backend.create_engine(url, sink)).await;
        match created {
            Ok(Ok(engine)) => {
                self.engine = Some(engine);
                info!(attachment, url, "engine attached");
                Ok(attachment)
            }
            Ok(Err(e)) => {
                let category = e.category();
                if category.is_recoverable() {
                    self.recoverable(category, &e.to_string());
                } else {
                    self.fail(e.to_string());
                }
                Err(e)
            }
            Err(_) => {
                let e = PlaybackError::AttachTimeout(self.attach_timeout);
                self.fail(e.to_string());
                Err(e)
            }
        }
    }

    /// Attach the current source again, e.g. after a network error.
    pub async fn reattach(&mut self) -> Result<AttachmentId, PlaybackError> {
        let url = self.source.clone().ok_or(PlaybackError::NotAttached)?;
        self.attach(&url).await
    }

    /// Release the engine and return to `Idle`.
    pub fn detach(&mut self) {
        self.release();
        self.source = None;
        self.state = PlaybackState::Idle;
        self.content = ContentKind::Unknown;
        self.position = 0.0;
        self.error = None;
        self.degraded = false;
    }

    fn release(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            debug!(attachment = self.attachment, "destroying engine");
            engine.destroy();
        }
        if self.degraded {
            self.backend.clear_source();
        }
    }

    fn fail(&mut self, message: String) {
        warn!(attachment = self.attachment, "{message}");
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
        }
        self.state = PlaybackState::ErrorFatal;
        self.error = Some(message);
    }

    /// Apply an engine event. Events from earlier attachments, or arriving
    /// after a fatal error, are dropped.
    pub fn handle_event(&mut self, tagged: TaggedEvent) {
        if tagged.attachment != self.attachment
            || matches!(self.state, PlaybackState::Idle | PlaybackState::ErrorFatal)
        {
            debug!(
                attachment = tagged.attachment,
                current = self.attachment,
                "dropping stale engine event"
            );
            return;
        }

        match tagged.event {
            EngineEvent::ManifestParsed => {
                if self.state == PlaybackState::Attaching {
                    self.backend.play();
                    self.state = PlaybackState::Playing;
                }
            }
            EngineEvent::MetadataLoaded { duration } => {
                self.content = ContentKind::from_duration(duration);
                if self.state == PlaybackState::Attaching {
                    self.backend.play();
                    self.state = PlaybackState::Playing;
                }
                if self.degraded && self.content == ContentKind::Live {
                    warn!(
                        attachment = self.attachment,
                        "live content on direct source; manifest refresh may stall"
                    );
                }
            }
            EngineEvent::TimeUpdate { position } => {
                self.position = position;
            }
            EngineEvent::Ended => {
                if self.state == PlaybackState::Playing {
                    self.state = PlaybackState::Paused;
                }
            }
            EngineEvent::Error { category, details } => self.on_error(category, &details),
        }
    }

    fn on_error(&mut self, category: ErrorCategory, details: &str) {
        if category == ErrorCategory::Media && !self.media_recovery_attempted {
            self.media_recovery_attempted = true;
            warn!(attachment = self.attachment, details, "media error, attempting recovery");
            if let Some(engine) = self.engine.as_mut() {
                engine.recover_media_error();
            }
        } else if category.is_recoverable() {
            self.recoverable(category, details);
        } else {
            self.fail(format!("Fatal playback error ({category:?}): {details}"));
        }
    }

    /// Stop in `ErrorRecoverable`; a reattach resumes playback.
    fn recoverable(&mut self, category: ErrorCategory, details: &str) {
        warn!(attachment = self.attachment, ?category, details, "recoverable playback error");
        self.state = PlaybackState::ErrorRecoverable;
        self.error = Some(match category {
            ErrorCategory::Network => {
                format!("Network error: {details}. Reattach the stream to resume playback.")
            }
            _ => format!("Media error: {details}"),
        });
    }

    /// Returns the new playing flag.
    pub fn toggle_play_pause(&mut self) -> bool {
        match self.state {
            PlaybackState::Playing => {
                self.backend.pause();
                self.state = PlaybackState::Paused;
            }
            PlaybackState::Paused => {
                self.backend.play();
                self.state = PlaybackState::Playing;
            }
            _ => {}
        }
        self.state == PlaybackState::Playing
    }

    /// Returns the new mute flag.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.backend.set_muted(self.muted);
        self.muted
    }

    /// Set volume in percent (clamped to 100). Raising the volume above
    /// zero while muted unmutes.
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        self.backend.set_volume(f64::from(self.volume) / 100.0);
        if self.volume > 0 && self.muted {
            self.muted = false;
            self.backend.set_muted(false);
        }
    }

    /// Seek to `fraction` (0.0..=1.0) of a finite duration. No-op for live
    /// or not-yet-classified content.
    pub fn seek(&mut self, fraction: f64) {
        let ContentKind::Finite { duration } = self.content else {
            debug!(content = ?self.content, "seek ignored");
            return;
        };
        if !fraction.is_finite() {
            return;
        }
        let position = fraction.clamp(0.0, 1.0) * duration;
        self.backend.seek(position);
        self.position = position;
    }

    #[must_use]
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state,
            playing: self.state == PlaybackState::Playing,
            muted: self.muted,
            volume: self.volume,
            elapsed: self.position,
            content: self.content,
            error: self.error.clone(),
            degraded: self.degraded,
        }
    }
}

impl<B: MediaBackend> Drop for PlaybackSession<B> {
    fn drop(&mut self) {
        self.release();
    }
}
