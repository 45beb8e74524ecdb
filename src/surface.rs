//! Composition surface: the one dispatch point for user gestures and
//! engine events.
//!
//! The surface owns the active stream identity and sequences its
//! collaborators; everything else lives in the [`StreamLifecycleController`],
//! the [`PlaybackSession`] and the [`OverlaySyncAdapter`]. Failures never
//! escape [`dispatch`](CompositionSurface::dispatch): they become
//! [`Notice`]s for the caller to show.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::BackendClient;
use crate::config::Config;
use crate::overlay::{compose, Geometry, Layer, NewOverlay, Overlay, OverlayStore, OverlaySyncAdapter};
use crate::playback::{MediaBackend, PlaybackSession, PlaybackSnapshot, TaggedEvent};
use crate::stream::{StartedStream, Stream, StreamError, StreamLifecycleController};

/// A user action or engine signal.
#[derive(Debug, Clone)]
pub enum SurfaceEvent {
    StartStream { source_url: String },
    SelectStream { stream_id: String },
    RefreshStreams,
    StopStream { stream_id: String },
    PauseStream { stream_id: String },
    ResumeStream { stream_id: String },
    AddOverlay(NewOverlay),
    DragEnd { id: String, x: f64, y: f64 },
    ResizeEnd { id: String, geometry: Geometry },
    DeleteOverlay { id: String },
    EditOverlay(Overlay),
    Engine(TaggedEvent),
    TogglePlayPause,
    ToggleMute,
    SetVolume(u8),
    Seek(f64),
    Reattach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Something to show the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Cancels the start currently waiting for readiness. Cheap to clone and
/// usable while the surface is busy inside `dispatch`.
#[derive(Debug, Clone, Default)]
pub struct StartCanceller {
    current: Arc<Mutex<CancellationToken>>,
}

impl StartCanceller {
    pub fn cancel(&self) {
        if let Ok(token) = self.current.lock() {
            token.cancel();
        }
    }

    /// Cancel any pending start and hand out a token for the next one.
    fn renew(&self) -> CancellationToken {
        let fresh = CancellationToken::new();
        if let Ok(mut token) = self.current.lock() {
            token.cancel();
            *token = fresh.clone();
        }
        fresh
    }
}

pub struct CompositionSurface<B: MediaBackend> {
    streams: StreamLifecycleController,
    playback: PlaybackSession<B>,
    overlays: OverlaySyncAdapter,
    active: Option<StartedStream>,
    canceller: StartCanceller,
    notices: Vec<Notice>,
}

impl<B: MediaBackend> CompositionSurface<B> {
    pub fn new(
        streams: StreamLifecycleController,
        playback: PlaybackSession<B>,
        overlays: OverlaySyncAdapter,
    ) -> Self {
        Self {
            streams,
            playback,
            overlays,
            active: None,
            canceller: StartCanceller::default(),
            notices: Vec::new(),
        }
    }

    /// Wire every component to one [`BackendClient`].
    pub fn connect(config: &Config, backend: B) -> crate::api::Result<Self> {
        let client = Arc::new(BackendClient::new(&config.api)?);
        let streams =
            StreamLifecycleController::new(client.clone(), &config.api.base_url, &config.polling);
        let playback = PlaybackSession::new(backend, &config.playback);
        let overlays = OverlaySyncAdapter::new(client);
        Ok(Self::new(streams, playback, overlays))
    }

    #[must_use]
    pub fn canceller(&self) -> StartCanceller {
        self.canceller.clone()
    }

    /// Engine event stream; forward each item as [`SurfaceEvent::Engine`].
    pub fn take_engine_events(&mut self) -> Option<mpsc::UnboundedReceiver<TaggedEvent>> {
        self.playback.take_events()
    }

    #[must_use]
    pub fn active_stream(&self) -> Option<&StartedStream> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn streams(&self) -> &[Stream] {
        self.streams.known_streams()
    }

    #[must_use]
    pub fn overlays(&self) -> &OverlayStore {
        self.overlays.store()
    }

    /// Overlays in paint order, ready to draw.
    #[must_use]
    pub fn layers(&self) -> Vec<Layer> {
        compose(self.overlays.store())
    }

    #[must_use]
    pub fn playback(&self) -> PlaybackSnapshot {
        self.playback.snapshot()
    }

    /// Drain pending notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub async fn dispatch(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::StartStream { source_url } => self.start(&source_url).await,
            SurfaceEvent::SelectStream { stream_id } => self.select(&stream_id).await,
            SurfaceEvent::RefreshStreams => {
                if let Err(e) = self.streams.list().await {
                    self.notify(NoticeLevel::Warning, e.to_string());
                }
            }
            SurfaceEvent::StopStream { stream_id } => self.stop(&stream_id).await,
            SurfaceEvent::PauseStream { stream_id } => {
                if let Err(e) = self.streams.pause(&stream_id).await {
                    self.notify(NoticeLevel::Error, e.to_string());
                }
            }
            SurfaceEvent::ResumeStream { stream_id } => {
                if let Err(e) = self.streams.resume(&stream_id).await {
                    self.notify(NoticeLevel::Error, e.to_string());
                }
            }
            SurfaceEvent::AddOverlay(new) => match self.overlays.add(new).await {
                Ok(created) => {
                    self.notify(NoticeLevel::Info, format!("{} overlay added", created.kind()));
                }
                Err(e) => self.notify(NoticeLevel::Error, e.to_string()),
            },
            SurfaceEvent::DragEnd { id, x, y } => {
                let result = self.overlays.move_to(&id, x, y).await;
                self.sync_notice(result);
            }
            SurfaceEvent::ResizeEnd { id, geometry } => {
                let result = self.overlays.resize(&id, geometry).await;
                self.sync_notice(result);
            }
            SurfaceEvent::DeleteOverlay { id } => {
                let result = self.overlays.delete(&id).await;
                self.sync_notice(result);
            }
            SurfaceEvent::EditOverlay(overlay) => {
                let result = self.overlays.edit(overlay).await;
                self.sync_notice(result);
            }
            SurfaceEvent::Engine(tagged) => {
                let before = self.playback.snapshot().error;
                self.playback.handle_event(tagged);
                let after = self.playback.snapshot().error;
                if after.is_some() && after != before {
                    self.notify(NoticeLevel::Error, after.unwrap_or_default());
                }
            }
            SurfaceEvent::TogglePlayPause => {
                self.playback.toggle_play_pause();
            }
            SurfaceEvent::ToggleMute => {
                self.playback.toggle_mute();
            }
            SurfaceEvent::SetVolume(volume) => self.playback.set_volume(volume),
            SurfaceEvent::Seek(fraction) => self.playback.seek(fraction),
            SurfaceEvent::Reattach => {
                if let Err(e) = self.playback.reattach().await {
                    self.notify(NoticeLevel::Error, e.to_string());
                }
            }
        }
    }

    async fn start(&mut self, source_url: &str) {
        let token = self.canceller.renew();
        match self.streams.start(source_url, &token).await {
            // a start abandoned while its last request was in flight must
            // not replace the active stream
            Ok(_) if token.is_cancelled() => {
                debug!(source_url, "late readiness for a cancelled start ignored");
            }
            Ok(started) => {
                self.activate(started).await;
                self.streams.list_or_empty().await;
            }
            Err(StreamError::Cancelled) => {
                self.notify(NoticeLevel::Info, "stream start cancelled".to_string());
            }
            Err(e) => self.notify(NoticeLevel::Error, e.to_string()),
        }
    }

    async fn select(&mut self, stream_id: &str) {
        let mut selected = self.streams.select(stream_id);
        if matches!(selected, Err(StreamError::UnknownStream(_))) {
            self.streams.list_or_empty().await;
            selected = self.streams.select(stream_id);
        }
        match selected {
            Ok(started) => self.activate(started).await,
            Err(e) => self.notify(NoticeLevel::Error, e.to_string()),
        }
    }

    async fn activate(&mut self, started: StartedStream) {
        info!(stream_id = %started.stream_id, url = %started.playable_url, "activating stream");
        let url = started.playable_url.clone();
        let stream_id = started.stream_id.clone();
        self.active = Some(started);

        if let Err(e) = self.playback.attach(&url).await {
            self.notify(NoticeLevel::Error, e.to_string());
        }
        if let Err(e) = self.overlays.load_for_stream(&stream_id).await {
            self.notify(NoticeLevel::Warning, e.to_string());
        }
    }

    async fn stop(&mut self, stream_id: &str) {
        if let Err(e) = self.streams.stop(stream_id).await {
            self.notify(NoticeLevel::Error, e.to_string());
            return;
        }
        if self.active.as_ref().is_some_and(|a| a.stream_id == stream_id) {
            self.active = None;
            self.playback.detach();
            self.overlays.clear();
        }
    }

    fn sync_notice(&mut self, result: crate::overlay::sync::Result<()>) {
        if let Err(e) = result {
            self.notify(NoticeLevel::Warning, e.to_string());
        }
    }

    fn notify(&mut self, level: NoticeLevel, message: String) {
        match level {
            NoticeLevel::Error | NoticeLevel::Warning => warn!("{message}"),
            NoticeLevel::Info => debug!("{message}"),
        }
        self.notices.push(Notice { level, message });
    }
}
