//! Headless media backend.
//!
//! Plays nothing on screen: it fetches the HLS manifest, classifies it,
//! and drives the session with the same lifecycle events a real player
//! would emit. Live playlists are refreshed at half the target duration
//! and each batch of new segments advances the playback position.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::engine::{EngineEvent, ErrorCategory, EventSink, MediaBackend, StreamEngine};
use super::manifest::{MediaPlaylist, Playlist};
use super::PlaybackError;

/// Transport flags shared between the backend and its driver task.
#[derive(Debug, Default)]
struct Transport {
    playing: AtomicBool,
    seek_to: Mutex<Option<f64>>,
}

impl Transport {
    fn playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn take_seek(&self) -> Option<f64> {
        self.seek_to.lock().ok().and_then(|mut s| s.take())
    }

    /// Forget transport state left over from the previous attachment.
    fn reset(&self) {
        self.playing.store(false, Ordering::SeqCst);
        if let Ok(mut seek) = self.seek_to.lock() {
            *seek = None;
        }
    }
}

pub struct HeadlessBackend {
    client: Client,
    transport: Arc<Transport>,
    direct: Option<JoinHandle<()>>,
}

impl HeadlessBackend {
    pub fn new() -> Result<Self, PlaybackError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| PlaybackError::AttachFailed {
                url: String::new(),
                reason: e.to_string(),
                category: ErrorCategory::Other,
            })?;

        Ok(Self {
            client,
            transport: Arc::new(Transport::default()),
            direct: None,
        })
    }

    /// Fetch `url`, following a master playlist to its best variant.
    /// Returns the media playlist URL and its parsed contents.
    pub async fn probe(&self, url: &str) -> Result<(String, MediaPlaylist), PlaybackError> {
        probe(&self.client, url).await
    }

    fn spawn_driver(&self, url: String, playlist: MediaPlaylist, events: EventSink) -> JoinHandle<()> {
        tokio::spawn(drive(
            self.client.clone(),
            url,
            playlist,
            events,
            Arc::clone(&self.transport),
        ))
    }
}

struct HeadlessEngine {
    driver: Option<JoinHandle<()>>,
}

impl StreamEngine for HeadlessEngine {
    fn recover_media_error(&mut self) {
        // nothing is decoded, so there is no buffer to flush
        debug!("headless engine: media recovery requested");
    }

    fn destroy(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

impl Drop for HeadlessEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[async_trait]
impl MediaBackend for HeadlessBackend {
    fn supports_adaptive(&self) -> bool {
        true
    }

    async fn create_engine(
        &mut self,
        url: &str,
        events: EventSink,
    ) -> Result<Box<dyn StreamEngine>, PlaybackError> {
        self.transport.reset();
        let (media_url, playlist) = self.probe(url).await?;
        info!(
            attachment = events.attachment(),
            segments = playlist.segments.len(),
            live = playlist.is_live,
            "manifest loaded"
        );

        events.emit(EngineEvent::ManifestParsed);
        events.emit(EngineEvent::MetadataLoaded {
            duration: playlist.reported_duration(),
        });

        let driver = self.spawn_driver(media_url, playlist, events);
        Ok(Box::new(HeadlessEngine {
            driver: Some(driver),
        }))
    }

    fn assign_source(&mut self, url: &str, events: EventSink) {
        self.clear_source();
        self.transport.reset();
        let client = self.client.clone();
        let transport = Arc::clone(&self.transport);
        let url = url.to_string();
        self.direct = Some(tokio::spawn(async move {
            match probe(&client, &url).await {
                Ok((media_url, playlist)) => {
                    events.emit(EngineEvent::MetadataLoaded {
                        duration: playlist.reported_duration(),
                    });
                    drive(client, media_url, playlist, events, transport).await;
                }
                Err(e) => {
                    events.emit(EngineEvent::Error {
                        category: e.category(),
                        details: e.to_string(),
                    });
                }
            }
        }));
    }

    fn clear_source(&mut self) {
        if let Some(task) = self.direct.take() {
            task.abort();
        }
    }

    fn play(&mut self) {
        self.transport.playing.store(true, Ordering::SeqCst);
    }

    fn pause(&mut self) {
        self.transport.playing.store(false, Ordering::SeqCst);
    }

    fn set_muted(&mut self, muted: bool) {
        debug!(muted, "headless: mute changed");
    }

    fn set_volume(&mut self, volume: f64) {
        debug!(volume, "headless: volume changed");
    }

    fn seek(&mut self, position: f64) {
        if let Ok(mut seek) = self.transport.seek_to.lock() {
            *seek = Some(position);
        }
    }
}

impl Drop for HeadlessBackend {
    fn drop(&mut self) {
        self.clear_source();
    }
}

/// Transport and HTTP status failures are `Network`; a body that is not a
/// playlist is `Other`.
async fn fetch_playlist(client: &Client, url: &str) -> Result<Playlist, (ErrorCategory, String)> {
    let network = |reason: String| (ErrorCategory::Network, reason);
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| network(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(network(format!("failed to fetch playlist: {}", resp.status())));
    }
    let content = resp.text().await.map_err(|e| network(e.to_string()))?;
    Playlist::parse(&content, url).map_err(|reason| (ErrorCategory::Other, reason))
}

async fn probe(client: &Client, url: &str) -> Result<(String, MediaPlaylist), PlaybackError> {
    let failed = |(category, reason): (ErrorCategory, String)| PlaybackError::AttachFailed {
        url: url.to_string(),
        reason,
        category,
    };

    match fetch_playlist(client, url).await.map_err(failed)? {
        Playlist::Media(playlist) => Ok((url.to_string(), playlist)),
        Playlist::Master(variants) => {
            let best = variants.first().ok_or_else(|| {
                failed((
                    ErrorCategory::Other,
                    "master playlist has no variants".to_string(),
                ))
            })?;
            debug!(height = best.height, bandwidth = best.bandwidth, "selected variant");
            match fetch_playlist(client, &best.uri).await.map_err(failed)? {
                Playlist::Media(playlist) => Ok((best.uri.clone(), playlist)),
                Playlist::Master(_) => Err(failed((
                    ErrorCategory::Other,
                    "nested master playlist".to_string(),
                ))),
            }
        }
    }
}

/// Emit time updates until the content ends, the session goes away, or a
/// refresh fails.
async fn drive(
    client: Client,
    url: String,
    playlist: MediaPlaylist,
    events: EventSink,
    transport: Arc<Transport>,
) {
    let mut position = 0.0f64;

    if playlist.is_live {
        let mut last_sequence = playlist
            .segments
            .last()
            .map_or(playlist.media_sequence, |s| s.sequence);
        let interval = Duration::from_secs_f64((playlist.target_duration / 2.0).max(0.5));

        loop {
            tokio::time::sleep(interval).await;
            let refreshed = match fetch_playlist(&client, &url).await {
                Ok(Playlist::Media(p)) => p,
                Ok(Playlist::Master(_)) => {
                    events.emit(EngineEvent::Error {
                        category: ErrorCategory::Other,
                        details: "media playlist turned into a master playlist".to_string(),
                    });
                    return;
                }
                Err((category, details)) => {
                    events.emit(EngineEvent::Error { category, details });
                    return;
                }
            };

            let fresh: f64 = refreshed
                .segments
                .iter()
                .filter(|s| s.sequence > last_sequence)
                .map(|s| s.duration)
                .sum();
            if let Some(last) = refreshed.segments.last() {
                last_sequence = last_sequence.max(last.sequence);
            }
            if transport.playing() {
                position += fresh;
            }
            if !events.emit(EngineEvent::TimeUpdate { position }) {
                return;
            }
            if !refreshed.is_live {
                events.emit(EngineEvent::Ended);
                return;
            }
        }
    } else {
        let total = playlist.total_duration();
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;
            if let Some(target) = transport.take_seek() {
                position = target.clamp(0.0, total);
            }
            if transport.playing() {
                position = (position + 1.0).min(total);
            }
            if !events.emit(EngineEvent::TimeUpdate { position }) {
                return;
            }
            if position >= total {
                events.emit(EngineEvent::Ended);
                return;
            }
        }
    }
}
