//! Turning a source URL into a playable stream.
//!
//! `start` submits the source, then polls the status endpoint at a fixed
//! interval until the backend reports the manifest ready. The poll loop
//! stops as soon as the caller's [`CancellationToken`] fires, and is
//! optionally bounded by a readiness timeout.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{StartedStream, Stream};
use crate::api::{ApiError, StreamApi};
use crate::config::PollingConfig;

/// Stream lifecycle errors
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("stream start rejected: {0}")]
    StartRejected(#[source] ApiError),

    #[error("stream status check failed: {0}")]
    StatusCheckFailed(#[source] ApiError),

    #[error("stream list unavailable: {0}")]
    ListUnavailable(#[source] ApiError),

    #[error("stream control failed: {0}")]
    ControlFailed(#[source] ApiError),

    #[error("stream manifest not ready after {0:?}")]
    ReadinessTimeout(Duration),

    #[error("stream start cancelled")]
    Cancelled,

    #[error("unknown stream: {0}")]
    UnknownStream(String),
}

/// Strip the API path suffix from the API base to get the media origin.
///
/// `http://host:5000/api` → `http://host:5000`.
#[must_use]
pub fn media_origin(api_base: &str) -> String {
    let trimmed = api_base.trim_end_matches('/');
    trimmed.strip_suffix("/api").unwrap_or(trimmed).to_string()
}

/// Resolve a backend manifest path against the media origin.
#[must_use]
pub fn playable_url(origin: &str, manifest_path: &str) -> String {
    if manifest_path.starts_with("http://") || manifest_path.starts_with("https://") {
        manifest_path.to_string()
    } else if manifest_path.starts_with('/') {
        format!("{}{manifest_path}", origin.trim_end_matches('/'))
    } else {
        format!("{}/{manifest_path}", origin.trim_end_matches('/'))
    }
}

pub struct StreamLifecycleController {
    api: Arc<dyn StreamApi>,
    origin: String,
    poll_interval: Duration,
    ready_timeout: Option<Duration>,
    known: Vec<Stream>,
}

impl StreamLifecycleController {
    pub fn new(api: Arc<dyn StreamApi>, api_base: &str, polling: &PollingConfig) -> Self {
        Self {
            api,
            origin: media_origin(api_base),
            poll_interval: polling.interval(),
            ready_timeout: polling.ready_timeout(),
            known: Vec::new(),
        }
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Streams from the last successful [`list`](Self::list).
    #[must_use]
    pub fn known_streams(&self) -> &[Stream] {
        &self.known
    }

    /// Start `source_url` and resolve once its manifest is playable.
    ///
    /// Never resolves before the status endpoint first reports ready.
    pub async fn start(
        &self,
        source_url: &str,
        cancel: &CancellationToken,
    ) -> Result<StartedStream, StreamError> {
        url::Url::parse(source_url).map_err(|e| StreamError::StartRejected(e.into()))?;

        let ack = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StreamError::Cancelled),
            ack = self.api.start_stream(source_url) => ack.map_err(StreamError::StartRejected)?,
        };
        info!(stream_id = %ack.stream_id, "stream started, waiting for manifest");

        self.wait_until_ready(&ack.stream_id, cancel).await?;

        let playable_url = playable_url(&self.origin, &ack.hls_url);
        info!(stream_id = %ack.stream_id, %playable_url, "stream ready");
        Ok(StartedStream {
            stream_id: ack.stream_id,
            playable_url,
        })
    }

    async fn wait_until_ready(
        &self,
        stream_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), StreamError> {
        let bounded = async {
            match self.ready_timeout {
                Some(limit) => tokio::time::timeout(limit, self.poll_until_ready(stream_id))
                    .await
                    .map_err(|_| StreamError::ReadinessTimeout(limit))?,
                None => self.poll_until_ready(stream_id).await,
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(stream_id, "readiness polling cancelled");
                Err(StreamError::Cancelled)
            }
            result = bounded => result,
        }
    }

    async fn poll_until_ready(&self, stream_id: &str) -> Result<(), StreamError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let status = self
                .api
                .stream_status(stream_id)
                .await
                .map_err(StreamError::StatusCheckFailed)?;
            if status.ready {
                debug!(stream_id, attempts, "manifest ready");
                return Ok(());
            }
            debug!(stream_id, attempts, "manifest not ready yet");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Fetch all streams known to the backend and remember them for
    /// [`select`](Self::select).
    pub async fn list(&mut self) -> Result<Vec<Stream>, StreamError> {
        let streams = self
            .api
            .list_streams()
            .await
            .map_err(StreamError::ListUnavailable)?;
        self.known.clone_from(&streams);
        Ok(streams)
    }

    /// [`list`](Self::list), degrading to an empty list on failure.
    pub async fn list_or_empty(&mut self) -> Vec<Stream> {
        match self.list().await {
            Ok(streams) => streams,
            Err(e) => {
                warn!("{e}");
                Vec::new()
            }
        }
    }

    /// Look up a previously listed stream.
    pub fn select(&self, stream_id: &str) -> Result<StartedStream, StreamError> {
        self.known
            .iter()
            .find(|s| s.stream_id == stream_id)
            .map(|s| StartedStream {
                stream_id: s.stream_id.clone(),
                playable_url: playable_url(&self.origin, &s.manifest_path),
            })
            .ok_or_else(|| StreamError::UnknownStream(stream_id.to_string()))
    }

    pub async fn stop(&mut self, stream_id: &str) -> Result<(), StreamError> {
        self.api
            .stop_stream(stream_id)
            .await
            .map_err(StreamError::ControlFailed)?;
        self.known.retain(|s| s.stream_id != stream_id);
        info!(stream_id, "stream stopped");
        Ok(())
    }

    pub async fn pause(&mut self, stream_id: &str) -> Result<(), StreamError> {
        self.api
            .pause_stream(stream_id)
            .await
            .map_err(StreamError::ControlFailed)?;
        self.set_running(stream_id, false);
        Ok(())
    }

    pub async fn resume(&mut self, stream_id: &str) -> Result<(), StreamError> {
        self.api
            .resume_stream(stream_id)
            .await
            .map_err(StreamError::ControlFailed)?;
        self.set_running(stream_id, true);
        Ok(())
    }

    fn set_running(&mut self, stream_id: &str, running: bool) {
        if let Some(stream) = self.known.iter_mut().find(|s| s.stream_id == stream_id) {
            stream.running = running;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{StartAck, StreamStatus};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted backend: status responses are popped in order, the last
    /// one repeats.
    #[derive(Default)]
    struct ScriptedApi {
        reject_start: bool,
        statuses: Mutex<VecDeque<crate::api::Result<StreamStatus>>>,
        status_calls: AtomicUsize,
        streams: Vec<Stream>,
    }

    impl ScriptedApi {
        fn with_statuses(ready: &[bool]) -> Self {
            Self {
                statuses: Mutex::new(ready.iter().map(|&ready| Ok(StreamStatus { ready })).collect()),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StreamApi for ScriptedApi {
        async fn start_stream(&self, _source_url: &str) -> crate::api::Result<StartAck> {
            if self.reject_start {
                return Err(ApiError::Rejected("missing rtspUrl".to_string()));
            }
            Ok(StartAck {
                stream_id: "s1".to_string(),
                hls_url: "/streams/s1/index.m3u8".to_string(),
            })
        }

        async fn stream_status(&self, _stream_id: &str) -> crate::api::Result<StreamStatus> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                match statuses.front() {
                    Some(Ok(status)) => Ok(*status),
                    Some(Err(_)) => Err(ApiError::Status {
                        endpoint: "streams/status/s1".to_string(),
                        status: 500,
                    }),
                    None => Ok(StreamStatus { ready: false }),
                }
            }
        }

        async fn list_streams(&self) -> crate::api::Result<Vec<Stream>> {
            if self.streams.is_empty() {
                return Err(ApiError::Status {
                    endpoint: "streams".to_string(),
                    status: 503,
                });
            }
            Ok(self.streams.clone())
        }

        async fn stop_stream(&self, _stream_id: &str) -> crate::api::Result<()> {
            Ok(())
        }

        async fn pause_stream(&self, _stream_id: &str) -> crate::api::Result<()> {
            Ok(())
        }

        async fn resume_stream(&self, _stream_id: &str) -> crate::api::Result<()> {
            Ok(())
        }
    }

    fn controller(api: Arc<ScriptedApi>, ready_timeout_secs: u64) -> StreamLifecycleController {
        StreamLifecycleController::new(
            api,
            "http://localhost:5000/api",
            &PollingConfig {
                interval_ms: 2000,
                ready_timeout_secs,
            },
        )
    }

    #[test]
    fn media_origin_strips_api_suffix() {
        assert_eq!(media_origin("http://localhost:5000/api"), "http://localhost:5000");
        assert_eq!(media_origin("http://localhost:5000/api/"), "http://localhost:5000");
        assert_eq!(media_origin("https://cams.example.com"), "https://cams.example.com");
    }

    #[test]
    fn playable_url_joins_paths() {
        let origin = "http://localhost:5000";
        assert_eq!(
            playable_url(origin, "/streams/s1/index.m3u8"),
            "http://localhost:5000/streams/s1/index.m3u8"
        );
        assert_eq!(
            playable_url(origin, "streams/s1/index.m3u8"),
            "http://localhost:5000/streams/s1/index.m3u8"
        );
        assert_eq!(
            playable_url(origin, "https://cdn.example.com/s1.m3u8"),
            "https://cdn.example.com/s1.m3u8"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn start_resolves_after_ready() {
        let api = Arc::new(ScriptedApi::with_statuses(&[false, false, true]));
        let ctl = controller(Arc::clone(&api), 0);

        let started = ctl
            .start("rtsp://cam1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(started.stream_id, "s1");
        assert_eq!(
            started.playable_url,
            "http://localhost:5000/streams/s1/index.m3u8"
        );
        assert_eq!(api.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn start_rejected_is_not_retried() {
        let api = Arc::new(ScriptedApi {
            reject_start: true,
            ..ScriptedApi::default()
        });
        let ctl = controller(Arc::clone(&api), 0);

        let err = ctl
            .start("rtsp://cam1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::StartRejected(_)));
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_source_is_rejected_locally() {
        let api = Arc::new(ScriptedApi::default());
        let ctl = controller(api, 0);
        let err = ctl
            .start("not a url", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::StartRejected(ApiError::Url(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn status_failure_aborts_start() {
        let api = Arc::new(ScriptedApi {
            statuses: Mutex::new(VecDeque::from(vec![
                Ok(StreamStatus { ready: false }),
                Err(ApiError::Rejected("boom".to_string())),
            ])),
            ..ScriptedApi::default()
        });
        let ctl = controller(Arc::clone(&api), 0);

        let err = ctl
            .start("rtsp://cam1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::StatusCheckFailed(_)));
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_polling() {
        let api = Arc::new(ScriptedApi::with_statuses(&[false]));
        let ctl = controller(Arc::clone(&api), 0);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        let watcher = Arc::clone(&api);
        tokio::spawn(async move {
            while watcher.calls() < 2 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            canceller.cancel();
        });

        let err = ctl.start("rtsp://cam1", &cancel).await.unwrap_err();
        assert!(matches!(err, StreamError::Cancelled));

        let calls_at_cancel = api.calls();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.calls(), calls_at_cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_issues_no_requests() {
        let api = Arc::new(ScriptedApi::with_statuses(&[true]));
        let ctl = controller(Arc::clone(&api), 0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = ctl.start("rtsp://cam1", &cancel).await.unwrap_err();
        assert!(matches!(err, StreamError::Cancelled));
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_timeout_bounds_polling() {
        let api = Arc::new(ScriptedApi::with_statuses(&[false]));
        let ctl = controller(Arc::clone(&api), 5);

        let err = ctl
            .start("rtsp://cam1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::ReadinessTimeout(d) if d == Duration::from_secs(5)));
        // polls at t=0,2,4
        assert_eq!(api.calls(), 3);
    }

    #[tokio::test]
    async fn list_failure_degrades_to_empty() {
        let api = Arc::new(ScriptedApi::default());
        let mut ctl = controller(api, 0);
        assert!(matches!(ctl.list().await, Err(StreamError::ListUnavailable(_))));
        assert!(ctl.list_or_empty().await.is_empty());
    }

    #[tokio::test]
    async fn select_uses_last_listing() {
        let api = Arc::new(ScriptedApi {
            streams: vec![Stream {
                stream_id: "s7".to_string(),
                running: true,
                manifest_path: "/streams/s7/index.m3u8".to_string(),
            }],
            ..ScriptedApi::default()
        });
        let mut ctl = controller(api, 0);

        assert!(matches!(ctl.select("s7"), Err(StreamError::UnknownStream(_))));
        ctl.list().await.unwrap();
        let selected = ctl.select("s7").unwrap();
        assert_eq!(
            selected.playable_url,
            "http://localhost:5000/streams/s7/index.m3u8"
        );

        ctl.pause("s7").await.unwrap();
        assert!(!ctl.known_streams()[0].running);
        ctl.stop("s7").await.unwrap();
        assert!(ctl.known_streams().is_empty());
    }
}
