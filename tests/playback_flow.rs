//! End-to-end flows through the composition surface with the headless
//! engine playing manifests served by a mock backend.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use livelay::playback::{ContentKind, HeadlessBackend};
use livelay::{CompositionSurface, Config, PlaybackState, SurfaceEvent};

const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720
high/index.m3u8
";

const VOD: &str = "#EXTM3U
#EXT-X-TARGETDURATION:10
#EXTINF:10.0,
seg0.ts
#EXTINF:5.0,
seg1.ts
#EXT-X-ENDLIST
";

const LIVE: &str = "#EXTM3U
#EXT-X-TARGETDURATION:2
#EXT-X-MEDIA-SEQUENCE:7
#EXTINF:2.0,
seg7.ts
#EXTINF:2.0,
seg8.ts
";

fn config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.api.base_url = format!("{}/api", server.uri());
    config.polling.interval_ms = 100;
    config
}

async fn serve_playlist(server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn backend_with_stream(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/streams/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "data": { "streamId": "s1", "hlsUrl": "/streams/s1/index.m3u8" }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/streams/status/s1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "data": { "ready": true } })),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/overlays"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "data": [{
                "id": "o1", "streamId": "s1", "type": "text", "text": "LIVE", "style": "live",
                "x": 10, "y": 10, "width": 120, "height": 40, "zIndex": 1000
            }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn probe_follows_master_to_best_variant() {
    let server = MockServer::start().await;
    serve_playlist(&server, "/master.m3u8", MASTER).await;
    serve_playlist(&server, "/high/index.m3u8", VOD).await;

    let backend = HeadlessBackend::new().unwrap();
    let (media_url, playlist) = backend
        .probe(&format!("{}/master.m3u8", server.uri()))
        .await
        .unwrap();

    assert_eq!(media_url, format!("{}/high/index.m3u8", server.uri()));
    assert_eq!(playlist.reported_duration(), Some(15.0));
}

#[tokio::test]
async fn started_finite_stream_plays_with_overlays() {
    let server = MockServer::start().await;
    backend_with_stream(&server).await;
    serve_playlist(&server, "/streams/s1/index.m3u8", VOD).await;

    let mut surface =
        CompositionSurface::connect(&config(&server), HeadlessBackend::new().unwrap()).unwrap();
    let mut events = surface.take_engine_events().unwrap();

    surface
        .dispatch(SurfaceEvent::StartStream {
            source_url: "rtsp://cam1".to_string(),
        })
        .await;
    assert!(surface.take_notices().is_empty());
    assert_eq!(surface.active_stream().unwrap().stream_id, "s1");
    assert_eq!(surface.overlays().len(), 1);
    assert_eq!(surface.layers()[0].overlay_id, "o1");

    // ManifestParsed, then MetadataLoaded
    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        surface.dispatch(SurfaceEvent::Engine(event)).await;
    }

    let snapshot = surface.playback();
    assert_eq!(snapshot.state, PlaybackState::Playing);
    assert_eq!(snapshot.content, ContentKind::Finite { duration: 15.0 });
    assert!(!snapshot.degraded);

    surface.dispatch(SurfaceEvent::Seek(0.5)).await;
    assert!((surface.playback().elapsed - 7.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn live_stream_is_not_seekable() {
    let server = MockServer::start().await;
    backend_with_stream(&server).await;
    serve_playlist(&server, "/streams/s1/index.m3u8", LIVE).await;

    let mut surface =
        CompositionSurface::connect(&config(&server), HeadlessBackend::new().unwrap()).unwrap();
    let mut events = surface.take_engine_events().unwrap();
    surface
        .dispatch(SurfaceEvent::StartStream {
            source_url: "rtsp://cam1".to_string(),
        })
        .await;

    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        surface.dispatch(SurfaceEvent::Engine(event)).await;
    }

    assert_eq!(surface.playback().content, ContentKind::Live);
    surface.dispatch(SurfaceEvent::Seek(0.5)).await;
    assert!(surface.playback().elapsed.abs() < f64::EPSILON);
}

#[tokio::test]
async fn missing_manifest_leaves_stream_reattachable() {
    let server = MockServer::start().await;
    backend_with_stream(&server).await;

    let mut surface =
        CompositionSurface::connect(&config(&server), HeadlessBackend::new().unwrap()).unwrap();
    surface
        .dispatch(SurfaceEvent::StartStream {
            source_url: "rtsp://cam1".to_string(),
        })
        .await;

    let snapshot = surface.playback();
    assert_eq!(snapshot.state, PlaybackState::ErrorRecoverable);
    assert!(snapshot.error.is_some());
    // overlays still load for the active stream
    assert_eq!(surface.overlays().len(), 1);
    assert_eq!(surface.take_notices().len(), 1);
}

#[tokio::test]
async fn unavailable_manifest_recovers_on_reattach() {
    let server = MockServer::start().await;
    backend_with_stream(&server).await;
    Mock::given(method("GET"))
        .and(path("/streams/s1/index.m3u8"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/streams/s1/index.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(VOD))
        .with_priority(2)
        .mount(&server)
        .await;

    let mut surface =
        CompositionSurface::connect(&config(&server), HeadlessBackend::new().unwrap()).unwrap();
    let mut events = surface.take_engine_events().unwrap();
    surface
        .dispatch(SurfaceEvent::StartStream {
            source_url: "rtsp://cam1".to_string(),
        })
        .await;

    let snapshot = surface.playback();
    assert_eq!(snapshot.state, PlaybackState::ErrorRecoverable);
    assert!(snapshot.error.unwrap().contains("503"));
    surface.take_notices();

    surface.dispatch(SurfaceEvent::Reattach).await;
    assert!(surface.take_notices().is_empty());
    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        surface.dispatch(SurfaceEvent::Engine(event)).await;
    }
    assert_eq!(surface.playback().state, PlaybackState::Playing);
}
