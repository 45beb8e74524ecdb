//! Wire types for the stream endpoints.

use serde::{Deserialize, Serialize};

/// Acknowledgement returned by `POST /streams/start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAck {
    /// Backend-assigned stream identifier.
    pub stream_id: String,
    /// Manifest path relative to the media origin (e.g. `/streams/s1/index.m3u8`).
    pub hls_url: String,
}

/// Body of `GET /streams/status/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStatus {
    /// `true` once the manifest exists on the backend.
    pub ready: bool,
}

/// A stream known to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawStream")]
pub struct Stream {
    pub stream_id: String,
    pub running: bool,
    /// Manifest path relative to the media origin.
    #[serde(rename = "hlsUrl")]
    pub manifest_path: String,
}

/// Listing entries carry either `running: bool` or a `status` string
/// depending on backend version.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStream {
    stream_id: String,
    #[serde(default)]
    running: Option<bool>,
    #[serde(default)]
    status: Option<String>,
    hls_url: String,
}

impl From<RawStream> for Stream {
    fn from(raw: RawStream) -> Self {
        let running = raw
            .running
            .unwrap_or_else(|| raw.status.as_deref() == Some("running"));
        Self {
            stream_id: raw.stream_id,
            running,
            manifest_path: raw.hls_url,
        }
    }
}

/// A stream that is ready to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedStream {
    pub stream_id: String,
    /// Fully-qualified manifest URL.
    pub playable_url: String,
}
