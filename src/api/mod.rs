//! Backend contract: stream control and overlay persistence over JSON/HTTP.
//!
//! Every response is wrapped in an [`Envelope`]. The traits here are the
//! seams the rest of the crate talks to; [`BackendClient`] is the `reqwest`
//! implementation.

pub mod client;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::overlay::Overlay;
use crate::stream::{StartAck, Stream, StreamStatus};

pub use client::BackendClient;

/// Backend call errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("backend rejected request: {0}")]
    Rejected(String),

    #[error("malformed response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// `{ok: true, data}` / `{ok: false, error}` response wrapper.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// Unwrap the payload, turning `ok: false` into [`ApiError::Rejected`].
    pub fn into_result(self, endpoint: &str) -> Result<T> {
        if !self.ok {
            return Err(self.rejection());
        }
        self.data.ok_or_else(|| ApiError::Decode {
            endpoint: endpoint.to_string(),
            reason: "missing data".to_string(),
        })
    }

    /// Like [`into_result`](Self::into_result) for calls with no payload.
    pub fn into_unit(self) -> Result<()> {
        if self.ok {
            Ok(())
        } else {
            Err(self.rejection())
        }
    }

    fn rejection(self) -> ApiError {
        ApiError::Rejected(self.error.unwrap_or_else(|| "request failed".to_string()))
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub status: String,
}

/// Stream ingest/control endpoints.
#[async_trait]
pub trait StreamApi: Send + Sync {
    /// `POST /streams/start` with `{rtspUrl}`.
    async fn start_stream(&self, source_url: &str) -> Result<StartAck>;

    /// `GET /streams/status/{id}`.
    async fn stream_status(&self, stream_id: &str) -> Result<StreamStatus>;

    /// `GET /streams`.
    async fn list_streams(&self) -> Result<Vec<Stream>>;

    /// `POST /streams/stop/{id}`.
    async fn stop_stream(&self, stream_id: &str) -> Result<()>;

    /// `POST /streams/pause/{id}`.
    async fn pause_stream(&self, stream_id: &str) -> Result<()>;

    /// `POST /streams/resume/{id}`.
    async fn resume_stream(&self, stream_id: &str) -> Result<()>;
}

/// Overlay persistence endpoints.
#[async_trait]
pub trait OverlayApi: Send + Sync {
    /// `GET /overlays?streamId=`.
    async fn list_overlays(&self, stream_id: &str) -> Result<Vec<Overlay>>;

    /// `POST /overlays`.
    async fn create_overlay(&self, overlay: &Overlay) -> Result<Overlay>;

    /// `PUT /overlays/{id}` with the full record.
    async fn update_overlay(&self, overlay: &Overlay) -> Result<Overlay>;

    /// `DELETE /overlays/{id}`.
    async fn delete_overlay(&self, id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_ok_yields_data() {
        let env: Envelope<StreamStatus> =
            serde_json::from_str(r#"{"ok":true,"data":{"ready":true}}"#).unwrap();
        assert!(env.into_result("status").unwrap().ready);
    }

    #[test]
    fn envelope_error_is_rejected() {
        let env: Envelope<StreamStatus> =
            serde_json::from_str(r#"{"ok":false,"error":"missing rtspUrl"}"#).unwrap();
        match env.into_result("start") {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "missing rtspUrl"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn envelope_without_data_is_decode_error() {
        let env: Envelope<StreamStatus> = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert!(matches!(
            env.into_result("status"),
            Err(ApiError::Decode { .. })
        ));
    }

    #[test]
    fn unit_envelope_ignores_missing_data() {
        let env: Envelope<serde::de::IgnoredAny> = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert!(env.into_unit().is_ok());

        let env: Envelope<serde::de::IgnoredAny> =
            serde_json::from_str(r#"{"ok":false,"error":"no such stream"}"#).unwrap();
        assert!(matches!(env.into_unit(), Err(ApiError::Rejected(_))));
    }
}
