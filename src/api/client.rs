//! `reqwest` implementation of the backend contract.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use super::{ApiError, Envelope, Health, OverlayApi, Result, StreamApi};
use crate::config::ApiConfig;
use crate::overlay::Overlay;
use crate::stream::{StartAck, Stream, StreamStatus};

/// HTTP client for the stream/overlay backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base: Url,
}

impl BackendClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)?;

        let client = Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .gzip(true)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { client, base })
    }

    /// API base URL (e.g. `http://localhost:5000/api`).
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Send a request and decode its envelope. An empty 2xx body counts
    /// as `{ok: true}`.
    async fn envelope<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<Envelope<T>> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() && body.trim().is_empty() {
            return Ok(Envelope {
                ok: true,
                data: None,
                error: None,
            });
        }

        match serde_json::from_str::<Envelope<T>>(&body) {
            Ok(envelope) if status.is_success() => Ok(envelope),
            Ok(envelope) => Err(ApiError::Rejected(
                envelope
                    .error
                    .unwrap_or_else(|| format!("{endpoint} returned status {status}")),
            )),
            Err(_) if !status.is_success() => Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            }),
            Err(e) => Err(ApiError::Decode {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Send a request and unwrap its payload.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, endpoint: &str) -> Result<T> {
        self.envelope(request, endpoint)
            .await?
            .into_result(endpoint)
    }

    /// Send a request whose payload, if any, is ignored.
    async fn send_unit(&self, request: RequestBuilder, endpoint: &str) -> Result<()> {
        self.envelope::<IgnoredAny>(request, endpoint)
            .await?
            .into_unit()
    }

    async fn control(&self, action: &str, stream_id: &str) -> Result<()> {
        let endpoint = format!("streams/{action}/{}", urlencoding::encode(stream_id));
        self.send_unit(self.client.post(self.endpoint(&endpoint)), &endpoint)
            .await
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<Health> {
        self.send(self.client.get(self.endpoint("health")), "health")
            .await
    }
}

#[async_trait]
impl StreamApi for BackendClient {
    #[instrument(skip(self))]
    async fn start_stream(&self, source_url: &str) -> Result<StartAck> {
        let request = self
            .client
            .post(self.endpoint("streams/start"))
            .json(&json!({ "rtspUrl": source_url }));
        let ack: StartAck = self.send(request, "streams/start").await?;
        debug!(stream_id = %ack.stream_id, "stream start acknowledged");
        Ok(ack)
    }

    async fn stream_status(&self, stream_id: &str) -> Result<StreamStatus> {
        let endpoint = format!("streams/status/{}", urlencoding::encode(stream_id));
        self.send(self.client.get(self.endpoint(&endpoint)), &endpoint)
            .await
    }

    async fn list_streams(&self) -> Result<Vec<Stream>> {
        self.send(self.client.get(self.endpoint("streams")), "streams")
            .await
    }

    async fn stop_stream(&self, stream_id: &str) -> Result<()> {
        self.control("stop", stream_id).await
    }

    async fn pause_stream(&self, stream_id: &str) -> Result<()> {
        self.control("pause", stream_id).await
    }

    async fn resume_stream(&self, stream_id: &str) -> Result<()> {
        self.control("resume", stream_id).await
    }
}

#[async_trait]
impl OverlayApi for BackendClient {
    async fn list_overlays(&self, stream_id: &str) -> Result<Vec<Overlay>> {
        let request = self
            .client
            .get(self.endpoint("overlays"))
            .query(&[("streamId", stream_id)]);
        self.send(request, "overlays").await
    }

    #[instrument(skip(self, overlay), fields(overlay_id = %overlay.id))]
    async fn create_overlay(&self, overlay: &Overlay) -> Result<Overlay> {
        let request = self.client.post(self.endpoint("overlays")).json(overlay);
        self.send(request, "overlays").await
    }

    async fn update_overlay(&self, overlay: &Overlay) -> Result<Overlay> {
        let endpoint = format!("overlays/{}", urlencoding::encode(&overlay.id));
        let request = self.client.put(self.endpoint(&endpoint)).json(overlay);
        self.send(request, &endpoint).await
    }

    async fn delete_overlay(&self, id: &str) -> Result<()> {
        let endpoint = format!("overlays/{}", urlencoding::encode(id));
        self.send_unit(self.client.delete(self.endpoint(&endpoint)), &endpoint)
            .await
    }
}
