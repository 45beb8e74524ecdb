//! Keeps the [`OverlayStore`] and the persistence service in step.
//!
//! Writes are optimistic: move, resize, edit and delete change the store
//! first and call the backend afterwards. A failed call is reported but not
//! rolled back; the next [`load_for_stream`](OverlaySyncAdapter::load_for_stream)
//! restores the persisted view. Creation is the exception: nothing is
//! inserted locally until the backend confirms it.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::model::{Geometry, NewOverlay, Overlay};
use super::store::OverlayStore;
use crate::api::{ApiError, OverlayApi};

/// Overlay synchronization errors
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("no active stream")]
    NoActiveStream,

    #[error("invalid overlay: {0}")]
    InvalidOverlay(String),

    #[error("failed to create overlay: {0}")]
    Create(#[source] ApiError),

    #[error("failed to update overlay {id}: {source}")]
    Update { id: String, source: ApiError },

    #[error("failed to delete overlay {id}: {source}")]
    Delete { id: String, source: ApiError },

    #[error("failed to load overlays for stream {stream_id}: {source}")]
    Load { stream_id: String, source: ApiError },
}

pub type Result<T> = std::result::Result<T, SyncError>;

pub struct OverlaySyncAdapter {
    api: Arc<dyn OverlayApi>,
    store: OverlayStore,
    stream_id: Option<String>,
}

impl OverlaySyncAdapter {
    pub fn new(api: Arc<dyn OverlayApi>) -> Self {
        Self {
            api,
            store: OverlayStore::new(),
            stream_id: None,
        }
    }

    /// Read access for rendering.
    #[must_use]
    pub fn store(&self) -> &OverlayStore {
        &self.store
    }

    #[must_use]
    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref()
    }

    /// Switch to `stream_id` and load its overlays.
    ///
    /// The store is emptied immediately and only repopulated once the
    /// listing succeeds.
    pub async fn load_for_stream(&mut self, stream_id: &str) -> Result<usize> {
        self.stream_id = Some(stream_id.to_string());
        self.store.clear();
        self.reload().await
    }

    /// Forget the active stream and its overlays.
    pub fn clear(&mut self) {
        self.stream_id = None;
        self.store.clear();
    }

    async fn reload(&mut self) -> Result<usize> {
        let stream_id = self.stream_id.clone().ok_or(SyncError::NoActiveStream)?;
        let overlays = self
            .api
            .list_overlays(&stream_id)
            .await
            .map_err(|source| SyncError::Load {
                stream_id: stream_id.clone(),
                source,
            })?;
        self.store.replace_all(overlays);
        debug!(stream_id, count = self.store.len(), "overlays loaded");
        Ok(self.store.len())
    }

    /// Create an overlay on the active stream with a fresh id, then reload
    /// the stream's overlays.
    pub async fn add(&mut self, new: NewOverlay) -> Result<Overlay> {
        let stream_id = self.stream_id.clone().ok_or(SyncError::NoActiveStream)?;
        if !new.geometry.has_area() {
            return Err(SyncError::InvalidOverlay(format!(
                "width and height must be positive, got {}x{}",
                new.geometry.width, new.geometry.height
            )));
        }

        let overlay = new.into_overlay(Uuid::new_v4().to_string(), stream_id);
        let created = self
            .api
            .create_overlay(&overlay)
            .await
            .map_err(SyncError::Create)?;
        info!(overlay_id = %created.id, kind = created.kind(), "overlay created");

        if let Err(e) = self.reload().await {
            warn!("{e}; keeping confirmed overlay locally");
            self.store.upsert(created.clone());
        }
        Ok(created)
    }

    /// Drag end: new position, same size.
    pub async fn move_to(&mut self, id: &str, x: f64, y: f64) -> Result<()> {
        let Some(current) = self.store.get(id) else {
            debug!(overlay_id = id, "move for unknown overlay ignored");
            return Ok(());
        };
        let geometry = current.geometry.moved_to(x, y);
        self.apply_and_persist(id, geometry).await
    }

    /// Resize end: size and possibly position change together.
    pub async fn resize(&mut self, id: &str, geometry: Geometry) -> Result<()> {
        self.apply_and_persist(id, geometry).await
    }

    async fn apply_and_persist(&mut self, id: &str, geometry: Geometry) -> Result<()> {
        if !self.store.apply_geometry(id, geometry) {
            return Ok(());
        }
        let Some(overlay) = self.store.get(id).cloned() else {
            return Ok(());
        };
        self.persist(&overlay).await
    }

    /// Replace an overlay's fields (text, style, data...) optimistically.
    pub async fn edit(&mut self, overlay: Overlay) -> Result<()> {
        if !overlay.geometry.has_area() {
            return Err(SyncError::InvalidOverlay(format!(
                "width and height must be positive, got {}x{}",
                overlay.geometry.width, overlay.geometry.height
            )));
        }
        if self.store.get(&overlay.id).is_none() {
            debug!(overlay_id = %overlay.id, "edit for unknown overlay ignored");
            return Ok(());
        }
        self.store.upsert(overlay.clone());
        self.persist(&overlay).await
    }

    async fn persist(&self, overlay: &Overlay) -> Result<()> {
        match self.api.update_overlay(overlay).await {
            Ok(_) => Ok(()),
            Err(source) => {
                warn!(overlay_id = %overlay.id, "update failed, local copy kept: {source}");
                Err(SyncError::Update {
                    id: overlay.id.clone(),
                    source,
                })
            }
        }
    }

    /// Remove locally, then delete on the backend.
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        self.store.remove(id);
        match self.api.delete_overlay(id).await {
            Ok(()) => {
                info!(overlay_id = id, "overlay deleted");
                Ok(())
            }
            Err(source) => {
                warn!(overlay_id = id, "delete failed: {source}");
                Err(SyncError::Delete {
                    id: id.to_string(),
                    source,
                })
            }
        }
    }
}
