//! In-memory overlay set for the active stream.
//!
//! Entries keep insertion order so that equal-`zIndex` overlays paint in a
//! stable order. No I/O happens here; persistence is driven by
//! [`OverlaySyncAdapter`](super::sync::OverlaySyncAdapter).

use tracing::debug;

use super::model::{Geometry, Overlay};

#[derive(Debug, Clone, Default)]
pub struct OverlayStore {
    entries: Vec<Overlay>,
}

impl OverlayStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole set. Later duplicates of an `id` win but keep the
    /// position of the first occurrence.
    pub fn replace_all(&mut self, overlays: impl IntoIterator<Item = Overlay>) {
        self.entries.clear();
        for overlay in overlays {
            self.upsert(overlay);
        }
    }

    /// Insert, or replace in place when the `id` already exists.
    /// Returns the replaced overlay.
    pub fn upsert(&mut self, overlay: Overlay) -> Option<Overlay> {
        match self.position(&overlay.id) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx], overlay)),
            None => {
                self.entries.push(overlay);
                None
            }
        }
    }

    /// Remove by `id`. Absent ids are not an error.
    pub fn remove(&mut self, id: &str) -> Option<Overlay> {
        self.position(id).map(|idx| self.entries.remove(idx))
    }

    /// Apply a drag/resize result. Returns `false` (and changes nothing)
    /// when the `id` is gone or the geometry has no area.
    pub fn apply_geometry(&mut self, id: &str, geometry: Geometry) -> bool {
        if !geometry.has_area() {
            debug!(overlay_id = id, ?geometry, "ignoring geometry without area");
            return false;
        }
        let Some(idx) = self.position(id) else {
            debug!(overlay_id = id, "geometry update for unknown overlay ignored");
            return false;
        };
        self.entries[idx].geometry = geometry;
        true
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Overlay> {
        self.entries.iter().find(|o| o.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Overlays in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.entries.iter()
    }

    /// Overlays in paint order: `zIndex` ascending, ties in insertion order.
    #[must_use]
    pub fn render_order(&self) -> Vec<&Overlay> {
        let mut ordered: Vec<&Overlay> = self.entries.iter().collect();
        ordered.sort_by_key(|o| o.z_index);
        ordered
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|o| o.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::model::{NewOverlay, TextStyle};

    fn text(id: &str, z: i32) -> Overlay {
        NewOverlay::text(id, TextStyle::Safe)
            .with_z_index(z)
            .into_overlay(id, "s1")
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut store = OverlayStore::new();
        assert!(store.upsert(text("a", 1)).is_none());
        let previous = store.upsert(text("a", 5)).unwrap();
        assert_eq!(previous.z_index, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().z_index, 5);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut store = OverlayStore::new();
        store.upsert(text("a", 1));
        assert!(store.remove("missing").is_none());
        assert_eq!(store.len(), 1);
        assert!(store.remove("a").is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn apply_geometry_on_absent_id_leaves_store_unchanged() {
        let mut store = OverlayStore::new();
        store.upsert(text("a", 1));
        let before = store.clone();

        assert!(!store.apply_geometry("gone", Geometry::new(150.0, 80.0, 10.0, 10.0)));
        assert_eq!(store.get("a"), before.get("a"));
        assert_eq!(store.len(), before.len());
    }

    #[test]
    fn apply_geometry_updates_in_place() {
        let mut store = OverlayStore::new();
        store.upsert(text("a", 1));
        assert!(store.apply_geometry("a", Geometry::new(150.0, 80.0, 120.0, 40.0)));
        let geometry = store.get("a").unwrap().geometry;
        assert_eq!((geometry.x, geometry.y), (150.0, 80.0));
    }

    #[test]
    fn apply_geometry_rejects_zero_size() {
        let mut store = OverlayStore::new();
        store.upsert(text("a", 1));
        assert!(!store.apply_geometry("a", Geometry::new(0.0, 0.0, 0.0, 40.0)));
        assert_eq!(store.get("a").unwrap().geometry.width, 120.0);
    }

    #[test]
    fn render_order_is_stable_by_z_index() {
        let mut store = OverlayStore::new();
        store.replace_all(vec![
            text("top", 10),
            text("first-tie", 2),
            text("bottom", 0),
            text("second-tie", 2),
        ]);

        let ids: Vec<&str> = store.render_order().iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["bottom", "first-tie", "second-tie", "top"]);

        let z: Vec<i32> = store.render_order().iter().map(|o| o.z_index).collect();
        assert!(z.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn replace_all_discards_previous_set() {
        let mut store = OverlayStore::new();
        store.upsert(text("old", 1));
        store.replace_all(vec![text("new", 1), text("new", 3)]);
        assert!(store.get("old").is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("new").unwrap().z_index, 3);
    }
}
