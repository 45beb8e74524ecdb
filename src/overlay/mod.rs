//! Overlays composited on top of a stream.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌───────────────┐    ┌─────────────────┐
//! │  NewOverlay  │───▶│ SyncAdapter   │───▶│   OverlayApi    │
//! │  / presets   │    │ (optimistic)  │    │ (persistence)   │
//! └──────────────┘    └───────┬───────┘    └─────────────────┘
//!                             │
//!                     ┌───────▼───────┐    ┌─────────────────┐
//!                     │ OverlayStore  │───▶│ render: layers  │
//!                     │               │    │ + filter graph  │
//!                     └───────────────┘    └─────────────────┘
//! ```

pub mod model;
pub mod presets;
pub mod render;
pub mod store;
pub mod sync;

pub use model::{
    AlertCardData, Geometry, NewOverlay, Overlay, OverlayContent, Palette, StatEntry, TextStyle,
};
pub use presets::Preset;
pub use render::{compose, filter_graph, layer_for, FilterGraph, Layer, LayerContent};
pub use store::OverlayStore;
pub use sync::{OverlaySyncAdapter, SyncError};
