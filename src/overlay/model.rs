//! Overlay data model.
//!
//! An [`Overlay`] is a positioned, resizable annotation composited over the
//! playback surface. The variant payload lives in [`OverlayContent`], a
//! closed tagged union serialized with a `type` discriminator
//! (`text`, `image`, `alert-card`).

use serde::{Deserialize, Serialize};

/// Default top-left position for new overlays.
pub const DEFAULT_POSITION: (f64, f64) = (20.0, 20.0);
/// Default paint order for new overlays.
pub const DEFAULT_Z_INDEX: i32 = 1000;

/// Fixed visual preset for text overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStyle {
    Alert,
    Warning,
    Safe,
    Live,
}

/// Background/foreground colors for a [`TextStyle`] (hex `RRGGBB`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub foreground: &'static str,
}

impl TextStyle {
    pub const ALL: [Self; 4] = [Self::Alert, Self::Warning, Self::Safe, Self::Live];

    #[must_use]
    pub fn palette(self) -> Palette {
        match self {
            Self::Alert => Palette {
                background: "EF4444",
                foreground: "FFFFFF",
            },
            Self::Warning => Palette {
                background: "F59E0B",
                foreground: "000000",
            },
            Self::Safe => Palette {
                background: "10B981",
                foreground: "FFFFFF",
            },
            Self::Live => Palette {
                background: "22C55E",
                foreground: "FFFFFF",
            },
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Warning => "warning",
            Self::Safe => "safe",
            Self::Live => "live",
        }
    }
}

impl std::str::FromStr for TextStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown text style: {s} (expected alert, warning, safe or live)"))
    }
}

/// One stat row on an alert card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEntry {
    pub label: String,
    pub value: String,
    /// Highlight this row as alerting.
    #[serde(default, rename = "alert", alias = "alertFlag")]
    pub alert_flag: bool,
}

/// Structured payload of an alert card overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertCardData {
    pub title: String,
    #[serde(default)]
    pub stats: Vec<StatEntry>,
    pub active_alert: String,
    pub time: String,
}

/// Variant payload of an overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OverlayContent {
    Text {
        text: String,
        style: TextStyle,
    },
    Image {
        /// Image reference; may be a local file path before upload.
        #[serde(rename = "imageUrl")]
        image_url: String,
    },
    AlertCard {
        data: AlertCardData,
    },
}

impl OverlayContent {
    /// The wire discriminator of this variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::AlertCard { .. } => "alert-card",
        }
    }

    /// Size given to freshly created overlays of this kind.
    #[must_use]
    pub fn default_size(&self) -> (f64, f64) {
        match self {
            Self::Text { .. } => (120.0, 40.0),
            Self::Image { .. } => (80.0, 80.0),
            Self::AlertCard { .. } => (280.0, 160.0),
        }
    }
}

/// Position and size in pixels relative to the playback surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Same size, new top-left corner.
    #[must_use]
    pub fn moved_to(self, x: f64, y: f64) -> Self {
        Self { x, y, ..self }
    }

    /// `width` and `height` are both strictly positive (and finite).
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// A persisted overlay record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    pub id: String,
    pub stream_id: String,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(default)]
    pub z_index: i32,
    #[serde(flatten)]
    pub content: OverlayContent,
}

impl Overlay {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.content.kind()
    }
}

/// An overlay the user asked for that has no identity yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOverlay {
    pub geometry: Geometry,
    pub z_index: i32,
    pub content: OverlayContent,
}

impl NewOverlay {
    /// New overlay at the default position with the default size for its kind.
    #[must_use]
    pub fn new(content: OverlayContent) -> Self {
        let (width, height) = content.default_size();
        let (x, y) = DEFAULT_POSITION;
        Self {
            geometry: Geometry::new(x, y, width, height),
            z_index: DEFAULT_Z_INDEX,
            content,
        }
    }

    #[must_use]
    pub fn text(text: impl Into<String>, style: TextStyle) -> Self {
        Self::new(OverlayContent::Text {
            text: text.into(),
            style,
        })
    }

    #[must_use]
    pub fn image(image_url: impl Into<String>) -> Self {
        Self::new(OverlayContent::Image {
            image_url: image_url.into(),
        })
    }

    #[must_use]
    pub fn alert_card(data: AlertCardData) -> Self {
        Self::new(OverlayContent::AlertCard { data })
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    #[must_use]
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Bind to an identity and owning stream.
    #[must_use]
    pub fn into_overlay(self, id: impl Into<String>, stream_id: impl Into<String>) -> Overlay {
        Overlay {
            id: id.into(),
            stream_id: stream_id.into(),
            geometry: self.geometry,
            z_index: self.z_index,
            content: self.content,
        }
    }
}
