//! Built-in overlay templates for site-safety monitoring.

use chrono::{DateTime, Local, TimeZone};

use super::model::{AlertCardData, NewOverlay, StatEntry, TextStyle};

/// A ready-made text label.
#[derive(Debug, Clone, Copy)]
pub struct TextPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub text: &'static str,
    pub style: TextStyle,
}

/// A ready-made alert card. `stats` rows are `(label, value, alert)`.
#[derive(Debug, Clone, Copy)]
pub struct CardPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub title: &'static str,
    pub stats: &'static [(&'static str, &'static str, bool)],
    pub active_alert: &'static str,
}

pub const TEXT_PRESETS: &[TextPreset] = &[
    TextPreset {
        id: "ppe-detector",
        name: "PPE Detection Alert",
        description: "Missing safety equipment warning",
        text: "Missing Helmet",
        style: TextStyle::Alert,
    },
    TextPreset {
        id: "safety-zone",
        name: "Safety Zone Monitor",
        description: "Restricted area violation",
        text: "Safety Zone",
        style: TextStyle::Warning,
    },
    TextPreset {
        id: "worker-count",
        name: "Worker Counter",
        description: "Track number of workers",
        text: "Workers: 3",
        style: TextStyle::Safe,
    },
    TextPreset {
        id: "camera-status",
        name: "Camera Status",
        description: "Live camera indicator",
        text: "LIVE",
        style: TextStyle::Live,
    },
];

pub const CARD_PRESETS: &[CardPreset] = &[
    CardPreset {
        id: "ppe-card",
        name: "PPE Monitoring Card",
        description: "Monitor personal protective equipment.",
        title: "Site ppe 1",
        stats: &[("Workers", "2", false), ("Gloves", "0/2", true)],
        active_alert: "Missing Gloves",
    },
    CardPreset {
        id: "classroom-card",
        name: "Classroom Monitoring Card",
        description: "Track classroom occupancy and alerts.",
        title: "Classroom C8",
        stats: &[("Teachers", "0/2", true), ("Children", "24/24", false)],
        active_alert: "Suspicious Behavior",
    },
];

/// Either kind of preset.
#[derive(Debug, Clone, Copy)]
pub enum Preset {
    Text(&'static TextPreset),
    Card(&'static CardPreset),
}

impl Preset {
    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            Self::Text(p) => p.id,
            Self::Card(p) => p.id,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text(p) => p.name,
            Self::Card(p) => p.name,
        }
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Text(p) => p.description,
            Self::Card(p) => p.description,
        }
    }

    /// Build the overlay, stamping cards with the current local time.
    #[must_use]
    pub fn instantiate(&self) -> NewOverlay {
        self.instantiate_at(&Local::now())
    }

    #[must_use]
    pub fn instantiate_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> NewOverlay
    where
        Tz::Offset: std::fmt::Display,
    {
        match self {
            Self::Text(p) => NewOverlay::text(p.text, p.style),
            Self::Card(p) => NewOverlay::alert_card(AlertCardData {
                title: p.title.to_string(),
                stats: p
                    .stats
                    .iter()
                    .map(|&(label, value, alert_flag)| StatEntry {
                        label: label.to_string(),
                        value: value.to_string(),
                        alert_flag,
                    })
                    .collect(),
                active_alert: p.active_alert.to_string(),
                time: now.format("%I:%M %P").to_string(),
            }),
        }
    }
}

/// All presets, text labels first.
pub fn all() -> impl Iterator<Item = Preset> {
    TEXT_PRESETS
        .iter()
        .map(Preset::Text)
        .chain(CARD_PRESETS.iter().map(Preset::Card))
}

/// Look a preset up by id.
#[must_use]
pub fn find(id: &str) -> Option<Preset> {
    all().find(|p| p.id() == id)
}
