//! Playback of a single live or finite HLS stream.
//!
//! [`PlaybackSession`] owns the media endpoint and its streaming engine;
//! [`engine`] defines the seam a concrete player implements and
//! [`headless`] is the player used by the CLI.

pub mod engine;
pub mod headless;
pub mod manifest;
pub mod session;

use std::time::Duration;

use thiserror::Error;

pub use engine::{
    AttachmentId, EngineEvent, ErrorCategory, EventSink, MediaBackend, StreamEngine, TaggedEvent,
};
pub use headless::HeadlessBackend;
pub use session::{format_clock, ContentKind, PlaybackSession, PlaybackSnapshot, PlaybackState};

/// Playback errors
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("failed to attach {url}: {reason}")]
    AttachFailed {
        url: String,
        reason: String,
        category: ErrorCategory,
    },

    #[error("attach timed out after {0:?}")]
    AttachTimeout(Duration),

    #[error("no stream attached")]
    NotAttached,
}

impl PlaybackError {
    /// How the session should treat this failure. Only an attach that
    /// failed while loading the manifest can be retried.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AttachFailed { category, .. } => *category,
            Self::AttachTimeout(_) | Self::NotAttached => ErrorCategory::Other,
        }
    }
}
