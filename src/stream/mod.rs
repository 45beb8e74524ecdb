//! Stream lifecycle: start a source, wait for its manifest, list and
//! control streams known to the backend.

pub mod lifecycle;
pub mod types;

pub use lifecycle::{media_origin, playable_url, StreamError, StreamLifecycleController};
pub use types::{StartAck, StartedStream, Stream, StreamStatus};
