//! facesync-feed — frame input for the detection loop.
//!
//! Frames arrive as JSON lines from an upstream face detector/extractor,
//! each carrying the faces it found with their embeddings.

pub mod frame;
pub mod source;

pub use frame::Frame;
pub use source::{FeedError, FrameSource, JsonLinesSource};
