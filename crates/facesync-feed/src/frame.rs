use facesync_core::FaceObservation;
use serde::Deserialize;

/// One frame's worth of face observations.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Frame {
    /// Frame number as reported upstream; filled in by the source when absent.
    #[serde(default)]
    pub sequence: u64,
    #[serde(default)]
    pub faces: Vec<FaceObservation>,
}

impl Frame {
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}
