use std::time::SystemTime;

use crate::shared::face_box::FaceBox;

/// A recognized face surfaced by the scan loop.
///
/// Only known faces become events; unknown detections are reported to
/// the observer as part of the per-tick face count.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanEvent {
    pub label: String,
    pub distance: f64,
    pub face: FaceBox,
    pub timestamp: SystemTime,
    /// Whether the match cleared the alert margin below the threshold.
    pub high_confidence: bool,
}
