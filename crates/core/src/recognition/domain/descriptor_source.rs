use crate::shared::descriptor::Descriptor;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// One detected face with its bounding box and embedding.
#[derive(Clone, Debug)]
pub struct Detection {
    pub face: FaceBox,
    pub descriptor: Descriptor,
}

/// Domain interface for face detection and embedding.
///
/// Implementations typically hold inference sessions, hence `&mut self`.
/// Both calls may legitimately find nothing, and may take unbounded
/// (normally sub-second) time.
pub trait DescriptorSource: Send {
    /// Descriptor of the single most confident face, if any.
    fn detect_single_best(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<Descriptor>, Box<dyn std::error::Error>>;

    /// Every detected face with its bounding box and descriptor.
    fn detect_all(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
