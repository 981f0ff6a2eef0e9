use crate::shared::frame::Frame;

/// Domain interface for frame acquisition.
///
/// `Ok(None)` means the source is exhausted (end of a file-backed stream);
/// live sources block until a frame is available.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;
}
