use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Frame source backed by an image file or a directory of image files.
///
/// Directory entries are served in lexicographic order, one per
/// `next_frame` call, then the source reports exhaustion. Stands in for a
/// live camera in batch and test workflows.
pub struct ImageDirFrameSource {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageDirFrameSource {
    pub fn open(input: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let paths = if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_image(p))
                .collect();
            found.sort();
            found
        } else if input.is_file() {
            vec![input.to_path_buf()]
        } else {
            return Err(format!("Input not found: {}", input.display()).into());
        };

        if paths.is_empty() {
            return Err(format!("No image files in {}", input.display()).into());
        }
        Ok(Self { paths, next: 0 })
    }

    /// Total number of frames this source will serve.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageDirFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;

        let rgb = image::open(path)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(Some(Frame::new(rgb.into_raw(), width, height)))
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
