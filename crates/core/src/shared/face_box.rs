/// Axis-aligned bounding box of a detected face, in frame pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceBox {
    /// Builds a box from floating-point corners, clamped to frame bounds.
    ///
    /// Detections that fall entirely outside the frame collapse to a
    /// zero-area box at the nearest edge.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64, frame_w: u32, frame_h: u32) -> Self {
        let max_x = frame_w as f64;
        let max_y = frame_h as f64;
        let cx1 = x1.clamp(0.0, max_x);
        let cy1 = y1.clamp(0.0, max_y);
        let cx2 = x2.clamp(cx1, max_x);
        let cy2 = y2.clamp(cy1, max_y);
        Self {
            x: cx1.round() as i32,
            y: cy1.round() as i32,
            width: (cx2 - cx1).round() as i32,
            height: (cy2 - cy1).round() as i32,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_from_corners_inside_frame() {
        let b = FaceBox::from_corners(10.2, 20.6, 110.2, 220.6, 640, 480);
        assert_eq!(b, FaceBox { x: 10, y: 21, width: 100, height: 200 });
    }

    #[test]
    fn test_from_corners_clamps_to_frame() {
        let b = FaceBox::from_corners(-30.0, -10.0, 50.0, 50.0, 640, 480);
        assert_eq!(b, FaceBox { x: 0, y: 0, width: 50, height: 50 });
    }

    #[test]
    fn test_from_corners_clamps_bottom_right() {
        let b = FaceBox::from_corners(600.0, 400.0, 700.0, 500.0, 640, 480);
        assert_eq!(b, FaceBox { x: 600, y: 400, width: 40, height: 80 });
    }

    #[rstest]
    #[case::fully_left(-100.0, 10.0, -50.0, 60.0)]
    #[case::fully_below(10.0, 500.0, 60.0, 550.0)]
    fn test_outside_frame_is_degenerate(
        #[case] x1: f64,
        #[case] y1: f64,
        #[case] x2: f64,
        #[case] y2: f64,
    ) {
        let b = FaceBox::from_corners(x1, y1, x2, y2, 640, 480);
        assert!(b.is_degenerate());
    }

    #[test]
    fn test_inverted_corners_collapse() {
        let b = FaceBox::from_corners(100.0, 100.0, 50.0, 50.0, 640, 480);
        assert!(b.is_degenerate());
    }
}
