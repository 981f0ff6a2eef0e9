pub const DETECTOR_MODEL_NAME: &str = "yolov8n-face.onnx";
pub const DETECTOR_MODEL_URL: &str =
    "https://github.com/facewatch/facewatch/releases/download/v0.1.0/yolov8n-face.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/facewatch/facewatch/releases/download/v0.1.0/w600k_r50.onnx";

/// Inclusive nearest-neighbor match threshold used when none is given.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.45;

/// How far below the match threshold a distance must fall before a match
/// is promoted to a high-confidence event. Policy parameter, not a tuned
/// constant.
pub const DEFAULT_ALERT_MARGIN: f64 = 0.03;

/// Bounds the requested enrollment sample count is clamped to.
pub const MIN_SAMPLE_COUNT: usize = 3;
pub const MAX_SAMPLE_COUNT: usize = 15;

/// Capture attempts allowed per requested sample before enrollment gives up.
pub const ENROLL_ATTEMPTS_PER_SAMPLE: usize = 6;

/// Pause between enrollment capture attempts, so head pose can vary
/// between samples.
pub const DEFAULT_SAMPLE_DELAY_MS: u64 = 180;

pub const DEFAULT_SCAN_PERIOD_MS: u64 = 200;

/// Key under which the enrollment document is persisted.
pub const ENROLLMENT_STORAGE_KEY: &str = "face_enrollments_v1";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
