use std::path::Path;

use crate::recognition::domain::descriptor_source::{DescriptorSource, Detection};
use crate::shared::descriptor::Descriptor;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Fallback detector input resolution when the model doesn't specify one.
const DEFAULT_DETECTOR_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// ArcFace input resolution.
const EMBED_INPUT_SIZE: usize = 112;
const EMBED_NORM_MEAN: f32 = 127.5;
const EMBED_NORM_STD: f32 = 127.5;

/// Descriptor source backed by two ONNX Runtime sessions: a YOLO face
/// detector and an ArcFace embedding model.
///
/// Detection handles letterbox preprocessing, confidence filtering, and
/// greedy NMS; each surviving box is cropped, resized to the embedding
/// input size, and embedded. Embeddings are L2-normalized so Euclidean
/// distances fall in [0, 2].
pub struct OnnxDescriptorSource {
    detector: ort::session::Session,
    embedder: ort::session::Session,
    confidence: f64,
    detector_input_size: u32,
}

impl OnnxDescriptorSource {
    /// Load both ONNX models and prepare for inference.
    ///
    /// The detector input resolution is read from the model's input shape
    /// (expecting NCHW), falling back to 640 when dynamic or unreadable.
    pub fn new(
        detector_model: &Path,
        embedding_model: &Path,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let detector = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(detector_model)?;

        let embedder = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(embedding_model)?;

        let detector_input_size = detector
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    // NCHW: [N, C, H, W] — H and W are equal for square input
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_DETECTOR_INPUT_SIZE);

        Ok(Self {
            detector,
            embedder,
            confidence,
            detector_input_size,
        })
    }

    fn detect_boxes(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.detector_input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.detector.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Detector model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape();

        // YOLO output is [1, features, detections] (transposed) or
        // [1, detections, features]. Handle both.
        let (num_dets, num_feats, transposed) = if shape.len() == 3 {
            if shape[1] < shape[2] {
                (shape[2], shape[1], true)
            } else {
                (shape[1], shape[2], false)
            }
        } else {
            return Err(format!("Unexpected detector output shape: {shape:?}").into());
        };

        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw_dets = Vec::new();
        for i in 0..num_dets {
            let row = if transposed {
                (0..num_feats)
                    .map(|f| data[f * num_dets + i])
                    .collect::<Vec<f32>>()
            } else {
                data[i * num_feats..(i + 1) * num_feats].to_vec()
            };

            // row format: [cx, cy, w, h, conf, ...]
            if row.len() < 5 {
                continue;
            }
            let conf = row[4] as f64;
            if conf < self.confidence {
                continue;
            }

            let cx = row[0] as f64;
            let cy = row[1] as f64;
            let w = row[2] as f64;
            let h = row[3] as f64;

            // Map letterbox coords back to original frame coords
            raw_dets.push(RawDetection {
                x1: ((cx - w / 2.0) - pad_x as f64) / scale,
                y1: ((cy - h / 2.0) - pad_y as f64) / scale,
                x2: ((cx + w / 2.0) - pad_x as f64) / scale,
                y2: ((cy + h / 2.0) - pad_y as f64) / scale,
                confidence: conf,
            });
        }

        Ok(nms(&mut raw_dets, NMS_IOU_THRESH))
    }

    fn embed(&mut self, frame: &Frame, face: &FaceBox) -> Result<Descriptor, Box<dyn std::error::Error>> {
        let tensor = preprocess_crop(frame, face);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.embedder.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Embedding model produced no outputs".into());
        }
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;

        let mut embedding = embedding_slice.to_vec();
        l2_normalize(&mut embedding);
        Ok(Descriptor::new(embedding))
    }
}

impl DescriptorSource for OnnxDescriptorSource {
    fn detect_single_best(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<Descriptor>, Box<dyn std::error::Error>> {
        let boxes = self.detect_boxes(frame)?;
        let Some(best) = boxes.iter().max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        }) else {
            return Ok(None);
        };

        let face = best.to_face_box(frame.width(), frame.height());
        if face.is_degenerate() {
            return Ok(None);
        }
        self.embed(frame, &face).map(Some)
    }

    fn detect_all(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let boxes = self.detect_boxes(frame)?;
        let mut detections = Vec::with_capacity(boxes.len());
        for raw in &boxes {
            let face = raw.to_face_box(frame.width(), frame.height());
            if face.is_degenerate() {
                continue;
            }
            let descriptor = self.embed(frame, &face)?;
            detections.push(Detection { face, descriptor });
        }
        Ok(detections)
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Pad with 114/255 gray, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray(); // [H, W, C] u8
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize into the padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

/// Crop a face region, resize to the embedding input size, normalize,
/// NCHW layout.
fn preprocess_crop(frame: &Frame, face: &FaceBox) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let crop_w = face.width.max(1) as f64;
    let crop_h = face.height.max(1) as f64;
    let max_y = (frame.height() as usize).saturating_sub(1);
    let max_x = (frame.width() as usize).saturating_sub(1);

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, EMBED_INPUT_SIZE, EMBED_INPUT_SIZE));

    for y in 0..EMBED_INPUT_SIZE {
        let fy = (y as f64 + 0.5) * crop_h / EMBED_INPUT_SIZE as f64;
        let src_y = ((face.y as f64 + fy) as usize).min(max_y);
        for x in 0..EMBED_INPUT_SIZE {
            let fx = (x as f64 + 0.5) * crop_w / EMBED_INPUT_SIZE as f64;
            let src_x = ((face.x as f64 + fx) as usize).min(max_x);
            for c in 0..3 {
                tensor[[0, c, y, x]] =
                    (src[[src_y, src_x, c]] as f32 - EMBED_NORM_MEAN) / EMBED_NORM_STD;
            }
        }
    }

    tensor
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
}

impl RawDetection {
    fn to_face_box(&self, frame_w: u32, frame_h: u32) -> FaceBox {
        FaceBox::from_corners(self.x1, self.y1, self.x2, self.y2, frame_w, frame_h)
    }
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && bbox_iou(&dets[i], &dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &RawDetection, b: &RawDetection) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
