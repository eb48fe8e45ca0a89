use super::{Detection, FaceDetector, ModelError, ModelSource};
use crate::shapes::rect::Rect;
use anyhow::Result;
use image::RgbImage;
use image::imageops::grayscale;
use rustface::ImageData;
use std::fs::File;
use std::io::{BufReader, Cursor};
use tracing::{Level, span};

const MIN_FACE_SIZE: u32 = 20;
const SCORE_THRESHOLD: f64 = 2.0;
const PYRAMID_SCALE_FACTOR: f32 = 0.8;
const SLIDE_WINDOW_STEP: u32 = 4;

/// SeetaFace cascade run by `rustface` over a grayscale image pyramid.
/// Faster than the network, less robust to pose and lighting.
pub struct ClassicalDetector {
    detector: Box<dyn rustface::Detector>,
}

impl ClassicalDetector {
    pub fn new(source: &ModelSource) -> Result<ClassicalDetector, ModelError> {
        source.ensure_exists()?;

        let model = match source {
            ModelSource::Path(p) => {
                let file = File::open(p).map_err(|e| ModelError::malformed(source, e))?;
                rustface::read_model(BufReader::new(file))
            }
            ModelSource::Embedded(bytes) => rustface::read_model(Cursor::new(*bytes)),
        }
        .map_err(|e| ModelError::malformed(source, e))?;

        let mut detector = rustface::create_detector_with_model(model);
        detector.set_min_face_size(MIN_FACE_SIZE);
        detector.set_score_thresh(SCORE_THRESHOLD);
        detector.set_pyramid_scale_factor(PYRAMID_SCALE_FACTOR);
        detector.set_slide_window_step(SLIDE_WINDOW_STEP, SLIDE_WINDOW_STEP);

        Ok(ClassicalDetector { detector })
    }
}

impl FaceDetector for ClassicalDetector {
    fn detect(&mut self, img: &RgbImage) -> Result<Vec<Detection>> {
        let span = span!(Level::DEBUG, "face_detector");
        let _guard = span.enter();

        if img.width() == 0 || img.height() == 0 {
            return Ok(Vec::new());
        }

        let gray = grayscale(img);
        let faces = self
            .detector
            .detect(&ImageData::new(gray.as_raw(), gray.width(), gray.height()));

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                Detection {
                    bounds: Rect::from_tl(bbox.x(), bbox.y(), bbox.width(), bbox.height()),
                    confidence: face.score() as f32,
                }
            })
            .collect())
    }
}
