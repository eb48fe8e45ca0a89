use anyhow::Result;
use image::RgbImage;
use std::fmt;
use tracing::{Level, info, span};

use crate::shapes::rect::Rect;
use classical::ClassicalDetector;
use detection::DnnDetector;
pub use model::{ModelError, ModelSource};

mod classical;
mod detection;
mod model;

#[cfg(feature = "embedded-model")]
pub use model::EMBEDDED_DNN;

pub const DEFAULT_THRESHOLD: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bounds: Rect,
    pub confidence: f32,
}

pub trait FaceDetector {
    fn detect(&mut self, img: &RgbImage) -> Result<Vec<Detection>>;
}

/// Detector chosen for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorKind {
    Dnn { model: ModelSource, threshold: f32 },
    Classical { model: ModelSource },
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorKind::Dnn { model, .. } => write!(f, "network detector ({model})"),
            DetectorKind::Classical { model } => write!(f, "classical detector ({model})"),
        }
    }
}

pub fn load_detector(
    kind: &DetectorKind,
    threads: usize,
) -> Result<Box<dyn FaceDetector>, ModelError> {
    let span = span!(Level::DEBUG, "load_detector");
    let _guard = span.enter();

    info!("Loading {kind}");
    Ok(match kind {
        DetectorKind::Dnn { model, threshold } => Box::new(DnnDetector::new(
            model,
            model::ULTRAFACE_RFB_320,
            *threshold,
            threads,
        )?),
        DetectorKind::Classical { model } => Box::new(ClassicalDetector::new(model)?),
    })
}

/// Greedy non-maximum suppression: most confident first, dropping anything
/// that overlaps an accepted detection by more than `limit_pct`.
pub fn suppress_overlaps(mut candidates: Vec<Detection>, limit_pct: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut results: Vec<Detection> = Vec::new();
    for candidate in candidates {
        let better_found = results
            .iter()
            .any(|d| d.bounds.overlap_pct(&candidate.bounds) > limit_pct);
        if !better_found {
            results.push(candidate);
        }
    }

    results
}
