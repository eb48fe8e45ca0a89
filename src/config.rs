use std::path::PathBuf;

use crate::manipulation::Degradation;
use crate::pipeline::DetectorKind;

pub const DEFAULT_DNN_PATH: &str = "models/version-RFB-320.onnx";
pub const DEFAULT_FAST_MODEL_PATH: &str = "models/seeta_fd_frontal_v1.0.bin";
pub const DEFAULT_OUTPUT: &str = "blurred.png";

/// Everything a run needs, fixed once arguments are parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub inputs: Vec<PathBuf>,
    pub detector: DetectorKind,
    pub degradation: Degradation,
    /// Overwritten by every processed image
    pub output: PathBuf,
    pub preview: bool,
    pub threads: usize,
}
