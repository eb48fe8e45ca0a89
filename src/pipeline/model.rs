use std::fmt;
use std::path::PathBuf;

use ort::execution_providers::XNNPACKExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
pub use ort::session::Session;
use ort::value::ValueType;
use thiserror::Error;
use tracing::debug;

#[cfg(feature = "embedded-model")]
pub const EMBEDDED_DNN: &[u8] = include_bytes!(env!("FACEBLUR_EMBEDDED_MODEL"));

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("model {model} is malformed: {reason}")]
    Malformed { model: String, reason: String },
}

impl ModelError {
    pub fn malformed(source: &ModelSource, reason: impl fmt::Display) -> ModelError {
        ModelError::Malformed {
            model: source.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Where model weights come from. Read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    Path(PathBuf),
    Embedded(&'static [u8]),
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Path(p) => write!(f, "{}", p.display()),
            ModelSource::Embedded(bytes) => write!(f, "<embedded, {} bytes>", bytes.len()),
        }
    }
}

impl ModelSource {
    pub fn ensure_exists(&self) -> Result<(), ModelError> {
        match self {
            ModelSource::Path(p) if !p.is_file() => Err(ModelError::NotFound(p.clone())),
            _ => Ok(()),
        }
    }
}

/// Input/output schema of a face detection network.
///
/// The weights file carries the layer graph itself; this is what the code
/// around the session relies on: an NCHW RGB input of fixed size, per
/// channel `(v - mean) / scale` normalisation, a `[1, N, 2]` score tensor
/// (background, face) and a `[1, N, 4]` box tensor of normalised corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkDescriptor {
    pub name: &'static str,
    pub input: &'static str,
    pub width: u32,
    pub height: u32,
    pub mean: f32,
    pub scale: f32,
    pub scores: &'static str,
    pub boxes: &'static str,
    /// Boxes overlapping a better one by more than this are dropped
    pub overlap_limit_pct: f32,
}

/// Ultra-Light-Fast-Generic-Face-Detector, RFB variant at 320x240.
pub const ULTRAFACE_RFB_320: NetworkDescriptor = NetworkDescriptor {
    name: "version-RFB-320",
    input: "input",
    width: 320,
    height: 240,
    mean: 127.,
    scale: 128.,
    scores: "scores",
    boxes: "boxes",
    overlap_limit_pct: 30.,
};

impl NetworkDescriptor {
    pub fn input_shape(&self) -> [i64; 4] {
        [1, 3, self.height as i64, self.width as i64]
    }

    /// Expected `(name, shape)` of each output; `-1` is any size.
    pub fn output_shapes(&self) -> [(&'static str, [i64; 3]); 2] {
        [(self.scores, [1, -1, 2]), (self.boxes, [1, -1, 4])]
    }

    /// Check a session's declared tensors against this schema. Dynamic
    /// dimensions (negative) match anything.
    pub fn check(
        &self,
        inputs: &[(String, Vec<i64>)],
        outputs: &[(String, Vec<i64>)],
    ) -> Result<(), String> {
        let Some((_, dims)) = inputs.iter().find(|(name, _)| name == self.input) else {
            return Err(format!("{} has no input named {:?}", self.name, self.input));
        };

        let expected = self.input_shape();
        if !shape_matches(dims, &expected) {
            return Err(format!(
                "{} expects input {:?} with shape {:?}, found {:?}",
                self.name, self.input, expected, dims
            ));
        }

        for (output, expected) in self.output_shapes() {
            let Some((_, dims)) = outputs.iter().find(|(name, _)| name == output) else {
                return Err(format!("{} has no output named {:?}", self.name, output));
            };
            if !shape_matches(dims, &expected) {
                return Err(format!(
                    "{} expects output {:?} with shape {:?}, found {:?}",
                    self.name, output, expected, dims
                ));
            }
        }

        Ok(())
    }
}

fn shape_matches(dims: &[i64], expected: &[i64]) -> bool {
    dims.len() == expected.len()
        && dims
            .iter()
            .zip(expected)
            .all(|(d, e)| *d < 0 || *e < 0 || d == e)
}

fn tensor_dims(value: &ValueType) -> Vec<i64> {
    match value {
        ValueType::Tensor { dimensions, .. } => dimensions.clone(),
        _ => Vec::new(),
    }
}

pub fn initialize_model(
    source: &ModelSource,
    network: &NetworkDescriptor,
    threads: usize,
) -> Result<Session, ModelError> {
    source.ensure_exists()?;

    let session = build_session(source, threads).map_err(|e| ModelError::malformed(source, e))?;

    let inputs: Vec<(String, Vec<i64>)> = session
        .inputs
        .iter()
        .map(|i| (i.name.clone(), tensor_dims(&i.input_type)))
        .collect();
    let outputs: Vec<(String, Vec<i64>)> = session
        .outputs
        .iter()
        .map(|o| (o.name.clone(), tensor_dims(&o.output_type)))
        .collect();
    debug!("Model inputs {inputs:?}, outputs {outputs:?}");

    network
        .check(&inputs, &outputs)
        .map_err(|reason| ModelError::malformed(source, reason))?;

    Ok(session)
}

fn build_session(source: &ModelSource, threads: usize) -> ort::Result<Session> {
    // Falls back to the default CPU provider when XNNPACK is unavailable
    ort::init()
        .with_execution_providers([XNNPACKExecutionProvider::default().build()])
        .commit()?;

    let builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(threads.max(1))?;

    match source {
        ModelSource::Path(p) => builder.commit_from_file(p),
        ModelSource::Embedded(bytes) => builder.commit_from_memory(bytes),
    }
}
