#![warn(unused_extern_crates)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use image::{ImageFormat, RgbImage};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{Level, debug, info, span, trace, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::{Config, DEFAULT_DNN_PATH, DEFAULT_FAST_MODEL_PATH, DEFAULT_OUTPUT};
use crate::manipulation::{
    DEFAULT_PADDING, DEFAULT_PIXEL_FACTOR, DEFAULT_SIGMA, Degradation, Executable, MAX_PADDING,
    Operation,
};
use crate::pipeline::{DEFAULT_THRESHOLD, DetectorKind, FaceDetector, ModelSource};
use crate::preview::Preview;

mod config;
mod files;
mod manipulation;
mod pipeline;
mod preview;
mod shapes;

#[derive(Parser, Debug)]
#[command(version, about = "Blur the faces found in a batch of images", long_about = None)]
struct CmdArgs {
    /// Image files, or directories to search for images
    paths: Vec<PathBuf>,

    /// Path to the face detection network
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DNN_PATH, conflicts_with = "fast")]
    dnn: PathBuf,

    /// Use the classical detector instead of the network
    #[arg(long)]
    fast: bool,

    /// Path to the classical detector model
    #[arg(long, value_name = "PATH", default_value = DEFAULT_FAST_MODEL_PATH)]
    fast_model: PathBuf,

    /// Size of the gaussian blur kernel
    #[arg(long, default_value_t = DEFAULT_SIGMA, value_parser = positive_f32)]
    sigma: f32,

    /// Blurred area around each face, as a multiple of the face size
    #[arg(long, default_value_t = DEFAULT_PADDING, value_parser = padding_factor)]
    padding: f32,

    /// Pixelate faces instead of blurring them
    #[arg(long)]
    pixelate: bool,

    /// Downsampling factor used by --pixelate
    #[arg(long, default_value_t = DEFAULT_PIXEL_FACTOR, value_parser = clap::value_parser!(u32).range(1..))]
    pixel_factor: u32,

    /// Minimum network confidence for a face
    #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_parser = unit_f32)]
    threshold: f32,

    /// Where to write each processed image
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Show each image before and after editing (needs ffplay)
    #[arg(long)]
    preview: bool,

    /// Threads available to the network, defaults to the CPU count
    #[arg(long)]
    threads: Option<usize>,

    /// Use the network compiled into this binary
    #[cfg(feature = "embedded-model")]
    #[arg(long, conflicts_with_all = ["dnn", "fast"])]
    embedded: bool,
}

fn positive_f32(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if v > 0. && v.is_finite() {
        Ok(v)
    } else {
        Err(format!("must be greater than 0, got {v}"))
    }
}

fn padding_factor(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if (1. ..=MAX_PADDING).contains(&v) {
        Ok(v)
    } else {
        Err(format!("must be between 1 and {MAX_PADDING}, got {v}"))
    }
}

fn unit_f32(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if (0. ..=1.).contains(&v) {
        Ok(v)
    } else {
        Err(format!("must be between 0 and 1, got {v}"))
    }
}

impl CmdArgs {
    fn dnn_source(&self) -> ModelSource {
        #[cfg(feature = "embedded-model")]
        if self.embedded {
            return ModelSource::Embedded(pipeline::EMBEDDED_DNN);
        }

        ModelSource::Path(self.dnn.clone())
    }

    fn into_config(self) -> Config {
        let detector = if self.fast {
            DetectorKind::Classical {
                model: ModelSource::Path(self.fast_model.clone()),
            }
        } else {
            DetectorKind::Dnn {
                model: self.dnn_source(),
                threshold: self.threshold,
            }
        };

        let degradation = if self.pixelate {
            Degradation::Pixelate {
                factor: self.pixel_factor,
            }
        } else {
            Degradation::Blur {
                sigma: self.sigma,
                padding: self.padding,
            }
        };

        Config {
            inputs: self.paths,
            detector,
            degradation,
            output: self.output,
            preview: self.preview,
            threads: self.threads.unwrap_or_else(num_cpus::get).max(1),
        }
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    println!("Face Blur");
    let args = CmdArgs::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: CmdArgs) -> Result<()> {
    if args.paths.is_empty() {
        CmdArgs::command().print_help()?;
        return Ok(());
    }

    let config = args.into_config();
    debug!("{config:?}");

    for input in &config.inputs {
        println!("{}", input.display());
    }

    let files = files::collect_images(&config.inputs);
    if files.is_empty() {
        println!("no images found");
        return Ok(());
    }

    let mut detector = pipeline::load_detector(&config.detector, config.threads)?;
    println!("processing {} images", files.len());

    let mut preview = None;
    for file in &files {
        let faces = process_image(file, &config, detector.as_mut(), &mut preview)?;
        info!("{faces} faces in {:?}", file);
    }

    Ok(())
}

fn process_image(
    src: &Path,
    config: &Config,
    detector: &mut dyn FaceDetector,
    preview: &mut Option<Preview>,
) -> Result<usize> {
    let span = span!(Level::INFO, "process_image", path = %src.display());
    let _guard = span.enter();
    let start = Instant::now();

    let mut img = image::open(src)
        .with_context(|| format!("failed to load {}", src.display()))?
        .into_rgb8();

    if config.preview {
        reopen(preview, Preview::open(&img));
    }

    let faces = redact_faces(&mut img, detector, config.degradation)?;

    if let Some(p) = preview.as_mut() {
        if let Err(e) = p.show(&img) {
            warn!("Failed to update preview: {e:?}");
        }
    }

    img.save_with_format(&config.output, ImageFormat::Png)
        .with_context(|| format!("failed to save {}", config.output.display()))?;
    debug!("Took {:?}", start.elapsed());

    Ok(faces)
}

/// Replace the window in `slot`. On failure the old window is closed too,
/// since it no longer matches the image being edited.
fn reopen<T>(slot: &mut Option<T>, opened: Result<T>) {
    match opened {
        Ok(p) => *slot = Some(p),
        Err(e) => {
            *slot = None;
            warn!("Preview unavailable: {e:?}");
        }
    }
}

/// Detect faces in `img` and degrade each one in place. Returns the number
/// of faces found.
fn redact_faces(
    img: &mut RgbImage,
    detector: &mut dyn FaceDetector,
    degradation: Degradation,
) -> Result<usize> {
    let detections = detector.detect(img)?;
    debug!("Detected {} faces", detections.len());

    for detection in &detections {
        trace!("{detection:?}");
        Operation::new(degradation, detection.bounds).execute(img)?;
    }

    Ok(detections.len())
}
