use anyhow::Result;
pub use blur::Blur;
use image::RgbImage;
pub use pixelate::Pixelate;
use tracing::trace;

use crate::shapes::rect::Rect;

mod blur;
mod pixelate;
mod util;

pub const DEFAULT_SIGMA: f32 = 3.;
pub const DEFAULT_PADDING: f32 = 2.;
pub const MAX_PADDING: f32 = 16.;
pub const DEFAULT_PIXEL_FACTOR: u32 = 8;

/// How a detected face gets obscured. One policy is chosen per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Degradation {
    /// Gaussian blur over a chip `padding` times the face size, so the blur
    /// has real pixels to pull from at the face border.
    Blur { sigma: f32, padding: f32 },
    /// Nearest neighbour down then up sampling by `factor`.
    Pixelate { factor: u32 },
}

impl Default for Degradation {
    fn default() -> Self {
        Degradation::Blur {
            sigma: DEFAULT_SIGMA,
            padding: DEFAULT_PADDING,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Operation {
    Blur(Blur),
    Pixelate(Pixelate),
}

impl From<Blur> for Operation {
    fn from(o: Blur) -> Operation {
        Operation::Blur(o)
    }
}

impl From<Pixelate> for Operation {
    fn from(o: Pixelate) -> Operation {
        Operation::Pixelate(o)
    }
}

pub trait Executable {
    fn execute(&self, img: &mut RgbImage) -> Result<()>;
}

impl Operation {
    pub fn new(degradation: Degradation, target: Rect) -> Operation {
        match degradation {
            Degradation::Blur { sigma, padding } => Blur::new(target, sigma, padding).into(),
            Degradation::Pixelate { factor } => Pixelate::new(target, factor).into(),
        }
    }

    fn target(&self) -> Rect {
        match self {
            Operation::Blur(o) => o.target,
            Operation::Pixelate(o) => o.target,
        }
    }
}

impl Executable for Operation {
    fn execute(&self, img: &mut RgbImage) -> Result<()> {
        let target = self.target();
        if target.is_empty() || target.clip(img.width(), img.height()).is_none() {
            trace!("Skipping {target:?}, nothing to edit");
            return Ok(());
        }

        match self {
            Operation::Blur(o) => o.execute(img),
            Operation::Pixelate(o) => o.execute(img),
        }
    }
}
