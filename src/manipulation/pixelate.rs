use super::Executable;
use super::util;
use crate::shapes::rect::Rect;
use anyhow::{Error, Result};
use image::RgbImage;
use image::imageops::{FilterType, resize};

#[derive(Debug, Clone)]
pub struct Pixelate {
    pub(super) target: Rect,
    factor: u32,
}

impl Pixelate {
    pub fn new(target: Rect, factor: u32) -> Self {
        Self { target, factor }
    }
}

/// Shrink by `factor` then grow back to the original size, both nearest
/// neighbour. The output always has the input's dimensions.
pub fn pixelate(chip: &RgbImage, factor: u32) -> RgbImage {
    let (w, h) = chip.dimensions();
    let small = resize(
        chip,
        (w / factor).max(1),
        (h / factor).max(1),
        FilterType::Nearest,
    );
    resize(&small, w, h, FilterType::Nearest)
}

impl Executable for Pixelate {
    fn execute(&self, img: &mut RgbImage) -> Result<()> {
        if self.factor == 0 {
            return Err(Error::msg("Pixelation factor must be at least 1"));
        }

        let chip = util::image_at(self.target, img)?;
        util::paste(img, self.target, &pixelate(&chip, self.factor));

        Ok(())
    }
}
