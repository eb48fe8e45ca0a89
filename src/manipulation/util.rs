use crate::shapes::rect::Rect;
use anyhow::{Error, Result};
use image::RgbImage;

/// Largest chip `image_at` will allocate.
pub const MAX_CHIP_PIXELS: u64 = 1 << 28;

/// Copy of `src` under `bounds`. Pixels outside `src` repeat the nearest
/// edge pixel.
pub fn image_at(bounds: Rect, src: &RgbImage) -> Result<RgbImage> {
    if src.width() == 0 || src.height() == 0 {
        return Err(Error::msg("Cannot extract a chip from an empty image"));
    }
    if bounds.area() > MAX_CHIP_PIXELS {
        return Err(Error::msg(format!(
            "Chip of {}x{} exceeds {MAX_CHIP_PIXELS} pixels",
            bounds.w, bounds.h
        )));
    }

    let max_x = src.width() as i64 - 1;
    let max_y = src.height() as i64 - 1;
    let left = bounds.left();
    let top = bounds.top();

    Ok(RgbImage::from_fn(bounds.w, bounds.h, |x, y| {
        let sx = (left as i64 + x as i64).clamp(0, max_x);
        let sy = (top as i64 + y as i64).clamp(0, max_y);
        *src.get_pixel(sx as u32, sy as u32)
    }))
}

/// Write `chip` into `img` with its top left corner at `dest`'s.
///
/// Only the intersection of `dest`, the chip and the image is touched.
/// Returns the number of pixels written.
pub fn paste(img: &mut RgbImage, dest: Rect, chip: &RgbImage) -> usize {
    let window = Rect::from_tl(
        dest.left(),
        dest.top(),
        dest.w.min(chip.width()),
        dest.h.min(chip.height()),
    );
    let Some(window) = window.clip(img.width(), img.height()) else {
        return 0;
    };

    for y in window.top()..window.bottom() {
        for x in window.left()..window.right() {
            let px = *chip.get_pixel((x - dest.left()) as u32, (y - dest.top()) as u32);
            img.put_pixel(x as u32, y as u32, px);
        }
    }

    window.area() as usize
}
