use super::{Executable, MAX_PADDING};
use super::util;
use crate::shapes::rect::Rect;
use anyhow::{Error, Result};
use image::RgbImage;
use imageproc::filter::gaussian_blur_f32;

#[derive(Debug, Clone)]
pub struct Blur {
    pub(super) target: Rect,
    sigma: f32,
    padding: f32,
}

impl Blur {
    pub fn new(target: Rect, sigma: f32, padding: f32) -> Self {
        Self {
            target,
            sigma,
            padding,
        }
    }

    /// Region read from the source image before blurring.
    pub fn padded_bounds(&self) -> Rect {
        self.target.padded(self.padding)
    }
}

impl Executable for Blur {
    fn execute(&self, img: &mut RgbImage) -> Result<()> {
        if self.sigma <= 0. {
            return Err(Error::msg(format!(
                "Blur sigma must be positive, got {}",
                self.sigma
            )));
        }
        if !(1. ..=MAX_PADDING).contains(&self.padding) {
            return Err(Error::msg(format!(
                "Blur padding must be between 1 and {MAX_PADDING}, got {}",
                self.padding
            )));
        }

        let chip = util::image_at(self.padded_bounds(), img)?;
        let blurred = gaussian_blur_f32(&chip, self.sigma);

        // The face sits at the centre of the padded chip
        let inner = Rect::from_center(
            (blurred.width() / 2) as i32,
            (blurred.height() / 2) as i32,
            self.target.w,
            self.target.h,
        );
        let face = util::image_at(inner, &blurred)?;
        util::paste(img, self.target, &face);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn checkerboard(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn test_padded_bounds() {
        let target = Rect::from_tl(30, 40, 20, 10);
        let blur = Blur::new(target, 3., 2.);
        let bounds = blur.padded_bounds();

        assert_eq!((bounds.w, bounds.h), (40, 20));
        assert_eq!(bounds.center(), target.center());
    }

    #[test]
    fn test_blurs_only_target() {
        let original = checkerboard(64, 48);
        let mut img = original.clone();
        let target = Rect::from_tl(20, 10, 16, 12);

        Blur::new(target, 3., 2.).execute(&mut img).unwrap();

        for (x, y, px) in img.enumerate_pixels() {
            let (xi, yi) = (x as i32, y as i32);
            let inside = xi >= target.left()
                && xi < target.right()
                && yi >= target.top()
                && yi < target.bottom();
            if inside {
                assert_ne!(px, original.get_pixel(x, y), "({x}, {y}) not blurred");
            } else {
                assert_eq!(px, original.get_pixel(x, y), "({x}, {y}) changed");
            }
        }
    }

    #[test]
    fn test_blur_at_image_edge() {
        let original = checkerboard(32, 32);
        let mut img = original.clone();

        Blur::new(Rect::from_tl(24, -4, 16, 16), 3., 2.)
            .execute(&mut img)
            .unwrap();

        assert_eq!(img.dimensions(), (32, 32));
        assert_ne!(img.get_pixel(28, 4), original.get_pixel(28, 4));
        assert_eq!(img.get_pixel(10, 20), original.get_pixel(10, 20));
    }

    #[test]
    fn test_rejects_oversized_padding() {
        let original = checkerboard(64, 64);
        let mut img = original.clone();

        let blur = Blur::new(Rect::from_tl(10, 10, 20, 20), 3., 1e9);
        assert!(blur.execute(&mut img).is_err());
        assert!(Blur::new(Rect::from_tl(10, 10, 20, 20), 3., f32::NAN)
            .execute(&mut img)
            .is_err());
        assert_eq!(img, original);
    }

    #[test]
    fn test_rejects_oversized_chip() {
        let mut img = checkerboard(64, 64);
        let blur = Blur::new(Rect::from_tl(-20000, -20000, 40000, 40000), 3., 2.);

        let err = blur.execute(&mut img).unwrap_err();
        assert!(err.to_string().contains("exceeds"), "{err}");
    }

    #[test]
    fn test_rejects_non_positive_sigma() {
        let mut img = checkerboard(8, 8);
        let blur = Blur::new(Rect::from_tl(0, 0, 4, 4), 0., 2.);
        assert!(blur.execute(&mut img).is_err());
    }
}
