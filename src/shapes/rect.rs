use super::point::Point;
use super::util::mult;

/// Axis aligned integer rectangle in image coordinates.
///
/// Stored as a centerpoint plus size. The centre is signed so that a
/// rectangle may hang off any edge of the image it refers to. `left`/`top`
/// are inclusive, `right`/`bottom` exclusive.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rect {
    // centerpoint
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    // Edges saturate at the i32 range instead of wrapping
    pub fn left(&self) -> i32 {
        self.x.saturating_sub((self.w / 2) as i32)
    }
    pub fn right(&self) -> i32 {
        (self.left() as i64 + self.w as i64).min(i32::MAX as i64) as i32
    }
    pub fn top(&self) -> i32 {
        self.y.saturating_sub((self.h / 2) as i32)
    }
    pub fn bottom(&self) -> i32 {
        (self.top() as i64 + self.h as i64).min(i32::MAX as i64) as i32
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x,
            y: self.y,
        }
    }

    pub fn from_tl(x: i32, y: i32, w: u32, h: u32) -> Rect {
        Rect {
            x: x.saturating_add((w / 2) as i32),
            y: y.saturating_add((h / 2) as i32),
            w,
            h,
        }
    }

    pub fn from_center(xc: i32, yc: i32, w: u32, h: u32) -> Rect {
        Rect { x: xc, y: yc, w, h }
    }

    /// Build from corner coordinates, `right`/`bottom` exclusive. Inverted
    /// corners give an empty rectangle.
    pub fn from_corners(left: i32, top: i32, right: i32, bottom: i32) -> Rect {
        let w = (right as i64 - left as i64).max(0) as u32;
        let h = (bottom as i64 - top as i64).max(0) as u32;
        Rect::from_tl(left, top, w, h)
    }

    /// Same centre, each side multiplied by `factor`.
    pub fn padded(&self, factor: f32) -> Rect {
        let center = self.center();
        Rect::from_center(center.x, center.y, mult(self.w, factor), mult(self.h, factor))
    }

    /// Intersection with a `width` x `height` image, if any.
    pub fn clip(&self, width: u32, height: u32) -> Option<Rect> {
        let left = self.left().max(0);
        let top = self.top().max(0);
        let right = self.right().min(width.min(i32::MAX as u32) as i32);
        let bottom = self.bottom().min(height.min(i32::MAX as u32) as i32);

        if left < right && top < bottom {
            Some(Rect::from_corners(left, top, right, bottom))
        } else {
            None
        }
    }

    pub fn overlap_pct(&self, other: &Rect) -> f32 {
        let x_min = self.left().max(other.left());
        let x_max = self.right().min(other.right());
        let y_min = self.top().max(other.top());
        let y_max = self.bottom().min(other.bottom());

        let overlap_area = if x_min < x_max && y_min < y_max {
            (x_max as i64 - x_min as i64) as u64 * (y_max as i64 - y_min as i64) as u64
        } else {
            0
        };

        let area_delta = self.area() + other.area() - overlap_area;

        if area_delta > 0 {
            overlap_area as f32 / area_delta as f32 * 100.
        } else {
            0.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tl_round_trip() {
        for (w, h) in [(4, 4), (5, 7), (1, 1), (0, 3)] {
            let r = Rect::from_tl(-3, 10, w, h);
            assert_eq!(r.left(), -3);
            assert_eq!(r.top(), 10);
            assert_eq!(r.right(), -3 + w as i32);
            assert_eq!(r.bottom(), 10 + h as i32);
        }
    }

    #[test]
    fn test_padded_keeps_center() {
        let r = Rect::from_tl(40, 20, 30, 50);
        let padded = r.padded(2.);

        assert_eq!(padded.w, 60);
        assert_eq!(padded.h, 100);
        assert_eq!(padded.center(), r.center());
        assert_eq!(padded.left(), r.left() - 15);
        assert_eq!(padded.top(), r.top() - 25);
    }

    #[test]
    fn test_padded_odd_size() {
        let r = Rect::from_tl(10, 10, 7, 9);
        let padded = r.padded(3.);

        assert_eq!((padded.w, padded.h), (21, 27));
        assert_eq!(padded.center(), r.center());
    }

    #[test]
    fn test_clip() {
        let r = Rect::from_tl(-5, 8, 20, 20);
        let clipped = r.clip(10, 20).unwrap();

        assert_eq!(clipped.left(), 0);
        assert_eq!(clipped.top(), 8);
        assert_eq!(clipped.right(), 10);
        assert_eq!(clipped.bottom(), 20);

        assert!(Rect::from_tl(12, 0, 5, 5).clip(10, 10).is_none());
        assert!(Rect::from_tl(-6, -6, 5, 5).clip(10, 10).is_none());
    }

    #[test]
    fn test_from_corners_inverted() {
        let r = Rect::from_corners(10, 10, 5, 20);
        assert!(r.is_empty());
    }

    #[test]
    fn test_extreme_corners_do_not_wrap() {
        let r = Rect::from_corners(i32::MIN, 0, i32::MAX, 10);
        assert_eq!(r.w, u32::MAX);
        assert_eq!(r.left(), i32::MIN);
        assert_eq!(r.right(), i32::MAX);

        let huge = Rect::from_tl(10, 10, 20, 20).padded(1e9);
        assert_eq!(huge.w, u32::MAX);
        assert!(huge.left() < 0);
        assert_eq!(huge.right(), i32::MAX);
        assert_eq!(huge.clip(64, 64), Some(Rect::from_tl(0, 0, 64, 64)));
    }

    #[test]
    fn test_overlap_pct() {
        let a = Rect::from_tl(0, 0, 10, 10);
        let b = Rect::from_tl(5, 0, 10, 10);

        assert_eq!(a.overlap_pct(&a), 100.);
        // 50 shared / 150 union
        assert!((a.overlap_pct(&b) - 100. / 3.).abs() < 1e-3);
        assert_eq!(a.overlap_pct(&Rect::from_tl(20, 20, 4, 4)), 0.);
    }
}
