//! Uniform scale + symmetric padding between an arbitrary image and a
//! square detector input.
//!
//! The same `Letterbox` must be used to build the detector input and to
//! map the detector's boxes back, or detections drift.

/// Scale/pad pair fitting a `src_w` × `src_h` image inside a square.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub scale: f64,
    pub pad_x: u32,
    pub pad_y: u32,
    /// Size of the scaled image inside the square, before padding.
    pub scaled_w: u32,
    pub scaled_h: u32,
}

impl Letterbox {
    /// `scale = min(dst/src_w, dst/src_h)`, `pad = floor((dst - src*scale) / 2)`.
    pub fn compute(src_w: u32, src_h: u32, dst_size: u32) -> Self {
        let src_w = src_w.max(1) as f64;
        let src_h = src_h.max(1) as f64;
        let dst = dst_size as f64;

        let scale = (dst / src_w).min(dst / src_h);
        let pad_x = ((dst - src_w * scale) / 2.0).floor().max(0.0) as u32;
        let pad_y = ((dst - src_h * scale) / 2.0).floor().max(0.0) as u32;
        let scaled_w = ((src_w * scale).round() as u32).clamp(1, dst_size);
        let scaled_h = ((src_h * scale).round() as u32).clamp(1, dst_size);

        Self {
            scale,
            pad_x,
            pad_y,
            scaled_w,
            scaled_h,
        }
    }

    /// Source-image point → detector-input point.
    pub fn to_detector(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.scale + self.pad_x as f64,
            y * self.scale + self.pad_y as f64,
        )
    }

    /// Detector-input point → source-image point.
    pub fn to_source(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_wide_image_pads_vertically() {
        // 200x100 → scale 3.2, scaled 640x320, pad_y 160
        let lb = Letterbox::compute(200, 100, 640);
        assert_relative_eq!(lb.scale, 3.2);
        assert_eq!((lb.pad_x, lb.pad_y), (0, 160));
        assert_eq!((lb.scaled_w, lb.scaled_h), (640, 320));
    }

    #[test]
    fn test_tall_image_pads_horizontally() {
        // 800x1000 → scale 0.64, scaled 512x640, pad_x 64
        let lb = Letterbox::compute(800, 1000, 640);
        assert_relative_eq!(lb.scale, 0.64);
        assert_eq!((lb.pad_x, lb.pad_y), (64, 0));
        assert_eq!((lb.scaled_w, lb.scaled_h), (512, 640));
    }

    #[test]
    fn test_square_image_has_no_padding() {
        let lb = Letterbox::compute(100, 100, 640);
        assert_relative_eq!(lb.scale, 6.4);
        assert_eq!((lb.pad_x, lb.pad_y), (0, 0));
    }

    #[test]
    fn test_odd_padding_is_floored() {
        // 300x200 into 641 → scale 641/300, height 427.33 → pad 106.83 → 106
        let lb = Letterbox::compute(300, 200, 641);
        assert_eq!(lb.pad_y, 106);
    }

    #[rstest]
    #[case(800, 1000, 640)]
    #[case(4032, 3024, 640)]
    #[case(33, 517, 640)]
    #[case(1920, 1080, 320)]
    #[case(640, 640, 640)]
    fn test_round_trip_within_one_pixel(#[case] w: u32, #[case] h: u32, #[case] dst: u32) {
        let lb = Letterbox::compute(w, h, dst);
        let points = [(0, 0), (w - 1, h - 1), (w / 2, h / 3), (w / 7, h - 1)];
        for (x, y) in points {
            let (dx, dy) = lb.to_detector(x as f64, y as f64);
            assert!(dx >= 0.0 && dx <= dst as f64);
            assert!(dy >= 0.0 && dy <= dst as f64);
            let (sx, sy) = lb.to_source(dx, dy);
            assert!((sx - x as f64).abs() <= 1.0, "x {x} → {sx}");
            assert!((sy - y as f64).abs() <= 1.0, "y {y} → {sy}");
        }
    }

    #[test]
    fn test_scaled_image_is_centered() {
        let lb = Letterbox::compute(800, 1000, 640);
        let (left, _) = lb.to_detector(0.0, 0.0);
        let (right, _) = lb.to_detector(800.0, 0.0);
        assert_relative_eq!(left, 64.0);
        assert_relative_eq!(640.0 - right, 64.0);
    }
}
