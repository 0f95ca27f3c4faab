/// Axis-aligned face box in the pixel space of one specific raster.
///
/// Always satisfies `width >= 1`, `height >= 1` and lies inside the raster
/// it was derived from. A box carries no reference to that raster, so call
/// sites must not reuse it against a different image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Builds a box, rejecting empty boxes and boxes that leave the
    /// `image_w` × `image_h` raster.
    pub fn new(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_w: u32,
        image_h: u32,
    ) -> Option<Self> {
        let fits = width >= 1
            && height >= 1
            && x.checked_add(width).is_some_and(|r| r <= image_w)
            && y.checked_add(height).is_some_and(|b| b <= image_h);
        fits.then_some(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Snaps floating-point corners `(x1, y1, x2, y2)` outward to whole
    /// pixels and clamps them to the raster. Returns `None` when nothing of
    /// the box remains inside the raster or a coordinate is not finite.
    pub fn from_corners_clamped(
        corners: (f64, f64, f64, f64),
        image_w: u32,
        image_h: u32,
    ) -> Option<Self> {
        let (x1, y1, x2, y2) = corners;
        if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
            return None;
        }
        let left = x1.min(x2).max(0.0).floor();
        let top = y1.min(y2).max(0.0).floor();
        let right = x1.max(x2).min(image_w as f64).ceil();
        let bottom = y1.max(y2).min(image_h as f64).ceil();
        if right <= left || bottom <= top {
            return None;
        }
        Self::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
            image_w,
            image_h,
        )
    }

    /// Grows the box by `fraction` of its width/height on every side,
    /// clamped to the raster.
    pub fn expand(&self, fraction: f64, image_w: u32, image_h: u32) -> Self {
        let pad_x = (self.width as f64 * fraction.max(0.0)).round() as u32;
        let pad_y = (self.height as f64 * fraction.max(0.0)).round() as u32;

        let x = self.x.saturating_sub(pad_x);
        let y = self.y.saturating_sub(pad_y);
        let right = self.right().saturating_add(pad_x).min(image_w).max(x + 1);
        let bottom = self.bottom().saturating_add(pad_y).min(image_h).max(y + 1);

        Self {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// The pixel at the box centre (integer division).
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    pub fn min_side(&self) -> u32 {
        self.width.min(self.height)
    }
}
