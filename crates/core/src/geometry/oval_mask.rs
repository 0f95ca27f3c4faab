use crate::shared::constants::{OVAL_RX_FACTOR, OVAL_RY_FACTOR};

/// Single-channel opacity raster, 0 = transparent, 255 = opaque.
///
/// Built per compositing call for the destination face box and never
/// cached; its size follows the box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlendMask {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl BlendMask {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn at(&self, x: u32, y: u32) -> u8 {
        self.data[(y as usize) * (self.width as usize) + x as usize]
    }
}

/// Feathered ellipse inscribed in a `w` × `h` box.
///
/// Semi-axes are `0.85·w/2` and `0.9·h/2`. With `d` the normalised
/// elliptical distance of a pixel centre, opacity is 255 for
/// `d <= inner`, 0 for `d >= 1`, and ramps linearly in between, where
/// `inner = 1 - feather_px / max(rx, ry)`. `inner` never drops below one
/// pixel so the centre pixel is always fully opaque.
pub fn oval_mask(w: u32, h: u32, feather_px: u32) -> BlendMask {
    let mut data = vec![0u8; (w as usize) * (h as usize)];
    if w == 0 || h == 0 {
        return BlendMask {
            data,
            width: w,
            height: h,
        };
    }

    let cx = w as f64 / 2.0;
    let cy = h as f64 / 2.0;
    let rx = OVAL_RX_FACTOR * cx;
    let ry = OVAL_RY_FACTOR * cy;

    let core = (1.0 / rx.min(ry)).min(1.0);
    let inner = (1.0 - feather_px as f64 / rx.max(ry)).max(core);
    let ramp = 1.0 - inner;

    for y in 0..h {
        let ny = (y as f64 + 0.5 - cy) / ry;
        for x in 0..w {
            let nx = (x as f64 + 0.5 - cx) / rx;
            let d = (nx * nx + ny * ny).sqrt();

            let opacity = if d <= inner {
                255
            } else if d >= 1.0 {
                0
            } else {
                (255.0 * (1.0 - d) / ramp).round().clamp(0.0, 255.0) as u8
            };
            data[(y as usize) * (w as usize) + x as usize] = opacity;
        }
    }

    BlendMask {
        data,
        width: w,
        height: h,
    }
}
