use crate::geometry::oval_mask::BlendMask;
use crate::shared::raster::{Raster, RGBA_CHANNELS};

/// Composite `src` over `dst` with its top-left corner at `at`, weighting
/// each source pixel by the mask.
///
/// Effective source alpha is `mask × src alpha`. Over an opaque destination
/// this reduces to `out = src·a + dst·(1 − a)` per channel with the
/// destination staying opaque. Translucent destinations use the
/// non-premultiplied "over" operator. Pixels falling outside `dst` are
/// skipped.
pub fn blend_over(dst: &mut Raster, src: &Raster, mask: &BlendMask, at: (u32, u32)) {
    debug_assert_eq!(
        (src.width(), src.height()),
        (mask.width(), mask.height()),
        "mask must match the patch size"
    );

    let frame_width = dst.width() as usize;
    let cols = src.width().min(dst.width().saturating_sub(at.0)) as usize;
    let rows = src.height().min(dst.height().saturating_sub(at.1)) as usize;
    let src_width = src.width() as usize;
    let src_data = src.data();
    let mask_data = mask.data();
    let data = dst.data_mut();

    for row in 0..rows {
        for col in 0..cols {
            let m = mask_data[row * src_width + col];
            if m == 0 {
                continue;
            }
            let src_offset = (row * src_width + col) * RGBA_CHANNELS;
            let src_px = &src_data[src_offset..src_offset + RGBA_CHANNELS];
            let alpha = (m as f32 / 255.0) * (src_px[3] as f32 / 255.0);
            if alpha <= 0.0 {
                continue;
            }

            let frame_offset =
                ((at.1 as usize + row) * frame_width + at.0 as usize + col) * RGBA_CHANNELS;
            let dst_px = &mut data[frame_offset..frame_offset + RGBA_CHANNELS];
            blend_pixel(dst_px, src_px, alpha);
        }
    }
}

fn blend_pixel(dst: &mut [u8], src: &[u8], alpha: f32) {
    let dst_alpha = dst[3] as f32 / 255.0;
    if dst[3] == 255 {
        for c in 0..3 {
            dst[c] = mix(src[c] as f32 * alpha + dst[c] as f32 * (1.0 - alpha));
        }
        return;
    }

    let out_alpha = alpha + dst_alpha * (1.0 - alpha);
    if out_alpha <= 0.0 {
        return;
    }
    for c in 0..3 {
        let value =
            (src[c] as f32 * alpha + dst[c] as f32 * dst_alpha * (1.0 - alpha)) / out_alpha;
        dst[c] = mix(value);
    }
    dst[3] = mix(out_alpha * 255.0);
}

fn mix(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
