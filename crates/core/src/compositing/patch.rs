use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba};

use crate::shared::bounding_box::BoundingBox;
use crate::shared::raster::{Raster, RGBA_CHANNELS};

/// Copy the pixels under `bbox` into a new raster.
///
/// The box must lie inside the raster; [`BoundingBox`] construction already
/// clamps to image bounds.
pub fn crop(raster: &Raster, bbox: &BoundingBox) -> Raster {
    let frame_width = raster.width() as usize;
    let (x, y) = (bbox.x as usize, bbox.y as usize);
    let (w, h) = (bbox.width as usize, bbox.height as usize);
    let row_bytes = w * RGBA_CHANNELS;

    let src = raster.data();
    let mut patch = vec![0u8; row_bytes * h];
    for row in 0..h {
        let src_offset = ((y + row) * frame_width + x) * RGBA_CHANNELS;
        let dst_offset = row * row_bytes;
        patch[dst_offset..dst_offset + row_bytes]
            .copy_from_slice(&src[src_offset..src_offset + row_bytes]);
    }
    Raster::new(patch, bbox.width, bbox.height)
}

/// Resample `patch` to exactly `width × height`, ignoring aspect ratio.
pub fn resize_to_fill(patch: &Raster, width: u32, height: u32) -> Raster {
    if patch.width() == width && patch.height() == height {
        return patch.clone();
    }
    let view: ImageBuffer<Rgba<u8>, &[u8]> =
        ImageBuffer::from_raw(patch.width(), patch.height(), patch.data())
            .expect("raster length matches its dimensions");
    let resized = imageops::resize(&view, width, height, FilterType::Triangle);
    Raster::new(resized.into_raw(), width, height)
}
