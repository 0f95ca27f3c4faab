use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::shared::raster::Raster;

use super::CodecError;

/// Encode a raster in `format` when it is one we write back in kind
/// (PNG, JPEG, WebP). Anything else, including an unknown source format,
/// is written as PNG.
///
/// JPEG drops alpha and uses `jpeg_quality`. WebP output is lossless.
pub fn encode(
    raster: &Raster,
    format: Option<ImageFormat>,
    jpeg_quality: u8,
) -> Result<Vec<u8>, CodecError> {
    let img = RgbaImage::from_raw(raster.width(), raster.height(), raster.data().to_vec())
        .ok_or(CodecError::BufferSize {
            width: raster.width(),
            height: raster.height(),
        })?;
    let img = DynamicImage::ImageRgba8(img);

    let format = output_format(format);
    let mut buf = Cursor::new(Vec::new());
    let result = match format {
        ImageFormat::Jpeg => JpegEncoder::new_with_quality(&mut buf, jpeg_quality.clamp(1, 100))
            .encode_image(&img.to_rgb8()),
        other => img.write_to(&mut buf, other),
    };
    result.map_err(|source| CodecError::Encode { format, source })?;
    Ok(buf.into_inner())
}

/// Format the composited result is written in, given the source format.
pub fn output_format(source: Option<ImageFormat>) -> ImageFormat {
    match source {
        Some(f @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP)) => f,
        _ => ImageFormat::Png,
    }
}
