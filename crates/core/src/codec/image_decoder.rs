use image::ImageFormat;

use crate::shared::raster::Raster;

use super::CodecError;

/// Decoded pixels plus the container format they came from, so the result
/// can be written back in kind.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub raster: Raster,
    pub format: Option<ImageFormat>,
}

/// Decode encoded image bytes (PNG, JPEG, WebP, ...) into an RGBA raster.
///
/// The format is sniffed from the magic bytes; unknown content is a decode
/// error, not a panic.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, CodecError> {
    let format = image::guess_format(bytes).ok();
    let img = image::load_from_memory(bytes).map_err(CodecError::Decode)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        raster: Raster::new(rgba.into_raw(), width, height),
        format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let bytes = encode_png(12, 7, [10, 20, 30, 40]);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.format, Some(ImageFormat::Png));
        assert_eq!((decoded.raster.width(), decoded.raster.height()), (12, 7));
        assert_eq!(decoded.raster.pixel(11, 6), [10, 20, 30, 40]);
    }

    #[test]
    fn test_decode_jpeg_is_opaque() {
        let img = image::RgbImage::from_pixel(16, 16, image::Rgb([128, 128, 128]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();

        let decoded = decode(buf.get_ref()).unwrap();
        assert_eq!(decoded.format, Some(ImageFormat::Jpeg));
        assert_eq!(decoded.raster.pixel(8, 8)[3], 255);
    }

    #[test]
    fn test_decode_garbage_is_error() {
        assert!(matches!(
            decode(b"definitely not an image"),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_empty_is_error() {
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn test_decode_truncated_png_is_error() {
        let bytes = encode_png(32, 32, [1, 2, 3, 255]);
        assert!(decode(&bytes[..bytes.len() / 2]).is_err());
    }
}
