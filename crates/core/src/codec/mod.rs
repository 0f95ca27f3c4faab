pub mod image_decoder;
pub mod image_encoder;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode {format:?} image: {source}")]
    Encode {
        format: image::ImageFormat,
        #[source]
        source: image::ImageError,
    },
    #[error("raster buffer does not match {width}x{height}")]
    BufferSize { width: u32, height: u32 },
}
