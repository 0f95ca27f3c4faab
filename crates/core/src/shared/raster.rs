use ndarray::ArrayView3;

/// Bytes per pixel: RGBA, 8 bits per channel, non-premultiplied alpha.
pub const RGBA_CHANNELS: usize = 4;

/// A decoded image: contiguous RGBA bytes in row-major order.
///
/// Encoded formats only exist at the codec boundary; everything between
/// decode and encode works on `Raster`. Operations return new rasters
/// except [`Raster::data_mut`], which the compositor uses on its own copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Raster {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * RGBA_CHANNELS,
            "data length must equal width * height * 4"
        );
        Self {
            data,
            width,
            height,
        }
    }

    /// A raster filled with a single RGBA colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixels * RGBA_CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self::new(data, width, height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA value at `(x, y)`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = self.offset(x, y);
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let offset = self.offset(x, y);
        self.data[offset..offset + RGBA_CHANNELS].copy_from_slice(&rgba);
    }

    /// `(height, width, 4)` view for indexed access in tensor builders.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, RGBA_CHANNELS),
            &self.data,
        )
        .expect("Raster data length must match dimensions")
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} raster",
            self.width,
            self.height
        );
        ((y as usize) * (self.width as usize) + x as usize) * RGBA_CHANNELS
    }
}
