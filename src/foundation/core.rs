use crate::foundation::error::{FxPipeError, FxPipeResult};

/// Straight (non-premultiplied) RGBA8 pixels in row-major order.
///
/// This is the only in-memory image representation the pipeline deals in.
/// The wire format sent to the external interpreter drops the alpha channel;
/// buffers decoded back from its output are opaque.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Width in pixels. Always > 0.
    pub width: u32,
    /// Height in pixels. Always > 0.
    pub height: u32,
    /// Pixel bytes, `width * height * 4` long.
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap an RGBA8 byte buffer, validating its geometry.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> FxPipeResult<Self> {
        if width == 0 || height == 0 {
            return Err(FxPipeError::validation(
                "pixel buffer width/height must be non-zero",
            ));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| FxPipeError::validation("pixel buffer dimensions overflow"))?;
        if data.len() != expected {
            return Err(FxPipeError::validation(format!(
                "pixel buffer data length {} does not match {width}x{height}x4",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Expand packed RGB triples into an opaque RGBA8 buffer.
    pub fn from_rgb8(width: u32, height: u32, rgb: &[u8]) -> FxPipeResult<Self> {
        if width == 0 || height == 0 {
            return Err(FxPipeError::validation(
                "pixel buffer width/height must be non-zero",
            ));
        }
        let pixels = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| FxPipeError::validation("pixel buffer dimensions overflow"))?;
        if rgb.len() != pixels * 3 {
            return Err(FxPipeError::validation(format!(
                "rgb data length {} does not match {width}x{height}x3",
                rgb.len()
            )));
        }

        let mut data = Vec::with_capacity(pixels * 4);
        for px in rgb.chunks_exact(3) {
            data.extend_from_slice(px);
            data.push(255);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Number of pixels in the buffer.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// RGBA channels of the pixel at `(x, y)`, or `None` when out of bounds.
    pub fn rgba_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }
}
