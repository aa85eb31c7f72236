//! Owned RGB pixel buffers

use std::fmt;

use crate::error::{BoxScaleError, Result};

/// Bytes per pixel (R, G, B)
pub const CHANNELS: usize = 3;

/// Interleaved 8-bit RGB image with a single owner.
///
/// The pixel vector always holds exactly `width * height * CHANNELS` bytes.
/// Dropping the buffer releases its memory, so early returns on error paths
/// cannot leak or double-free.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageBuffer {
    /// Wrap existing pixel data, checking its length against the dimensions
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = byte_len(width, height)?;
        if pixels.len() != expected {
            return Err(BoxScaleError::invalid_buffer(format!(
                "{}x{} RGB image needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }

        Ok(Self { width, height, pixels })
    }

    /// Allocate a zero-filled buffer.
    ///
    /// Allocation failure is reported as [`BoxScaleError::OutOfMemory`]
    /// instead of aborting the process.
    pub fn zeroed(width: u32, height: u32) -> Result<Self> {
        let len = byte_len(width, height)?;
        let pixels = try_alloc(len, format_args!("a {}x{} image", width, height))?;

        Ok(Self { width, height, pixels })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels (not bytes)
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// True when either dimension is zero. Such a buffer is valid but must not be encoded.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Raw interleaved RGB bytes, row-major
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// RGB value at column `x`, row `y`
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; CHANNELS]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]])
    }

    /// Consume the buffer and return its pixel bytes
    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }
}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

impl From<image::RgbImage> for ImageBuffer {
    fn from(image: image::RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }
}

/// Zero-filled byte vector of exactly `len` bytes, or `OutOfMemory` if the
/// allocator refuses. `what` names the allocation in the error message.
pub(crate) fn try_alloc(len: usize, what: fmt::Arguments<'_>) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes.try_reserve_exact(len).map_err(|e| {
        BoxScaleError::out_of_memory(format!("cannot allocate {} bytes for {}: {}", len, what, e))
    })?;
    bytes.resize(len, 0);
    Ok(bytes)
}

fn byte_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or_else(|| {
            BoxScaleError::out_of_memory(format!("{}x{} image exceeds addressable memory", width, height))
        })
}
