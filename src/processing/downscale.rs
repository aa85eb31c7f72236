//! Integer box-filter downscaling

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use rayon::prelude::*;
use tracing::trace;

use crate::error::{BoxScaleError, Result};
use super::buffer::{ImageBuffer, CHANNELS};

/// Positive integer by which both width and height are divided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScaleFactor(NonZeroU32);

impl ScaleFactor {
    /// Create a scale factor, rejecting zero
    pub fn new(factor: u32) -> Result<Self> {
        NonZeroU32::new(factor)
            .map(Self)
            .ok_or_else(|| BoxScaleError::invalid_scale_factor(factor.to_string()))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Output dimensions for a `width` x `height` source (floor division)
    pub fn apply(self, width: u32, height: u32) -> (u32, u32) {
        (width / self.get(), height / self.get())
    }
}

impl FromStr for ScaleFactor {
    type Err = BoxScaleError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.parse::<i64>() {
            Ok(value) if value > 0 => u32::try_from(value)
                .map_err(|_| BoxScaleError::invalid_scale_factor(trimmed))
                .and_then(Self::new),
            _ => Err(BoxScaleError::invalid_scale_factor(trimmed)),
        }
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Downscale `input` by averaging non-overlapping `factor x factor` blocks.
///
/// The output is `floor(W / factor)` by `floor(H / factor)`. Each output
/// channel is the truncated mean of its block; trailing rows and columns that
/// do not fill a whole block are dropped. A factor larger than either
/// dimension yields a zero-area buffer, which is a valid result.
///
/// Output rows are computed in parallel on the rayon pool. The input is never
/// modified. The only error is failure to allocate the output buffer.
pub fn downscale(input: &ImageBuffer, factor: ScaleFactor) -> Result<ImageBuffer> {
    let (out_width, out_height) = factor.apply(input.width(), input.height());
    let mut output = ImageBuffer::zeroed(out_width, out_height)?;
    if output.is_empty() {
        trace!(
            "Factor {} leaves nothing of {}x{}",
            factor,
            input.width(),
            input.height()
        );
        return Ok(output);
    }

    let f = factor.get() as usize;
    let area = (f as u64) * (f as u64);
    let in_stride = input.width() as usize * CHANNELS;
    let out_stride = out_width as usize * CHANNELS;
    let block_bytes = f * CHANNELS;
    let src = input.pixels();

    output
        .pixels_mut()
        .par_chunks_mut(out_stride)
        .enumerate()
        .for_each(|(row, out_row)| {
            let top = row * f;
            for (col, out_px) in out_row.chunks_exact_mut(CHANNELS).enumerate() {
                let left = col * block_bytes;
                let mut sums = [0u64; CHANNELS];

                for k in 0..f {
                    let start = (top + k) * in_stride + left;
                    for px in src[start..start + block_bytes].chunks_exact(CHANNELS) {
                        for (sum, &value) in sums.iter_mut().zip(px) {
                            *sum += u64::from(value);
                        }
                    }
                }

                for (dst, sum) in out_px.iter_mut().zip(sums) {
                    // mean of u8 samples always fits in u8
                    *dst = (sum / area) as u8;
                }
            }
        });

    Ok(output)
}
