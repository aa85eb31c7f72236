//! Core image processing functionality

use std::path::Path;
use tracing::debug;

use crate::error::Result;

pub mod buffer;
pub mod codec;
pub mod downscale;
pub mod validation;

pub use buffer::*;
pub use codec::*;
pub use downscale::*;
pub use validation::*;

/// What happened to a single source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Downscaled copy written to the output path
    Written {
        input: (u32, u32),
        output: (u32, u32),
    },
    /// Factor exceeded a dimension; nothing was written
    SkippedEmpty { input: (u32, u32) },
}

impl FileOutcome {
    /// Pixels in the decoded source
    pub fn input_pixels(&self) -> u64 {
        let (w, h) = match self {
            Self::Written { input, .. } | Self::SkippedEmpty { input } => *input,
        };
        u64::from(w) * u64::from(h)
    }

    /// Pixels in the written output (zero when skipped)
    pub fn output_pixels(&self) -> u64 {
        match self {
            Self::Written { output: (w, h), .. } => u64::from(*w) * u64::from(*h),
            Self::SkippedEmpty { .. } => 0,
        }
    }
}

/// Decode `input_path`, downscale by `factor`, and encode to `output_path`.
///
/// Each buffer is owned by this call and released when it goes out of scope,
/// whichever step fails. A zero-area result is reported as
/// [`FileOutcome::SkippedEmpty`] and never reaches the encoder.
pub fn process_file(
    codec: &dyn Codec,
    input_path: &Path,
    output_path: &Path,
    factor: ScaleFactor,
) -> Result<FileOutcome> {
    debug!("Processing file: {:?} -> {:?}", input_path, output_path);

    let source = codec.decode(input_path)?;
    let input = source.dimensions();
    let scaled = downscale(&source, factor)?;
    drop(source);

    if scaled.is_empty() {
        debug!(
            "{:?}: {}x{} is smaller than factor {}, skipping",
            input_path, input.0, input.1, factor
        );
        return Ok(FileOutcome::SkippedEmpty { input });
    }

    codec.encode(output_path, &scaled)?;

    Ok(FileOutcome::Written {
        input,
        output: scaled.dimensions(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxScaleError;
    use crate::processing::codec::testing::RecordingCodec;
    use tempfile::TempDir;

    #[test]
    fn test_process_file_writes_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.jpg");
        let output = dir.path().join("out.jpg");
        std::fs::write(&input, [42u8]).unwrap();

        let codec = RecordingCodec::new(8);
        let outcome = process_file(&codec, &input, &output, ScaleFactor::new(2).unwrap()).unwrap();

        assert_eq!(outcome, FileOutcome::Written { input: (8, 8), output: (4, 4) });
        assert_eq!(outcome.input_pixels(), 64);
        assert_eq!(outcome.output_pixels(), 16);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "4x4");
    }

    #[test]
    fn test_zero_area_result_is_not_encoded() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("tiny.jpg");
        let output = dir.path().join("tiny-out.jpg");
        std::fs::write(&input, [1u8]).unwrap();

        let codec = RecordingCodec::new(3);
        let outcome = process_file(&codec, &input, &output, ScaleFactor::new(4).unwrap()).unwrap();

        assert_eq!(outcome, FileOutcome::SkippedEmpty { input: (3, 3) });
        assert_eq!(outcome.output_pixels(), 0);
        assert!(codec.encoded_names().is_empty());
        assert!(!output.exists());
    }

    #[test]
    fn test_decode_failure_skips_encode() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("bad.jpg");
        std::fs::write(&input, b"corrupt data").unwrap();

        let codec = RecordingCodec::new(4);
        let err = process_file(&codec, &input, &dir.path().join("o.jpg"), ScaleFactor::new(2).unwrap())
            .unwrap_err();

        assert!(matches!(err, BoxScaleError::DecodeError { .. }));
        assert!(codec.encoded_names().is_empty());
    }
}
