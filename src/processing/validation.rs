//! Limits checked on source files before and during decode

use std::path::Path;
use tracing::debug;

use crate::config::ProcessingConfig;
use crate::error::{Result, BoxScaleError};

/// Size limits a source file must satisfy to be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLimits {
    pub max_file_size: u64,
    pub max_image_pixels: u64,
}

impl Default for SourceLimits {
    fn default() -> Self {
        Self::from_config(&ProcessingConfig::default())
    }
}

impl SourceLimits {
    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            max_image_pixels: config.max_image_pixels,
        }
    }

    /// Reject empty files and files above `max_file_size`
    pub fn check_file_size(&self, path: &Path, size: u64) -> Result<()> {
        if size == 0 {
            return Err(BoxScaleError::validation("File is empty", Some(path.to_path_buf())));
        }

        if size > self.max_file_size {
            return Err(BoxScaleError::file_too_large(
                size,
                self.max_file_size,
                path.to_path_buf(),
            ));
        }

        Ok(())
    }

    /// Reject images whose pixel count exceeds `max_image_pixels`
    pub fn check_dimensions(&self, path: &Path, width: u32, height: u32) -> Result<()> {
        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.max_image_pixels {
            return Err(BoxScaleError::image_too_large(
                width,
                height,
                self.max_image_pixels,
                Some(path.to_path_buf()),
            ));
        }

        debug!("{:?}: {}x{} within limits", path, width, height);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> SourceLimits {
        SourceLimits {
            max_file_size: 1024,
            max_image_pixels: 100,
        }
    }

    #[test]
    fn test_file_size_limits() {
        let path = Path::new("a.jpg");
        assert!(limits().check_file_size(path, 1).is_ok());
        assert!(limits().check_file_size(path, 1024).is_ok());

        let err = limits().check_file_size(path, 0).unwrap_err();
        assert!(matches!(err, BoxScaleError::ValidationError { .. }));
        assert_eq!(err.file_path(), Some(path));

        let err = limits().check_file_size(path, 1025).unwrap_err();
        assert!(matches!(err, BoxScaleError::FileTooLarge { size: 1025, .. }));
    }

    #[test]
    fn test_dimension_limits() {
        let path = Path::new("a.jpg");
        assert!(limits().check_dimensions(path, 10, 10).is_ok());
        assert!(limits().check_dimensions(path, 0, 1_000_000).is_ok());

        let err = limits().check_dimensions(path, 11, 10).unwrap_err();
        assert!(matches!(err, BoxScaleError::ImageTooLarge { width: 11, height: 10, .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_defaults_follow_config() {
        let config = ProcessingConfig::default();
        let limits = SourceLimits::default();
        assert_eq!(limits.max_file_size, config.max_file_size);
        assert_eq!(limits.max_image_pixels, config.max_image_pixels);
    }
}
