//! Error types and handling for boxscale

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for boxscale operations
pub type Result<T> = std::result::Result<T, BoxScaleError>;

/// Main error type for boxscale operations
#[derive(Debug, Error)]
pub enum BoxScaleError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Errors raised by the image codec
    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Scale factor is not a positive integer
    #[error("Invalid scale factor '{value}': must be a positive integer")]
    InvalidScaleFactor { value: String },

    /// The input directory could not be opened
    #[error("Error opening directory {path:?}: {source}")]
    InputDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A source file could not be read or decoded
    #[error("Unable to decode {path:?}: {message}")]
    DecodeError { path: PathBuf, message: String },

    /// A target file could not be created or written
    #[error("Unable to encode {path:?}: {message}")]
    EncodeError { path: PathBuf, message: String },

    /// File content is not a supported image format
    #[error("Unsupported image format: {format} (file: {file:?})")]
    UnsupportedFormat {
        format: String,
        file: Option<PathBuf>,
    },

    /// Image dimensions too large
    #[error("Image too large: {width}x{height} pixels (limit: {limit} pixels, file: {file:?})")]
    ImageTooLarge {
        width: u32,
        height: u32,
        limit: u64,
        file: Option<PathBuf>,
    },

    /// File size too large
    #[error("File too large: {size} bytes (limit: {limit} bytes, file: {file:?})")]
    FileTooLarge {
        size: u64,
        limit: u64,
        file: PathBuf,
    },

    /// Pixel buffer allocation failed
    #[error("Memory allocation failed: {message}")]
    OutOfMemory { message: String },

    /// Pixel data does not match the declared dimensions
    #[error("Invalid image buffer: {message}")]
    InvalidBuffer { message: String },

    /// File validation errors
    #[error("File validation failed: {message} (file: {file:?})")]
    ValidationError {
        message: String,
        file: Option<PathBuf>,
    },

    /// A worker thread panicked
    #[error("Worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    /// The worker pool could not be joined cleanly
    #[error("Worker pool failed: {message}")]
    WorkerPool { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),
}

impl BoxScaleError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new invalid scale factor error
    pub fn invalid_scale_factor<S: Into<String>>(value: S) -> Self {
        Self::InvalidScaleFactor {
            value: value.into(),
        }
    }

    /// Create a new input directory error
    pub fn input_directory(path: &Path, source: std::io::Error) -> Self {
        Self::InputDirectory {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create a new decode error
    pub fn decode<S: ToString>(path: &Path, message: S) -> Self {
        Self::DecodeError {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Create a new encode error
    pub fn encode<S: ToString>(path: &Path, message: S) -> Self {
        Self::EncodeError {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(format: S, file: Option<PathBuf>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
            file,
        }
    }

    /// Create a new image too large error
    pub fn image_too_large(width: u32, height: u32, limit: u64, file: Option<PathBuf>) -> Self {
        Self::ImageTooLarge {
            width,
            height,
            limit,
            file,
        }
    }

    /// Create a new file too large error
    pub fn file_too_large(size: u64, limit: u64, file: PathBuf) -> Self {
        Self::FileTooLarge { size, limit, file }
    }

    /// Create a new out of memory error
    pub fn out_of_memory<S: Into<String>>(message: S) -> Self {
        Self::OutOfMemory {
            message: message.into(),
        }
    }

    /// Create a new invalid buffer error
    pub fn invalid_buffer<S: Into<String>>(message: S) -> Self {
        Self::InvalidBuffer {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S, file: Option<PathBuf>) -> Self {
        Self::ValidationError {
            message: message.into(),
            file,
        }
    }

    /// Check if this error is recoverable (the batch can continue with the next file)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Per-file failures: logged by the worker, batch continues
            Self::IoError(_)
            | Self::ImageError(_)
            | Self::DecodeError { .. }
            | Self::EncodeError { .. }
            | Self::UnsupportedFormat { .. }
            | Self::ImageTooLarge { .. }
            | Self::FileTooLarge { .. }
            | Self::OutOfMemory { .. }
            | Self::InvalidBuffer { .. }
            | Self::ValidationError { .. } => true,

            // These abort the run before (or instead of) reporting
            Self::ConfigError { .. }
            | Self::InvalidScaleFactor { .. }
            | Self::InputDirectory { .. }
            | Self::WorkerPanicked { .. }
            | Self::WorkerPool { .. }
            | Self::SerdeError(_) => false,
        }
    }

    /// Get the associated file path if available
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Self::UnsupportedFormat { file, .. }
            | Self::ImageTooLarge { file, .. }
            | Self::ValidationError { file, .. } => file.as_deref(),

            Self::FileTooLarge { file, .. } => Some(file),

            Self::InputDirectory { path, .. }
            | Self::DecodeError { path, .. }
            | Self::EncodeError { path, .. } => Some(path),

            _ => None,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::InputDirectory { path, source } => {
                format!("Error opening directory {}: {}", path.display(), source)
            }
            Self::InvalidScaleFactor { value } => {
                format!("Invalid scale factor '{}'. Use a positive integer such as 2 or 4", value)
            }
            Self::UnsupportedFormat { format, .. } => {
                format!("Unsupported image format: {}. Only JPEG input is supported", format)
            }
            Self::FileTooLarge { size, limit, .. } => {
                format!(
                    "File is too large ({:.2} MB). Maximum supported: {:.2} MB",
                    *size as f64 / 1024.0 / 1024.0,
                    *limit as f64 / 1024.0 / 1024.0
                )
            }
            Self::ImageTooLarge { width, height, limit, .. } => {
                format!(
                    "Image is too large ({}x{} = {} pixels). Maximum supported: {} pixels",
                    width,
                    height,
                    u64::from(*width) * u64::from(*height),
                    limit
                )
            }
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for BoxScaleError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for BoxScaleError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}

/// Error context extension for adding file path information
pub trait ErrorContext<T> {
    /// Add file context to an error
    fn with_file_context(self, file: &Path) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<BoxScaleError>,
{
    fn with_file_context(self, file: &Path) -> Result<T> {
        self.map_err(|e| match e.into() {
            BoxScaleError::IoError(source) => BoxScaleError::decode(file, source),
            BoxScaleError::ImageError(source) => BoxScaleError::decode(file, source),
            mut error => {
                match &mut error {
                    BoxScaleError::UnsupportedFormat { file: f, .. }
                    | BoxScaleError::ImageTooLarge { file: f, .. }
                    | BoxScaleError::ValidationError { file: f, .. } => {
                        if f.is_none() {
                            *f = Some(file.to_path_buf());
                        }
                    }
                    _ => {}
                }
                error
            }
        })
    }
}
