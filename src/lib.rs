//! boxscale - Parallel Batch Box-Filter Downscaler
//!
//! Shrinks every JPEG in a directory by an integer factor, writing copies
//! with the same file names into an output directory. A fixed pool of worker
//! threads drains one shared directory cursor; each worker decodes a file,
//! averages non-overlapping `factor x factor` blocks, and encodes the result.
//!
//! # Features
//!
//! - **Exact box filter**: truncated per-channel block means, remainder rows and columns dropped
//! - **No duplicated work**: each directory entry is claimed by exactly one worker
//! - **Failure isolation**: a corrupt or unwritable file is logged and skipped
//! - **Data-parallel filter**: output rows computed on the rayon pool
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use boxscale::{BatchDriver, BatchOptions, ScaleFactor};
//!
//! let options = BatchOptions::new("photos", "thumbs", ScaleFactor::new(4)?).workers(8);
//! let report = BatchDriver::new(options).run()?;
//!
//! println!("{} files downscaled", report.processed);
//! println!("{}", report.timing_line());
//! # Ok::<(), boxscale::BoxScaleError>(())
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

pub mod config;
pub mod error;
pub mod parallel;
pub mod processing;

// Re-export commonly used types
pub use config::{Config, LoggingConfig, ProcessingConfig};
pub use error::{BoxScaleError, Result};
pub use parallel::{detected_workers, BatchDriver, BatchOptions, BatchReport, DirectoryQueue};
pub use processing::{downscale, Codec, ImageBuffer, JpegCodec, ScaleFactor, JPEG_QUALITY};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.level` when set. Logs go to stderr so stdout
/// stays clean for the summary. Calling this more than once is harmless.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            BoxScaleError::config(format!("Invalid log level '{}': {}", config.level, e))
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if config.json_format {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        info!("boxscale v{} initialized", VERSION);
    }

    Ok(())
}

/// Log memory and CPU availability, warning when memory is low
pub fn log_system_capabilities() {
    use sysinfo::{System, SystemExt};

    let mut system = System::new();
    system.refresh_memory();

    let available_memory = system.available_memory();
    const MIN_MEMORY_MB: u64 = 512;

    if available_memory < MIN_MEMORY_MB * 1024 * 1024 {
        warn!(
            "Low available memory: {}MB (recommended: >{}MB)",
            available_memory / (1024 * 1024),
            MIN_MEMORY_MB
        );
    }

    let physical = system.physical_core_count().unwrap_or(1);
    info!(
        "Detected {} physical / {} logical CPU cores",
        physical,
        detected_workers()
    );
    info!("JPEG decode support: {}", image::ImageFormat::Jpeg.can_read());
}
