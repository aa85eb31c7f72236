//! Downscale a directory of JPEGs with an explicit worker pool
//!
//! cargo run --example batch -- <INPUT_DIR> <OUTPUT_DIR> [SCALE_FACTOR]

use boxscale::{init_logging, BatchDriver, BatchOptions, LoggingConfig, ScaleFactor};
use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&LoggingConfig::default())?;

    let mut args = env::args().skip(1);
    let input = PathBuf::from(args.next().unwrap_or_else(|| "photos".to_string()));
    let output = PathBuf::from(args.next().unwrap_or_else(|| "thumbs".to_string()));
    let factor: ScaleFactor = args.next().as_deref().unwrap_or("4").parse()?;

    // Four workers share one directory cursor
    let options = BatchOptions::new(&input, &output, factor).workers(4);
    let report = BatchDriver::new(options).run()?;

    println!(
        "{} written, {} failed, {} too small ({:.1} files/s)",
        report.processed,
        report.failed,
        report.skipped_empty,
        report.files_per_second()
    );
    report.print_summary();

    Ok(())
}
