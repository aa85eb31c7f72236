//! boxscale CLI - Parallel Batch Box-Filter Downscaler
//!
//! Usage: `boxscale <INPUT_DIR> <OUTPUT_DIR> <SCALE_FACTOR>`

use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use console::{style, Term};
use tracing::{debug, info};

use boxscale::parallel::ProgressTracker;
use boxscale::{
    detected_workers, init_logging, log_system_capabilities, BatchDriver, BatchOptions,
    BoxScaleError, Config, JpegCodec, LoggingConfig, ScaleFactor,
};

/// boxscale - downscale every JPEG in a directory by an integer factor
#[derive(Parser, Debug)]
#[command(
    name = "boxscale",
    version,
    about = "Downscale a directory of JPEGs by an integer factor using box filtering",
    long_about = "boxscale averages non-overlapping blocks of pixels to shrink every regular \
                  file in INPUT_DIR by SCALE_FACTOR, writing copies with the same names into \
                  OUTPUT_DIR. Files are spread across a pool of worker threads."
)]
struct Cli {
    /// Directory containing the source images
    #[arg(value_name = "INPUT_DIR")]
    input: PathBuf,

    /// Existing directory that receives the downscaled copies
    #[arg(value_name = "OUTPUT_DIR")]
    output: PathBuf,

    /// Positive integer dividing both width and height
    #[arg(value_name = "SCALE_FACTOR", allow_negative_numbers = true, value_parser = parse_scale_factor)]
    scale: ScaleFactor,

    /// Number of worker threads (default: detected core count)
    #[arg(short, long, value_name = "COUNT", env = "BOXSCALE_WORKERS")]
    workers: Option<usize>,

    /// Configuration file path (.toml or .yaml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the batch report as JSON
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_scale_factor(s: &str) -> Result<ScaleFactor, String> {
    s.parse::<ScaleFactor>().map_err(|e| e.user_message())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    if let Err(e) = run(&cli) {
        let message = match e.downcast_ref::<BoxScaleError>() {
            Some(err) => err.user_message(),
            None => format!("{:#}", e),
        };
        eprintln!("{}: {}", style("Error").red().bold(), message);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    init_logging(&logging_config(cli, &config))?;
    log_system_capabilities();

    let workers = cli
        .workers
        .or(config.processing.workers)
        .unwrap_or_else(detected_workers);
    debug!("Using {} workers", workers);

    let options = BatchOptions::new(&cli.input, &cli.output, cli.scale).workers(workers);
    let codec = JpegCodec::from_config(&config.processing);
    let mut driver = BatchDriver::with_codec(options, std::sync::Arc::new(codec));

    if show_progress(cli) {
        driver = driver.with_progress_bar(ProgressTracker::spinner());
    }

    let report = driver.run()?;

    if cli.json {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, &report).context("failed to write JSON report")?;
        writeln!(out)?;
    } else {
        report.print_summary();
    }

    if report.failed > 0 {
        info!("{} files could not be processed; see warnings above", report.failed);
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Verbosity flags override the configured level
fn logging_config(cli: &Cli, config: &Config) -> LoggingConfig {
    let mut logging = config.logging.clone();
    if cli.quiet {
        logging.level = "error".to_string();
    } else if cli.verbose {
        logging.level = "debug".to_string();
    }
    logging
}

fn show_progress(cli: &Cli) -> bool {
    !cli.quiet && !cli.json && !cli.no_progress && Term::stderr().is_term()
}
