//! Parallel batch driver: one directory queue, a fixed pool of worker threads

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::error::{BoxScaleError, Result};
use crate::processing::{Codec, JpegCodec, ScaleFactor};

pub mod progress;
pub mod queue;
pub mod worker;

pub use progress::*;
pub use queue::*;
pub use worker::*;

/// Worker count used when none is configured
pub fn detected_workers() -> usize {
    num_cpus::get().max(1)
}

/// Everything a batch run needs to know
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub layout: DirectoryLayout,
    pub factor: ScaleFactor,
    pub workers: usize,
}

impl BatchOptions {
    /// Options with the detected core count as pool size
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        input_dir: P,
        output_dir: Q,
        factor: ScaleFactor,
    ) -> Self {
        Self {
            layout: DirectoryLayout::new(input_dir, output_dir),
            factor,
            workers: detected_workers(),
        }
    }

    /// Override the pool size
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(BoxScaleError::config("Worker count must be greater than 0"));
        }
        Ok(())
    }
}

/// Spawns the worker pool against a single [`DirectoryQueue`] and waits for it
pub struct BatchDriver {
    options: BatchOptions,
    codec: Arc<dyn Codec>,
    progress_bar: Option<ProgressBar>,
}

impl BatchDriver {
    /// Driver using the default JPEG codec
    pub fn new(options: BatchOptions) -> Self {
        Self::with_codec(options, Arc::new(JpegCodec::new()))
    }

    pub fn with_codec(options: BatchOptions, codec: Arc<dyn Codec>) -> Self {
        Self {
            options,
            codec,
            progress_bar: None,
        }
    }

    /// Mirror worker progress on `bar`
    pub fn with_progress_bar(mut self, bar: ProgressBar) -> Self {
        self.progress_bar = Some(bar);
        self
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Run the batch to completion.
    ///
    /// Fails only when the options are invalid, the input directory cannot be
    /// opened, or a worker thread panics. Per-file failures are counted in the
    /// report.
    pub fn run(&self) -> Result<BatchReport> {
        let start_time = Instant::now();
        self.options.validate()?;

        let layout = &self.options.layout;
        let queue = DirectoryQueue::open(&layout.input_dir)?;

        let mut tracker = ProgressTracker::new();
        if let Some(bar) = &self.progress_bar {
            tracker = tracker.with_progress_bar(bar.clone());
        }

        info!(
            "Downscaling {:?} -> {:?} by {} with {} workers",
            layout.input_dir, layout.output_dir, self.options.factor, self.options.workers
        );

        let summaries = self.spawn_workers(&queue, &tracker)?;
        tracker.finish();

        for summary in &summaries {
            debug!(
                "Worker {}: {} processed, {} failed, {} too small",
                summary.id, summary.processed, summary.failed, summary.skipped_empty
            );
        }

        let state = tracker.state();
        let report = BatchReport {
            input_dir: layout.input_dir.clone(),
            output_dir: layout.output_dir.clone(),
            scale_factor: self.options.factor.get(),
            workers: self.options.workers,
            processed: state.processed,
            failed: state.failed,
            skipped_empty: state.skipped_empty,
            skipped_entries: queue.skipped(),
            unreadable_entries: queue.unreadable(),
            input_pixels: state.input_pixels,
            output_pixels: state.output_pixels,
            elapsed: start_time.elapsed(),
        };

        info!(
            "Batch completed in {:.2}s: {} processed, {} failed",
            report.elapsed.as_secs_f64(),
            report.processed,
            report.failed
        );

        Ok(report)
    }

    fn spawn_workers(
        &self,
        queue: &DirectoryQueue,
        tracker: &ProgressTracker,
    ) -> Result<Vec<WorkerSummary>> {
        let codec = self.codec.as_ref();
        let layout = &self.options.layout;
        let factor = self.options.factor;

        let joined = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = (0..self.options.workers)
                .map(|id| {
                    let worker = Worker::new(id, queue, codec, layout, factor, tracker);
                    (id, scope.spawn(move |_| worker.run()))
                })
                .collect();

            // join every handle so a panic is attributed to its worker
            handles
                .into_iter()
                .map(|(id, handle)| handle.join().map_err(|_| id))
                .collect::<Vec<_>>()
        });

        collect_summaries(joined)
    }
}

/// Turn the scope's join results into summaries, failing on the first panic
fn collect_summaries(
    joined: std::thread::Result<Vec<std::result::Result<WorkerSummary, usize>>>,
) -> Result<Vec<WorkerSummary>> {
    let results = joined.map_err(|_| BoxScaleError::WorkerPool {
        message: "a worker thread panicked without being joined".to_string(),
    })?;

    results
        .into_iter()
        .map(|result| result.map_err(|worker| BoxScaleError::WorkerPanicked { worker }))
        .collect()
}

/// Aggregate result of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub scale_factor: u32,
    pub workers: usize,
    pub processed: u64,
    pub failed: u64,
    pub skipped_empty: u64,
    /// Directory entries that were not regular files
    pub skipped_entries: u64,
    /// Directory entries the listing failed to read
    pub unreadable_entries: u64,
    pub input_pixels: u64,
    pub output_pixels: u64,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl BatchReport {
    /// Files the workers finished with, whatever the outcome
    pub fn attempted(&self) -> u64 {
        self.processed + self.failed + self.skipped_empty
    }

    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.processed as f64 / secs
    }

    /// Line printed at the end of every run
    pub fn timing_line(&self) -> String {
        format!("Total execution time: {:.2} seconds", self.elapsed.as_secs_f64())
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        if self.failed > 0 || self.skipped_empty > 0 {
            println!("Processed: {}", self.processed);
            if self.failed > 0 {
                println!("Failed: {}", self.failed);
            }
            if self.skipped_empty > 0 {
                println!("Too small for factor {}: {}", self.scale_factor, self.skipped_empty);
            }
        }
        println!("{}", self.timing_line());
    }
}

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}
