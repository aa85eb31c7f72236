//! Worker loop: claim, decode, downscale, encode, repeat

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::processing::{process_file, Codec, FileOutcome, ScaleFactor};
use super::progress::ProgressTracker;
use super::queue::{Claim, DirectoryQueue, WorkItem};

/// Input and output directories; entry names are shared between them
#[derive(Debug, Clone)]
pub struct DirectoryLayout {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl DirectoryLayout {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(input_dir: P, output_dir: Q) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn input_path(&self, item: &WorkItem) -> PathBuf {
        self.input_dir.join(item.file_name())
    }

    pub fn output_path(&self, item: &WorkItem) -> PathBuf {
        self.output_dir.join(item.file_name())
    }
}

/// Per-worker tallies returned when the worker reaches `Done`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub id: usize,
    pub processed: u64,
    pub failed: u64,
    pub skipped_empty: u64,
}

/// One unit of parallel execution.
///
/// Cycles `Claiming -> Processing -> Claiming` until the queue reports
/// `Exhausted`. A failed file is logged and counted; the worker then claims
/// the next one.
pub struct Worker<'a> {
    id: usize,
    queue: &'a DirectoryQueue,
    codec: &'a dyn Codec,
    layout: &'a DirectoryLayout,
    factor: ScaleFactor,
    tracker: &'a ProgressTracker,
}

impl<'a> Worker<'a> {
    pub fn new(
        id: usize,
        queue: &'a DirectoryQueue,
        codec: &'a dyn Codec,
        layout: &'a DirectoryLayout,
        factor: ScaleFactor,
        tracker: &'a ProgressTracker,
    ) -> Self {
        Self {
            id,
            queue,
            codec,
            layout,
            factor,
            tracker,
        }
    }

    /// Drain the queue, returning this worker's tallies
    pub fn run(self) -> WorkerSummary {
        let mut summary = WorkerSummary {
            id: self.id,
            ..WorkerSummary::default()
        };

        debug!(worker = self.id, "Worker started");

        while let Claim::Item(item) = self.queue.claim_next() {
            let input_path = self.layout.input_path(&item);
            let output_path = self.layout.output_path(&item);
            self.process(&input_path, &output_path, &mut summary);
        }

        debug!(
            worker = self.id,
            processed = summary.processed,
            failed = summary.failed,
            "Worker done"
        );
        summary
    }

    fn process(&self, input_path: &Path, output_path: &Path, summary: &mut WorkerSummary) {
        match process_file(self.codec, input_path, output_path, self.factor) {
            Ok(outcome @ FileOutcome::Written { .. }) => {
                summary.processed += 1;
                self.tracker
                    .record_written(outcome.input_pixels(), outcome.output_pixels());
            }
            Ok(outcome @ FileOutcome::SkippedEmpty { .. }) => {
                summary.skipped_empty += 1;
                self.tracker.record_skipped_empty(outcome.input_pixels());
            }
            Err(e) => {
                summary.failed += 1;
                self.tracker.record_failure();
                warn!(worker = self.id, path = ?input_path, "{}", e.user_message());
            }
        }
    }
}
