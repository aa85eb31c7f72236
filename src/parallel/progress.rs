//! Progress tracking for the worker pool

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Thread-safe counters shared by all workers, with an optional spinner
#[derive(Default)]
pub struct ProgressTracker {
    processed: AtomicU64,
    failed: AtomicU64,
    skipped_empty: AtomicU64,
    input_pixels: AtomicU64,
    output_pixels: AtomicU64,
    bar: Option<ProgressBar>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub processed: u64,
    pub failed: u64,
    pub skipped_empty: u64,
    pub input_pixels: u64,
    pub output_pixels: u64,
}

impl ProgressState {
    /// Files a worker finished with, whatever the outcome
    pub fn attempted(&self) -> u64 {
        self.processed + self.failed + self.skipped_empty
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report progress through `bar` as well as the counters
    pub fn with_progress_bar(mut self, bar: ProgressBar) -> Self {
        self.bar = Some(bar);
        self
    }

    /// Spinner used by the CLI; the total is unknown because the directory is streamed
    pub fn spinner() -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }

    /// A file was decoded, downscaled and written
    pub fn record_written(&self, input_pixels: u64, output_pixels: u64) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.input_pixels.fetch_add(input_pixels, Ordering::Relaxed);
        self.output_pixels.fetch_add(output_pixels, Ordering::Relaxed);
        self.tick();
    }

    /// A file was decoded but downscaled to nothing
    pub fn record_skipped_empty(&self, input_pixels: u64) {
        self.skipped_empty.fetch_add(1, Ordering::Relaxed);
        self.input_pixels.fetch_add(input_pixels, Ordering::Relaxed);
        self.tick();
    }

    /// A file failed to decode or encode
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.tick();
    }

    pub fn state(&self) -> ProgressState {
        ProgressState {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped_empty: self.skipped_empty.load(Ordering::Relaxed),
            input_pixels: self.input_pixels.load(Ordering::Relaxed),
            output_pixels: self.output_pixels.load(Ordering::Relaxed),
        }
    }

    /// Stop the spinner, leaving the final counts on screen
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(status_line(&self.state()));
        }
    }

    fn tick(&self) {
        if let Some(bar) = &self.bar {
            bar.set_message(status_line(&self.state()));
        }
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("state", &self.state())
            .field("has_bar", &self.bar.is_some())
            .finish()
    }
}

fn status_line(state: &ProgressState) -> String {
    let mut line = format!("{} processed, {} failed", state.processed, state.failed);
    if state.skipped_empty > 0 {
        line.push_str(&format!(", {} too small", state.skipped_empty));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let tracker = ProgressTracker::new();
        tracker.record_written(100, 25);
        tracker.record_written(16, 4);
        tracker.record_failure();
        tracker.record_skipped_empty(9);

        let state = tracker.state();
        assert_eq!(state.processed, 2);
        assert_eq!(state.failed, 1);
        assert_eq!(state.skipped_empty, 1);
        assert_eq!(state.input_pixels, 125);
        assert_eq!(state.output_pixels, 29);
        assert_eq!(state.attempted(), 4);
    }

    #[test]
    fn test_concurrent_updates() {
        let tracker = ProgressTracker::new();
        crossbeam::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|_| {
                    for _ in 0..1000 {
                        tracker.record_written(4, 1);
                    }
                });
            }
        })
        .unwrap();

        assert_eq!(tracker.state().processed, 8000);
        assert_eq!(tracker.state().output_pixels, 8000);
    }

    #[test]
    fn test_hidden_bar_tracks_message() {
        let tracker = ProgressTracker::new().with_progress_bar(ProgressBar::hidden());
        tracker.record_written(1, 1);
        tracker.record_failure();
        tracker.finish();
        assert_eq!(tracker.state().attempted(), 2);
    }

    #[test]
    fn test_status_line() {
        let state = ProgressState {
            processed: 3,
            failed: 1,
            ..ProgressState::default()
        };
        assert_eq!(status_line(&state), "3 processed, 1 failed");

        let state = ProgressState {
            skipped_empty: 2,
            ..state
        };
        assert_eq!(status_line(&state), "3 processed, 1 failed, 2 too small");
    }
}
