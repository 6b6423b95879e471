//! Progress publication for long ingestion runs.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::constants::{PROGRESS_INTERVAL_MS, PROGRESS_SCALE};

/// Receives scaled progress values.
///
/// The scale is `0..=10000`; consumers render the last two digits as
/// decimals of a percentage. Exactly one final `10000` is published when
/// the run ends, whatever the outcome.
pub trait ProgressSink: Send + Sync {
    fn publish(&self, scaled: u16);
}

/// Periodic publisher reading the reader's byte counter.
pub(crate) struct ProgressTicker {
    done: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub(crate) fn spawn(
        sink: Arc<dyn ProgressSink>,
        bytes_walked: Arc<AtomicU64>,
        file_size: u64,
    ) -> Self {
        let done = Arc::new(AtomicBool::new(false));
        let ticker_done = done.clone();
        let handle = thread::spawn(move || {
            while !ticker_done.load(Ordering::Relaxed) {
                sink.publish(scaled(bytes_walked.load(Ordering::Relaxed), file_size));
                thread::sleep(Duration::from_millis(PROGRESS_INTERVAL_MS));
            }
            sink.publish(PROGRESS_SCALE);
        });
        Self {
            done,
            handle: Some(handle),
        }
    }

    /// Stops the ticker and waits for its final publication.
    pub(crate) fn finish(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.done.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn scaled(bytes: u64, file_size: u64) -> u16 {
    if file_size == 0 {
        return 0;
    }
    let value = bytes.saturating_mul(u64::from(PROGRESS_SCALE)) / file_size;
    value.min(u64::from(PROGRESS_SCALE)) as u16
}
