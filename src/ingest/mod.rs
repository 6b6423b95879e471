//! Single-pass STDF ingestion: reader thread, summarizer, progress ticker.
//!
//! The reader walks the file on its own thread and feeds a bounded queue;
//! the summarizer drains it on the calling thread and writes the summary
//! database. The queue is the only synchronization between the two. The
//! reader is always joined before control returns to the caller, and the
//! database handle is closed even when ingestion fails.

pub(crate) mod message;
mod progress;
pub(crate) mod reader;
mod summarizer;

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::bounded;
use tracing::{debug, info};

use crate::constants::INGEST_QUEUE_DEPTH;
use crate::db::SummaryDb;
use crate::endian::{detect_byte_order, Endian};
use crate::error::{Result, StdfError};
use crate::records;
use crate::source::{file_size_hint, StdfSource};

use message::RecordMessage;
use summarizer::Summarizer;

pub use progress::ProgressSink;

/// Outcome of a successful ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Byte order the file was written in.
    pub endian: Endian,
    /// Total bytes walked, including skipped records.
    pub bytes_walked: u64,
    /// Number of DUTs opened by PIR records.
    pub dut_count: u64,
    /// Number of wafers opened by WIR records.
    pub wafer_count: u64,
}

/// One STDF file → one summary database.
pub struct Ingestor {
    stdf_path: PathBuf,
    db_path: PathBuf,
    stop: Arc<AtomicBool>,
    sink: Option<Arc<dyn ProgressSink>>,
}

impl Ingestor {
    pub fn new(stdf_path: impl AsRef<Path>, db_path: impl AsRef<Path>) -> Self {
        Self {
            stdf_path: stdf_path.as_ref().to_path_buf(),
            db_path: db_path.as_ref().to_path_buf(),
            stop: Arc::new(AtomicBool::new(false)),
            sink: None,
        }
    }

    /// Shares the cooperative stop flag with the caller; setting it makes
    /// the reader finish with [`StdfError::Terminated`] at the next record
    /// boundary.
    #[must_use]
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Runs the full pass. On success the database at `db_path` is complete
    /// and closed; on failure rows committed at PRR boundaries survive and
    /// the open tail transaction is rolled back.
    pub fn run(self) -> Result<IngestReport> {
        let mut source = StdfSource::open(&self.stdf_path)?;
        let endian = detect_byte_order(&mut source)?;
        info!(
            byte_order = endian.describe(),
            path = %self.stdf_path.display(),
            "detected STDF byte order"
        );
        source.reopen()?;

        let file_size = file_size_hint(&self.stdf_path);
        let db = SummaryDb::create(&self.db_path)?;
        let bytes_walked = Arc::new(AtomicU64::new(0));
        let (tx, rx) = bounded(INGEST_QUEUE_DEPTH);

        let reader_stop = self.stop.clone();
        let reader_bytes = bytes_walked.clone();
        let reader = thread::Builder::new()
            .name("stdf-reader".into())
            .spawn(move || {
                reader::run_reader(
                    source,
                    endian,
                    records::is_enqueued,
                    &tx,
                    &reader_stop,
                    &reader_bytes,
                );
            })?;
        let ticker = self
            .sink
            .map(|sink| progress::ProgressTicker::spawn(sink, bytes_walked.clone(), file_size));

        let mut summarizer = Summarizer::new(&db)?;
        let mut consumer_err: Option<StdfError> = None;
        let mut reader_err: Option<StdfError> = None;
        loop {
            match rx.recv() {
                Ok(RecordMessage::Finish(outcome)) => {
                    reader_err = outcome;
                    break;
                }
                Ok(msg) => {
                    if let Err(err) = summarizer.apply(msg) {
                        consumer_err = Some(err);
                        break;
                    }
                }
                Err(_) => break, // reader vanished without a Finish
            }
        }

        if consumer_err.is_some() {
            // Stop the reader so it cannot block on a full queue, then
            // drain whatever it already enqueued up to its Finish.
            self.stop.store(true, Ordering::Relaxed);
            while let Ok(msg) = rx.recv() {
                if matches!(msg, RecordMessage::Finish(_)) {
                    break;
                }
            }
        }

        let join_err = reader
            .join()
            .err()
            .map(|panic| StdfError::ReaderPanic {
                payload: panic_payload(&panic),
            });
        if let Some(ticker) = ticker {
            ticker.finish();
        }

        // First error observed wins; reader-side failures arrive through
        // the terminal Finish message.
        let first_err = consumer_err.or(reader_err).or(join_err);
        match first_err {
            None => {
                summarizer.finish()?;
                let report = IngestReport {
                    endian,
                    bytes_walked: bytes_walked.load(Ordering::Relaxed),
                    dut_count: summarizer.dut_count(),
                    wafer_count: summarizer.wafer_count(),
                };
                debug!(
                    duts = report.dut_count,
                    wafers = report.wafer_count,
                    bytes = report.bytes_walked,
                    "ingestion complete"
                );
                db.close()?;
                Ok(report)
            }
            Some(err) => {
                db.abort();
                let _ = db.close();
                Err(err)
            }
        }
    }
}

fn panic_payload(payload: &Box<dyn Any + Send + 'static>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown".to_string()
    }
}
