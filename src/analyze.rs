//! Diagnostic record-type histogram.
//!
//! Runs the same detector + reader + queue pipeline as ingestion, but the
//! consumer only tallies record codes. Useful for eyeballing what a tester
//! actually wrote before committing to a full summarization pass.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::thread;

use crossbeam_channel::bounded;
use tracing::debug;

use crate::constants::ANALYZE_QUEUE_DEPTH;
use crate::endian::detect_byte_order;
use crate::error::{Result, StdfError};
use crate::ingest::message::RecordMessage;
use crate::records;
use crate::source::StdfSource;

/// Per-code record counts for one file, ordered by record code.
#[derive(Debug, Clone, Default)]
pub struct RecordHistogram {
    counts: BTreeMap<u16, u64>,
}

impl RecordHistogram {
    /// Occurrences of one record code.
    #[must_use]
    pub fn count(&self, code: u16) -> u64 {
        self.counts.get(&code).copied().unwrap_or(0)
    }

    /// Total records tallied.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    fn bump(&mut self, code: u16) {
        *self.counts.entry(code).or_insert(0) += 1;
    }
}

impl fmt::Display for RecordHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (&code, &count) in &self.counts {
            let name = records::record_name(code).unwrap_or("???");
            let rec_typ = code >> 8;
            let rec_sub = code & 0xFF;
            writeln!(f, "{name:<4} ({rec_typ:>2},{rec_sub:>3})  {count:>10}")?;
        }
        Ok(())
    }
}

/// Walks `path` end to end and returns the record-type histogram.
pub fn analyze_records(path: impl AsRef<Path>) -> Result<RecordHistogram> {
    let mut source = StdfSource::open(path.as_ref())?;
    let endian = detect_byte_order(&mut source)?;
    source.reopen()?;

    let stop = AtomicBool::new(false);
    let bytes_walked = AtomicU64::new(0);
    let (tx, rx) = bounded(ANALYZE_QUEUE_DEPTH);

    let mut histogram = RecordHistogram::default();
    let mut reader_err: Option<StdfError> = None;
    thread::scope(|scope| {
        scope.spawn(|| {
            crate::ingest::reader::run_reader(
                source,
                endian,
                records::is_known,
                &tx,
                &stop,
                &bytes_walked,
            );
        });
        loop {
            match rx.recv() {
                Ok(RecordMessage::Parse { code, .. }) => histogram.bump(code),
                Ok(RecordMessage::SetEndian(_)) => {}
                Ok(RecordMessage::Finish(outcome)) => {
                    reader_err = outcome;
                    break;
                }
                Err(_) => break,
            }
        }
    });

    match reader_err {
        None => {
            debug!(records = histogram.total(), "analysis complete");
            Ok(histogram)
        }
        Some(err) => Err(err),
    }
}
