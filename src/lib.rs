//! Single-pass summarization of STDF V4 test logs into an embedded SQLite
//! database.
//!
//! Semiconductor test equipment emits Standard Test Data Format files:
//! dense binary record streams that are slow to rescan. This crate walks a
//! (possibly gzip or bzip2 compressed) STDF file exactly once and produces
//! a relational summary that viewers and analytics query instead of the
//! raw log. Individual parametric measurements are not copied into the
//! database; their byte offsets are indexed during the pass and fetched on
//! demand later.
//!
//! # Pipeline
//!
//! ```text
//! .stdf / .stdf.gz / .stdf.bz2
//!     → byte-order detection (leading FAR)
//!         → reader thread (filter, allocate, enqueue)
//!             → bounded queue
//!                 → summarizer (decode, correlate, SQL rows)
//!                     → summary.db (File_Info, Dut_Info, Test_Info, …)
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use stdfsum::{fetch_results, Ingestor, REC_PTR};
//!
//! # fn main() -> stdfsum::Result<()> {
//! let report = Ingestor::new("lot42.stdf", "lot42.db").run()?;
//!
//! // Later, pull the raw measurements for one test number using the
//! // offsets the pass indexed in Test_Offsets.
//! let fetched = fetch_results("lot42.stdf", REC_PTR, &[86], &[12], report.endian)?;
//! assert_eq!(fetched.values.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod analyze;
pub mod constants;
pub mod db;
pub mod endian;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod records;
pub mod source;

pub use analyze::{analyze_records, RecordHistogram};
pub use constants::{REC_FTR, REC_MPR, REC_PTR};
pub use db::SummaryDb;
pub use endian::{detect_byte_order, Endian};
pub use error::{Result, StdfError};
pub use fetch::{fetch_results, FetchedResults};
pub use ingest::{IngestReport, Ingestor, ProgressSink};
pub use source::{file_size_hint, StdfSource};
