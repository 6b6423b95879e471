//! Fixed values shared across the ingestion pipeline.
//!
//! Record codes are the composite `(rec_typ << 8) | rec_sub` of the 4-byte
//! record header; the decimal values are part of the dispatch contract and
//! are also what `Test_Info.recHeader` stores.

/// File Attributes Record, always the first record of a conforming file.
pub const REC_FAR: u16 = 10;
/// Audit Trail Record.
pub const REC_ATR: u16 = 20;
/// Master Information Record.
pub const REC_MIR: u16 = 266;
/// Master Results Record.
pub const REC_MRR: u16 = 276;
/// Part Count Record.
pub const REC_PCR: u16 = 286;
/// Hardware Bin Record.
pub const REC_HBR: u16 = 296;
/// Software Bin Record.
pub const REC_SBR: u16 = 306;
/// Pin Map Record.
pub const REC_PMR: u16 = 316;
/// Pin Group Record.
pub const REC_PGR: u16 = 318;
/// Pin List Record.
pub const REC_PLR: u16 = 319;
/// Retest Data Record.
pub const REC_RDR: u16 = 326;
/// Site Description Record.
pub const REC_SDR: u16 = 336;
/// Wafer Information Record.
pub const REC_WIR: u16 = 522;
/// Wafer Results Record.
pub const REC_WRR: u16 = 532;
/// Wafer Configuration Record.
pub const REC_WCR: u16 = 542;
/// Part Information Record.
pub const REC_PIR: u16 = 1290;
/// Part Results Record.
pub const REC_PRR: u16 = 1300;
/// Test Synopsis Record.
pub const REC_TSR: u16 = 2590;
/// Parametric Test Record.
pub const REC_PTR: u16 = 3850;
/// Multiple-Result Parametric Record.
pub const REC_MPR: u16 = 3855;
/// Functional Test Record.
pub const REC_FTR: u16 = 3860;
/// Begin Program Section Record.
pub const REC_BPS: u16 = 5130;
/// End Program Section Record.
pub const REC_EPS: u16 = 5140;
/// Generic Data Record.
pub const REC_GDR: u16 = 12810;
/// Datalog Text Record.
pub const REC_DTR: u16 = 12830;

/// Size of the record header preceding every payload.
pub const HEADER_LEN: usize = 4;
/// The only STDF major version this engine accepts.
pub const SUPPORTED_STDF_VERSION: u8 = 4;
/// Payload length of a conforming FAR (CPU_TYPE + STDF_VER).
pub const FAR_PAYLOAD_LEN: u16 = 2;

/// Queue depth for the first-pass ingestion channel.
pub const INGEST_QUEUE_DEPTH: usize = 1 << 22;
/// Queue depth for the diagnostic analyzer channel.
pub const ANALYZE_QUEUE_DEPTH: usize = 1024;

/// Progress is published on a 0..=10000 scale; the last two digits are
/// interpreted as decimals by the consumer.
pub const PROGRESS_SCALE: u16 = 10_000;
/// Interval between progress publications.
pub const PROGRESS_INTERVAL_MS: u64 = 100;

/// PRR coordinate value meaning "not recorded"; stored as NULL.
pub const COORD_MISSING: i16 = -32768;
/// WRR/PCR/TSR count value meaning "not recorded".
pub const COUNT_MISSING: u32 = u32::MAX;
/// MIR burn-in time value meaning "not recorded".
pub const BURN_TIM_MISSING: u16 = 65_535;
/// Placeholder bin name until an authoritative HBR/SBR supplies one.
pub const MISSING_BIN_NAME: &str = "MissingName";
