//! On-demand parametric measurement retrieval.
//!
//! The first pass records `(offset, length)` pairs in `Test_Offsets`; this
//! module reopens the raw file, extracts the payload bytes row by row, and
//! decodes them in parallel. Extraction is sequential (one file cursor),
//! decoding is data-parallel per row.

use std::io::Read;
use std::path::Path;

use rayon::prelude::*;
use tracing::debug;

use crate::constants::{REC_FTR, REC_MPR, REC_PTR};
use crate::endian::Endian;
use crate::error::{Result, StdfError};
use crate::records::{Ftr, Mpr, Ptr};
use crate::source::StdfSource;

/// Numeric results and test flags for one test number across DUTs, in the
/// order the offsets were supplied. Entries whose offset or length was
/// negative decode to `NaN` with a zero flag.
#[derive(Debug, Clone)]
pub struct FetchedResults {
    pub values: Vec<f64>,
    pub flags: Vec<u8>,
}

/// Reads and decodes the payloads at `offsets`/`lengths` from `path`.
///
/// `code` selects the decoder and must be PTR, FTR, or MPR. Offsets are
/// payload starts within the uncompressed stream, exactly as stored in
/// `Test_Offsets.Offset`. The byte order is the one ingestion detected.
pub fn fetch_results(
    path: impl AsRef<Path>,
    code: u16,
    offsets: &[i64],
    lengths: &[i32],
    endian: Endian,
) -> Result<FetchedResults> {
    if !matches!(code, REC_PTR | REC_FTR | REC_MPR) {
        return Err(StdfError::UnsupportedRecord { code });
    }
    if offsets.len() != lengths.len() {
        return Err(StdfError::MismatchedArrays {
            offsets: offsets.len(),
            lengths: lengths.len(),
        });
    }

    let count = offsets.len();
    let stride = lengths.iter().copied().filter(|&len| len > 0).max().unwrap_or(0) as usize;
    if count == 0 || stride == 0 {
        return Ok(FetchedResults {
            values: vec![f64::NAN; count],
            flags: vec![0; count],
        });
    }

    // One flat matrix, each row zero right-padded to the widest payload so
    // every row has identical stride.
    let mut matrix = vec![0u8; count * stride];
    let mut lens = vec![0usize; count];
    let mut source = StdfSource::open(path)?;
    for index in 0..count {
        if offsets[index] < 0 || lengths[index] < 0 {
            continue;
        }
        let len = lengths[index] as usize;
        source.seek_to(offsets[index] as u64)?;
        source.read_exact(&mut matrix[index * stride..index * stride + len])?;
        lens[index] = len;
    }
    debug!(rows = count, stride, "extracted parametric payloads");

    let decoded: Vec<(f64, u8)> = matrix
        .par_chunks(stride)
        .zip(lens.par_iter())
        .map(|(row, &len)| {
            if len == 0 {
                (f64::NAN, 0)
            } else {
                decode_row(code, &row[..len], endian)
            }
        })
        .collect();

    let (values, flags) = decoded.into_iter().unzip();
    Ok(FetchedResults { values, flags })
}

fn decode_row(code: u16, row: &[u8], endian: Endian) -> (f64, u8) {
    match code {
        REC_PTR => Ptr::decode(row, endian)
            .map(|ptr| {
                (
                    ptr.result.map_or(f64::NAN, f64::from),
                    ptr.test_flg,
                )
            })
            .unwrap_or((f64::NAN, 0)),
        REC_FTR => Ftr::decode(row, endian)
            .map(|ftr| (f64::from(ftr.test_flg), ftr.test_flg))
            .unwrap_or((f64::NAN, 0)),
        REC_MPR => Mpr::decode(row, endian)
            .map(|mpr| (f64::from(mpr.test_flg), mpr.test_flg))
            .unwrap_or((f64::NAN, 0)),
        _ => (f64::NAN, 0),
    }
}
