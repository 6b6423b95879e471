//! Producer side of the ingestion pipeline: walks records sequentially and
//! feeds the bounded queue.

use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::Sender;
use tracing::debug;

use crate::constants::HEADER_LEN;
use crate::endian::Endian;
use crate::error::StdfError;
use crate::records::RecordHeader;
use crate::source::StdfSource;

use super::message::RecordMessage;

/// Walks `source` start to finish, enqueueing records matching `filter`.
///
/// Emits `SetEndian` first, then zero or more `Parse` messages in file
/// order, then exactly one `Finish`. Never blocks on anything but the
/// queue and file I/O; the stop flag is observed once per record boundary,
/// so no partial record is ever emitted.
pub(crate) fn run_reader(
    mut source: StdfSource,
    endian: Endian,
    filter: fn(u16) -> bool,
    tx: &Sender<RecordMessage>,
    stop: &AtomicBool,
    bytes_walked: &AtomicU64,
) {
    if tx.send(RecordMessage::SetEndian(endian)).is_err() {
        return;
    }
    let outcome = walk(&mut source, endian, filter, tx, stop, bytes_walked);
    debug!(
        bytes = source.position(),
        clean = outcome.is_none(),
        "reader finished"
    );
    let _ = tx.send(RecordMessage::Finish(outcome));
}

/// Returns `None` on clean end of stream, `Some(err)` otherwise.
fn walk(
    source: &mut StdfSource,
    endian: Endian,
    filter: fn(u16) -> bool,
    tx: &Sender<RecordMessage>,
    stop: &AtomicBool,
    bytes_walked: &AtomicU64,
) -> Option<StdfError> {
    let mut offset: u64 = 0;
    let mut header_bytes = [0u8; HEADER_LEN];
    loop {
        if stop.load(Ordering::Relaxed) {
            return Some(StdfError::Terminated);
        }

        match source.read_exact(&mut header_bytes) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return None,
            Err(err) => return Some(err.into()),
        }
        offset += HEADER_LEN as u64;

        let header = RecordHeader::decode(header_bytes, endian);
        let code = header.code();
        let len = usize::from(header.rec_len);

        if filter(code) {
            let mut bytes = Vec::new();
            if bytes.try_reserve_exact(len).is_err() {
                return Some(StdfError::NoMemory { bytes: len });
            }
            bytes.resize(len, 0);
            match source.read_exact(&mut bytes) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return None,
                Err(err) => return Some(err.into()),
            }
            if tx
                .send(RecordMessage::Parse {
                    code,
                    offset,
                    bytes,
                })
                .is_err()
            {
                // Consumer went away without draining; nothing left to do.
                return None;
            }
        } else if let Err(err) = source.skip(len as u64) {
            return match err {
                StdfError::Io { ref source, .. }
                    if source.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    None
                }
                other => Some(other),
            };
        }

        offset += len as u64;
        bytes_walked.store(offset, Ordering::Relaxed);
    }
}
