//! Messages flowing over the reader → summarizer channel.

use crate::endian::Endian;
use crate::error::StdfError;

/// One element of the bounded ingestion queue.
///
/// `Parse` payload buffers are allocated by the reader and owned by the
/// consumer once received; the move across the channel is the ownership
/// handoff, so every exit path on the consumer side releases them.
#[derive(Debug)]
pub(crate) enum RecordMessage {
    /// Latches the detected byte order; always precedes the first `Parse`.
    SetEndian(Endian),
    /// One record of interest. `offset` is the payload start within the
    /// uncompressed stream (the header sits at `offset - 4`).
    Parse {
        code: u16,
        offset: u64,
        bytes: Vec<u8>,
    },
    /// Terminal element, exactly one per run. `None` is a clean end of
    /// stream; `Some` carries the reader-side failure.
    Finish(Option<StdfError>),
}
