//! Byte-order detection for STDF streams.
//!
//! A conforming file opens with a FAR whose payload length is 2. Reading
//! that length in the wrong byte order yields 512, which is how the order
//! is detected without any out-of-band hint. The detected order is threaded
//! through every decoder as an explicit parameter.

use std::io::Read;

use crate::constants::{FAR_PAYLOAD_LEN, SUPPORTED_STDF_VERSION};
use crate::error::{Result, StdfError};
use crate::source::StdfSource;

/// Integer byte order of an STDF stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    #[must_use]
    pub fn u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            Self::Little => u16::from_le_bytes(bytes),
            Self::Big => u16::from_be_bytes(bytes),
        }
    }

    #[must_use]
    pub fn u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Self::Little => u32::from_le_bytes(bytes),
            Self::Big => u32::from_be_bytes(bytes),
        }
    }

    #[must_use]
    pub fn i16(self, bytes: [u8; 2]) -> i16 {
        self.u16(bytes) as i16
    }

    #[must_use]
    pub fn i32(self, bytes: [u8; 4]) -> i32 {
        self.u32(bytes) as i32
    }

    #[must_use]
    pub fn f32(self, bytes: [u8; 4]) -> f32 {
        f32::from_bits(self.u32(bytes))
    }

    /// Human-readable form stored in `File_Info.BYTE_ORD`.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Little => "Little endian",
            Self::Big => "Big endian",
        }
    }
}

/// Reads the leading FAR from `source` and decides the stream byte order.
///
/// Consumes the first six bytes (header plus FAR payload); callers rewind
/// the source with [`StdfSource::reopen`] before walking records. Rejects
/// files whose first record is not a FAR and files declaring an STDF
/// version other than 4.
pub fn detect_byte_order(source: &mut StdfSource) -> Result<Endian> {
    let mut header = [0u8; 4];
    source.read_exact(&mut header).map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            StdfError::InvalidStdf {
                reason: "file is shorter than a record header".into(),
            }
        } else {
            err.into()
        }
    })?;

    let rec_typ = header[2];
    let rec_sub = header[3];
    if rec_typ != 0 || rec_sub != 10 {
        return Err(StdfError::InvalidStdf {
            reason: "first record is not a FAR".into(),
        });
    }

    let len_bytes = [header[0], header[1]];
    let endian = if u16::from_le_bytes(len_bytes) == FAR_PAYLOAD_LEN {
        Endian::Little
    } else if u16::from_be_bytes(len_bytes) == FAR_PAYLOAD_LEN {
        Endian::Big
    } else {
        return Err(StdfError::InvalidStdf {
            reason: "FAR payload length is not 2 in either byte order".into(),
        });
    };

    let mut payload = [0u8; 2];
    source.read_exact(&mut payload).map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            StdfError::InvalidStdf {
                reason: "FAR payload is truncated".into(),
            }
        } else {
            StdfError::from(err)
        }
    })?;
    let version = payload[1];
    if version != SUPPORTED_STDF_VERSION {
        return Err(StdfError::WrongVersion { version });
    }

    Ok(endian)
}
