//! Sequential access to plain, gzip, and bzip2 compressed STDF files.
//!
//! The walk is strictly forward: the only rewind is a full reopen, and
//! compressed inputs "seek" by decompress-and-discard. Offsets reported by
//! [`StdfSource::position`] are always within the uncompressed stream.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;

use crate::error::{Result, StdfError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gz") => Self::Gzip,
            Some(ext) if ext.eq_ignore_ascii_case("bz2") => Self::Bzip2,
            _ => Self::None,
        }
    }
}

enum SourceReader {
    Plain(BufReader<File>),
    Gzip(Box<GzDecoder<BufReader<File>>>),
    Bzip2(Box<BzDecoder<BufReader<File>>>),
}

/// A (possibly compressed) STDF file opened for one sequential pass.
pub struct StdfSource {
    path: PathBuf,
    compression: Compression,
    reader: SourceReader,
    position: u64,
}

impl StdfSource {
    /// Opens `path`, inferring compression from the file extension.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let compression = Compression::from_path(&path);
        let reader = Self::make_reader(&path, compression)?;
        Ok(Self {
            path,
            compression,
            reader,
            position: 0,
        })
    }

    fn make_reader(path: &Path, compression: Compression) -> Result<SourceReader> {
        let file = File::open(path).map_err(|source| StdfError::Io {
            source,
            path: Some(path.to_path_buf()),
        })?;
        let buffered = BufReader::new(file);
        Ok(match compression {
            Compression::None => SourceReader::Plain(buffered),
            Compression::Gzip => SourceReader::Gzip(Box::new(GzDecoder::new(buffered))),
            Compression::Bzip2 => SourceReader::Bzip2(Box::new(BzDecoder::new(buffered))),
        })
    }

    /// Rewinds to the start of the stream by reopening the underlying file.
    pub fn reopen(&mut self) -> Result<()> {
        self.reader = Self::make_reader(&self.path, self.compression)?;
        self.position = 0;
        Ok(())
    }

    /// Current offset within the uncompressed stream.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Advances past `n` bytes without surfacing them.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        if let SourceReader::Plain(reader) = &mut self.reader {
            reader.seek_relative(n as i64)?;
            self.position += n;
            return Ok(());
        }
        let copied = io::copy(&mut (&mut self.reader).take(n), &mut io::sink())?;
        self.position += copied;
        if copied < n {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "skip ran past end of stream",
            )
            .into());
        }
        Ok(())
    }

    /// Positions the stream at an absolute uncompressed offset.
    ///
    /// Plain files seek directly; compressed files skip forward, reopening
    /// first when the target precedes the current position.
    pub fn seek_to(&mut self, target: u64) -> Result<()> {
        if let SourceReader::Plain(reader) = &mut self.reader {
            reader.seek(SeekFrom::Start(target))?;
            self.position = target;
            return Ok(());
        }
        if target < self.position {
            self.reopen()?;
        }
        let delta = target - self.position;
        if delta > 0 {
            self.skip(delta)?;
        }
        Ok(())
    }
}

impl Read for StdfSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.reader.read(buf)?;
        self.position += read as u64;
        Ok(read)
    }
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(reader) => reader.read(buf),
            Self::Gzip(reader) => reader.read(buf),
            Self::Bzip2(reader) => reader.read(buf),
        }
    }
}

/// Best-effort uncompressed size used to normalize progress reporting.
///
/// `.gz` inputs report the ISIZE trailer (last four bytes, little-endian);
/// `.bz2` and plain files report the on-disk length. A file that cannot be
/// opened, or is too short to carry the trailer, reports 0 so progress
/// stays pinned at the origin instead of dividing by garbage.
#[must_use]
pub fn file_size_hint(path: impl AsRef<Path>) -> u64 {
    let path = path.as_ref();
    let Ok(mut file) = File::open(path) else {
        return 0;
    };
    match Compression::from_path(path) {
        Compression::Gzip => {
            if file.seek(SeekFrom::End(-4)).is_err() {
                return 0;
            }
            let mut trailer = [0u8; 4];
            if file.read_exact(&mut trailer).is_err() {
                return 0;
            }
            u64::from(u32::from_le_bytes(trailer))
        }
        Compression::None | Compression::Bzip2 => file.seek(SeekFrom::End(0)).unwrap_or(0),
    }
}
