//! SQLite-backed summary database.
//!
//! One ingestion run owns one database file. The whole load runs inside a
//! single transaction with PRR-delimited commit points so the WAL footprint
//! stays bounded on multi-gigabyte logs.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::{Result, StdfError};

// ── Schema SQL ───────────────────────────────────────────────────────────

const SCHEMA_SQL: &str = "
CREATE TABLE File_Info (
    Field TEXT,
    Value TEXT
);

CREATE TABLE Wafer_Info (
    HEAD_NUM INTEGER,
    WaferIndex INTEGER PRIMARY KEY,
    PART_CNT INTEGER,
    RTST_CNT INTEGER,
    ABRT_CNT INTEGER,
    GOOD_CNT INTEGER,
    FUNC_CNT INTEGER,
    WAFER_ID TEXT,
    FABWF_ID TEXT,
    FRAME_ID TEXT,
    MASK_ID TEXT,
    USR_DESC TEXT,
    EXC_DESC TEXT
);

CREATE TABLE Dut_Info (
    HEAD_NUM INTEGER,
    SITE_NUM INTEGER,
    DUTIndex INTEGER PRIMARY KEY,
    TestCount INTEGER,
    TestTime INTEGER,
    PartID TEXT,
    HBIN INTEGER,
    SBIN INTEGER,
    Flag INTEGER,
    WaferIndex INTEGER,
    XCOORD INTEGER,
    YCOORD INTEGER
) WITHOUT ROWID;

CREATE TABLE Dut_Counts (
    HEAD_NUM INTEGER,
    SITE_NUM INTEGER,
    PART_CNT INTEGER,
    RTST_CNT INTEGER,
    ABRT_CNT INTEGER,
    GOOD_CNT INTEGER,
    FUNC_CNT INTEGER
);

CREATE TABLE Test_Info (
    TEST_NUM INTEGER PRIMARY KEY,
    recHeader INTEGER,
    TEST_NAME TEXT,
    RES_SCAL INTEGER,
    LLimit REAL,
    HLimit REAL,
    Unit TEXT,
    OPT_FLAG INTEGER,
    FailCount INTEGER
);

CREATE TABLE Test_Offsets (
    DUTIndex INTEGER,
    TEST_NUM INTEGER,
    Offset INTEGER,
    BinaryLen INTEGER,
    PRIMARY KEY (DUTIndex, TEST_NUM)
) WITHOUT ROWID;

CREATE TABLE Bin_Info (
    BIN_TYPE TEXT,
    BIN_NUM INTEGER,
    BIN_NAME TEXT,
    BIN_PF TEXT,
    PRIMARY KEY (BIN_TYPE, BIN_NUM)
);
";

// ── Core implementation ──────────────────────────────────────────────────

/// Handle to the relational summary produced by one ingestion pass.
pub struct SummaryDb {
    conn: Connection,
    path: PathBuf,
}

impl SummaryDb {
    /// Creates the database at `path`, replacing any previous contents.
    /// Pragmas are applied before the first insert.
    pub fn create(path: &Path) -> Result<Self> {
        remove_stale(path)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StdfError::Io {
                    source,
                    path: Some(parent.to_path_buf()),
                })?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA synchronous = OFF;
             PRAGMA journal_mode = WAL;",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Opens an existing summary database read/write. Errors if absent.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StdfError::Io {
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "summary database not found",
                ),
                path: Some(path.to_path_buf()),
            });
        }
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Borrow the underlying connection (for callers that need raw SQL).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN;")?;
        Ok(())
    }

    /// PRR commit point: bounds the WAL while keeping one logical load.
    pub(crate) fn commit_boundary(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT; BEGIN;")?;
        Ok(())
    }

    /// Post-ingest finalization: the DUT lookup index plus the terminal
    /// commit.
    pub(crate) fn finish(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE INDEX dutKey ON Dut_Info (HEAD_NUM ASC, SITE_NUM ASC);
             COMMIT;",
        )?;
        Ok(())
    }

    /// Abandons the open transaction after a failed ingest. Rows committed
    /// at earlier PRR boundaries survive.
    pub(crate) fn abort(&self) {
        let _ = self.conn.execute_batch("ROLLBACK;");
    }

    /// Flushes the statement cache and closes the connection.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| err.into())
    }
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_stale(path: &Path) -> Result<()> {
    for stale in [
        path.to_path_buf(),
        sidecar(path, "-wal"),
        sidecar(path, "-shm"),
    ] {
        match std::fs::remove_file(&stale) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StdfError::Io {
                    source,
                    path: Some(stale),
                })
            }
        }
    }
    Ok(())
}
