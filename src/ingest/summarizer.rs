//! Consumer side of the ingestion pipeline: decodes records of interest,
//! maintains cross-record correlation state, and emits summary rows.

use std::collections::{HashMap, HashSet};

use chrono::{LocalResult, TimeZone, Utc};
use rusqlite::params;
use tracing::debug;

use crate::constants::{
    BURN_TIM_MISSING, COORD_MISSING, COUNT_MISSING, MISSING_BIN_NAME, REC_FTR, REC_HBR, REC_MIR,
    REC_MPR, REC_PCR, REC_PIR, REC_PMR, REC_PRR, REC_PTR, REC_SBR, REC_TSR, REC_WCR, REC_WIR,
    REC_WRR,
};
use crate::db::SummaryDb;
use crate::endian::Endian;
use crate::error::{Result, StdfError};
use crate::records::{BinRecord, Ftr, Mir, Mpr, Pcr, Pir, Pmr, Prr, Ptr, Tsr, Wcr, Wir, Wrr};

use super::message::RecordMessage;

/// Builds the relational summary from the message stream.
///
/// Owns the correlation state that ties records together across the file:
/// which DUT is open on each (head, site) channel, which wafer is open on
/// each head, which test numbers already have a `Test_Info` row, and the
/// accumulated per-test failure counts flushed at the end of the run.
pub(crate) struct Summarizer<'db> {
    db: &'db SummaryDb,
    endian: Option<Endian>,
    dut_index: i64,
    wafer_index: i64,
    seen_test_nums: HashSet<u32>,
    test_fail_count: HashMap<u32, i64>,
    dut_by_head_site: HashMap<u16, i64>,
    wafer_by_head: HashMap<u8, i64>,
}

fn channel_key(head: u8, site: u8) -> u16 {
    (u16::from(head) << 8) | u16::from(site)
}

/// `0xFFFF_FFFF` means "not recorded"; the sentinel is stored as `-1`.
fn count_or_missing(count: Option<u32>) -> Option<i64> {
    count.map(|value| {
        if value == COUNT_MISSING {
            -1
        } else {
            i64::from(value)
        }
    })
}

/// Pass/fail character inferred from PRR `PART_FLG` bits 3-4.
fn part_flag_char(part_flg: u8) -> &'static str {
    if part_flg & 0b0001_1000 == 0 {
        "P"
    } else if part_flg & 0b0001_0000 == 0 {
        "F"
    } else {
        "U"
    }
}

/// HBR/SBR pass/fail field; anything but an explicit P or F is unknown.
fn bin_pf_char(pf: Option<u8>) -> &'static str {
    match pf {
        Some(b'P') => "P",
        Some(b'F') => "F",
        _ => "U",
    }
}

fn wf_units_label(units: u8) -> &'static str {
    match units {
        1 => "inch",
        2 => "cm",
        3 => "mm",
        _ => "mil",
    }
}

fn format_epoch(secs: u32) -> String {
    match Utc.timestamp_opt(i64::from(secs), 0) {
        LocalResult::Single(stamp) => stamp.format("%Y-%m-%d %H:%M:%S (UTC)").to_string(),
        _ => secs.to_string(),
    }
}

impl<'db> Summarizer<'db> {
    /// Opens the load transaction and returns a consumer ready for the
    /// first message.
    pub(crate) fn new(db: &'db SummaryDb) -> Result<Self> {
        db.begin()?;
        Ok(Self {
            db,
            endian: None,
            dut_index: 0,
            wafer_index: 0,
            seen_test_nums: HashSet::new(),
            test_fail_count: HashMap::new(),
            dut_by_head_site: HashMap::new(),
            wafer_by_head: HashMap::new(),
        })
    }

    #[must_use]
    pub(crate) fn dut_count(&self) -> u64 {
        self.dut_index as u64
    }

    #[must_use]
    pub(crate) fn wafer_count(&self) -> u64 {
        self.wafer_index as u64
    }

    /// Applies one queue message. `Parse` payload buffers are dropped on
    /// every path out of here, error included.
    pub(crate) fn apply(&mut self, msg: RecordMessage) -> Result<()> {
        match msg {
            RecordMessage::SetEndian(endian) => {
                self.endian = Some(endian);
                self.insert_file_info("BYTE_ORD", endian.describe())
            }
            RecordMessage::Parse {
                code,
                offset,
                bytes,
            } => self.dispatch(code, offset, &bytes),
            RecordMessage::Finish(_) => Ok(()),
        }
    }

    /// Handler dispatch, ordered by expected record frequency: the TR
    /// family dominates real logs, then the PIR/PRR pairs, then wafer and
    /// bin bookkeeping, then the once-per-file records.
    fn dispatch(&mut self, code: u16, offset: u64, bytes: &[u8]) -> Result<()> {
        let Some(endian) = self.endian else {
            return Err(StdfError::InvalidStdf {
                reason: "record arrived before byte-order detection".into(),
            });
        };
        match code {
            REC_PTR => self.on_ptr(offset, bytes, endian),
            REC_FTR => self.on_ftr(offset, bytes, endian),
            REC_MPR => self.on_mpr(offset, bytes, endian),
            REC_PIR => self.on_pir(bytes, endian),
            REC_PRR => self.on_prr(offset, bytes, endian),
            REC_WIR => self.on_wir(bytes, endian),
            REC_WRR => self.on_wrr(offset, bytes, endian),
            REC_HBR => self.on_bin_record("H", bytes, endian),
            REC_SBR => self.on_bin_record("S", bytes, endian),
            REC_TSR => self.on_tsr(bytes, endian),
            REC_PCR => self.on_pcr(bytes, endian),
            REC_PMR => {
                let _ = Pmr::decode(bytes, endian)?;
                Ok(())
            }
            REC_MIR => self.on_mir(bytes, endian),
            REC_WCR => self.on_wcr(bytes, endian),
            other => {
                debug!(code = other, "no handler for enqueued record");
                Ok(())
            }
        }
    }

    /// Flushes accumulated failure counts and finalizes the database.
    pub(crate) fn finish(&mut self) -> Result<()> {
        {
            let mut update = self
                .db
                .conn()
                .prepare_cached("UPDATE Test_Info SET FailCount = ?1 WHERE TEST_NUM = ?2")?;
            for (&test_num, &fail_count) in &self.test_fail_count {
                update.execute(params![fail_count, test_num])?;
            }
        }
        self.db.finish()
    }

    // ── Correlation lookups ──────────────────────────────────────────

    fn dut_for(&self, offset: u64, head: u8, site: u8) -> Result<i64> {
        self.dut_by_head_site
            .get(&channel_key(head, site))
            .copied()
            .ok_or_else(|| StdfError::MapMissing {
                offset,
                scope: format!("head {head}, site {site}"),
            })
    }

    fn wafer_for(&self, offset: u64, head: u8) -> Result<i64> {
        self.wafer_by_head
            .get(&head)
            .copied()
            .ok_or_else(|| StdfError::MapMissing {
                offset,
                scope: format!("head {head}"),
            })
    }

    // ── Test record family ───────────────────────────────────────────

    fn on_ptr(&mut self, offset: u64, bytes: &[u8], endian: Endian) -> Result<()> {
        let ptr = Ptr::decode(bytes, endian)?;
        let dut = self.dut_for(offset, ptr.head_num, ptr.site_num)?;
        self.upsert_test_offset(dut, ptr.test_num, offset, bytes.len())?;
        if self.seen_test_nums.insert(ptr.test_num) {
            self.db
                .conn()
                .prepare_cached(
                    "INSERT INTO Test_Info (TEST_NUM, recHeader, TEST_NAME, RES_SCAL,
                                            LLimit, HLimit, Unit, OPT_FLAG, FailCount)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, -1)",
                )?
                .execute(params![
                    ptr.test_num,
                    REC_PTR,
                    ptr.test_txt,
                    ptr.res_scal,
                    ptr.lo_limit.map(f64::from),
                    ptr.hi_limit.map(f64::from),
                    ptr.units,
                    ptr.opt_flag,
                ])?;
        }
        Ok(())
    }

    fn on_mpr(&mut self, offset: u64, bytes: &[u8], endian: Endian) -> Result<()> {
        let mpr = Mpr::decode(bytes, endian)?;
        let dut = self.dut_for(offset, mpr.head_num, mpr.site_num)?;
        self.upsert_test_offset(dut, mpr.test_num, offset, bytes.len())?;
        if self.seen_test_nums.insert(mpr.test_num) {
            self.db
                .conn()
                .prepare_cached(
                    "INSERT INTO Test_Info (TEST_NUM, recHeader, TEST_NAME, RES_SCAL,
                                            LLimit, HLimit, Unit, OPT_FLAG, FailCount)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, -1)",
                )?
                .execute(params![
                    mpr.test_num,
                    REC_MPR,
                    mpr.test_txt,
                    mpr.res_scal,
                    mpr.lo_limit.map(f64::from),
                    mpr.hi_limit.map(f64::from),
                    mpr.units,
                    mpr.opt_flag,
                ])?;
        }
        Ok(())
    }

    fn on_ftr(&mut self, offset: u64, bytes: &[u8], endian: Endian) -> Result<()> {
        let ftr = Ftr::decode(bytes, endian)?;
        let dut = self.dut_for(offset, ftr.head_num, ftr.site_num)?;
        self.upsert_test_offset(dut, ftr.test_num, offset, bytes.len())?;
        if self.seen_test_nums.insert(ftr.test_num) {
            // Functional tests carry no limits, scale, or units.
            self.db
                .conn()
                .prepare_cached(
                    "INSERT INTO Test_Info (TEST_NUM, recHeader, TEST_NAME, RES_SCAL,
                                            LLimit, HLimit, Unit, OPT_FLAG, FailCount)
                     VALUES (?1, ?2, ?3, NULL, NULL, NULL, '', 0, -1)",
                )?
                .execute(params![ftr.test_num, REC_FTR, ftr.test_txt])?;
        }
        Ok(())
    }

    fn upsert_test_offset(
        &self,
        dut_index: i64,
        test_num: u32,
        offset: u64,
        len: usize,
    ) -> Result<()> {
        self.db
            .conn()
            .prepare_cached(
                "INSERT OR REPLACE INTO Test_Offsets (DUTIndex, TEST_NUM, Offset, BinaryLen)
                 VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![dut_index, test_num, offset as i64, len as i64])?;
        Ok(())
    }

    // ── Part records ─────────────────────────────────────────────────

    fn on_pir(&mut self, bytes: &[u8], endian: Endian) -> Result<()> {
        let pir = Pir::decode(bytes, endian)?;
        self.dut_index += 1;
        self.db
            .conn()
            .prepare_cached(
                "INSERT INTO Dut_Info (HEAD_NUM, SITE_NUM, DUTIndex) VALUES (?1, ?2, ?3)",
            )?
            .execute(params![pir.head_num, pir.site_num, self.dut_index])?;
        self.dut_by_head_site
            .insert(channel_key(pir.head_num, pir.site_num), self.dut_index);
        Ok(())
    }

    fn on_prr(&mut self, offset: u64, bytes: &[u8], endian: Endian) -> Result<()> {
        let prr = Prr::decode(bytes, endian)?;
        let dut = self.dut_for(offset, prr.head_num, prr.site_num)?;
        let wafer = self.wafer_by_head.get(&prr.head_num).copied();
        let x = prr.x_coord.filter(|&coord| coord != COORD_MISSING);
        let y = prr.y_coord.filter(|&coord| coord != COORD_MISSING);
        self.db
            .conn()
            .prepare_cached(
                "UPDATE Dut_Info SET TestCount = ?1, TestTime = ?2, PartID = ?3,
                        HBIN = ?4, SBIN = ?5, Flag = ?6, WaferIndex = ?7,
                        XCOORD = ?8, YCOORD = ?9
                 WHERE DUTIndex = ?10",
            )?
            .execute(params![
                prr.num_test,
                prr.test_t,
                prr.part_id,
                prr.hard_bin,
                prr.soft_bin,
                prr.part_flg,
                wafer,
                x,
                y,
                dut,
            ])?;

        // Placeholder rows; an authoritative HBR/SBR wins whenever one
        // exists in the file, whatever order it arrives in.
        let pf = part_flag_char(prr.part_flg);
        let mut inferred = self.db.conn().prepare_cached(
            "INSERT OR IGNORE INTO Bin_Info (BIN_TYPE, BIN_NUM, BIN_NAME, BIN_PF)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        inferred.execute(params!["H", prr.hard_bin, MISSING_BIN_NAME, pf])?;
        inferred.execute(params!["S", prr.soft_bin, MISSING_BIN_NAME, pf])?;
        drop(inferred);

        self.db.commit_boundary()
    }

    // ── Wafer records ────────────────────────────────────────────────

    fn on_wir(&mut self, bytes: &[u8], endian: Endian) -> Result<()> {
        let wir = Wir::decode(bytes, endian)?;
        self.wafer_index += 1;
        self.wafer_by_head.insert(wir.head_num, self.wafer_index);
        self.db
            .conn()
            .prepare_cached(
                "INSERT INTO Wafer_Info (HEAD_NUM, WaferIndex, WAFER_ID) VALUES (?1, ?2, ?3)",
            )?
            .execute(params![wir.head_num, self.wafer_index, wir.wafer_id])?;
        Ok(())
    }

    fn on_wrr(&mut self, offset: u64, bytes: &[u8], endian: Endian) -> Result<()> {
        let wrr = Wrr::decode(bytes, endian)?;
        let wafer = self.wafer_for(offset, wrr.head_num)?;
        self.db
            .conn()
            .prepare_cached(
                "UPDATE Wafer_Info SET PART_CNT = ?1, RTST_CNT = ?2, ABRT_CNT = ?3,
                        GOOD_CNT = ?4, FUNC_CNT = ?5,
                        WAFER_ID = COALESCE(?6, WAFER_ID), FABWF_ID = ?7,
                        FRAME_ID = ?8, MASK_ID = ?9, USR_DESC = ?10, EXC_DESC = ?11
                 WHERE WaferIndex = ?12",
            )?
            .execute(params![
                count_or_missing(wrr.part_cnt),
                count_or_missing(wrr.rtst_cnt),
                count_or_missing(wrr.abrt_cnt),
                count_or_missing(wrr.good_cnt),
                count_or_missing(wrr.func_cnt),
                wrr.wafer_id,
                wrr.fabwf_id,
                wrr.frame_id,
                wrr.mask_id,
                wrr.usr_desc,
                wrr.exc_desc,
                wafer,
            ])?;
        Ok(())
    }

    fn on_wcr(&mut self, bytes: &[u8], endian: Endian) -> Result<()> {
        let wcr = Wcr::decode(bytes, endian)?;
        if let Some(size) = wcr.wafr_siz {
            self.insert_file_info("WAFR_SIZ", &size.to_string())?;
        }
        if let Some(height) = wcr.die_ht {
            self.insert_file_info("DIE_HT", &height.to_string())?;
        }
        if let Some(width) = wcr.die_wid {
            self.insert_file_info("DIE_WID", &width.to_string())?;
        }
        if let Some(units) = wcr.wf_units {
            self.insert_file_info("WF_UNITS", wf_units_label(units))?;
        }
        if let Some(flat) = wcr.wf_flat {
            self.insert_file_info("WF_FLAT", &char::from(flat).to_string())?;
        }
        if let Some(center_x) = wcr.center_x {
            self.insert_file_info("CENTER_X", &center_x.to_string())?;
        }
        if let Some(center_y) = wcr.center_y {
            self.insert_file_info("CENTER_Y", &center_y.to_string())?;
        }
        if let Some(pos_x) = wcr.pos_x {
            self.insert_file_info("POS_X", &char::from(pos_x).to_string())?;
        }
        if let Some(pos_y) = wcr.pos_y {
            self.insert_file_info("POS_Y", &char::from(pos_y).to_string())?;
        }
        Ok(())
    }

    // ── Bin and synopsis records ─────────────────────────────────────

    fn on_bin_record(&mut self, bin_type: &'static str, bytes: &[u8], endian: Endian) -> Result<()> {
        let bin = BinRecord::decode(bytes, endian)?;
        let name = match bin.bin_nam {
            Some(ref name) if !name.is_empty() => name.as_str(),
            _ => MISSING_BIN_NAME,
        };
        self.db
            .conn()
            .prepare_cached(
                "INSERT OR REPLACE INTO Bin_Info (BIN_TYPE, BIN_NUM, BIN_NAME, BIN_PF)
                 VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![bin_type, bin.bin_num, name, bin_pf_char(bin.bin_pf)])?;
        Ok(())
    }

    fn on_tsr(&mut self, bytes: &[u8], endian: Endian) -> Result<()> {
        let tsr = Tsr::decode(bytes, endian)?;
        if let Some(fail_cnt) = tsr.fail_cnt {
            if fail_cnt != COUNT_MISSING {
                *self.test_fail_count.entry(tsr.test_num).or_insert(0) += i64::from(fail_cnt);
            }
        }
        Ok(())
    }

    fn on_pcr(&mut self, bytes: &[u8], endian: Endian) -> Result<()> {
        let pcr = Pcr::decode(bytes, endian)?;
        self.db
            .conn()
            .prepare_cached(
                "INSERT INTO Dut_Counts (HEAD_NUM, SITE_NUM, PART_CNT, RTST_CNT,
                                         ABRT_CNT, GOOD_CNT, FUNC_CNT)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?
            .execute(params![
                pcr.head_num,
                pcr.site_num,
                count_or_missing(pcr.part_cnt),
                count_or_missing(pcr.rtst_cnt),
                count_or_missing(pcr.abrt_cnt),
                count_or_missing(pcr.good_cnt),
                count_or_missing(pcr.func_cnt),
            ])?;
        Ok(())
    }

    // ── File-level records ───────────────────────────────────────────

    fn on_mir(&mut self, bytes: &[u8], endian: Endian) -> Result<()> {
        let mir = Mir::decode(bytes, endian)?;
        if let Some(setup_t) = mir.setup_t {
            self.insert_file_info("SETUP_T", &format_epoch(setup_t))?;
        }
        if let Some(start_t) = mir.start_t {
            self.insert_file_info("START_T", &format_epoch(start_t))?;
        }
        if let Some(stat_num) = mir.stat_num {
            self.insert_file_info("STAT_NUM", &stat_num.to_string())?;
        }
        for (field, code) in [
            ("MODE_COD", mir.mode_cod),
            ("RTST_COD", mir.rtst_cod),
            ("PROT_COD", mir.prot_cod),
        ] {
            if let Some(code) = code.filter(|&byte| byte != b' ') {
                self.insert_file_info(field, &char::from(code).to_string())?;
            }
        }
        if let Some(burn_tim) = mir.burn_tim.filter(|&t| t != BURN_TIM_MISSING) {
            self.insert_file_info("BURN_TIM", &burn_tim.to_string())?;
        }
        if let Some(code) = mir.cmod_cod.filter(|&byte| byte != b' ') {
            self.insert_file_info("CMOD_COD", &char::from(code).to_string())?;
        }
        for (field, value) in &mir.texts {
            if !value.is_empty() {
                self.insert_file_info(field, value)?;
            }
        }
        Ok(())
    }

    fn insert_file_info(&self, field: &str, value: &str) -> Result<()> {
        self.db
            .conn()
            .prepare_cached("INSERT INTO File_Info (Field, Value) VALUES (?1, ?2)")?
            .execute(params![field, value])?;
        Ok(())
    }
}
