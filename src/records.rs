//! Typed views over raw STDF record payloads.
//!
//! Each view decodes the fields the summarizer and the parametric reader
//! consume; everything else is walked past. STDF permits writers to drop
//! optional trailing fields, so decoders surface the tail as `Option` and
//! only the fixed required prefix produces a [`StdfError::TruncatedRecord`].

use crate::constants::{
    REC_ATR, REC_BPS, REC_DTR, REC_EPS, REC_FAR, REC_FTR, REC_GDR, REC_HBR, REC_MIR, REC_MPR,
    REC_MRR, REC_PCR, REC_PGR, REC_PIR, REC_PLR, REC_PMR, REC_PRR, REC_PTR, REC_RDR, REC_SBR,
    REC_SDR, REC_TSR, REC_WCR, REC_WIR, REC_WRR,
};
use crate::endian::Endian;
use crate::error::{Result, StdfError};

/// Every record code this engine recognizes, with its display name.
pub const KNOWN_RECORDS: &[(u16, &str)] = &[
    (REC_FAR, "FAR"),
    (REC_ATR, "ATR"),
    (REC_MIR, "MIR"),
    (REC_MRR, "MRR"),
    (REC_PCR, "PCR"),
    (REC_HBR, "HBR"),
    (REC_SBR, "SBR"),
    (REC_PMR, "PMR"),
    (REC_PGR, "PGR"),
    (REC_PLR, "PLR"),
    (REC_RDR, "RDR"),
    (REC_SDR, "SDR"),
    (REC_WIR, "WIR"),
    (REC_WRR, "WRR"),
    (REC_WCR, "WCR"),
    (REC_PIR, "PIR"),
    (REC_PRR, "PRR"),
    (REC_TSR, "TSR"),
    (REC_PTR, "PTR"),
    (REC_MPR, "MPR"),
    (REC_FTR, "FTR"),
    (REC_BPS, "BPS"),
    (REC_EPS, "EPS"),
    (REC_GDR, "GDR"),
    (REC_DTR, "DTR"),
];

/// Record codes the ingestion reader hands to the summarizer; everything
/// else is skipped at the reader.
const ENQUEUED_RECORDS: &[u16] = &[
    REC_MIR, REC_WCR, REC_WIR, REC_WRR, REC_PTR, REC_FTR, REC_MPR, REC_TSR, REC_PIR, REC_PRR,
    REC_HBR, REC_SBR, REC_PCR, REC_PMR,
];

/// Display name for a record code, if the code is recognized.
#[must_use]
pub fn record_name(code: u16) -> Option<&'static str> {
    KNOWN_RECORDS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, name)| *name)
}

#[must_use]
pub fn is_known(code: u16) -> bool {
    record_name(code).is_some()
}

#[must_use]
pub fn is_enqueued(code: u16) -> bool {
    ENQUEUED_RECORDS.contains(&code)
}

/// The 4-byte prefix of every STDF record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub rec_len: u16,
    pub rec_typ: u8,
    pub rec_sub: u8,
}

impl RecordHeader {
    #[must_use]
    pub fn decode(bytes: [u8; 4], endian: Endian) -> Self {
        Self {
            rec_len: endian.u16([bytes[0], bytes[1]]),
            rec_typ: bytes[2],
            rec_sub: bytes[3],
        }
    }

    /// Composite dispatch code `(rec_typ << 8) | rec_sub`.
    #[must_use]
    pub fn code(&self) -> u16 {
        (u16::from(self.rec_typ) << 8) | u16::from(self.rec_sub)
    }
}

// ── Field cursor ─────────────────────────────────────────────────────────

/// Forward-only cursor over a record payload. Reads past the end yield
/// `None`, which is how truncated optional tails decode.
pub(crate) struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(buf: &'a [u8], endian: Endian) -> Self {
        Self {
            buf,
            pos: 0,
            endian,
        }
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.buf.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    pub(crate) fn u1(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    pub(crate) fn u2(&mut self) -> Option<u16> {
        let endian = self.endian;
        self.take::<2>().map(|b| endian.u16(b))
    }

    pub(crate) fn u4(&mut self) -> Option<u32> {
        let endian = self.endian;
        self.take::<4>().map(|b| endian.u32(b))
    }

    pub(crate) fn i1(&mut self) -> Option<i8> {
        self.u1().map(|b| b as i8)
    }

    pub(crate) fn i2(&mut self) -> Option<i16> {
        let endian = self.endian;
        self.take::<2>().map(|b| endian.i16(b))
    }

    pub(crate) fn i4(&mut self) -> Option<i32> {
        let endian = self.endian;
        self.take::<4>().map(|b| endian.i32(b))
    }

    pub(crate) fn r4(&mut self) -> Option<f32> {
        let endian = self.endian;
        self.take::<4>().map(|b| endian.f32(b))
    }

    /// Single-character field; STDF uses an ASCII space for "missing".
    pub(crate) fn c1(&mut self) -> Option<u8> {
        self.u1()
    }

    /// Length-prefixed text field.
    pub(crate) fn cn(&mut self) -> Option<String> {
        let len = self.u1()? as usize;
        let bytes = self.buf.get(self.pos..self.pos + len)?;
        self.pos += len;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Advances past `n` raw bytes; subsequent reads fail if this ran off
    /// the end.
    pub(crate) fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n);
    }

    /// Advances past an array of `count` packed nibbles.
    pub(crate) fn skip_nibbles(&mut self, count: usize) {
        self.skip(count.div_ceil(2));
    }

    /// Advances past a bit-counted `Dn` field.
    pub(crate) fn skip_dn(&mut self) -> Option<()> {
        let bits = self.u2()? as usize;
        self.skip(bits.div_ceil(8));
        Some(())
    }

    /// Advances past a length-prefixed `Cn` field without materializing it.
    pub(crate) fn skip_cn(&mut self) -> Option<()> {
        let len = self.u1()? as usize;
        self.skip(len);
        Some(())
    }
}

fn required<T>(value: Option<T>, name: &'static str, field: &'static str) -> Result<T> {
    value.ok_or(StdfError::TruncatedRecord { name, field })
}

// ── Typed views ──────────────────────────────────────────────────────────

/// Field names of the MIR text tail, in on-wire order. Decoded values keep
/// this pairing so the summarizer can emit them as `File_Info` key/value
/// rows.
const MIR_TEXT_FIELDS: [&str; 30] = [
    "LOT_ID", "PART_TYP", "NODE_NAM", "TSTR_TYP", "JOB_NAM", "JOB_REV", "SBLOT_ID", "OPER_NAM",
    "EXEC_TYP", "EXEC_VER", "TEST_COD", "TST_TEMP", "USER_TXT", "AUX_FILE", "PKG_TYP", "FAMLY_ID",
    "DATE_COD", "FACIL_ID", "FLOOR_ID", "PROC_ID", "OPER_FRQ", "SPEC_NAM", "SPEC_VER", "FLOW_ID",
    "SETUP_ID", "DSGN_REV", "ENG_ID", "ROM_COD", "SERL_NUM", "SUPR_NAM",
];

/// Master Information Record.
#[derive(Debug, Clone)]
pub struct Mir {
    pub setup_t: Option<u32>,
    pub start_t: Option<u32>,
    pub stat_num: Option<u8>,
    pub mode_cod: Option<u8>,
    pub rtst_cod: Option<u8>,
    pub prot_cod: Option<u8>,
    pub burn_tim: Option<u16>,
    pub cmod_cod: Option<u8>,
    /// `(field name, value)` pairs for the text fields present on the wire.
    pub texts: Vec<(&'static str, String)>,
}

impl Mir {
    pub fn decode(bytes: &[u8], endian: Endian) -> Result<Self> {
        let mut r = FieldReader::new(bytes, endian);
        let setup_t = r.u4();
        let start_t = r.u4();
        let stat_num = r.u1();
        let mode_cod = r.c1();
        let rtst_cod = r.c1();
        let prot_cod = r.c1();
        let burn_tim = r.u2();
        let cmod_cod = r.c1();
        let mut texts = Vec::new();
        for name in MIR_TEXT_FIELDS {
            match r.cn() {
                Some(value) => texts.push((name, value)),
                None => break,
            }
        }
        Ok(Self {
            setup_t,
            start_t,
            stat_num,
            mode_cod,
            rtst_cod,
            prot_cod,
            burn_tim,
            cmod_cod,
            texts,
        })
    }
}

/// Part Information Record: opens one DUT on a (head, site) channel.
#[derive(Debug, Clone, Copy)]
pub struct Pir {
    pub head_num: u8,
    pub site_num: u8,
}

impl Pir {
    pub fn decode(bytes: &[u8], endian: Endian) -> Result<Self> {
        let mut r = FieldReader::new(bytes, endian);
        Ok(Self {
            head_num: required(r.u1(), "PIR", "HEAD_NUM")?,
            site_num: required(r.u1(), "PIR", "SITE_NUM")?,
        })
    }
}

/// Part Results Record: closes the DUT opened by the matching PIR.
#[derive(Debug, Clone)]
pub struct Prr {
    pub head_num: u8,
    pub site_num: u8,
    pub part_flg: u8,
    pub num_test: u16,
    pub hard_bin: u16,
    pub soft_bin: u16,
    pub x_coord: Option<i16>,
    pub y_coord: Option<i16>,
    pub test_t: Option<u32>,
    pub part_id: Option<String>,
}

impl Prr {
    pub fn decode(bytes: &[u8], endian: Endian) -> Result<Self> {
        let mut r = FieldReader::new(bytes, endian);
        Ok(Self {
            head_num: required(r.u1(), "PRR", "HEAD_NUM")?,
            site_num: required(r.u1(), "PRR", "SITE_NUM")?,
            part_flg: required(r.u1(), "PRR", "PART_FLG")?,
            num_test: required(r.u2(), "PRR", "NUM_TEST")?,
            hard_bin: required(r.u2(), "PRR", "HARD_BIN")?,
            soft_bin: required(r.u2(), "PRR", "SOFT_BIN")?,
            x_coord: r.i2(),
            y_coord: r.i2(),
            test_t: r.u4(),
            part_id: r.cn(),
        })
    }
}

/// Wafer Information Record: opens one wafer on a head.
#[derive(Debug, Clone)]
pub struct Wir {
    pub head_num: u8,
    pub start_t: Option<u32>,
    pub wafer_id: Option<String>,
}

impl Wir {
    pub fn decode(bytes: &[u8], endian: Endian) -> Result<Self> {
        let mut r = FieldReader::new(bytes, endian);
        let head_num = required(r.u1(), "WIR", "HEAD_NUM")?;
        let _ = r.u1(); // SITE_GRP
        let start_t = r.u4();
        let wafer_id = r.cn();
        Ok(Self {
            head_num,
            start_t,
            wafer_id,
        })
    }
}

/// Wafer Results Record.
#[derive(Debug, Clone)]
pub struct Wrr {
    pub head_num: u8,
    pub finish_t: Option<u32>,
    pub part_cnt: Option<u32>,
    pub rtst_cnt: Option<u32>,
    pub abrt_cnt: Option<u32>,
    pub good_cnt: Option<u32>,
    pub func_cnt: Option<u32>,
    pub wafer_id: Option<String>,
    pub fabwf_id: Option<String>,
    pub frame_id: Option<String>,
    pub mask_id: Option<String>,
    pub usr_desc: Option<String>,
    pub exc_desc: Option<String>,
}

impl Wrr {
    pub fn decode(bytes: &[u8], endian: Endian) -> Result<Self> {
        let mut r = FieldReader::new(bytes, endian);
        let head_num = required(r.u1(), "WRR", "HEAD_NUM")?;
        let _ = r.u1(); // SITE_GRP
        Ok(Self {
            head_num,
            finish_t: r.u4(),
            part_cnt: r.u4(),
            rtst_cnt: r.u4(),
            abrt_cnt: r.u4(),
            good_cnt: r.u4(),
            func_cnt: r.u4(),
            wafer_id: r.cn(),
            fabwf_id: r.cn(),
            frame_id: r.cn(),
            mask_id: r.cn(),
            usr_desc: r.cn(),
            exc_desc: r.cn(),
        })
    }
}

/// Wafer Configuration Record.
#[derive(Debug, Clone)]
pub struct Wcr {
    pub wafr_siz: Option<f32>,
    pub die_ht: Option<f32>,
    pub die_wid: Option<f32>,
    pub wf_units: Option<u8>,
    pub wf_flat: Option<u8>,
    pub center_x: Option<i16>,
    pub center_y: Option<i16>,
    pub pos_x: Option<u8>,
    pub pos_y: Option<u8>,
}

impl Wcr {
    pub fn decode(bytes: &[u8], endian: Endian) -> Result<Self> {
        let mut r = FieldReader::new(bytes, endian);
        Ok(Self {
            wafr_siz: r.r4(),
            die_ht: r.r4(),
            die_wid: r.r4(),
            wf_units: r.u1(),
            wf_flat: r.c1(),
            center_x: r.i2(),
            center_y: r.i2(),
            pos_x: r.c1(),
            pos_y: r.c1(),
        })
    }
}

/// HBR and SBR share one layout; `BIN_TYPE` distinguishes them downstream.
#[derive(Debug, Clone)]
pub struct BinRecord {
    pub head_num: u8,
    pub site_num: u8,
    pub bin_num: u16,
    pub bin_cnt: Option<u32>,
    pub bin_pf: Option<u8>,
    pub bin_nam: Option<String>,
}

impl BinRecord {
    pub fn decode(bytes: &[u8], endian: Endian) -> Result<Self> {
        let mut r = FieldReader::new(bytes, endian);
        Ok(Self {
            head_num: required(r.u1(), "HBR/SBR", "HEAD_NUM")?,
            site_num: required(r.u1(), "HBR/SBR", "SITE_NUM")?,
            bin_num: required(r.u2(), "HBR/SBR", "BIN_NUM")?,
            bin_cnt: r.u4(),
            bin_pf: r.c1(),
            bin_nam: r.cn(),
        })
    }
}

/// Part Count Record.
#[derive(Debug, Clone)]
pub struct Pcr {
    pub head_num: u8,
    pub site_num: u8,
    pub part_cnt: Option<u32>,
    pub rtst_cnt: Option<u32>,
    pub abrt_cnt: Option<u32>,
    pub good_cnt: Option<u32>,
    pub func_cnt: Option<u32>,
}

impl Pcr {
    pub fn decode(bytes: &[u8], endian: Endian) -> Result<Self> {
        let mut r = FieldReader::new(bytes, endian);
        Ok(Self {
            head_num: required(r.u1(), "PCR", "HEAD_NUM")?,
            site_num: required(r.u1(), "PCR", "SITE_NUM")?,
            part_cnt: r.u4(),
            rtst_cnt: r.u4(),
            abrt_cnt: r.u4(),
            good_cnt: r.u4(),
            func_cnt: r.u4(),
        })
    }
}

/// Test Synopsis Record; only the failure count feeds the summary.
#[derive(Debug, Clone)]
pub struct Tsr {
    pub head_num: u8,
    pub site_num: u8,
    pub test_num: u32,
    pub exec_cnt: Option<u32>,
    pub fail_cnt: Option<u32>,
}

impl Tsr {
    pub fn decode(bytes: &[u8], endian: Endian) -> Result<Self> {
        let mut r = FieldReader::new(bytes, endian);
        let head_num = required(r.u1(), "TSR", "HEAD_NUM")?;
        let site_num = required(r.u1(), "TSR", "SITE_NUM")?;
        let _ = r.c1(); // TEST_TYP
        Ok(Self {
            head_num,
            site_num,
            test_num: required(r.u4(), "TSR", "TEST_NUM")?,
            exec_cnt: r.u4(),
            fail_cnt: r.u4(),
        })
    }
}

/// Parametric Test Record.
#[derive(Debug, Clone)]
pub struct Ptr {
    pub test_num: u32,
    pub head_num: u8,
    pub site_num: u8,
    pub test_flg: u8,
    pub parm_flg: u8,
    pub result: Option<f32>,
    pub test_txt: Option<String>,
    pub opt_flag: Option<u8>,
    pub res_scal: Option<i8>,
    pub lo_limit: Option<f32>,
    pub hi_limit: Option<f32>,
    pub units: Option<String>,
}

impl Ptr {
    pub fn decode(bytes: &[u8], endian: Endian) -> Result<Self> {
        let mut r = FieldReader::new(bytes, endian);
        let test_num = required(r.u4(), "PTR", "TEST_NUM")?;
        let head_num = required(r.u1(), "PTR", "HEAD_NUM")?;
        let site_num = required(r.u1(), "PTR", "SITE_NUM")?;
        let test_flg = required(r.u1(), "PTR", "TEST_FLG")?;
        let parm_flg = required(r.u1(), "PTR", "PARM_FLG")?;
        let result = r.r4();
        let test_txt = r.cn();
        let _ = r.skip_cn(); // ALARM_ID
        let opt_flag = r.u1();
        let res_scal = r.i1();
        let _ = r.i1(); // LLM_SCAL
        let _ = r.i1(); // HLM_SCAL
        let lo_limit = r.r4();
        let hi_limit = r.r4();
        let units = r.cn();
        Ok(Self {
            test_num,
            head_num,
            site_num,
            test_flg,
            parm_flg,
            result,
            test_txt,
            opt_flag,
            res_scal,
            lo_limit,
            hi_limit,
            units,
        })
    }
}

/// Multiple-Result Parametric Record. The per-pin state and result arrays
/// are walked past; the summary keeps the scalar metadata tail.
#[derive(Debug, Clone)]
pub struct Mpr {
    pub test_num: u32,
    pub head_num: u8,
    pub site_num: u8,
    pub test_flg: u8,
    pub parm_flg: u8,
    pub test_txt: Option<String>,
    pub opt_flag: Option<u8>,
    pub res_scal: Option<i8>,
    pub lo_limit: Option<f32>,
    pub hi_limit: Option<f32>,
    pub units: Option<String>,
}

impl Mpr {
    pub fn decode(bytes: &[u8], endian: Endian) -> Result<Self> {
        let mut r = FieldReader::new(bytes, endian);
        let test_num = required(r.u4(), "MPR", "TEST_NUM")?;
        let head_num = required(r.u1(), "MPR", "HEAD_NUM")?;
        let site_num = required(r.u1(), "MPR", "SITE_NUM")?;
        let test_flg = required(r.u1(), "MPR", "TEST_FLG")?;
        let parm_flg = required(r.u1(), "MPR", "PARM_FLG")?;

        let mut tail = Tail::default();
        let mut read_tail = || -> Option<()> {
            let rtn_icnt = r.u2()? as usize;
            let rslt_cnt = r.u2()? as usize;
            r.skip_nibbles(rtn_icnt); // RTN_STAT
            r.skip(rslt_cnt * 4); // RTN_RSLT
            tail.test_txt = r.cn();
            r.skip_cn()?; // ALARM_ID
            tail.opt_flag = r.u1();
            tail.res_scal = r.i1();
            r.i1()?; // LLM_SCAL
            r.i1()?; // HLM_SCAL
            tail.lo_limit = r.r4();
            tail.hi_limit = r.r4();
            r.r4()?; // START_IN
            r.r4()?; // INCR_IN
            r.skip(rtn_icnt * 2); // RTN_INDX
            tail.units = r.cn();
            Some(())
        };
        let _ = read_tail();

        Ok(Self {
            test_num,
            head_num,
            site_num,
            test_flg,
            parm_flg,
            test_txt: tail.test_txt,
            opt_flag: tail.opt_flag,
            res_scal: tail.res_scal,
            lo_limit: tail.lo_limit,
            hi_limit: tail.hi_limit,
            units: tail.units,
        })
    }
}

#[derive(Default)]
struct Tail {
    test_txt: Option<String>,
    opt_flag: Option<u8>,
    res_scal: Option<i8>,
    lo_limit: Option<f32>,
    hi_limit: Option<f32>,
    units: Option<String>,
}

/// Functional Test Record. Pin arrays and pattern fields are walked past to
/// reach `TEST_TXT`; functional tests carry no limits or units.
#[derive(Debug, Clone)]
pub struct Ftr {
    pub test_num: u32,
    pub head_num: u8,
    pub site_num: u8,
    pub test_flg: u8,
    pub test_txt: Option<String>,
}

impl Ftr {
    pub fn decode(bytes: &[u8], endian: Endian) -> Result<Self> {
        let mut r = FieldReader::new(bytes, endian);
        let test_num = required(r.u4(), "FTR", "TEST_NUM")?;
        let head_num = required(r.u1(), "FTR", "HEAD_NUM")?;
        let site_num = required(r.u1(), "FTR", "SITE_NUM")?;
        let test_flg = required(r.u1(), "FTR", "TEST_FLG")?;

        let mut test_txt = None;
        let mut read_tail = || -> Option<()> {
            r.u1()?; // OPT_FLAG
            r.u4()?; // CYCL_CNT
            r.u4()?; // REL_VADR
            r.u4()?; // REPT_CNT
            r.u4()?; // NUM_FAIL
            r.i4()?; // XFAIL_AD
            r.i4()?; // YFAIL_AD
            r.i2()?; // VECT_OFF
            let rtn_icnt = r.u2()? as usize;
            let pgm_icnt = r.u2()? as usize;
            r.skip(rtn_icnt * 2); // RTN_INDX
            r.skip_nibbles(rtn_icnt); // RTN_STAT
            r.skip(pgm_icnt * 2); // PGM_INDX
            r.skip_nibbles(pgm_icnt); // PGM_STAT
            r.skip_dn()?; // FAIL_PIN
            r.skip_cn()?; // VECT_NAM
            r.skip_cn()?; // TIME_SET
            r.skip_cn()?; // OP_CODE
            test_txt = r.cn();
            Some(())
        };
        let _ = read_tail();

        Ok(Self {
            test_num,
            head_num,
            site_num,
            test_flg,
            test_txt,
        })
    }
}

/// Pin Map Record: decoded for completeness, not persisted by this core.
#[derive(Debug, Clone)]
pub struct Pmr {
    pub pmr_indx: u16,
    pub chan_nam: Option<String>,
    pub phy_nam: Option<String>,
    pub log_nam: Option<String>,
}

impl Pmr {
    pub fn decode(bytes: &[u8], endian: Endian) -> Result<Self> {
        let mut r = FieldReader::new(bytes, endian);
        let pmr_indx = required(r.u2(), "PMR", "PMR_INDX")?;
        let _ = r.u2(); // CHAN_TYP
        Ok(Self {
            pmr_indx,
            chan_nam: r.cn(),
            phy_nam: r.cn(),
            log_nam: r.cn(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le(bytes: &[u8]) -> FieldReader<'_> {
        FieldReader::new(bytes, Endian::Little)
    }

    fn push_cn(buf: &mut Vec<u8>, s: &str) {
        buf.push(s.len() as u8);
        buf.extend_from_slice(s.as_bytes());
    }

    #[test]
    fn header_code_composes_type_and_subtype() {
        let header = RecordHeader::decode([12, 0, 15, 10], Endian::Little);
        assert_eq!(header.rec_len, 12);
        assert_eq!(header.code(), REC_PTR);

        let swapped = RecordHeader::decode([0, 12, 15, 20], Endian::Big);
        assert_eq!(swapped.rec_len, 12);
        assert_eq!(swapped.code(), REC_FTR);
    }

    #[test]
    fn field_reader_stops_at_end() {
        let mut r = le(&[1, 2, 3]);
        assert_eq!(r.u2(), Some(0x0201));
        assert_eq!(r.u2(), None);
        assert_eq!(r.u1(), Some(3));
    }

    #[test]
    fn cn_reads_length_prefixed_text() {
        let mut buf = Vec::new();
        push_cn(&mut buf, "LOT42");
        buf.push(0xFF);
        let mut r = le(&buf);
        assert_eq!(r.cn().as_deref(), Some("LOT42"));
        assert_eq!(r.u1(), Some(0xFF));
    }

    #[test]
    fn cn_with_truncated_body_is_none() {
        let mut r = le(&[5, b'a', b'b']);
        assert_eq!(r.cn(), None);
    }

    #[test]
    fn ptr_full_payload_decodes_limits() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&100u32.to_le_bytes()); // TEST_NUM
        buf.push(1); // HEAD_NUM
        buf.push(2); // SITE_NUM
        buf.push(0); // TEST_FLG
        buf.push(0); // PARM_FLG
        buf.extend_from_slice(&1.25f32.to_le_bytes()); // RESULT
        push_cn(&mut buf, "VDD leakage");
        push_cn(&mut buf, ""); // ALARM_ID
        buf.push(0x02); // OPT_FLAG
        buf.push(3u8); // RES_SCAL
        buf.push(0); // LLM_SCAL
        buf.push(0); // HLM_SCAL
        buf.extend_from_slice(&0.5f32.to_le_bytes()); // LO_LIMIT
        buf.extend_from_slice(&2.5f32.to_le_bytes()); // HI_LIMIT
        push_cn(&mut buf, "mA");

        let ptr = Ptr::decode(&buf, Endian::Little).unwrap();
        assert_eq!(ptr.test_num, 100);
        assert_eq!(ptr.head_num, 1);
        assert_eq!(ptr.site_num, 2);
        assert_eq!(ptr.result, Some(1.25));
        assert_eq!(ptr.test_txt.as_deref(), Some("VDD leakage"));
        assert_eq!(ptr.res_scal, Some(3));
        assert_eq!(ptr.lo_limit, Some(0.5));
        assert_eq!(ptr.hi_limit, Some(2.5));
        assert_eq!(ptr.units.as_deref(), Some("mA"));
    }

    #[test]
    fn ptr_without_optional_tail_decodes() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&7u32.to_le_bytes());
        buf.push(1);
        buf.push(1);
        buf.push(0x80);
        buf.push(0);
        buf.extend_from_slice(&9.0f32.to_le_bytes());

        let ptr = Ptr::decode(&buf, Endian::Little).unwrap();
        assert_eq!(ptr.test_flg, 0x80);
        assert_eq!(ptr.result, Some(9.0));
        assert_eq!(ptr.test_txt, None);
        assert_eq!(ptr.lo_limit, None);
        assert_eq!(ptr.units, None);
    }

    #[test]
    fn ptr_missing_required_prefix_errors() {
        let err = Ptr::decode(&[0, 0, 0], Endian::Little).unwrap_err();
        assert!(matches!(
            err,
            StdfError::TruncatedRecord {
                name: "PTR",
                field: "TEST_NUM"
            }
        ));
    }

    #[test]
    fn mpr_walks_variable_arrays_to_reach_limits() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&55u32.to_le_bytes()); // TEST_NUM
        buf.push(1);
        buf.push(1);
        buf.push(0);
        buf.push(0);
        buf.extend_from_slice(&3u16.to_le_bytes()); // RTN_ICNT
        buf.extend_from_slice(&2u16.to_le_bytes()); // RSLT_CNT
        buf.extend_from_slice(&[0x11, 0x01]); // RTN_STAT nibbles
        buf.extend_from_slice(&1.0f32.to_le_bytes()); // RTN_RSLT[0]
        buf.extend_from_slice(&2.0f32.to_le_bytes()); // RTN_RSLT[1]
        push_cn(&mut buf, "pin leakage");
        push_cn(&mut buf, ""); // ALARM_ID
        buf.push(0); // OPT_FLAG
        buf.push(0); // RES_SCAL
        buf.push(0); // LLM_SCAL
        buf.push(0); // HLM_SCAL
        buf.extend_from_slice(&(-1.0f32).to_le_bytes()); // LO_LIMIT
        buf.extend_from_slice(&1.0f32.to_le_bytes()); // HI_LIMIT
        buf.extend_from_slice(&0.0f32.to_le_bytes()); // START_IN
        buf.extend_from_slice(&0.0f32.to_le_bytes()); // INCR_IN
        buf.extend_from_slice(&[1, 0, 2, 0, 3, 0]); // RTN_INDX
        push_cn(&mut buf, "uA");

        let mpr = Mpr::decode(&buf, Endian::Little).unwrap();
        assert_eq!(mpr.test_num, 55);
        assert_eq!(mpr.test_txt.as_deref(), Some("pin leakage"));
        assert_eq!(mpr.lo_limit, Some(-1.0));
        assert_eq!(mpr.hi_limit, Some(1.0));
        assert_eq!(mpr.units.as_deref(), Some("uA"));
    }

    #[test]
    fn mpr_truncated_after_flags_keeps_required_prefix() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&55u32.to_le_bytes());
        buf.push(1);
        buf.push(1);
        buf.push(0x40);
        buf.push(0);

        let mpr = Mpr::decode(&buf, Endian::Little).unwrap();
        assert_eq!(mpr.test_flg, 0x40);
        assert_eq!(mpr.test_txt, None);
        assert_eq!(mpr.units, None);
    }

    #[test]
    fn ftr_reaches_test_txt_past_pin_arrays() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&9u32.to_le_bytes()); // TEST_NUM
        buf.push(1);
        buf.push(1);
        buf.push(0x80); // TEST_FLG
        buf.push(0xFF); // OPT_FLAG
        buf.extend_from_slice(&0u32.to_le_bytes()); // CYCL_CNT
        buf.extend_from_slice(&0u32.to_le_bytes()); // REL_VADR
        buf.extend_from_slice(&0u32.to_le_bytes()); // REPT_CNT
        buf.extend_from_slice(&0u32.to_le_bytes()); // NUM_FAIL
        buf.extend_from_slice(&0i32.to_le_bytes()); // XFAIL_AD
        buf.extend_from_slice(&0i32.to_le_bytes()); // YFAIL_AD
        buf.extend_from_slice(&0i16.to_le_bytes()); // VECT_OFF
        buf.extend_from_slice(&2u16.to_le_bytes()); // RTN_ICNT
        buf.extend_from_slice(&1u16.to_le_bytes()); // PGM_ICNT
        buf.extend_from_slice(&[1, 0, 2, 0]); // RTN_INDX
        buf.push(0x21); // RTN_STAT nibbles
        buf.extend_from_slice(&[3, 0]); // PGM_INDX
        buf.push(0x01); // PGM_STAT nibble
        buf.extend_from_slice(&8u16.to_le_bytes()); // FAIL_PIN bit count
        buf.push(0xAA); // FAIL_PIN data
        push_cn(&mut buf, "vec1"); // VECT_NAM
        push_cn(&mut buf, "ts1"); // TIME_SET
        push_cn(&mut buf, "op"); // OP_CODE
        push_cn(&mut buf, "scan chain"); // TEST_TXT

        let ftr = Ftr::decode(&buf, Endian::Little).unwrap();
        assert_eq!(ftr.test_num, 9);
        assert_eq!(ftr.test_flg, 0x80);
        assert_eq!(ftr.test_txt.as_deref(), Some("scan chain"));
    }

    #[test]
    fn mir_collects_present_text_fields() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1_600_000_000u32.to_le_bytes()); // SETUP_T
        buf.extend_from_slice(&1_600_000_100u32.to_le_bytes()); // START_T
        buf.push(1); // STAT_NUM
        buf.push(b'P'); // MODE_COD
        buf.push(b' '); // RTST_COD
        buf.push(b' '); // PROT_COD
        buf.extend_from_slice(&65535u16.to_le_bytes()); // BURN_TIM
        buf.push(b' '); // CMOD_COD
        push_cn(&mut buf, "LOT1"); // LOT_ID
        push_cn(&mut buf, "DEVICE9"); // PART_TYP

        let mir = Mir::decode(&buf, Endian::Little).unwrap();
        assert_eq!(mir.setup_t, Some(1_600_000_000));
        assert_eq!(mir.mode_cod, Some(b'P'));
        assert_eq!(mir.burn_tim, Some(65535));
        assert_eq!(
            mir.texts,
            vec![("LOT_ID", "LOT1".to_string()), ("PART_TYP", "DEVICE9".to_string())]
        );
    }

    #[test]
    fn wrr_big_endian_counts() {
        let mut buf = Vec::new();
        buf.push(2); // HEAD_NUM
        buf.push(0); // SITE_GRP
        buf.extend_from_slice(&0u32.to_be_bytes()); // FINISH_T
        buf.extend_from_slice(&500u32.to_be_bytes()); // PART_CNT
        buf.extend_from_slice(&u32::MAX.to_be_bytes()); // RTST_CNT

        let wrr = Wrr::decode(&buf, Endian::Big).unwrap();
        assert_eq!(wrr.head_num, 2);
        assert_eq!(wrr.part_cnt, Some(500));
        assert_eq!(wrr.rtst_cnt, Some(u32::MAX));
        assert_eq!(wrr.good_cnt, None);
        assert_eq!(wrr.wafer_id, None);
    }

    #[test]
    fn enqueue_filter_matches_contract() {
        for code in [REC_MIR, REC_PTR, REC_PIR, REC_PRR, REC_TSR, REC_PMR] {
            assert!(is_enqueued(code));
        }
        for code in [REC_FAR, REC_ATR, REC_MRR, REC_GDR, REC_DTR, 0x0707] {
            assert!(!is_enqueued(code));
        }
        assert!(is_known(REC_FAR));
        assert!(!is_known(0x0707));
        assert_eq!(record_name(REC_MPR), Some("MPR"));
    }
}
