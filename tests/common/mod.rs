//! Synthetic STDF fixtures for the integration suites.
//!
//! Builds record streams in either byte order so the same logical file can
//! be round-tripped through both detector paths.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use stdfsum::Endian;

/// One record payload, built field by field in the chosen byte order.
pub struct Payload {
    endian: Endian,
    bytes: Vec<u8>,
}

impl Payload {
    pub fn new(endian: Endian) -> Self {
        Self {
            endian,
            bytes: Vec::new(),
        }
    }

    pub fn u1(mut self, value: u8) -> Self {
        self.bytes.push(value);
        self
    }

    pub fn u2(mut self, value: u16) -> Self {
        let bytes = match self.endian {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        };
        self.bytes.extend_from_slice(&bytes);
        self
    }

    pub fn u4(mut self, value: u32) -> Self {
        let bytes = match self.endian {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        };
        self.bytes.extend_from_slice(&bytes);
        self
    }

    pub fn i2(mut self, value: i16) -> Self {
        let bytes = match self.endian {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        };
        self.bytes.extend_from_slice(&bytes);
        self
    }

    pub fn r4(mut self, value: f32) -> Self {
        let bytes = match self.endian {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        };
        self.bytes.extend_from_slice(&bytes);
        self
    }

    pub fn c1(self, value: u8) -> Self {
        self.u1(value)
    }

    pub fn cn(mut self, text: &str) -> Self {
        self.bytes.push(text.len() as u8);
        self.bytes.extend_from_slice(text.as_bytes());
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Record stream builder.
pub struct StdfBuilder {
    endian: Endian,
    bytes: Vec<u8>,
}

impl StdfBuilder {
    pub fn new(endian: Endian) -> Self {
        Self {
            endian,
            bytes: Vec::new(),
        }
    }

    pub fn little() -> Self {
        Self::new(Endian::Little)
    }

    pub fn big() -> Self {
        Self::new(Endian::Big)
    }

    fn payload(&self) -> Payload {
        Payload::new(self.endian)
    }

    /// Appends one framed record.
    pub fn record(&mut self, rec_typ: u8, rec_sub: u8, payload: &[u8]) -> &mut Self {
        let len = payload.len() as u16;
        let len_bytes = match self.endian {
            Endian::Little => len.to_le_bytes(),
            Endian::Big => len.to_be_bytes(),
        };
        self.bytes.extend_from_slice(&len_bytes);
        self.bytes.push(rec_typ);
        self.bytes.push(rec_sub);
        self.bytes.extend_from_slice(payload);
        self
    }

    pub fn far(&mut self) -> &mut Self {
        self.record(0, 10, &[2, 4])
    }

    pub fn far_with_version(&mut self, version: u8) -> &mut Self {
        self.record(0, 10, &[2, version])
    }

    pub fn mir(&mut self, lot_id: &str) -> &mut Self {
        let payload = self
            .payload()
            .u4(1_600_000_000) // SETUP_T
            .u4(1_600_000_100) // START_T
            .u1(1) // STAT_NUM
            .c1(b'P') // MODE_COD
            .c1(b' ') // RTST_COD
            .c1(b' ') // PROT_COD
            .u2(65535) // BURN_TIM (missing)
            .c1(b' ') // CMOD_COD
            .cn(lot_id)
            .into_bytes();
        self.record(1, 10, &payload)
    }

    pub fn pir(&mut self, head: u8, site: u8) -> &mut Self {
        let payload = self.payload().u1(head).u1(site).into_bytes();
        self.record(5, 10, &payload)
    }

    pub fn prr(
        &mut self,
        head: u8,
        site: u8,
        part_flg: u8,
        num_test: u16,
        hbin: u16,
        sbin: u16,
        x: i16,
        y: i16,
        part_id: &str,
    ) -> &mut Self {
        let payload = self
            .payload()
            .u1(head)
            .u1(site)
            .u1(part_flg)
            .u2(num_test)
            .u2(hbin)
            .u2(sbin)
            .i2(x)
            .i2(y)
            .u4(42) // TEST_T
            .cn(part_id)
            .into_bytes();
        self.record(5, 20, &payload)
    }

    /// PTR carrying the full optional tail, limits included.
    pub fn ptr_full(
        &mut self,
        test_num: u32,
        head: u8,
        site: u8,
        test_flg: u8,
        result: f32,
        test_txt: &str,
        lo_limit: f32,
        hi_limit: f32,
        units: &str,
    ) -> &mut Self {
        let payload = self
            .payload()
            .u4(test_num)
            .u1(head)
            .u1(site)
            .u1(test_flg)
            .u1(0) // PARM_FLG
            .r4(result)
            .cn(test_txt)
            .cn("") // ALARM_ID
            .u1(0) // OPT_FLAG
            .u1(0) // RES_SCAL
            .u1(0) // LLM_SCAL
            .u1(0) // HLM_SCAL
            .r4(lo_limit)
            .r4(hi_limit)
            .cn(units)
            .into_bytes();
        self.record(15, 10, &payload)
    }

    /// PTR truncated after RESULT, the shape testers use for repeats.
    pub fn ptr_bare(
        &mut self,
        test_num: u32,
        head: u8,
        site: u8,
        test_flg: u8,
        result: f32,
    ) -> &mut Self {
        let payload = self
            .payload()
            .u4(test_num)
            .u1(head)
            .u1(site)
            .u1(test_flg)
            .u1(0)
            .r4(result)
            .into_bytes();
        self.record(15, 10, &payload)
    }

    pub fn ftr_bare(&mut self, test_num: u32, head: u8, site: u8, test_flg: u8) -> &mut Self {
        let payload = self
            .payload()
            .u4(test_num)
            .u1(head)
            .u1(site)
            .u1(test_flg)
            .into_bytes();
        self.record(15, 20, &payload)
    }

    pub fn mpr_bare(&mut self, test_num: u32, head: u8, site: u8, test_flg: u8) -> &mut Self {
        let payload = self
            .payload()
            .u4(test_num)
            .u1(head)
            .u1(site)
            .u1(test_flg)
            .u1(0)
            .into_bytes();
        self.record(15, 15, &payload)
    }

    pub fn wir(&mut self, head: u8, wafer_id: &str) -> &mut Self {
        let payload = self
            .payload()
            .u1(head)
            .u1(255) // SITE_GRP
            .u4(0) // START_T
            .cn(wafer_id)
            .into_bytes();
        self.record(2, 10, &payload)
    }

    pub fn wrr(&mut self, head: u8, counts: [u32; 5]) -> &mut Self {
        let payload = self
            .payload()
            .u1(head)
            .u1(255) // SITE_GRP
            .u4(0) // FINISH_T
            .u4(counts[0])
            .u4(counts[1])
            .u4(counts[2])
            .u4(counts[3])
            .u4(counts[4])
            .into_bytes();
        self.record(2, 20, &payload)
    }

    pub fn hbr(&mut self, bin_num: u16, name: &str, pf: u8) -> &mut Self {
        let payload = self
            .payload()
            .u1(1)
            .u1(1)
            .u2(bin_num)
            .u4(0) // HBIN_CNT
            .c1(pf)
            .cn(name)
            .into_bytes();
        self.record(1, 40, &payload)
    }

    pub fn sbr(&mut self, bin_num: u16, name: &str, pf: u8) -> &mut Self {
        let payload = self
            .payload()
            .u1(1)
            .u1(1)
            .u2(bin_num)
            .u4(0)
            .c1(pf)
            .cn(name)
            .into_bytes();
        self.record(1, 50, &payload)
    }

    pub fn tsr(&mut self, head: u8, site: u8, test_num: u32, fail_cnt: u32) -> &mut Self {
        let payload = self
            .payload()
            .u1(head)
            .u1(site)
            .c1(b'P') // TEST_TYP
            .u4(test_num)
            .u4(0) // EXEC_CNT
            .u4(fail_cnt)
            .into_bytes();
        self.record(10, 30, &payload)
    }

    pub fn pcr(&mut self, head: u8, site: u8, counts: [u32; 5]) -> &mut Self {
        let payload = self
            .payload()
            .u1(head)
            .u1(site)
            .u4(counts[0])
            .u4(counts[1])
            .u4(counts[2])
            .u4(counts[3])
            .u4(counts[4])
            .into_bytes();
        self.record(1, 30, &payload)
    }

    pub fn wcr(&mut self) -> &mut Self {
        let payload = self
            .payload()
            .r4(200.0) // WAFR_SIZ
            .r4(1.5) // DIE_HT
            .r4(2.5) // DIE_WID
            .u1(3) // WF_UNITS → mm
            .c1(b'D') // WF_FLAT
            .i2(10) // CENTER_X
            .i2(-20) // CENTER_Y
            .c1(b'R') // POS_X
            .c1(b'U') // POS_Y
            .into_bytes();
        self.record(2, 30, &payload)
    }

    /// A record the reader skips (Datalog Text).
    pub fn dtr(&mut self, text: &str) -> &mut Self {
        let payload = self.payload().cn(text).into_bytes();
        self.record(50, 30, &payload)
    }

    pub fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::File::create(path)
            .unwrap()
            .write_all(&self.bytes)
            .unwrap();
    }

    pub fn write_gz(&self, path: &Path) {
        let file = std::fs::File::create(path).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(&self.bytes).unwrap();
        encoder.finish().unwrap();
    }
}

/// Scratch paths for one test.
pub struct Fixture {
    pub dir: tempfile::TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::TempDir::new().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
