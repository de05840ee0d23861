#![allow(dead_code)]

//! Writes just enough BIFF5/BIFF8 to exercise the reader, wrapped in a
//! compound document via `cfb`.

use std::io::{Cursor, Write};

pub const RECORD_BOF: u16 = 0x0809;
pub const RECORD_EOF: u16 = 0x000A;
pub const RECORD_CONTINUE: u16 = 0x003C;
pub const RECORD_CODEPAGE: u16 = 0x0042;
pub const RECORD_DATEMODE: u16 = 0x0022;
pub const RECORD_WRITEACCESS: u16 = 0x005C;
pub const RECORD_FONT: u16 = 0x0031;
pub const RECORD_FORMAT: u16 = 0x041E;
pub const RECORD_XF: u16 = 0x00E0;
pub const RECORD_BOUNDSHEET: u16 = 0x0085;
pub const RECORD_SST: u16 = 0x00FC;
pub const RECORD_ROW: u16 = 0x0208;
pub const RECORD_LABELSST: u16 = 0x00FD;
pub const RECORD_LABEL: u16 = 0x0204;
pub const RECORD_NUMBER: u16 = 0x0203;
pub const RECORD_RK: u16 = 0x027E;
pub const RECORD_MULRK: u16 = 0x00BD;
pub const RECORD_BLANK: u16 = 0x0201;
pub const RECORD_BOOLERR: u16 = 0x0205;
pub const RECORD_FORMULA: u16 = 0x0006;
pub const RECORD_STRING: u16 = 0x0207;

const BOF_VERSION_BIFF8: u16 = 0x0600;
const BOF_VERSION_BIFF5: u16 = 0x0500;
const BOF_DT_WORKBOOK_GLOBALS: u16 = 0x0005;
const BOF_DT_WORKSHEET: u16 = 0x0010;

/// Largest record body BIFF8 allows.
pub const MAX_RECORD_BODY: usize = 8224;

pub fn push_record(out: &mut Vec<u8>, id: u16, data: &[u8]) {
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
}

/// RK encoding of a 30-bit integer.
pub fn rk_int(v: i32) -> u32 {
    ((v << 2) as u32) | 0x02
}

/// Wrap a workbook stream in a compound document under `stream_name`.
pub fn wrap_in_cfb(stream_name: &str, workbook_stream: &[u8]) -> Vec<u8> {
    let cursor = Cursor::new(Vec::new());
    let mut ole = cfb::CompoundFile::create(cursor).expect("create cfb");
    {
        let mut stream = ole.create_stream(stream_name).expect("create stream");
        stream.write_all(workbook_stream).expect("write stream");
    }
    ole.into_inner().into_inner()
}

/// Records of one worksheet substream (without BOF/EOF).
#[derive(Debug, Clone)]
pub struct SheetBuilder {
    name: String,
    visibility: u8,
    records: Vec<u8>,
    biff5: bool,
    codepage: u16,
}

impl SheetBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            visibility: 0,
            records: Vec::new(),
            biff5: false,
            codepage: 1252,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visibility = 1;
        self
    }

    fn cell_header(row: u16, col: u16, xf: u16) -> Vec<u8> {
        let mut b = row.to_le_bytes().to_vec();
        b.extend_from_slice(&col.to_le_bytes());
        b.extend_from_slice(&xf.to_le_bytes());
        b
    }

    pub fn raw(&mut self, id: u16, body: &[u8]) -> &mut Self {
        push_record(&mut self.records, id, body);
        self
    }

    pub fn row(&mut self, row: u16, first_col: u16, last_col_plus1: u16) -> &mut Self {
        let mut b = row.to_le_bytes().to_vec();
        b.extend_from_slice(&first_col.to_le_bytes());
        b.extend_from_slice(&last_col_plus1.to_le_bytes());
        b.extend_from_slice(&[0u8; 10]);
        self.raw(RECORD_ROW, &b)
    }

    pub fn label_sst(&mut self, row: u16, col: u16, index: u32) -> &mut Self {
        let mut b = Self::cell_header(row, col, 0);
        b.extend_from_slice(&index.to_le_bytes());
        self.raw(RECORD_LABELSST, &b)
    }

    pub fn label(&mut self, row: u16, col: u16, text: &str) -> &mut Self {
        if self.biff5 {
            let bytes = encode_8bit(text, self.codepage);
            return self.label_bytes(row, col, &bytes);
        }
        let mut b = Self::cell_header(row, col, 0);
        b.extend(unicode_string_u16(text));
        self.raw(RECORD_LABEL, &b)
    }

    /// LABEL with pre-encoded 8-bit text (BIFF5 codepage bytes).
    pub fn label_bytes(&mut self, row: u16, col: u16, bytes: &[u8]) -> &mut Self {
        let mut b = Self::cell_header(row, col, 0);
        b.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
        b.extend_from_slice(bytes);
        self.raw(RECORD_LABEL, &b)
    }

    pub fn number(&mut self, row: u16, col: u16, xf: u16, value: f64) -> &mut Self {
        let mut b = Self::cell_header(row, col, xf);
        b.extend_from_slice(&value.to_le_bytes());
        self.raw(RECORD_NUMBER, &b)
    }

    pub fn rk(&mut self, row: u16, col: u16, xf: u16, rk: u32) -> &mut Self {
        let mut b = Self::cell_header(row, col, xf);
        b.extend_from_slice(&rk.to_le_bytes());
        self.raw(RECORD_RK, &b)
    }

    pub fn mulrk(&mut self, row: u16, first_col: u16, values: &[(u16, u32)]) -> &mut Self {
        let mut b = row.to_le_bytes().to_vec();
        b.extend_from_slice(&first_col.to_le_bytes());
        for (xf, rk) in values {
            b.extend_from_slice(&xf.to_le_bytes());
            b.extend_from_slice(&rk.to_le_bytes());
        }
        let last_col = first_col + values.len() as u16 - 1;
        b.extend_from_slice(&last_col.to_le_bytes());
        self.raw(RECORD_MULRK, &b)
    }

    pub fn blank(&mut self, row: u16, col: u16) -> &mut Self {
        let b = Self::cell_header(row, col, 0);
        self.raw(RECORD_BLANK, &b)
    }

    pub fn boolerr(&mut self, row: u16, col: u16, value: u8, is_error: bool) -> &mut Self {
        let mut b = Self::cell_header(row, col, 0);
        b.push(value);
        b.push(u8::from(is_error));
        self.raw(RECORD_BOOLERR, &b)
    }

    /// FORMULA with a string result, followed by its STRING record.
    pub fn formula_string(&mut self, row: u16, col: u16, text: &str) -> &mut Self {
        let mut b = Self::cell_header(row, col, 0);
        b.extend_from_slice(&[0x00, 0, 0, 0, 0, 0, 0xFF, 0xFF]);
        b.extend_from_slice(&0u16.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());
        self.raw(RECORD_FORMULA, &b);
        self.raw(RECORD_STRING, &unicode_string_u16(text))
    }

    /// FORMULA with a cached number.
    pub fn formula_number(&mut self, row: u16, col: u16, value: f64) -> &mut Self {
        let mut b = Self::cell_header(row, col, 0);
        b.extend_from_slice(&value.to_le_bytes());
        b.extend_from_slice(&0u16.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());
        self.raw(RECORD_FORMULA, &b)
    }
}

/// A workbook stream under construction.
#[derive(Debug, Clone)]
pub struct WorkbookBuilder {
    biff5: bool,
    codepage: Option<u16>,
    codepage_record: bool,
    date_1904: bool,
    author: Option<String>,
    formats: Vec<(u16, String)>,
    /// Number-format index of each XF, in order.
    xf_formats: Vec<u16>,
    sst: Vec<String>,
    sst_chunk: usize,
    sheets: Vec<SheetBuilder>,
}

impl Default for WorkbookBuilder {
    fn default() -> Self {
        Self {
            biff5: false,
            codepage: Some(1200),
            codepage_record: true,
            date_1904: false,
            author: None,
            formats: Vec::new(),
            xf_formats: vec![0],
            sst: Vec::new(),
            sst_chunk: MAX_RECORD_BODY,
            sheets: Vec::new(),
        }
    }
}

impl WorkbookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn biff5(codepage: u16) -> Self {
        Self {
            biff5: true,
            codepage: Some(codepage),
            ..Self::default()
        }
    }

    /// Keep encoding 8-bit text in the codepage but omit the CODEPAGE record.
    pub fn without_codepage_record(mut self) -> Self {
        self.codepage_record = false;
        self
    }

    pub fn date_1904(mut self) -> Self {
        self.date_1904 = true;
        self
    }

    pub fn author(mut self, name: &str) -> Self {
        self.author = Some(name.to_string());
        self
    }

    pub fn format(mut self, index: u16, pattern: &str) -> Self {
        self.formats.push((index, pattern.to_string()));
        self
    }

    /// Append an XF selecting `format`; returns its index.
    pub fn xf(&mut self, format: u16) -> u16 {
        self.xf_formats.push(format);
        (self.xf_formats.len() - 1) as u16
    }

    /// Append a shared string; returns its index.
    pub fn shared_string(&mut self, s: &str) -> u32 {
        self.sst.push(s.to_string());
        (self.sst.len() - 1) as u32
    }

    /// Cap SST/CONTINUE bodies at `limit` bytes to force splits.
    pub fn sst_chunk(mut self, limit: usize) -> Self {
        self.sst_chunk = limit;
        self
    }

    pub fn sheet(&mut self, mut sheet: SheetBuilder) -> &mut Self {
        sheet.biff5 = self.biff5;
        sheet.codepage = self.codepage_8bit();
        self.sheets.push(sheet);
        self
    }

    /// Start a sheet in this workbook's dialect.
    pub fn new_sheet(&self, name: &str) -> SheetBuilder {
        let mut sheet = SheetBuilder::new(name);
        sheet.biff5 = self.biff5;
        sheet.codepage = self.codepage_8bit();
        sheet
    }

    fn bof(&self, dt: u16) -> Vec<u8> {
        let version = if self.biff5 {
            BOF_VERSION_BIFF5
        } else {
            BOF_VERSION_BIFF8
        };
        let mut out = vec![0u8; if self.biff5 { 8 } else { 16 }];
        out[0..2].copy_from_slice(&version.to_le_bytes());
        out[2..4].copy_from_slice(&dt.to_le_bytes());
        out
    }

    fn codepage_8bit(&self) -> u16 {
        self.codepage.unwrap_or(1252)
    }

    fn short_string(&self, s: &str) -> Vec<u8> {
        if self.biff5 {
            let bytes = encode_8bit(s, self.codepage_8bit());
            let mut b = vec![bytes.len() as u8];
            b.extend_from_slice(&bytes);
            b
        } else {
            unicode_string_u8(s)
        }
    }

    /// The raw workbook stream.
    pub fn build_stream(&self) -> Vec<u8> {
        let mut out = Vec::new();
        push_record(&mut out, RECORD_BOF, &self.bof(BOF_DT_WORKBOOK_GLOBALS));
        if let Some(cp) = self.codepage.filter(|_| self.codepage_record) {
            push_record(&mut out, RECORD_CODEPAGE, &cp.to_le_bytes());
        }
        if let Some(author) = &self.author {
            let mut b = if self.biff5 {
                self.short_string(author)
            } else {
                unicode_string_u16(author)
            };
            b.resize(112, b' ');
            push_record(&mut out, RECORD_WRITEACCESS, &b);
        }
        push_record(
            &mut out,
            RECORD_DATEMODE,
            &u16::from(self.date_1904).to_le_bytes(),
        );

        let mut font = vec![0u8; 14];
        font[0..2].copy_from_slice(&200u16.to_le_bytes());
        font[6..8].copy_from_slice(&400u16.to_le_bytes());
        font.extend(self.short_string("Arial"));
        push_record(&mut out, RECORD_FONT, &font);

        for (index, pattern) in &self.formats {
            let mut b = index.to_le_bytes().to_vec();
            if self.biff5 {
                b.extend(self.short_string(pattern));
            } else {
                b.extend(unicode_string_u16(pattern));
            }
            push_record(&mut out, RECORD_FORMAT, &b);
        }

        for format in &self.xf_formats {
            let mut b = vec![0u8; if self.biff5 { 16 } else { 20 }];
            b[2..4].copy_from_slice(&format.to_le_bytes());
            push_record(&mut out, RECORD_XF, &b);
        }

        let mut offset_slots = Vec::new();
        for sheet in &self.sheets {
            let mut b = 0u32.to_le_bytes().to_vec();
            b.push(sheet.visibility);
            b.push(0);
            b.extend(self.short_string(&sheet.name));
            offset_slots.push(out.len() + 4);
            push_record(&mut out, RECORD_BOUNDSHEET, &b);
        }

        if !self.biff5 && !self.sst.is_empty() {
            for (i, body) in sst_bodies(&self.sst, self.sst_chunk).iter().enumerate() {
                let id = if i == 0 { RECORD_SST } else { RECORD_CONTINUE };
                push_record(&mut out, id, body);
            }
        }
        push_record(&mut out, RECORD_EOF, &[]);

        for (sheet, slot) in self.sheets.iter().zip(offset_slots) {
            let offset = out.len() as u32;
            out[slot..slot + 4].copy_from_slice(&offset.to_le_bytes());
            push_record(&mut out, RECORD_BOF, &self.bof(BOF_DT_WORKSHEET));
            out.extend_from_slice(&sheet.records);
            push_record(&mut out, RECORD_EOF, &[]);
        }
        out
    }

    /// The workbook wrapped in a compound document.
    pub fn build_xls(&self) -> Vec<u8> {
        let name = if self.biff5 { "Book" } else { "Workbook" };
        wrap_in_cfb(name, &self.build_stream())
    }
}

/// Text in a single-byte codepage, as BIFF5 stores it.
pub fn encode_8bit(s: &str, codepage: u16) -> Vec<u8> {
    let encoding = xlsgrid::codepage::encoding_for(codepage).unwrap_or(encoding_rs::WINDOWS_1252);
    encoding.encode(s).0.into_owned()
}

fn encode(s: &str) -> (bool, Vec<u16>) {
    let units: Vec<u16> = s.encode_utf16().collect();
    let wide = units.iter().any(|&u| u > 0xFF);
    (wide, units)
}

fn push_units(out: &mut Vec<u8>, units: &[u16], wide: bool) {
    for &u in units {
        if wide {
            out.extend_from_slice(&u.to_le_bytes());
        } else {
            out.push(u as u8);
        }
    }
}

/// BIFF8 string with a 2-byte length prefix.
pub fn unicode_string_u16(s: &str) -> Vec<u8> {
    let (wide, units) = encode(s);
    let mut out = (units.len() as u16).to_le_bytes().to_vec();
    out.push(u8::from(wide));
    push_units(&mut out, &units, wide);
    out
}

/// BIFF8 string with a 1-byte length prefix.
pub fn unicode_string_u8(s: &str) -> Vec<u8> {
    let (wide, units) = encode(s);
    let mut out = vec![units.len() as u8, u8::from(wide)];
    push_units(&mut out, &units, wide);
    out
}

/// Lay out an SST as an SST body plus CONTINUE bodies of at most `limit`
/// bytes. A string header never splits; character data that spills over
/// restarts with a flags byte.
pub fn sst_bodies(strings: &[String], limit: usize) -> Vec<Vec<u8>> {
    let mut bodies = Vec::new();
    let mut cur = Vec::new();
    cur.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    cur.extend_from_slice(&(strings.len() as u32).to_le_bytes());

    for s in strings {
        let (wide, units) = encode(s);
        let unit = if wide { 2 } else { 1 };
        if cur.len() + 3 > limit {
            bodies.push(std::mem::take(&mut cur));
        }
        cur.extend_from_slice(&(units.len() as u16).to_le_bytes());
        cur.push(u8::from(wide));

        let mut rest = &units[..];
        loop {
            let take = ((limit - cur.len()) / unit).min(rest.len());
            push_units(&mut cur, &rest[..take], wide);
            rest = &rest[take..];
            if rest.is_empty() {
                break;
            }
            bodies.push(std::mem::take(&mut cur));
            cur.push(u8::from(wide));
        }
    }
    bodies.push(cur);
    bodies
}
