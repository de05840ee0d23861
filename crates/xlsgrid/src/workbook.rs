//! Opening a workbook and querying its sheets.
//!
//! Opening runs one scan over the workbook-globals substream. Sheet rows
//! are decoded on first access to each sheet, exactly once, and are shared
//! read-only afterwards; concurrent first accesses to the same sheet wait
//! on a single decode.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use std::sync::OnceLock;

use crate::biff::sst::SharedStrings;
use crate::biff::{BiffVersion, RecordReader};
use crate::cell::Cell;
use crate::date::DateMode;
use crate::dispatch;
use crate::error::{XlsError, XlsResult};
use crate::globals::WorkbookGlobals;
use crate::options::ReadOptions;
use crate::sheet::{self, Row, SheetData, SheetInfo, SheetKind, SheetVisibility};
use crate::styles::{Font, Format, Xf};

/// Stream names tried in the compound document, in order.
const STREAM_NAMES: [&str; 2] = ["/Workbook", "/Book"];

struct Sheet {
    info: SheetInfo,
    data: OnceLock<SheetData>,
}

/// A decoded workbook.
pub struct Workbook {
    globals: WorkbookGlobals,
    sheets: Vec<Sheet>,
    stream: Vec<u8>,
    options: ReadOptions,
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("version", &self.globals.version)
            .field("sheets", &self.sheets.len())
            .field("stream_len", &self.stream.len())
            .finish()
    }
}

impl Workbook {
    /// Open an `.xls` file from a filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> XlsResult<Self> {
        Self::open_with_options(path, ReadOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ReadOptions) -> XlsResult<Self> {
        let file = File::open(path.as_ref()).map_err(XlsError::Container)?;
        Self::open_reader_with_options(file, options)
    }

    /// Open a compound document from any `Read + Seek` source.
    pub fn open_reader<R: Read + Seek>(reader: R) -> XlsResult<Self> {
        Self::open_reader_with_options(reader, ReadOptions::default())
    }

    pub fn open_reader_with_options<R: Read + Seek>(
        reader: R,
        options: ReadOptions,
    ) -> XlsResult<Self> {
        let mut cfb = cfb::CompoundFile::open(reader).map_err(XlsError::Container)?;

        let stream_path = STREAM_NAMES
            .into_iter()
            .find(|name| cfb.exists(name))
            .ok_or(XlsError::WorkbookStreamMissing)?;
        log::debug!("reading {stream_path} stream");

        let mut stream = Vec::new();
        cfb.open_stream(stream_path)?.read_to_end(&mut stream)?;
        Self::from_stream_bytes_with_options(stream, options)
    }

    /// Open a compound document from a non-seekable source by buffering it.
    pub fn open_stream<R: Read>(mut reader: R) -> XlsResult<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::open_reader(Cursor::new(buf))
    }

    /// Decode a BIFF record stream already extracted from its container.
    pub fn from_stream_bytes(stream: Vec<u8>) -> XlsResult<Self> {
        Self::from_stream_bytes_with_options(stream, ReadOptions::default())
    }

    pub fn from_stream_bytes_with_options(stream: Vec<u8>, options: ReadOptions) -> XlsResult<Self> {
        let mut globals = WorkbookGlobals::new(options.fallback_codepage);
        {
            let mut reader = RecordReader::new(Cursor::new(stream.as_slice()));
            dispatch::scan_globals(&mut reader, &mut globals)?;
        }

        let sheets = globals
            .sheets
            .iter()
            .cloned()
            .map(|info| Sheet {
                info,
                data: OnceLock::new(),
            })
            .collect();

        Ok(Self {
            globals,
            sheets,
            stream,
            options,
        })
    }

    // ── Sheets ──────────────────────────────────────────────────────────

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// BOUNDSHEET entries in workbook order.
    pub fn sheet_infos(&self) -> impl Iterator<Item = &SheetInfo> {
        self.sheets.iter().map(|s| &s.info)
    }

    /// Get a sheet by index, decoding it on first access.
    pub fn sheet(&self, index: usize) -> XlsResult<Worksheet<'_>> {
        let sheet = self.sheets.get(index).ok_or(XlsError::SheetOutOfBounds {
            index,
            count: self.sheets.len(),
        })?;
        Ok(self.worksheet(sheet))
    }

    /// Get a sheet by exact name.
    pub fn sheet_by_name(&self, name: &str) -> XlsResult<Worksheet<'_>> {
        let sheet = self
            .sheets
            .iter()
            .find(|s| s.info.name == name)
            .ok_or_else(|| XlsError::SheetNotFound(name.to_string()))?;
        Ok(self.worksheet(sheet))
    }

    pub fn first_sheet(&self) -> XlsResult<Worksheet<'_>> {
        self.sheet(0)
    }

    fn worksheet<'a>(&'a self, sheet: &'a Sheet) -> Worksheet<'a> {
        let data = sheet.data.get_or_init(|| {
            sheet::materialize(
                Cursor::new(self.stream.as_slice()),
                u64::from(sheet.info.offset),
                &self.globals.decoder(),
            )
        });
        Worksheet {
            workbook: self,
            info: &sheet.info,
            data,
        }
    }

    /// Render up to `max_rows` rows across all sheets, in sheet order.
    ///
    /// Each sheet contributes rows `0..=max_row` (missing rows are empty),
    /// and each row is padded with empty strings up to its last occupied
    /// column.
    pub fn read_all_cells(&self, max_rows: usize) -> XlsResult<Vec<Vec<String>>> {
        let mut out: Vec<Vec<String>> = Vec::new();
        for index in 0..self.sheets.len() {
            let budget = max_rows.saturating_sub(out.len());
            if budget == 0 {
                break;
            }
            let sheet = self.sheet(index)?;
            if sheet.data.rows.is_empty() {
                continue;
            }
            let len = (usize::from(sheet.max_row()) + 1).min(budget);
            let mut grid = vec![Vec::new(); len];
            for row in sheet.rows() {
                let idx = usize::from(row.index());
                if idx >= len {
                    break;
                }
                grid[idx] = row.values()?;
            }
            out.extend(grid);
        }
        Ok(out)
    }

    // ── Workbook metadata ───────────────────────────────────────────────

    /// User name from the WRITEACCESS record.
    pub fn author(&self) -> Option<&str> {
        self.globals.author.as_deref()
    }

    /// Codepage named by the CODEPAGE record.
    pub fn codepage(&self) -> Option<u16> {
        self.globals.codepage
    }

    pub fn version(&self) -> BiffVersion {
        self.globals.version
    }

    pub fn date_mode(&self) -> DateMode {
        self.globals.date_mode
    }

    pub fn fonts(&self) -> &[Font] {
        &self.globals.fonts
    }

    /// User-defined number formats by index.
    pub fn formats(&self) -> &HashMap<u16, Format> {
        &self.globals.formats
    }

    pub fn xfs(&self) -> &[Xf] {
        &self.globals.xfs
    }

    pub fn shared_strings(&self) -> &SharedStrings {
        &self.globals.sst
    }

    /// Problems absorbed while scanning the workbook globals.
    pub fn diagnostics(&self) -> &[XlsError] {
        &self.globals.diagnostics
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }
}

/// A decoded sheet.
#[derive(Clone, Copy)]
pub struct Worksheet<'a> {
    workbook: &'a Workbook,
    info: &'a SheetInfo,
    data: &'a SheetData,
}

impl<'a> Worksheet<'a> {
    pub fn name(&self) -> &'a str {
        &self.info.name
    }

    pub fn visibility(&self) -> SheetVisibility {
        self.info.visibility
    }

    pub fn kind(&self) -> SheetKind {
        self.info.kind
    }

    /// Highest row index seen in a cell or ROW record.
    pub fn max_row(&self) -> u16 {
        self.data.max_row
    }

    pub fn row_count(&self) -> usize {
        self.data.rows.len()
    }

    pub fn row(&self, index: u16) -> Option<RowRef<'a>> {
        let workbook = self.workbook;
        self.data.rows.get(&index).map(|row| RowRef { workbook, row })
    }

    /// Present rows in index order.
    pub fn rows(&self) -> impl Iterator<Item = RowRef<'a>> + 'a {
        let workbook = self.workbook;
        self.data.rows.values().map(move |row| RowRef { workbook, row })
    }

    /// Problems absorbed while decoding this sheet.
    pub fn diagnostics(&self) -> &'a [XlsError] {
        &self.data.diagnostics
    }
}

impl std::fmt::Debug for Worksheet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worksheet")
            .field("name", &self.info.name)
            .field("rows", &self.data.rows.len())
            .finish()
    }
}

/// A row of a decoded sheet.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    workbook: &'a Workbook,
    row: &'a Row,
}

impl<'a> RowRef<'a> {
    pub fn index(&self) -> u16 {
        self.row.index
    }

    pub fn first_col(&self) -> u16 {
        self.row.first_col()
    }

    pub fn last_col(&self) -> u16 {
        self.row.last_col()
    }

    pub fn cells(&self) -> &'a [Cell] {
        self.row.cells()
    }

    /// Rendered text of column `col`; an absent cell is an empty string.
    pub fn cell(&self, col: u16) -> XlsResult<String> {
        let Some(cell) = self.row.cell_at(col) else {
            return Ok(String::new());
        };
        let rendered = self.render(cell)?;
        Ok(rendered
            .into_iter()
            .nth(usize::from(col - cell.first_col))
            .unwrap_or_default())
    }

    /// Rendered text of columns `0..=last_col`, empty where unoccupied.
    pub fn values(&self) -> XlsResult<Vec<String>> {
        let cells = self.row.cells();
        if cells.is_empty() {
            return Ok(Vec::new());
        }
        let mut out = vec![String::new(); usize::from(self.last_col()) + 1];
        for cell in cells {
            let first = usize::from(cell.first_col);
            for (i, text) in self.render(cell)?.into_iter().enumerate() {
                if let Some(slot) = out.get_mut(first + i) {
                    *slot = text;
                }
            }
        }
        Ok(out)
    }

    fn render(&self, cell: &Cell) -> XlsResult<Vec<String>> {
        cell.render(&self.workbook.globals, &self.workbook.options.date_format)
    }
}
