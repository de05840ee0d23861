//! Sheet directory entries and the per-sheet row/cell materializer.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use crate::biff::parser::{read_u16, read_u32, read_u8};
use crate::biff::records;
use crate::biff::strings::StringDecoder;
use crate::biff::RecordReader;
use crate::cell::{self, Cell, CellKind};
use crate::error::{XlsError, XlsResult};

/// BOUNDSHEET visibility flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SheetVisibility {
    #[default]
    Visible,
    Hidden,
    /// Only unhideable through VBA.
    VeryHidden,
}

impl SheetVisibility {
    fn from_flag(flag: u8) -> Self {
        match flag & 0x03 {
            0 => SheetVisibility::Visible,
            1 => SheetVisibility::Hidden,
            _ => SheetVisibility::VeryHidden,
        }
    }
}

/// BOUNDSHEET sheet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SheetKind {
    #[default]
    Worksheet,
    Macro,
    Chart,
    VbModule,
    Other(u8),
}

impl SheetKind {
    fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => SheetKind::Worksheet,
            0x01 => SheetKind::Macro,
            0x02 => SheetKind::Chart,
            0x06 => SheetKind::VbModule,
            other => SheetKind::Other(other),
        }
    }
}

/// A sheet as declared by its BOUNDSHEET record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetInfo {
    pub name: String,
    pub visibility: SheetVisibility,
    pub kind: SheetKind,
    /// Stream offset of the sheet's BOF record.
    pub offset: u32,
}

impl SheetInfo {
    /// BOUNDSHEET: offset(4) + visibility(1) + type(1) + name (1-byte length)
    pub(crate) fn parse(data: &[u8], decoder: &StringDecoder) -> Self {
        let mut off = 0;
        let offset = read_u32(data, &mut off).unwrap_or_default();
        let visibility = SheetVisibility::from_flag(read_u8(data, &mut off).unwrap_or_default());
        let kind = SheetKind::from_byte(read_u8(data, &mut off).unwrap_or_default());
        let name = decoder.read_u8_string(data, &mut off).unwrap_or_default();
        Self {
            name,
            visibility,
            kind,
            offset,
        }
    }
}

/// One row of a materialized sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub index: u16,
    /// Column range announced by a ROW record, if any (last is inclusive).
    declared: Option<(u16, u16)>,
    /// Cells ordered by first column.
    cells: Vec<Cell>,
}

impl Row {
    fn new(index: u16) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// First occupied column; the ROW record's range for a row without cells.
    pub fn first_col(&self) -> u16 {
        match self.cells.first() {
            Some(c) => c.first_col,
            None => self.declared.map(|(first, _)| first).unwrap_or_default(),
        }
    }

    /// Last occupied column (inclusive).
    pub fn last_col(&self) -> u16 {
        match self.cells.iter().map(Cell::last_col).max() {
            Some(last) => last,
            None => self.declared.map(|(_, last)| last).unwrap_or_default(),
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The cell covering column `col`.
    pub fn cell_at(&self, col: u16) -> Option<&Cell> {
        let idx = self.cells.partition_point(|c| c.last_col() < col);
        self.cells.get(idx).filter(|c| c.first_col <= col)
    }

    /// Add a cell; wherever it overlaps earlier cells, it replaces them.
    /// Runs it lands inside keep their uncovered columns, so cells never
    /// overlap.
    fn insert(&mut self, cell: Cell) {
        let (first, last) = (cell.first_col, cell.last_col());
        if self.cells.last().map_or(true, |c| c.last_col() < first) {
            self.cells.push(cell);
            return;
        }

        let mut kept = Vec::with_capacity(self.cells.len() + 2);
        for existing in self.cells.drain(..) {
            if existing.last_col() < first || existing.first_col > last {
                kept.push(existing);
                continue;
            }
            if existing.first_col < first {
                kept.extend(existing.columns(existing.first_col, first - 1));
            }
            if existing.last_col() > last {
                kept.extend(existing.columns(last + 1, existing.last_col()));
            }
        }
        let idx = kept.partition_point(|c| c.first_col < first);
        kept.insert(idx, cell);
        self.cells = kept;
    }
}

/// The decoded contents of one sheet.
#[derive(Debug, Default)]
pub struct SheetData {
    pub(crate) rows: BTreeMap<u16, Row>,
    pub(crate) max_row: u16,
    pub(crate) diagnostics: Vec<XlsError>,
}

impl SheetData {
    fn row_mut(&mut self, index: u16) -> &mut Row {
        self.max_row = self.max_row.max(index);
        self.rows.entry(index).or_insert_with(|| Row::new(index))
    }

    fn push_cell(&mut self, cell: Cell) {
        self.row_mut(cell.row).insert(cell);
    }

    fn push_diagnostic(&mut self, err: XlsError) {
        log::warn!("{err}");
        self.diagnostics.push(err);
    }
}

/// Decode a sheet's substream starting at its BOF.
///
/// Cell records that cannot be decoded are skipped and kept as
/// diagnostics. Seek or read failures of the underlying stream also end
/// the decode and are recorded the same way, so whatever was decoded up to
/// that point is kept.
pub(crate) fn materialize<R: Read + Seek>(
    stream: R,
    offset: u64,
    decoder: &StringDecoder,
) -> SheetData {
    let mut data = SheetData::default();
    if let Err(err) = decode_records(stream, offset, decoder, &mut data) {
        data.push_diagnostic(err);
    }
    log::debug!(
        "materialized sheet at offset {offset}: {} rows, max row {}",
        data.rows.len(),
        data.max_row
    );
    data
}

fn decode_records<R: Read + Seek>(
    stream: R,
    offset: u64,
    decoder: &StringDecoder,
    data: &mut SheetData,
) -> XlsResult<()> {
    let mut reader = RecordReader::at(stream, offset)?;
    // FORMULA position waiting for its cached STRING
    let mut pending_formula: Option<(u16, u16, u16)> = None;
    let mut depth = 0usize;

    while let Some(rec) = reader.next_record()? {
        if let Some(err) = rec.truncation() {
            data.push_diagnostic(err);
        }

        let parsed = match rec.tag {
            records::BOF => {
                depth += 1;
                None
            }
            records::EOF => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
                None
            }
            // embedded substreams (charts) carry nothing for this grid
            _ if depth > 1 => None,
            records::ROW => {
                register_row(&rec.data, data);
                None
            }
            records::STRING => {
                if let Some((row, first_col, xf)) = pending_formula.take() {
                    match cell::parse_string(&rec.data, decoder) {
                        Ok(text) => data.push_cell(Cell {
                            row,
                            first_col,
                            kind: CellKind::FormulaCachedString { xf, text },
                        }),
                        Err(err) => data.push_diagnostic(err),
                    }
                }
                None
            }
            records::FORMULA => match cell::parse_formula(&rec.data) {
                Ok((cell, string_follows)) => {
                    pending_formula = match (&cell.kind, string_follows) {
                        (CellKind::Formula { xf, .. }, true) => Some((cell.row, cell.first_col, *xf)),
                        _ => None,
                    };
                    Some(Ok(cell))
                }
                Err(err) => Some(Err(err)),
            },
            records::NUMBER => Some(cell::parse_number(&rec.data)),
            records::RK => Some(cell::parse_rk(&rec.data)),
            records::MULRK => Some(cell::parse_mulrk(&rec.data)),
            records::BLANK => Some(cell::parse_blank(&rec.data)),
            records::MULBLANK => Some(cell::parse_mulblank(&rec.data)),
            records::LABELSST => Some(cell::parse_labelsst(&rec.data)),
            records::LABEL | records::RSTRING => Some(cell::parse_label(&rec.data, decoder)),
            records::BOOLERR => Some(cell::parse_boolerr(&rec.data)),
            _ => None,
        };

        if rec.tag != records::FORMULA && rec.tag != records::STRING && parsed.is_some() {
            pending_formula = None;
        }

        match parsed {
            Some(Ok(cell)) => data.push_cell(cell),
            Some(Err(err)) => data.push_diagnostic(err),
            None => {}
        }
    }
    Ok(())
}

/// ROW: row(2) + first_col(2) + last_col_plus1(2) + ...
fn register_row(body: &[u8], data: &mut SheetData) {
    let mut off = 0;
    let Ok(index) = read_u16(body, &mut off) else {
        return;
    };
    let first = read_u16(body, &mut off).unwrap_or_default();
    let last_plus1 = read_u16(body, &mut off).unwrap_or_default();
    let row = data.row_mut(index);
    if last_plus1 > first {
        row.declared = Some((first, last_plus1 - 1));
    }
}
