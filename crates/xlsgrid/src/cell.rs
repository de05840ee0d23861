//! Cell value model.
//!
//! Every on-disk cell encoding is one [`CellKind`] variant. A cell covers
//! one column, except the MULRK/MULBLANK runs which cover several adjacent
//! columns and render one string per column.

use std::fmt::Write as _;

use crate::biff::parser::{read_bytes, read_f64, read_u16, read_u32, read_u8, remaining};
use crate::biff::records;
use crate::biff::strings::StringDecoder;
use crate::date;
use crate::error::{XlsError, XlsResult};
use crate::globals::WorkbookGlobals;
use crate::rk::{Rk, RkValue};
use crate::styles::NumberFormatKind;

/// Rendered in place of a formula result that is not a cached string.
pub const FORMULA_PLACEHOLDER: &str = "FORMULA";

/// A style index paired with a packed number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XfRk {
    pub xf: u16,
    pub rk: Rk,
}

impl XfRk {
    fn read(data: &[u8], off: &mut usize) -> XlsResult<Self> {
        let xf = read_u16(data, off)?;
        let rk = Rk(read_u32(data, off)?);
        Ok(Self { xf, rk })
    }
}

/// The stored representation of a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellKind {
    /// BLANK: formatting only.
    Blank { xf: u16 },
    /// NUMBER: an IEEE double.
    Number { xf: u16, value: f64 },
    /// RK: a single packed number.
    Rk(XfRk),
    /// MULRK: packed numbers for consecutive columns.
    MulRk(Vec<XfRk>),
    /// MULBLANK: style indices for consecutive blank columns.
    MulBlank(Vec<u16>),
    /// LABELSST: a reference into the shared string table.
    LabelSst { xf: u16, index: u32 },
    /// LABEL or RSTRING: text stored in the cell record.
    Label { xf: u16, text: String },
    /// A formula whose cached result is the text of a STRING record.
    FormulaCachedString { xf: u16, text: String },
    /// A formula with a cached result we do not decode.
    Formula { xf: u16, result: [u8; 8], flags: u16 },
    /// BOOLERR: a boolean or an error code.
    BoolErr { xf: u16, value: u8, is_error: bool },
}

/// One decoded cell record.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row: u16,
    pub first_col: u16,
    pub kind: CellKind,
}

impl Cell {
    /// Last column covered; equals `first_col` except for runs.
    pub fn last_col(&self) -> u16 {
        let span = match &self.kind {
            CellKind::MulRk(values) => values.len(),
            CellKind::MulBlank(xfs) => xfs.len(),
            _ => 1,
        };
        self.first_col
            .saturating_add(span.saturating_sub(1).min(u16::MAX as usize) as u16)
    }

    /// The part of a run covering columns `from..=to`; `None` for single
    /// cells or columns outside the run.
    pub(crate) fn columns(&self, from: u16, to: u16) -> Option<Cell> {
        let start = usize::from(from.checked_sub(self.first_col)?);
        let end = usize::from(to.checked_sub(self.first_col)?);
        let kind = match &self.kind {
            CellKind::MulRk(values) => CellKind::MulRk(values.get(start..=end)?.to_vec()),
            CellKind::MulBlank(xfs) => CellKind::MulBlank(xfs.get(start..=end)?.to_vec()),
            _ => return None,
        };
        Some(Cell {
            row: self.row,
            first_col: from,
            kind,
        })
    }

    /// Record tag this cell was decoded from.
    pub fn tag(&self) -> u16 {
        match self.kind {
            CellKind::Blank { .. } => records::BLANK,
            CellKind::Number { .. } => records::NUMBER,
            CellKind::Rk(_) => records::RK,
            CellKind::MulRk(_) => records::MULRK,
            CellKind::MulBlank(_) => records::MULBLANK,
            CellKind::LabelSst { .. } => records::LABELSST,
            CellKind::Label { .. } => records::LABEL,
            CellKind::FormulaCachedString { .. } => records::STRING,
            CellKind::Formula { .. } => records::FORMULA,
            CellKind::BoolErr { .. } => records::BOOLERR,
        }
    }

    /// Render one display string per covered column.
    ///
    /// Numbers render through their style: a date-classified format goes
    /// through the date converter and `date_format`, anything else renders
    /// as the shortest round-trip decimal.
    ///
    /// This applies to NUMBER cells as well as packed (RK) ones: a NUMBER
    /// whose XF selects a date format renders as a date, where older readers
    /// printed the raw serial.
    pub fn render(&self, globals: &WorkbookGlobals, date_format: &str) -> XlsResult<Vec<String>> {
        let text = match &self.kind {
            CellKind::Blank { .. } => String::new(),
            CellKind::Number { xf, value } => {
                render_number(*xf, RkValue::Float(*value), globals, date_format)
            }
            CellKind::Rk(v) => render_number(v.xf, v.rk.value(), globals, date_format),
            CellKind::MulRk(values) => {
                return Ok(values
                    .iter()
                    .map(|v| render_number(v.xf, v.rk.value(), globals, date_format))
                    .collect());
            }
            CellKind::MulBlank(xfs) => return Ok(vec![String::new(); xfs.len()]),
            CellKind::LabelSst { index, .. } => globals.sst.get(*index as usize)?.to_string(),
            CellKind::Label { text, .. } | CellKind::FormulaCachedString { text, .. } => {
                text.clone()
            }
            CellKind::Formula { .. } => FORMULA_PLACEHOLDER.to_string(),
            CellKind::BoolErr {
                value, is_error, ..
            } => render_boolerr(*value, *is_error).to_string(),
        };
        Ok(vec![text])
    }

    /// Numeric value of a NUMBER or RK cell.
    pub fn number(&self) -> XlsResult<f64> {
        match &self.kind {
            CellKind::Number { value, .. } => Ok(*value),
            CellKind::Rk(v) => Ok(v.rk.value().to_f64()),
            _ => Err(XlsError::UnsupportedCellEncoding {
                tag: self.tag(),
                reason: "cell has no single numeric value".into(),
            }),
        }
    }
}

fn render_number(xf: u16, value: RkValue, globals: &WorkbookGlobals, date_format: &str) -> String {
    if globals.number_format_kind(xf) == NumberFormatKind::Date {
        if let Some(dt) = date::from_serial(value.to_f64(), globals.date_mode) {
            let mut out = String::new();
            // an invalid strftime pattern surfaces as a fmt error
            if write!(out, "{}", dt.format(date_format)).is_ok() {
                return out;
            }
            log::warn!("date format {date_format:?} cannot be rendered");
        }
    }
    value.to_string()
}

fn render_boolerr(value: u8, is_error: bool) -> &'static str {
    if !is_error {
        return if value != 0 { "TRUE" } else { "FALSE" };
    }
    match value {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        _ => "#VALUE!",
    }
}

// ── Cell record parsers ─────────────────────────────────────────────────

/// Common prefix of every cell record: row(2) + col(2).
fn read_position(data: &[u8], off: &mut usize) -> XlsResult<(u16, u16)> {
    let row = read_u16(data, off)?;
    let col = read_u16(data, off)?;
    Ok((row, col))
}

/// BLANK: row(2) + col(2) + xf(2)
pub(crate) fn parse_blank(data: &[u8]) -> XlsResult<Cell> {
    let mut off = 0;
    let (row, first_col) = read_position(data, &mut off)?;
    let xf = read_u16(data, &mut off)?;
    Ok(Cell {
        row,
        first_col,
        kind: CellKind::Blank { xf },
    })
}

/// NUMBER: row(2) + col(2) + xf(2) + value(8)
pub(crate) fn parse_number(data: &[u8]) -> XlsResult<Cell> {
    let mut off = 0;
    let (row, first_col) = read_position(data, &mut off)?;
    let xf = read_u16(data, &mut off)?;
    let value = read_f64(data, &mut off)?;
    Ok(Cell {
        row,
        first_col,
        kind: CellKind::Number { xf, value },
    })
}

/// RK: row(2) + col(2) + xf(2) + rk(4)
pub(crate) fn parse_rk(data: &[u8]) -> XlsResult<Cell> {
    let mut off = 0;
    let (row, first_col) = read_position(data, &mut off)?;
    let value = XfRk::read(data, &mut off)?;
    Ok(Cell {
        row,
        first_col,
        kind: CellKind::Rk(value),
    })
}

/// Validate a run record's trailing last-column field against its body.
///
/// Layout: row(2) + first_col(2) + [item]* + last_col(2)
fn run_length(tag: u16, data: &[u8], first_col: u16, item_size: usize) -> XlsResult<usize> {
    if data.len() < 6 || (data.len() - 6) % item_size != 0 {
        return Err(XlsError::UnsupportedCellEncoding {
            tag,
            reason: format!("body of {} bytes is not a whole run", data.len()),
        });
    }
    let mut tail = data.len() - 2;
    let last_col = read_u16(data, &mut tail)?;
    let count = (data.len() - 6) / item_size;
    if count == 0 || last_col < first_col || (last_col - first_col) as usize + 1 != count {
        return Err(XlsError::UnsupportedCellEncoding {
            tag,
            reason: format!("columns {first_col}..={last_col} do not match {count} entries"),
        });
    }
    Ok(count)
}

/// MULRK: row(2) + first_col(2) + [xf(2) + rk(4)]* + last_col(2)
pub(crate) fn parse_mulrk(data: &[u8]) -> XlsResult<Cell> {
    let mut off = 0;
    let (row, first_col) = read_position(data, &mut off)?;
    let count = run_length(records::MULRK, data, first_col, 6)?;
    let values = (0..count)
        .map(|_| XfRk::read(data, &mut off))
        .collect::<XlsResult<Vec<_>>>()?;
    Ok(Cell {
        row,
        first_col,
        kind: CellKind::MulRk(values),
    })
}

/// MULBLANK: row(2) + first_col(2) + [xf(2)]* + last_col(2)
pub(crate) fn parse_mulblank(data: &[u8]) -> XlsResult<Cell> {
    let mut off = 0;
    let (row, first_col) = read_position(data, &mut off)?;
    let count = run_length(records::MULBLANK, data, first_col, 2)?;
    let xfs = (0..count)
        .map(|_| read_u16(data, &mut off))
        .collect::<XlsResult<Vec<_>>>()?;
    Ok(Cell {
        row,
        first_col,
        kind: CellKind::MulBlank(xfs),
    })
}

/// LABELSST: row(2) + col(2) + xf(2) + sst_index(4)
pub(crate) fn parse_labelsst(data: &[u8]) -> XlsResult<Cell> {
    let mut off = 0;
    let (row, first_col) = read_position(data, &mut off)?;
    let xf = read_u16(data, &mut off)?;
    let index = read_u32(data, &mut off)?;
    Ok(Cell {
        row,
        first_col,
        kind: CellKind::LabelSst { xf, index },
    })
}

/// LABEL / RSTRING: row(2) + col(2) + xf(2) + string (2-byte length).
/// RSTRING's trailing formatting runs are not read.
pub(crate) fn parse_label(data: &[u8], decoder: &StringDecoder) -> XlsResult<Cell> {
    let mut off = 0;
    let (row, first_col) = read_position(data, &mut off)?;
    let xf = read_u16(data, &mut off)?;
    let text = decoder.read_u16_string(data, &mut off)?;
    Ok(Cell {
        row,
        first_col,
        kind: CellKind::Label { xf, text },
    })
}

/// BOOLERR: row(2) + col(2) + xf(2) + value(1) + is_error(1)
pub(crate) fn parse_boolerr(data: &[u8]) -> XlsResult<Cell> {
    let mut off = 0;
    let (row, first_col) = read_position(data, &mut off)?;
    let xf = read_u16(data, &mut off)?;
    let value = read_u8(data, &mut off)?;
    let is_error = read_u8(data, &mut off)? != 0;
    Ok(Cell {
        row,
        first_col,
        kind: CellKind::BoolErr {
            xf,
            value,
            is_error,
        },
    })
}

/// FORMULA: row(2) + col(2) + xf(2) + result(8) + flags(2) + reserved(4) + rgce
///
/// Returns the cell and whether a STRING record with its cached text
/// follows (result bytes 6..8 are 0xFFFF and byte 0 is 0).
pub(crate) fn parse_formula(data: &[u8]) -> XlsResult<(Cell, bool)> {
    let mut off = 0;
    let (row, first_col) = read_position(data, &mut off)?;
    let xf = read_u16(data, &mut off)?;
    let mut result = [0u8; 8];
    result.copy_from_slice(read_bytes(data, &mut off, 8)?);
    let flags = read_u16(data, &mut off)?;
    if remaining(data, off) < 4 {
        log::trace!("FORMULA at ({row}, {first_col}) has no expression bytes");
    }

    let string_follows = result[6] == 0xFF && result[7] == 0xFF && result[0] == 0x00;
    let cell = Cell {
        row,
        first_col,
        kind: CellKind::Formula { xf, result, flags },
    };
    Ok((cell, string_follows))
}

/// STRING: the cached text of the preceding FORMULA (2-byte length).
pub(crate) fn parse_string(data: &[u8], decoder: &StringDecoder) -> XlsResult<String> {
    let mut off = 0;
    decoder.read_u16_string(data, &mut off)
}
