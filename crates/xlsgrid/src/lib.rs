//! # xlsgrid
//!
//! Reader for the legacy Excel binary format (.xls, BIFF5 and BIFF8).
//!
//! Opens the `Workbook` (or `Book`) stream of a compound document, decodes
//! the workbook globals (styles, number formats, shared strings, sheet
//! directory) and renders sheet cells to display strings on demand.
//!
//! ```no_run
//! use xlsgrid::Workbook;
//!
//! let wb = Workbook::open("report.xls")?;
//! let sheet = wb.first_sheet()?;
//! if let Some(row) = sheet.row(0) {
//!     println!("{}", row.cell(0)?);
//! }
//! # Ok::<(), xlsgrid::XlsError>(())
//! ```

pub mod biff;
pub mod cell;
pub mod codepage;
pub mod date;
mod dispatch;
pub mod error;
pub mod globals;
pub mod options;
pub mod rk;
pub mod sheet;
pub mod styles;
pub mod workbook;


pub use biff::BiffVersion;
pub use cell::{Cell, CellKind};
pub use date::DateMode;
pub use error::{XlsError, XlsResult};
pub use options::ReadOptions;
pub use sheet::{SheetInfo, SheetKind, SheetVisibility};
pub use workbook::{RowRef, Workbook, Worksheet};
