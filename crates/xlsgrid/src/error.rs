//! XLS error types

use thiserror::Error;

/// Result type for XLS operations
pub type XlsResult<T> = std::result::Result<T, XlsError>;

/// Errors that can occur while decoding an XLS workbook.
///
/// Only the container/stream variants are ever returned from the `open`
/// family. Per-record problems are absorbed during the scan and kept as
/// diagnostics (see [`crate::Workbook::diagnostics`]).
#[derive(Debug, Error)]
pub enum XlsError {
    /// The input is not a readable compound document
    #[error("cannot open compound document: {0}")]
    Container(#[source] std::io::Error),

    /// Neither a `Workbook` nor a `Book` stream exists in the container
    #[error("no Workbook or Book stream found in compound document")]
    WorkbookStreamMissing,

    /// IO error while reading or seeking the workbook stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A record body is shorter than its header declares
    #[error("record 0x{tag:04X} truncated: declared {declared} bytes, got {available}")]
    TruncatedRecord {
        tag: u16,
        declared: usize,
        available: usize,
    },

    /// A field read ran past the end of a record body
    #[error("unexpected end of data at offset {offset}, need {needed} bytes")]
    UnexpectedEnd { offset: usize, needed: usize },

    /// A shared-string reference is outside the announced table size
    #[error("shared string index {index} out of range (table size {len})")]
    SstIndexOutOfRange { index: usize, len: usize },

    /// A shared string was still owed characters when a record other than
    /// CONTINUE arrived; the partial text is kept
    #[error("shared string {index} left incomplete before record 0x{next_tag:04X}")]
    SstContinuationDropped { index: usize, next_tag: u16 },

    /// A recognised cell record whose shape we cannot decode
    #[error("unsupported cell encoding in record 0x{tag:04X}: {reason}")]
    UnsupportedCellEncoding { tag: u16, reason: String },

    /// A packed number holds an integer where a float was requested
    #[error("packed number is an integer, not a float")]
    IsIntegerNotFloat,

    /// Sheet index out of bounds
    #[error("sheet index {index} out of bounds (count: {count})")]
    SheetOutOfBounds { index: usize, count: usize },

    /// Sheet not found by name
    #[error("sheet not found: {0}")]
    SheetNotFound(String),
}
