//! BIFF (Binary Interchange File Format) record handling.
//!
//! A BIFF stream is a sequence of records, each with a 4-byte header
//! (2 bytes record tag + 2 bytes body length) followed by the body.
//!
//! Unlike a reader that merges CONTINUE bodies into their parent, this
//! module yields every physical record as-is. The shared string table
//! depends on seeing the CONTINUE boundaries, because a string split across
//! them restarts with a fresh flags byte.

pub mod parser;
pub mod records;
pub mod sst;
pub mod strings;

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::error::{XlsError, XlsResult};

/// The two historical format generations we decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BiffVersion {
    /// Excel 5.0/95: 8-bit codepage strings, 16-byte XF records.
    Biff5,
    /// Excel 97-2003: Unicode strings with flags, 20-byte XF records, SST.
    #[default]
    Biff8,
}

impl BiffVersion {
    /// Dialect announced by a BOF `version` field.
    pub fn from_bof_version(version: u16) -> Self {
        if version == records::BIFF8_VERSION {
            BiffVersion::Biff8
        } else {
            BiffVersion::Biff5
        }
    }
}

/// A single physical BIFF record.
#[derive(Debug, Clone)]
pub struct Record {
    /// Record tag (e.g. `records::SST`, `records::NUMBER`).
    pub tag: u16,
    /// Record body bytes. Shorter than `declared_len` when truncated.
    pub data: Vec<u8>,
    /// Body length announced by the header.
    pub declared_len: usize,
    /// Byte offset of this record's header in the stream.
    pub stream_offset: u64,
}

impl Record {
    pub fn is_truncated(&self) -> bool {
        self.data.len() < self.declared_len
    }

    /// The truncation as an error value, if the body is short.
    pub fn truncation(&self) -> Option<XlsError> {
        self.is_truncated().then(|| XlsError::TruncatedRecord {
            tag: self.tag,
            declared: self.declared_len,
            available: self.data.len(),
        })
    }
}

/// Sequential record reader over a seekable byte stream.
///
/// End of stream (including a partial header) ends the sequence without an
/// error. A record whose body is cut short is still yielded, flagged as
/// truncated, and is the last record produced.
pub struct RecordReader<R> {
    inner: R,
    done: bool,
}

impl<R: Read + Seek> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, done: false }
    }

    /// Create a reader positioned at `offset` (e.g. a sheet's BOF).
    pub fn at(mut inner: R, offset: u64) -> XlsResult<Self> {
        inner.seek(SeekFrom::Start(offset))?;
        Ok(Self::new(inner))
    }

    /// Read the next record, or `None` once the stream is exhausted.
    pub fn next_record(&mut self) -> XlsResult<Option<Record>> {
        if self.done {
            return Ok(None);
        }

        let stream_offset = self.inner.stream_position()?;
        let mut header = [0u8; 4];
        match self.inner.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.done = true;
                return Ok(None);
            }
            Err(e) => return Err(XlsError::Io(e)),
        }

        let tag = u16::from_le_bytes([header[0], header[1]]);
        let declared_len = u16::from_le_bytes([header[2], header[3]]) as usize;

        let mut data = Vec::with_capacity(declared_len);
        (&mut self.inner)
            .take(declared_len as u64)
            .read_to_end(&mut data)?;

        let record = Record {
            tag,
            data,
            declared_len,
            stream_offset,
        };

        if record.is_truncated() {
            // A short body on a seekable stream means we hit the end; the
            // next record boundary lies past it.
            log::warn!(
                "record 0x{:04X} at offset {} truncated ({} of {} bytes)",
                tag,
                stream_offset,
                record.data.len(),
                declared_len
            );
            self.done = true;
        } else {
            log::trace!("record 0x{tag:04X} len {declared_len} at {stream_offset}");
        }

        Ok(Some(record))
    }
}

/// Extract the BOF record fields from a record body.
///
/// Returns `(version, substream_type)`; missing fields read as zero.
/// - `version` is `0x0600` for BIFF8, `0x0500` for BIFF5
/// - `substream_type`: 0x0005 = workbook globals, 0x0010 = worksheet, etc.
pub fn parse_bof(data: &[u8]) -> (u16, u16) {
    let mut off = 0;
    let version = parser::read_u16(data, &mut off).unwrap_or_default();
    let dt = parser::read_u16(data, &mut off).unwrap_or_default();
    (version, dt)
}
