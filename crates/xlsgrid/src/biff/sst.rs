//! Shared String Table assembly.
//!
//! The SST body starts with:
//! - `total_strings` (4 bytes, u32) - total string refs in workbook
//! - `unique_strings` (4 bytes, u32) - number of entries in this table
//! - Then `unique_strings` string entries, each with a 2-byte char count
//!
//! Entries routinely spill into one or more CONTINUE records. The builder
//! keeps a write cursor that only advances once an entry is complete; an
//! interrupted entry stays at the cursor and is finished by the next feed.

use super::parser::{read_u16, read_u32};
use super::strings::{ContinuationState, StringDecoder};
use crate::error::{XlsError, XlsResult};

#[derive(Debug, Default)]
pub struct SstBuilder {
    /// Entries decoded so far. Slots past the end read as empty strings.
    strings: Vec<String>,
    /// Size announced by the SST header.
    announced: usize,
    /// Next unfilled index.
    next: usize,
}

impl SstBuilder {
    /// Start a table from an SST record body, decoding the entries that fit.
    pub fn start(data: &[u8], decoder: &StringDecoder, state: &mut ContinuationState) -> Self {
        let mut off = 0;
        let _total_refs = read_u32(data, &mut off).unwrap_or_default();
        let announced = read_u32(data, &mut off).unwrap_or_default() as usize;
        log::debug!("SST announces {announced} strings");

        let mut builder = Self {
            // The header is untrusted; grow on demand instead of reserving it.
            strings: Vec::new(),
            announced,
            next: 0,
        };
        state.clear();
        builder.feed_from(data, off, decoder, state);
        builder
    }

    /// Resume decoding with the body of a CONTINUE record.
    pub fn feed(&mut self, data: &[u8], decoder: &StringDecoder, state: &mut ContinuationState) {
        self.feed_from(data, 0, decoder, state);
    }

    fn feed_from(
        &mut self,
        data: &[u8],
        mut off: usize,
        decoder: &StringDecoder,
        state: &mut ContinuationState,
    ) {
        while self.next < self.announced {
            let piece = if state.is_drained() {
                let Ok(char_count) = read_u16(data, &mut off) else {
                    break;
                };
                decoder.decode(data, &mut off, char_count, state)
            } else {
                decoder.resume(data, &mut off, state)
            };

            if self.strings.len() <= self.next {
                self.strings.resize_with(self.next + 1, String::new);
            }
            self.strings[self.next].push_str(&piece);

            if !state.is_drained() {
                break;
            }
            self.next += 1;
        }
    }

    /// Give up on the entry at the cursor, keeping what was decoded of it.
    pub fn skip_current(&mut self) {
        if self.next < self.announced {
            self.next += 1;
        }
    }

    /// Number of entries fully decoded.
    pub fn completed(&self) -> usize {
        self.next
    }

    /// Number of entries announced by the SST header.
    pub fn announced(&self) -> usize {
        self.announced
    }

    pub fn is_complete(&self) -> bool {
        self.next >= self.announced
    }

    /// Resolve an index against the announced table size.
    pub fn get(&self, index: usize) -> XlsResult<&str> {
        if index >= self.announced {
            return Err(XlsError::SstIndexOutOfRange {
                index,
                len: self.announced,
            });
        }
        Ok(self.strings.get(index).map(String::as_str).unwrap_or(""))
    }

    /// Finish into a fixed-size table of exactly `announced` entries.
    pub fn into_table(self) -> SharedStrings {
        SharedStrings {
            strings: self.strings,
            len: self.announced,
        }
    }
}

/// The finished workbook-wide string table.
#[derive(Debug, Clone, Default)]
pub struct SharedStrings {
    strings: Vec<String>,
    len: usize,
}

impl SharedStrings {
    /// Announced table size.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Look up an entry. Entries the stream never supplied are empty.
    pub fn get(&self, index: usize) -> XlsResult<&str> {
        if index >= self.len {
            return Err(XlsError::SstIndexOutOfRange {
                index,
                len: self.len,
            });
        }
        Ok(self.strings.get(index).map(String::as_str).unwrap_or(""))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        (0..self.len).map(move |i| self.strings.get(i).map(String::as_str).unwrap_or(""))
    }
}
