//! BIFF string decoding.
//!
//! BIFF8 strings have a complex encoding:
//! - Header: char_count (1 or 2 bytes, read by the caller) + flags (1 byte)
//! - Flags bit 0 (`fHighByte`): 0 = compressed Latin-1, 1 = uncompressed UTF-16LE
//! - Flags bit 2 (`fExtSt`): extended string data follows (Asian phonetic)
//! - Flags bit 3 (`fRichSt`): rich text run array follows
//! - If fRichSt: 2-byte run count follows the flags
//! - If fExtSt: 4-byte extended data size follows
//! - Then the character data
//! - Then the rich text runs (4 bytes each) if fRichSt
//! - Then the extended data if fExtSt
//!
//! BIFF5 strings are a flat byte run in the workbook's codepage.
//!
//! In SST records a string can be cut at a record boundary anywhere in its
//! character data, run array or extended data. What is still owed is kept
//! in a [`ContinuationState`]; the next CONTINUE body picks it up. When the
//! cut falls inside the character data, the continuation starts with a new
//! flags byte that may switch between compressed and wide characters.

use encoding_rs::Encoding;

use super::parser::{read_u16, read_u32, read_u8, remaining};
use super::BiffVersion;
use crate::codepage;
use crate::error::XlsResult;

const FLAG_WIDE: u8 = 0x01;
const FLAG_PHONETIC: u8 = 0x04;
const FLAG_RICH: u8 = 0x08;

/// Payload still owed by a string that ran off the end of a record body.
///
/// Must be fully drained before any record other than a CONTINUE of the
/// same SST is processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContinuationState {
    /// Character units still to be read.
    pub pending_chars: u16,
    /// Rich-text run bytes still to be skipped.
    pub pending_rich_bytes: u32,
    /// Phonetic (extended string) bytes still to be skipped.
    pub pending_phonetic: u32,
    /// High surrogate that ended the previous body, waiting for its pair.
    pub held_surrogate: Option<u16>,
}

impl ContinuationState {
    pub fn is_drained(&self) -> bool {
        *self == Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Dialect- and codepage-aware string decoder.
#[derive(Debug, Clone, Copy)]
pub struct StringDecoder {
    version: BiffVersion,
    encoding: &'static Encoding,
}

impl StringDecoder {
    pub fn new(version: BiffVersion, encoding: &'static Encoding) -> Self {
        Self { version, encoding }
    }

    pub fn version(&self) -> BiffVersion {
        self.version
    }

    fn run_size(&self) -> u32 {
        match self.version {
            BiffVersion::Biff8 => 4,
            BiffVersion::Biff5 => 2,
        }
    }

    /// Decode a string of `char_count` units starting at `offset` (just past
    /// the count field).
    ///
    /// Returns the characters that were available. Anything the body could
    /// not supply is recorded in `state` for [`StringDecoder::resume`].
    pub fn decode(
        &self,
        data: &[u8],
        offset: &mut usize,
        char_count: u16,
        state: &mut ContinuationState,
    ) -> String {
        if self.version == BiffVersion::Biff5 {
            return self.read_chars(data, offset, char_count, false, state);
        }

        let flags = match read_u8(data, offset) {
            Ok(flags) => flags,
            Err(_) => {
                state.pending_chars = char_count;
                return String::new();
            }
        };

        if flags & FLAG_RICH != 0 {
            let runs = read_u16(data, offset).unwrap_or_default();
            state.pending_rich_bytes = state
                .pending_rich_bytes
                .saturating_add(u32::from(runs) * self.run_size());
        }
        if flags & FLAG_PHONETIC != 0 {
            let size = read_u32(data, offset).unwrap_or_default();
            state.pending_phonetic = state.pending_phonetic.saturating_add(size);
        }

        let text = self.read_chars(data, offset, char_count, flags & FLAG_WIDE != 0, state);
        if state.pending_chars == 0 {
            skip_payload(data, offset, state);
        }
        text
    }

    /// Continue a string interrupted at the end of the previous body.
    pub fn resume(&self, data: &[u8], offset: &mut usize, state: &mut ContinuationState) -> String {
        let mut text = String::new();
        if state.pending_chars > 0 {
            let wide = match self.version {
                BiffVersion::Biff5 => false,
                BiffVersion::Biff8 => match read_u8(data, offset) {
                    Ok(flags) => flags & FLAG_WIDE != 0,
                    Err(_) => return text,
                },
            };
            let pending = state.pending_chars;
            text = self.read_chars(data, offset, pending, wide, state);
        }
        if state.pending_chars == 0 {
            skip_payload(data, offset, state);
        }
        text
    }

    /// Read up to `count` character units; shortfall goes to `pending_chars`.
    fn read_chars(
        &self,
        data: &[u8],
        offset: &mut usize,
        count: u16,
        wide: bool,
        state: &mut ContinuationState,
    ) -> String {
        let unit = if wide { 2 } else { 1 };
        let available = remaining(data, *offset) / unit;
        let take = available.min(count as usize);
        let bytes = &data[*offset..*offset + take * unit];
        *offset += take * unit;
        state.pending_chars = count - take as u16;

        if self.version == BiffVersion::Biff5 {
            return codepage::decode(bytes, self.encoding);
        }

        let mut units: Vec<u16> = state.held_surrogate.take().into_iter().collect();
        if wide {
            units.extend(
                bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]])),
            );
        } else {
            units.extend(bytes.iter().map(|&b| u16::from(b)));
        }
        // a pair split by the record boundary is decoded once both halves are in
        if state.pending_chars > 0 && units.last().is_some_and(|u| is_high_surrogate(*u)) {
            state.held_surrogate = units.pop();
        }
        String::from_utf16_lossy(&units)
    }

    /// Read a string that must fit in a single record body, with a
    /// 2-byte length prefix (LABEL, FORMAT, STRING, WRITEACCESS).
    pub fn read_u16_string(&self, data: &[u8], offset: &mut usize) -> XlsResult<String> {
        let char_count = read_u16(data, offset)?;
        Ok(self.read_whole(data, offset, char_count))
    }

    /// Read a string with a 1-byte length prefix (BOUNDSHEET, FONT, BIFF5 FORMAT).
    pub fn read_u8_string(&self, data: &[u8], offset: &mut usize) -> XlsResult<String> {
        let char_count = read_u8(data, offset)? as u16;
        Ok(self.read_whole(data, offset, char_count))
    }

    fn read_whole(&self, data: &[u8], offset: &mut usize, char_count: u16) -> String {
        let mut state = ContinuationState::default();
        let text = self.decode(data, offset, char_count, &mut state);
        if !state.is_drained() {
            log::debug!("string cut short inside a single record: {state:?}");
        }
        text
    }
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..0xDC00).contains(&unit)
}

/// Skip rich-text runs, then phonetic data, as far as the body allows.
fn skip_payload(data: &[u8], offset: &mut usize, state: &mut ContinuationState) {
    let skip = (state.pending_rich_bytes as usize).min(remaining(data, *offset));
    *offset += skip;
    state.pending_rich_bytes -= skip as u32;

    let skip = (state.pending_phonetic as usize).min(remaining(data, *offset));
    *offset += skip;
    state.pending_phonetic -= skip as u32;
}
