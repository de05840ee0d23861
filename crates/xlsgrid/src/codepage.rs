//! Codepage lookup for 8-bit (BIFF5 and compressed) text.
//!
//! The CODEPAGE record names a Windows codepage; BIFF5 strings are stored
//! as raw bytes in that codepage.

use encoding_rs::Encoding;

/// Codepage used when the stream carries no CODEPAGE record.
pub const DEFAULT_CODEPAGE: u16 = 1252;

/// Map a Windows codepage identifier to its `encoding_rs` table.
///
/// Returns `None` for identifiers we have no table for, including 1200
/// (UTF-16LE), which only labels BIFF8 streams and never applies to
/// 8-bit text.
pub fn encoding_for(codepage: u16) -> Option<&'static Encoding> {
    match codepage {
        // 367 is "US-ASCII"; 32769 is the legacy Excel alias for ANSI Latin I
        367 | 1252 | 32769 => Some(encoding_rs::WINDOWS_1252),
        437 | 866 => Some(encoding_rs::IBM866),
        874 => Some(encoding_rs::WINDOWS_874),
        932 => Some(encoding_rs::SHIFT_JIS),
        936 => Some(encoding_rs::GBK),
        949 => Some(encoding_rs::EUC_KR),
        950 => Some(encoding_rs::BIG5),
        1250 => Some(encoding_rs::WINDOWS_1250),
        1251 => Some(encoding_rs::WINDOWS_1251),
        1253 => Some(encoding_rs::WINDOWS_1253),
        1254 => Some(encoding_rs::WINDOWS_1254),
        1255 => Some(encoding_rs::WINDOWS_1255),
        1256 => Some(encoding_rs::WINDOWS_1256),
        1257 => Some(encoding_rs::WINDOWS_1257),
        1258 => Some(encoding_rs::WINDOWS_1258),
        10000 | 32768 => Some(encoding_rs::MACINTOSH),
        10007 => Some(encoding_rs::X_MAC_CYRILLIC),
        20866 => Some(encoding_rs::KOI8_R),
        21866 => Some(encoding_rs::KOI8_U),
        28591 => Some(encoding_rs::WINDOWS_1252),
        28592 => Some(encoding_rs::ISO_8859_2),
        28595 => Some(encoding_rs::ISO_8859_5),
        65001 => Some(encoding_rs::UTF_8),
        _ => None,
    }
}

/// Resolve `codepage`, falling back to `fallback` and then to Windows-1252.
pub fn resolve(codepage: Option<u16>, fallback: u16) -> &'static Encoding {
    codepage
        .and_then(encoding_for)
        .or_else(|| encoding_for(fallback))
        .unwrap_or(encoding_rs::WINDOWS_1252)
}

/// Decode 8-bit text through `encoding`.
#[inline]
pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> String {
    encoding.decode_without_bom_handling(bytes).0.into_owned()
}
