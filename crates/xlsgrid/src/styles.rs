//! Style record parsing: FONT, FORMAT and XF.
//!
//! Only the number-format index of an XF drives rendering; the remaining
//! fields are carried as inert metadata. Style records are parsed leniently:
//! a field the body is too short to supply reads as zero.

use crate::biff::parser::{read_u16, read_u32, read_u8};
use crate::biff::strings::StringDecoder;
use crate::biff::BiffVersion;

/// First format index available to user-defined FORMAT records.
pub const FIRST_CUSTOM_FORMAT: u16 = 164;

// ============================================================================
// Records
// ============================================================================

/// A FONT record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Font {
    /// Height in twips (1/20 pt).
    pub height_twips: u16,
    pub italic: bool,
    pub strikethrough: bool,
    pub color_index: u16,
    /// 400 = normal, 700 = bold.
    pub weight: u16,
    /// 0 = none, 1 = superscript, 2 = subscript.
    pub escapement: u16,
    pub underline: u8,
    pub family: u8,
    pub charset: u8,
    pub name: String,
}

impl Font {
    pub fn is_bold(&self) -> bool {
        self.weight >= 700
    }
}

/// A user-defined number format from a FORMAT record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Format {
    pub index: u16,
    pub pattern: String,
}

/// An XF (extended format) record, laid out per dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Xf {
    /// 16-byte BIFF5 layout.
    Biff5 {
        font: u16,
        format: u16,
        kind: u16,
        align: u16,
        color: u16,
        fill: u16,
        border: u16,
        line_style: u16,
    },
    /// 20-byte BIFF8 layout.
    Biff8 {
        font: u16,
        format: u16,
        kind: u16,
        align: u8,
        rotation: u8,
        indent: u8,
        used_attribs: u8,
        line_style: u32,
        line_color: u32,
        ground_color: u16,
    },
}

impl Xf {
    /// Number-format index this style selects.
    pub fn format_index(&self) -> u16 {
        match *self {
            Xf::Biff5 { format, .. } | Xf::Biff8 { format, .. } => format,
        }
    }

    pub fn font_index(&self) -> u16 {
        match *self {
            Xf::Biff5 { font, .. } | Xf::Biff8 { font, .. } => font,
        }
    }
}

// ============================================================================
// Record parsers
// ============================================================================

/// Parse a FONT record (0x0031).
///
/// Layout:
///   0  u16  dyHeight   - font height in twips
///   2  u16  grbit      - bit 1 = italic, bit 3 = strikethrough
///   4  u16  icv        - color index
///   6  u16  bls        - weight
///   8  u16  sss        - super/subscript
///  10  u8   uls        - underline type
///  11  u8   bFamily
///  12  u8   bCharSet
///  13  u8   reserved
///  14  ...  font name  - 1-byte length prefix
pub(crate) fn parse_font(data: &[u8], decoder: &StringDecoder) -> Font {
    let mut off = 0;
    let height_twips = read_u16(data, &mut off).unwrap_or_default();
    let grbit = read_u16(data, &mut off).unwrap_or_default();
    let color_index = read_u16(data, &mut off).unwrap_or_default();
    let weight = read_u16(data, &mut off).unwrap_or_default();
    let escapement = read_u16(data, &mut off).unwrap_or_default();
    let underline = read_u8(data, &mut off).unwrap_or_default();
    let family = read_u8(data, &mut off).unwrap_or_default();
    let charset = read_u8(data, &mut off).unwrap_or_default();
    let _reserved = read_u8(data, &mut off);

    let name = decoder.read_u8_string(data, &mut off).unwrap_or_default();

    Font {
        height_twips,
        italic: grbit & 0x0002 != 0,
        strikethrough: grbit & 0x0008 != 0,
        color_index,
        weight,
        escapement,
        underline,
        family,
        charset,
        name,
    }
}

/// Parse a FORMAT record (0x041E).
///
/// BIFF8 carries a 2-byte-length unicode string after the index, BIFF5 a
/// 1-byte-length codepage string.
pub(crate) fn parse_format(data: &[u8], decoder: &StringDecoder) -> Format {
    let mut off = 0;
    let index = read_u16(data, &mut off).unwrap_or_default();
    let pattern = match decoder.version() {
        BiffVersion::Biff8 => decoder.read_u16_string(data, &mut off),
        BiffVersion::Biff5 => decoder.read_u8_string(data, &mut off),
    }
    .unwrap_or_default();
    Format { index, pattern }
}

/// Parse an XF record (0x00E0) in the given dialect.
pub(crate) fn parse_xf(data: &[u8], version: BiffVersion) -> Xf {
    let mut off = 0;
    let u16_at = |off: &mut usize| read_u16(data, off).unwrap_or_default();
    let font = u16_at(&mut off);
    let format = u16_at(&mut off);
    let kind = u16_at(&mut off);

    match version {
        BiffVersion::Biff5 => Xf::Biff5 {
            font,
            format,
            kind,
            align: u16_at(&mut off),
            color: u16_at(&mut off),
            fill: u16_at(&mut off),
            border: u16_at(&mut off),
            line_style: u16_at(&mut off),
        },
        BiffVersion::Biff8 => {
            let byte = |off: &mut usize| read_u8(data, off).unwrap_or_default();
            let align = byte(&mut off);
            let rotation = byte(&mut off);
            let indent = byte(&mut off);
            let used_attribs = byte(&mut off);
            let line_style = read_u32(data, &mut off).unwrap_or_default();
            let line_color = read_u32(data, &mut off).unwrap_or_default();
            let ground_color = read_u16(data, &mut off).unwrap_or_default();
            Xf::Biff8 {
                font,
                format,
                kind,
                align,
                rotation,
                indent,
                used_attribs,
                line_style,
                line_color,
                ground_color,
            }
        }
    }
}

// ============================================================================
// Number format classification
// ============================================================================

/// How a numeric cell should be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormatKind {
    Numeric,
    Date,
}

/// Built-in format indices that display a date or time.
pub fn is_builtin_date_format(index: u16) -> bool {
    matches!(index, 14..=17 | 22 | 27..=36 | 50..=58)
}

/// Tokens that mark a custom pattern as a date even if it also looks numeric.
const DATE_TOKENS: [&str; 6] = ["m/y", "d/y", "m.y", "d.y", "h:", "д.г"];

/// Whether a lowercased custom pattern renders as a plain number.
pub fn is_numeric_pattern(pattern: &str) -> bool {
    let looks_numeric = pattern == "general" || pattern.contains('#') || pattern.contains(".00");
    looks_numeric && !DATE_TOKENS.iter().any(|t| pattern.contains(t))
}

/// Classify a number-format index, consulting `custom` for user formats.
///
/// A user-defined index with no FORMAT record is numeric.
pub fn classify(index: u16, custom: Option<&Format>) -> NumberFormatKind {
    if index >= FIRST_CUSTOM_FORMAT {
        return match custom {
            Some(f) if !is_numeric_pattern(&f.pattern.to_lowercase()) => NumberFormatKind::Date,
            _ => NumberFormatKind::Numeric,
        };
    }
    if is_builtin_date_format(index) {
        NumberFormatKind::Date
    } else {
        NumberFormatKind::Numeric
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn biff8() -> StringDecoder {
        StringDecoder::new(BiffVersion::Biff8, encoding_rs::WINDOWS_1252)
    }

    fn format(index: u16, pattern: &str) -> Format {
        Format {
            index,
            pattern: pattern.to_string(),
        }
    }

    #[test]
    fn test_parse_font() {
        let mut data = Vec::new();
        data.extend_from_slice(&220u16.to_le_bytes()); // 11pt
        data.extend_from_slice(&0x0002u16.to_le_bytes()); // italic
        data.extend_from_slice(&0x7FFFu16.to_le_bytes());
        data.extend_from_slice(&700u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&[1, 0, 0, 0]);
        data.extend_from_slice(&[5, 0x00]);
        data.extend_from_slice(b"Arial");

        let font = parse_font(&data, &biff8());
        assert_eq!(font.height_twips, 220);
        assert!(font.italic);
        assert!(!font.strikethrough);
        assert!(font.is_bold());
        assert_eq!(font.underline, 1);
        assert_eq!(font.name, "Arial");
    }

    #[test]
    fn test_parse_font_biff5_codepage_name() {
        let mut data = vec![0u8; 14];
        data.extend_from_slice(&[5, 0xD2, 0xE0, 0xE9, 0xEC, 0xF1]);
        let dec = StringDecoder::new(BiffVersion::Biff5, encoding_rs::WINDOWS_1251);
        assert_eq!(parse_font(&data, &dec).name, "Таймс");
    }

    #[test]
    fn test_parse_format_both_dialects() {
        let mut data = Vec::new();
        data.extend_from_slice(&164u16.to_le_bytes());
        data.extend_from_slice(&10u16.to_le_bytes());
        data.push(0x00);
        data.extend_from_slice(b"dd/mm/yyyy");
        assert_eq!(parse_format(&data, &biff8()), format(164, "dd/mm/yyyy"));

        let mut data = Vec::new();
        data.extend_from_slice(&165u16.to_le_bytes());
        data.push(4);
        data.extend_from_slice(b"0.00");
        let dec = StringDecoder::new(BiffVersion::Biff5, encoding_rs::WINDOWS_1252);
        assert_eq!(parse_format(&data, &dec), format(165, "0.00"));
    }

    #[test]
    fn test_parse_xf_layouts() {
        let mut data = Vec::new();
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(&14u16.to_le_bytes());
        data.extend_from_slice(&[0u8; 16]);
        let xf = parse_xf(&data, BiffVersion::Biff8);
        assert!(matches!(xf, Xf::Biff8 { .. }));
        assert_eq!(xf.font_index(), 3);
        assert_eq!(xf.format_index(), 14);

        let xf = parse_xf(&data[..16], BiffVersion::Biff5);
        assert!(matches!(xf, Xf::Biff5 { .. }));
        assert_eq!(xf.format_index(), 14);
    }

    #[test]
    fn test_parse_xf_short_body_defaults() {
        let xf = parse_xf(&[0x01, 0x00, 0xA4], BiffVersion::Biff8);
        assert_eq!(xf.font_index(), 1);
        assert_eq!(xf.format_index(), 0);
    }

    #[test]
    fn test_builtin_date_formats() {
        for id in [14, 15, 16, 17, 22, 27, 36, 50, 58] {
            assert!(is_builtin_date_format(id), "{id}");
        }
        for id in [0, 1, 2, 13, 18, 21, 23, 26, 37, 49, 59, 163] {
            assert!(!is_builtin_date_format(id), "{id}");
        }
    }

    #[test]
    fn test_numeric_pattern_heuristic() {
        assert!(is_numeric_pattern("general"));
        assert!(is_numeric_pattern("#,##0"));
        assert!(is_numeric_pattern("0.00"));
        assert!(!is_numeric_pattern("dd/mm/yyyy"));
        assert!(!is_numeric_pattern("0"));
        // digit placeholder next to a date token still reads as a date
        assert!(!is_numeric_pattern("#d.yy"));
        assert!(!is_numeric_pattern("#,##0 h:mm"));
        assert!(!is_numeric_pattern("#дд.гг"));
    }

    #[test]
    fn test_classify() {
        let date = format(164, "DD/MM/YYYY");
        let money = format(165, "#,##0.00");
        assert_eq!(classify(164, Some(&date)), NumberFormatKind::Date);
        assert_eq!(classify(165, Some(&money)), NumberFormatKind::Numeric);
        assert_eq!(classify(170, None), NumberFormatKind::Numeric);
        assert_eq!(classify(14, None), NumberFormatKind::Date);
        assert_eq!(classify(2, None), NumberFormatKind::Numeric);
    }
}
