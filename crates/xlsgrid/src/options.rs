//! Read options

use crate::codepage::DEFAULT_CODEPAGE;

/// Options for opening a workbook
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReadOptions {
    /// Codepage for 8-bit text when the workbook names none, or names one
    /// without a known table (default: 1252)
    pub fallback_codepage: u16,
    /// strftime pattern for date-formatted cells (default: `%d.%m.%Y`)
    pub date_format: String,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            fallback_codepage: DEFAULT_CODEPAGE,
            date_format: "%d.%m.%Y".to_string(),
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback_codepage(mut self, codepage: u16) -> Self {
        self.fallback_codepage = codepage;
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }
}
