//! Workbook-wide state populated by the globals scan.

use std::collections::HashMap;

use encoding_rs::Encoding;

use crate::biff::sst::SharedStrings;
use crate::biff::strings::StringDecoder;
use crate::biff::BiffVersion;
use crate::codepage;
use crate::date::DateMode;
use crate::error::XlsError;
use crate::sheet::SheetInfo;
use crate::styles::{self, Font, Format, NumberFormatKind, Xf};

/// Everything the workbook-globals substream declares.
///
/// Filled monotonically during a single scan; nothing is removed afterwards.
#[derive(Debug)]
pub struct WorkbookGlobals {
    pub(crate) version: BiffVersion,
    /// BOF substream type of the globals (0x0005 for a workbook).
    pub(crate) substream: u16,
    pub(crate) codepage: Option<u16>,
    pub(crate) fallback_codepage: u16,
    pub(crate) encoding: &'static Encoding,
    pub(crate) date_mode: DateMode,
    pub(crate) xfs: Vec<Xf>,
    pub(crate) fonts: Vec<Font>,
    pub(crate) formats: HashMap<u16, Format>,
    pub(crate) sst: SharedStrings,
    pub(crate) sheets: Vec<SheetInfo>,
    pub(crate) author: Option<String>,
    pub(crate) diagnostics: Vec<XlsError>,
}

impl WorkbookGlobals {
    pub(crate) fn new(fallback_codepage: u16) -> Self {
        Self {
            version: BiffVersion::default(),
            substream: 0,
            codepage: None,
            fallback_codepage,
            encoding: codepage::resolve(None, fallback_codepage),
            date_mode: DateMode::default(),
            xfs: Vec::new(),
            fonts: Vec::new(),
            formats: HashMap::new(),
            sst: SharedStrings::default(),
            sheets: Vec::new(),
            author: None,
            diagnostics: Vec::new(),
        }
    }

    /// String decoder for the current dialect and codepage.
    pub(crate) fn decoder(&self) -> StringDecoder {
        StringDecoder::new(self.version, self.encoding)
    }

    pub(crate) fn set_codepage(&mut self, codepage: u16) {
        self.codepage = Some(codepage);
        self.encoding = codepage::resolve(Some(codepage), self.fallback_codepage);
    }

    /// How numbers styled with XF `xf_index` should render.
    ///
    /// An index past the style table renders as a plain number.
    pub(crate) fn number_format_kind(&self, xf_index: u16) -> NumberFormatKind {
        match self.xfs.get(xf_index as usize) {
            Some(xf) => {
                let index = xf.format_index();
                styles::classify(index, self.formats.get(&index))
            }
            None => NumberFormatKind::Numeric,
        }
    }

    pub(crate) fn push_diagnostic(&mut self, err: XlsError) {
        log::warn!("{err}");
        self.diagnostics.push(err);
    }
}
