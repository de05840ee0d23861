//! Record dispatcher for the workbook-globals substream.
//!
//! SST and its CONTINUE chain are handled here directly because they share
//! the continuation state; every other record goes through a static
//! tag → handler table. Handlers only see the record body and the
//! workbook state they mutate.

use std::io::{Read, Seek};

use crate::biff::parser::read_u16;
use crate::biff::records;
use crate::biff::sst::SstBuilder;
use crate::biff::strings::ContinuationState;
use crate::biff::{parse_bof, BiffVersion, RecordReader};
use crate::date::DateMode;
use crate::error::{XlsError, XlsResult};
use crate::globals::WorkbookGlobals;
use crate::sheet::SheetInfo;
use crate::styles;

/// A state transition for one record kind.
pub(crate) type Handler = fn(&mut WorkbookGlobals, &[u8]);

/// Handler for `tag`, or `None` for records the globals scan ignores.
pub(crate) fn handler_for(tag: u16) -> Option<Handler> {
    match tag {
        records::BOF => Some(handle_bof),
        records::CODEPAGE => Some(handle_codepage),
        records::BOUNDSHEET => Some(handle_boundsheet),
        records::XF => Some(handle_xf),
        records::FONT => Some(handle_font),
        records::FORMAT => Some(handle_format),
        records::DATEMODE => Some(handle_datemode),
        records::WRITEACCESS => Some(handle_writeaccess),
        _ => None,
    }
}

fn handle_bof(globals: &mut WorkbookGlobals, data: &[u8]) {
    let (version, substream) = parse_bof(data);
    globals.version = BiffVersion::from_bof_version(version);
    globals.substream = substream;
    log::debug!(
        "BOF version 0x{version:04X} ({:?}), substream 0x{substream:04X}",
        globals.version
    );
}

fn handle_codepage(globals: &mut WorkbookGlobals, data: &[u8]) {
    let mut off = 0;
    if let Ok(codepage) = read_u16(data, &mut off) {
        globals.set_codepage(codepage);
    }
}

fn handle_boundsheet(globals: &mut WorkbookGlobals, data: &[u8]) {
    let info = SheetInfo::parse(data, &globals.decoder());
    globals.sheets.push(info);
}

fn handle_xf(globals: &mut WorkbookGlobals, data: &[u8]) {
    let xf = styles::parse_xf(data, globals.version);
    globals.xfs.push(xf);
}

fn handle_font(globals: &mut WorkbookGlobals, data: &[u8]) {
    let font = styles::parse_font(data, &globals.decoder());
    globals.fonts.push(font);
}

fn handle_format(globals: &mut WorkbookGlobals, data: &[u8]) {
    let format = styles::parse_format(data, &globals.decoder());
    globals.formats.insert(format.index, format);
}

fn handle_datemode(globals: &mut WorkbookGlobals, data: &[u8]) {
    let mut off = 0;
    let flag = read_u16(data, &mut off).unwrap_or_default();
    globals.date_mode = DateMode::from_flag(flag);
}

fn handle_writeaccess(globals: &mut WorkbookGlobals, data: &[u8]) {
    let decoder = globals.decoder();
    let mut off = 0;
    let name = match globals.version {
        BiffVersion::Biff8 => decoder.read_u16_string(data, &mut off),
        BiffVersion::Biff5 => decoder.read_u8_string(data, &mut off),
    };
    if let Ok(name) = name {
        // the record is padded to a fixed width with spaces
        let name = name.trim_end_matches([' ', '\0']).to_string();
        globals.author = Some(name);
    }
}

/// What the scan loop should do after a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    /// The EOF closing the globals substream was seen.
    Done,
}

/// Cross-record state of the globals scan.
#[derive(Debug, Default)]
pub(crate) struct Dispatcher {
    prev_tag: Option<u16>,
    /// The previous record was an SST or a CONTINUE belonging to it.
    in_sst_chain: bool,
    sst: Option<SstBuilder>,
    state: ContinuationState,
}

impl Dispatcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Index of the next shared string to be filled, once an SST was seen.
    pub(crate) fn pending_sst_index(&self) -> Option<usize> {
        self.sst.as_ref().map(SstBuilder::completed)
    }

    /// Route one record body.
    pub(crate) fn dispatch(&mut self, globals: &mut WorkbookGlobals, tag: u16, data: &[u8]) -> Flow {
        if tag != records::CONTINUE || !self.in_sst_chain {
            self.settle_continuation(globals, tag);
        }

        let flow = match tag {
            records::SST => {
                let builder = SstBuilder::start(data, &globals.decoder(), &mut self.state);
                self.sst = Some(builder);
                self.in_sst_chain = true;
                Flow::Continue
            }
            records::CONTINUE => {
                match self.sst.as_mut() {
                    Some(builder) if self.in_sst_chain => {
                        builder.feed(data, &globals.decoder(), &mut self.state)
                    }
                    _ => log::trace!(
                        "ignoring CONTINUE after 0x{:04X}",
                        self.prev_tag.unwrap_or_default()
                    ),
                }
                Flow::Continue
            }
            records::EOF => {
                self.in_sst_chain = false;
                Flow::Done
            }
            _ => {
                self.in_sst_chain = false;
                if let Some(handler) = handler_for(tag) {
                    handler(globals, data);
                }
                Flow::Continue
            }
        };

        self.prev_tag = Some(tag);
        flow
    }

    /// A string left mid-payload cannot be resumed by anything but a
    /// CONTINUE of the same SST.
    fn settle_continuation(&mut self, globals: &mut WorkbookGlobals, next_tag: u16) {
        if self.state.is_drained() {
            return;
        }
        let index = self.pending_sst_index().unwrap_or_default();
        globals.push_diagnostic(XlsError::SstContinuationDropped { index, next_tag });
        self.state.clear();
        if let Some(builder) = self.sst.as_mut() {
            builder.skip_current();
        }
    }

    /// Move the assembled string table into `globals`.
    pub(crate) fn finish(self, globals: &mut WorkbookGlobals) {
        if let Some(builder) = self.sst {
            if !builder.is_complete() {
                log::warn!(
                    "SST announced {} strings, stream supplied {}",
                    builder.announced(),
                    builder.completed()
                );
            }
            log::debug!("SST holds {} strings", builder.announced());
            globals.sst = builder.into_table();
        }
    }
}

/// Scan the workbook-globals substream into `globals`.
///
/// Stops at the EOF record closing the globals, or cleanly at the end of
/// the stream. Truncated records are dispatched with whatever body they
/// have and recorded as diagnostics.
pub(crate) fn scan_globals<R: Read + Seek>(
    reader: &mut RecordReader<R>,
    globals: &mut WorkbookGlobals,
) -> XlsResult<()> {
    let mut dispatcher = Dispatcher::new();
    while let Some(record) = reader.next_record()? {
        if let Some(err) = record.truncation() {
            globals.push_diagnostic(err);
        }
        if dispatcher.dispatch(globals, record.tag, &record.data) == Flow::Done {
            break;
        }
    }
    dispatcher.finish(globals);
    log::debug!("globals scan found {} sheets", globals.sheets.len());
    Ok(())
}
