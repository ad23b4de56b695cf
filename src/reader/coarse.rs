//! Coarse streaming reader over quick-xml
//!
//! quick-xml does the well-formedness work (tag matching, attribute syntax,
//! duplicate attributes). It only reports byte offsets between events, which
//! is what makes its positions "coarse".

use super::events::{CoarseEvent, CoarseKind, CoarseTag};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// A syntax error reported by the streaming parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoarseError {
    pub message: String,
    /// Byte offset into the source text
    pub offset: usize,
}

/// Pull reader producing [`CoarseEvent`]s
pub struct CoarseReader<'a> {
    reader: Reader<&'a [u8]>,
    finished: bool,
}

impl<'a> CoarseReader<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        let config = reader.config_mut();
        config.trim_text_start = false;
        config.trim_text_end = false;
        config.check_end_names = true;
        CoarseReader {
            reader,
            finished: false,
        }
    }

    /// Read the next event, or `None` at end of input
    pub fn next_event(&mut self) -> Result<Option<CoarseEvent>, CoarseError> {
        if self.finished {
            return Ok(None);
        }

        // Capture position before reading the event
        let start = self.reader.buffer_position() as usize;
        let event = match self.reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                self.finished = true;
                return Err(CoarseError {
                    message: err.to_string(),
                    offset: self.reader.error_position() as usize,
                });
            }
        };
        let end = self.reader.buffer_position() as usize;

        let kind = match event {
            Event::Start(e) => CoarseKind::Start(coarse_tag(&e, start)?),
            Event::Empty(e) => CoarseKind::Empty(coarse_tag(&e, start)?),
            Event::End(e) => CoarseKind::End {
                name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            },
            Event::Text(_) => CoarseKind::Text,
            Event::CData(_) => CoarseKind::CData,
            Event::Comment(_) => CoarseKind::Comment,
            Event::DocType(_) => CoarseKind::DocType,
            Event::PI(_) => CoarseKind::ProcessingInstruction,
            Event::Decl(_) => CoarseKind::Declaration,
            Event::Eof => {
                self.finished = true;
                return Ok(None);
            }
        };

        Ok(Some(CoarseEvent::new(kind, start..end)))
    }

    /// Byte offset the reader has consumed up to
    pub fn offset(&self) -> usize {
        self.reader.buffer_position() as usize
    }
}

fn coarse_tag(e: &BytesStart<'_>, start: usize) -> Result<CoarseTag, CoarseError> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| CoarseError {
            message: err.to_string(),
            offset: start,
        })?;
        attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            String::from_utf8_lossy(&attr.value).into_owned(),
        ));
    }
    Ok(CoarseTag {
        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        attributes,
    })
}
