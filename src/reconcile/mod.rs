//! Location Reconciler
//!
//! Drives the coarse reader and, for every event, rescans the source with a
//! [`Cursor`] to recover exact ranges: tag names, attribute names and values,
//! start/end delimiters, and the boundaries of every other construct.
//!
//! One running cursor walks the whole document. Coarse spans only move
//! forward, so each event re-anchors the cursor with `advance_to` and the
//! rescan starts exactly where the event starts.

use crate::core::cursor::{is_name_char, is_xml_whitespace, Cursor, CursorError};
use crate::core::entities::{EntityError, EntityTable};
use crate::core::range::{LocationKind, Position};
use crate::dom::{
    AttributeInput, DocumentBuilder, LocatedDocument, NodeKind, Prolog, PrologAttribute,
};
use crate::error::{ParseError, ResourceResolutionWarning};
use crate::options::ParseOptions;
use crate::reader::{CoarseError, CoarseEvent, CoarseKind, CoarseReader, CoarseTag};
use std::ops::Range as ByteSpan;

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";
const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";
const DOCTYPE_OPEN: &str = "<!DOCTYPE";
const DECL_OPEN: &str = "<?xml";
const PI_CLOSE: &str = "?>";

const PROLOG_ATTRIBUTES: [&str; 3] = ["version", "encoding", "standalone"];

/// Parse decoded source text into a located document
pub(crate) fn reconcile(source: &str, options: &ParseOptions) -> Result<LocatedDocument, ParseError> {
    let mut reader = CoarseReader::new(source);
    let mut reconciler = Reconciler::new(source, &options.entities);

    loop {
        match reader.next_event() {
            Ok(Some(event)) => reconciler.handle(event)?,
            Ok(None) => break,
            Err(err) => return Err(coarse_error(source, err)),
        }
    }

    let document = reconciler.finish()?;
    tracing::debug!(
        nodes = document.node_count(),
        attributes = document.attribute_count(),
        "reconciled document"
    );
    Ok(document)
}

/// An attribute located in the source, value still raw
struct ScannedAttribute<'a> {
    name: Cursor<'a>,
    name_end: Cursor<'a>,
    value: Cursor<'a>,
    value_end: Cursor<'a>,
}

impl<'a> ScannedAttribute<'a> {
    fn name(&self) -> &'a str {
        self.name.slice_to(&self.name_end)
    }

    fn raw_value(&self) -> &'a str {
        self.value.slice_to(&self.value_end)
    }
}

/// Attributes plus the cursor sitting on the tag closer
struct ScannedTag<'a> {
    attributes: Vec<ScannedAttribute<'a>>,
    closer: Cursor<'a>,
    closer_token: &'static str,
}

struct Reconciler<'a> {
    source: &'a str,
    cursor: Cursor<'a>,
    entities: &'a EntityTable,
    builder: DocumentBuilder,
    /// Byte span of the character data run not yet flushed
    pending_text: Option<ByteSpan<usize>>,
    seen_doctype: bool,
}

impl<'a> Reconciler<'a> {
    fn new(source: &'a str, entities: &'a EntityTable) -> Self {
        Reconciler {
            source,
            cursor: Cursor::new(source),
            entities,
            builder: DocumentBuilder::new(),
            pending_text: None,
            seen_doctype: false,
        }
    }

    fn handle(&mut self, event: CoarseEvent) -> Result<(), ParseError> {
        if event.is_text() {
            self.pending_text = Some(match self.pending_text.take() {
                Some(span) => span.start..event.span.end,
                None => event.span,
            });
            return Ok(());
        }

        self.flush_text()?;
        self.advance(event.span.start)?;

        let end = event.span.end;
        match event.kind {
            CoarseKind::Start(tag) => self.element(tag, false),
            CoarseKind::Empty(tag) => self.element(tag, true),
            CoarseKind::End { name } => self.end_tag(&name),
            CoarseKind::CData => self.cdata(end),
            CoarseKind::Comment => self.comment(end),
            CoarseKind::DocType => self.doctype(end),
            CoarseKind::ProcessingInstruction => self.processing_instruction(end),
            CoarseKind::Declaration => self.declaration(end),
            CoarseKind::Text => Ok(()),
        }
    }

    fn finish(mut self) -> Result<LocatedDocument, ParseError> {
        self.flush_text()?;

        if let Some(open) = self.builder.current_element() {
            let position = self
                .builder
                .range(open, LocationKind::Start)
                .map_or(Position::start(), |r| r.start);
            return Err(ParseError::Unterminated {
                construct: "element",
                position,
            });
        }
        if !self.builder.has_root() {
            return Err(ParseError::structure(
                "document has no root element",
                self.cursor.position(),
            ));
        }

        let end = self.cursor.advance_to(self.source.len()).map_err(mismatch("document end", &self.cursor))?;
        Ok(self.builder.finish(self.source, end.position()))
    }

    fn advance(&mut self, offset: usize) -> Result<(), ParseError> {
        self.cursor = self
            .cursor
            .advance_to(offset)
            .map_err(mismatch("event", &self.cursor))?;
        Ok(())
    }

    fn at_document_level(&self) -> bool {
        self.builder.open_elements() == 0
    }

    fn flush_text(&mut self) -> Result<(), ParseError> {
        let Some(span) = self.pending_text.take() else {
            return Ok(());
        };
        self.advance(span.start)?;
        let start = self.cursor;
        let end = start.advance_to(span.end).map_err(mismatch("text", &start))?;
        let raw = start.slice_to(&end);
        self.cursor = end;

        if self.at_document_level() {
            let is_blank = raw
                .trim_start_matches('\u{FEFF}')
                .chars()
                .all(is_xml_whitespace);
            if is_blank {
                return Ok(());
            }
            let at = start.move_while(|c| is_xml_whitespace(c) || c == '\u{FEFF}');
            return Err(ParseError::structure("text outside the root element", at.position()));
        }

        let value = self.decode_text(raw, &start)?;
        self.builder
            .character_data(NodeKind::Text, &value, start.range_to(&end), None);
        Ok(())
    }

    fn element(&mut self, tag: CoarseTag, empty: bool) -> Result<(), ParseError> {
        let open = self.cursor.move_before("<").map_err(mismatch("start tag", &self.cursor))?;
        if self.at_document_level() && self.builder.has_root() {
            return Err(ParseError::structure(
                "document has more than one root element",
                open.position(),
            ));
        }

        let name_start = open.shift(1).map_err(mismatch("start tag", &open))?;
        let name_end = name_start.move_while(is_name_char);
        let name = name_start.slice_to(&name_end);
        if name != tag.name {
            return Err(ParseError::Mismatch {
                construct: "start tag",
                message: format!("expected name '{}', found '{}'", tag.name, name),
                position: name_start.position(),
            });
        }

        let scanned = self.scan_attributes(&open, name_end, &["/>", ">"])?;
        if (scanned.closer_token == "/>") != empty {
            return Err(ParseError::Mismatch {
                construct: "start tag",
                message: format!("unexpected tag closer '{}'", scanned.closer_token),
                position: scanned.closer.position(),
            });
        }
        verify_attributes(&tag, &scanned, &name_start)?;

        let mut attributes = Vec::with_capacity(scanned.attributes.len());
        for attr in &scanned.attributes {
            attributes.push(AttributeInput {
                name: attr.name(),
                value: self.decode_attribute(attr.raw_value(), &attr.value)?,
                name_range: attr.name.range_to(&attr.name_end),
                value_range: attr.value.range_to(&attr.value_end),
            });
        }

        let tag_end = scanned
            .closer
            .shift(scanned.closer_token.len())
            .map_err(mismatch("start tag", &scanned.closer))?;
        let start = open.range_to(&tag_end);
        self.builder
            .start_element(name, name_start.range_to(&name_end), start, attributes)?;
        if empty {
            self.builder.end_element(start);
        }
        self.cursor = tag_end;
        Ok(())
    }

    /// Scan `name="value"` pairs up to one of `closers`
    fn scan_attributes(
        &self,
        open: &Cursor<'a>,
        mut cur: Cursor<'a>,
        closers: &[&'static str],
    ) -> Result<ScannedTag<'a>, ParseError> {
        let mut attributes = Vec::new();
        loop {
            let before_space = cur;
            cur = cur.move_after_whitespaces();

            if let Some(&closer_token) = closers.iter().find(|c| cur.starts_with(c)) {
                return Ok(ScannedTag {
                    attributes,
                    closer: cur,
                    closer_token,
                });
            }
            let Some(c) = cur.peek() else {
                return Err(ParseError::Unterminated {
                    construct: "tag",
                    position: open.position(),
                });
            };
            if cur.offset() == before_space.offset() {
                return Err(ParseError::syntax(
                    format!("expected whitespace before '{c}'"),
                    cur.position(),
                ));
            }

            let name_end = cur.move_while(is_name_char);
            if name_end.offset() == cur.offset() {
                return Err(ParseError::syntax(
                    format!("unexpected character '{c}' in tag"),
                    cur.position(),
                ));
            }

            let eq = name_end.move_after_whitespaces();
            if !eq.starts_with("=") {
                return Err(ParseError::syntax(
                    "expected '=' after attribute name",
                    eq.position(),
                ));
            }
            let quote_at = eq.shift(1).map_err(mismatch("attribute", &eq))?.move_after_whitespaces();
            let quote = match quote_at.peek() {
                Some('"') => "\"",
                Some('\'') => "'",
                _ => {
                    return Err(ParseError::syntax(
                        "expected quoted attribute value",
                        quote_at.position(),
                    ))
                }
            };

            let value = quote_at.shift(1).map_err(mismatch("attribute", &quote_at))?;
            let value_end = value.move_before(quote).map_err(|_| ParseError::Unterminated {
                construct: "attribute value",
                position: value.position(),
            })?;
            if value.has("<", &value_end) {
                let lt = value.move_before("<").map_err(mismatch("attribute", &value))?;
                return Err(ParseError::syntax(
                    "'<' is not allowed in attribute values",
                    lt.position(),
                ));
            }

            attributes.push(ScannedAttribute {
                name: cur,
                name_end,
                value,
                value_end,
            });
            cur = value_end.shift(1).map_err(mismatch("attribute", &value_end))?;
        }
    }

    fn end_tag(&mut self, expected: &str) -> Result<(), ParseError> {
        let open = self.cursor.move_before("</").map_err(mismatch("end tag", &self.cursor))?;
        let name_start = open.shift(2).map_err(mismatch("end tag", &open))?;
        let name_end = name_start.move_while(is_name_char);
        let name = name_start.slice_to(&name_end);

        let current = self.builder.current_element();
        let open_name = current.map_or("", |id| self.builder.element_name(id));
        if name != expected || name != open_name {
            return Err(ParseError::structure(
                format!("end tag '{name}' does not match '{open_name}'"),
                name_start.position(),
            ));
        }

        let close = name_end.move_after_whitespaces();
        if !close.starts_with(">") {
            return Err(ParseError::syntax("expected '>' to close end tag", close.position()));
        }
        let end = close.shift(1).map_err(mismatch("end tag", &close))?;
        self.builder.end_element(open.range_to(&end));
        self.cursor = end;
        Ok(())
    }

    fn cdata(&mut self, span_end: usize) -> Result<(), ParseError> {
        let open = self.cursor.move_before(CDATA_OPEN).map_err(mismatch("CDATA section", &self.cursor))?;
        if self.at_document_level() {
            return Err(ParseError::structure("CDATA section outside the root element", open.position()));
        }
        let body = open.shift(CDATA_OPEN.len()).map_err(mismatch("CDATA section", &open))?;
        let close = body.move_before(CDATA_CLOSE).map_err(|_| ParseError::Unterminated {
            construct: "CDATA section",
            position: open.position(),
        })?;
        let end = close.shift(CDATA_CLOSE.len()).map_err(mismatch("CDATA section", &close))?;
        check_span_end("CDATA section", &end, span_end)?;

        let value = normalize_newlines(body.slice_to(&close));
        self.builder.character_data(
            NodeKind::CData,
            &value,
            open.range_to(&end),
            Some((open.range_to(&body), close.range_to(&end))),
        );
        self.cursor = end;
        Ok(())
    }

    fn comment(&mut self, span_end: usize) -> Result<(), ParseError> {
        let open = self.cursor.move_before(COMMENT_OPEN).map_err(mismatch("comment", &self.cursor))?;
        let body = open.shift(COMMENT_OPEN.len()).map_err(mismatch("comment", &open))?;
        let close = body.move_before(COMMENT_CLOSE).map_err(|_| ParseError::Unterminated {
            construct: "comment",
            position: open.position(),
        })?;
        let end = close.shift(COMMENT_CLOSE.len()).map_err(mismatch("comment", &close))?;
        check_span_end("comment", &end, span_end)?;

        let value = normalize_newlines(body.slice_to(&close));
        self.builder
            .leaf(NodeKind::Comment, "", &value, open.range_to(&end));
        self.cursor = end;
        Ok(())
    }

    fn doctype(&mut self, span_end: usize) -> Result<(), ParseError> {
        let open = self.cursor.move_before("<!").map_err(mismatch("doctype", &self.cursor))?;
        if !open.starts_with(DOCTYPE_OPEN) {
            return Err(ParseError::Mismatch {
                construct: "doctype",
                message: "expected '<!DOCTYPE'".to_string(),
                position: open.position(),
            });
        }
        if self.seen_doctype || self.builder.has_root() {
            return Err(ParseError::structure(
                "DOCTYPE must precede the root element and appear once",
                open.position(),
            ));
        }
        self.seen_doctype = true;

        let end = self.cursor.advance_to(span_end).map_err(mismatch("doctype", &open))?;
        let after_keyword = open.shift(DOCTYPE_OPEN.len()).map_err(mismatch("doctype", &open))?;
        let name_start = after_keyword.move_after_whitespaces();
        let name_end = name_start.move_while(is_name_char);
        let name = name_start.slice_to(&name_end);
        let close = end.move_backward().map_err(mismatch("doctype", &end))?;
        let declaration = name_end.slice_to(&close).trim();

        let node = open.range_to(&end);
        if let Some((system_id, literal)) = external_system_id(name_end) {
            tracing::warn!(system_id, line = node.start.line, "external DTD is not resolved");
            self.builder.warn(ResourceResolutionWarning {
                system_id: system_id.to_string(),
                range: literal,
            });
        }

        self.builder.leaf(NodeKind::DocType, name, declaration, node);
        self.cursor = end;
        Ok(())
    }

    fn processing_instruction(&mut self, span_end: usize) -> Result<(), ParseError> {
        let open = self.cursor.move_before("<?").map_err(mismatch("processing instruction", &self.cursor))?;
        let target_start = open.shift(2).map_err(mismatch("processing instruction", &open))?;
        let target_end = target_start.move_while(is_name_char);
        let target = target_start.slice_to(&target_end);
        if target.is_empty() {
            return Err(ParseError::syntax(
                "processing instruction without a target",
                target_start.position(),
            ));
        }

        let close = target_end.move_before(PI_CLOSE).map_err(|_| ParseError::Unterminated {
            construct: "processing instruction",
            position: open.position(),
        })?;
        let end = close.shift(PI_CLOSE.len()).map_err(mismatch("processing instruction", &close))?;
        check_span_end("processing instruction", &end, span_end)?;

        let data = normalize_newlines(target_end.slice_to(&close).trim_matches(is_xml_whitespace));
        self.builder
            .leaf(NodeKind::ProcessingInstruction, target, &data, open.range_to(&end));
        self.cursor = end;
        Ok(())
    }

    fn declaration(&mut self, span_end: usize) -> Result<(), ParseError> {
        let open = self.cursor.move_before(DECL_OPEN).map_err(mismatch("XML declaration", &self.cursor))?;
        let leading = Cursor::new(self.source).slice_to(&open);
        if !leading.is_empty() && leading != "\u{FEFF}" {
            return Err(ParseError::syntax(
                "XML declaration is only allowed at the start of the document",
                open.position(),
            ));
        }

        let after_open = open.shift(DECL_OPEN.len()).map_err(mismatch("XML declaration", &open))?;
        let scanned = self.scan_attributes(&open, after_open, &[PI_CLOSE])?;
        let end = scanned
            .closer
            .shift(PI_CLOSE.len())
            .map_err(mismatch("XML declaration", &scanned.closer))?;
        check_span_end("XML declaration", &end, span_end)?;

        let mut attributes = Vec::with_capacity(scanned.attributes.len());
        for attr in &scanned.attributes {
            let name = attr.name();
            if !PROLOG_ATTRIBUTES.contains(&name) {
                return Err(ParseError::syntax(
                    format!("unexpected '{name}' in XML declaration"),
                    attr.name.position(),
                ));
            }
            attributes.push(PrologAttribute {
                name: name.to_string(),
                value: attr.raw_value().to_string(),
                name_range: attr.name.range_to(&attr.name_end),
                value_range: attr.value.range_to(&attr.value_end),
            });
        }

        self.builder.set_prolog(Prolog {
            start: open.range_to(&after_open),
            end: scanned.closer.range_to(&end),
            attributes,
        });
        self.cursor = end;
        Ok(())
    }

    fn decode_text(&self, raw: &str, at: &Cursor<'a>) -> Result<String, ParseError> {
        let decoded = self
            .entities
            .decode(raw)
            .map_err(|err| entity_error(err, at))?;
        if !raw.contains('\r') {
            return Ok(decoded.into_owned());
        }
        // Line ends are normalized before references are expanded, so `&#13;` survives
        self.entities
            .decode(&normalize_newlines(raw))
            .map(|value| value.into_owned())
            .map_err(|err| entity_error(err, at))
    }

    fn decode_attribute(&self, raw: &str, at: &Cursor<'a>) -> Result<String, ParseError> {
        let decoded = self
            .entities
            .decode(raw)
            .map_err(|err| entity_error(err, at))?;
        if !raw.contains(['\t', '\n', '\r']) {
            return Ok(decoded.into_owned());
        }
        let normalized = normalize_newlines(raw).replace(['\t', '\n'], " ");
        self.entities
            .decode(&normalized)
            .map(|value| value.into_owned())
            .map_err(|err| entity_error(err, at))
    }
}

/// Compare the rescanned attributes with what the coarse parser reported
fn verify_attributes(
    tag: &CoarseTag,
    scanned: &ScannedTag<'_>,
    at: &Cursor<'_>,
) -> Result<(), ParseError> {
    if tag.attributes.len() != scanned.attributes.len() {
        return Err(ParseError::Mismatch {
            construct: "start tag",
            message: format!(
                "found {} attributes, expected {}",
                scanned.attributes.len(),
                tag.attributes.len()
            ),
            position: at.position(),
        });
    }
    for ((name, value), attr) in tag.attributes.iter().zip(&scanned.attributes) {
        if name != attr.name() || value != attr.raw_value() {
            return Err(ParseError::Mismatch {
                construct: "attribute",
                message: format!("expected '{name}', found '{}'", attr.name()),
                position: attr.name.position(),
            });
        }
    }
    Ok(())
}

/// `SYSTEM "uri"` or `PUBLIC "id" "uri"` after the doctype name
fn external_system_id(after_name: Cursor<'_>) -> Option<(&str, crate::core::range::Range)> {
    let cur = after_name.move_after_whitespaces();
    let literal = if cur.starts_with("SYSTEM") {
        cur.shift(6).ok()?
    } else if cur.starts_with("PUBLIC") {
        let (_, public_end) = quoted_literal(cur.shift(6).ok()?)?;
        public_end
    } else {
        return None;
    };
    let (start, end) = quoted_literal(literal)?;
    Some((start.slice_to(&end), start.range_to(&end)))
}

/// Locate a quoted literal after optional whitespace. Returns (content start, content end).
fn quoted_literal(cur: Cursor<'_>) -> Option<(Cursor<'_>, Cursor<'_>)> {
    let quote_at = cur.move_after_whitespaces();
    let quote = match quote_at.peek()? {
        '"' => "\"",
        '\'' => "'",
        _ => return None,
    };
    let start = quote_at.shift(1).ok()?;
    let end = start.move_before(quote).ok()?;
    Some((start, end))
}

fn check_span_end(construct: &'static str, end: &Cursor<'_>, span_end: usize) -> Result<(), ParseError> {
    if end.offset() == span_end {
        return Ok(());
    }
    Err(ParseError::Mismatch {
        construct,
        message: format!("construct ends at byte {}, expected {}", end.offset(), span_end),
        position: end.position(),
    })
}

/// `\r\n` and lone `\r` become `\n`
fn normalize_newlines(text: &str) -> String {
    if text.contains('\r') {
        text.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        text.to_string()
    }
}

fn entity_error(err: EntityError, base: &Cursor<'_>) -> ParseError {
    let position = base
        .advance_to(base.offset() + err.offset())
        .map_or_else(|_| base.position(), |c| c.position());
    match err {
        EntityError::Unknown { name, .. } => ParseError::UndeclaredEntity { name, position },
        EntityError::InvalidCharRef { reference, .. } => {
            ParseError::InvalidReference { reference, position }
        }
        EntityError::Malformed { .. } => {
            ParseError::syntax("'&' does not start a valid reference", position)
        }
    }
}

/// Map a missing required token into a located error
fn mismatch<'c>(construct: &'static str, at: &Cursor<'c>) -> impl FnOnce(CursorError) -> ParseError {
    let position = at.position();
    move |err| ParseError::Mismatch {
        construct,
        message: err.to_string(),
        position,
    }
}

fn coarse_error(source: &str, err: CoarseError) -> ParseError {
    let mut offset = err.offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    let position = Cursor::new(source)
        .advance_to(offset)
        .map_or(Position::start(), |c| c.position());
    ParseError::Syntax {
        message: err.message,
        position,
    }
}
