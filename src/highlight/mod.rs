//! Syntax highlighting from recorded ranges
//!
//! Token spans are derived from the location map alone: delimiters are
//! ASCII and never span a line, so they are cut off the start or end of a
//! recorded range by character count. Nothing is re-parsed.

use crate::core::range::{LocationKind, Position, Range};
use crate::dom::{LocatedDocument, NodeId, NodeKind, DOCUMENT_NODE};

/// Highlight category of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenCategory {
    /// Markup: tag brackets and names, comment, CDATA, doctype and PI markers
    Delimiter,
    AttributeName,
    /// Attribute value including its quotes
    AttributeValue,
    /// Comment body
    StructuredComment,
}

/// One highlighted span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub range: Range,
    pub category: TokenCategory,
}

const COMMENT_OPEN: usize = "<!--".len();
const COMMENT_CLOSE: usize = "-->".len();
const DOCTYPE_OPEN: usize = "<!DOCTYPE".len();

/// Highlight a document: prolog first, then the tree. The result is
/// ordered by position and the spans are disjoint.
pub fn highlight(doc: &LocatedDocument) -> Vec<Highlight> {
    let mut sink = HighlightSink::default();

    if let Some(prolog) = doc.prolog() {
        sink.push(prolog.start, TokenCategory::Delimiter);
        for attr in &prolog.attributes {
            sink.push(attr.name_range, TokenCategory::AttributeName);
            sink.push(with_quotes(attr.value_range), TokenCategory::AttributeValue);
        }
        sink.push(prolog.end, TokenCategory::Delimiter);
    }

    for id in doc.descendants(DOCUMENT_NODE) {
        let Some(node) = doc.range(id, LocationKind::Node) else {
            continue;
        };
        match doc.kind(id) {
            Some(NodeKind::Element) => element(doc, id, &mut sink),
            Some(NodeKind::CData) => {
                for kind in [LocationKind::Start, LocationKind::End] {
                    if let Some(range) = doc.range(id, kind) {
                        sink.push(range, TokenCategory::Delimiter);
                    }
                }
            }
            Some(NodeKind::Comment) => {
                let open = head(node, COMMENT_OPEN);
                let close = tail(node, COMMENT_CLOSE);
                sink.push(open, TokenCategory::Delimiter);
                sink.push(Range::new(open.end, close.start), TokenCategory::StructuredComment);
                sink.push(close, TokenCategory::Delimiter);
            }
            Some(NodeKind::DocType) => {
                sink.push(head(node, DOCTYPE_OPEN), TokenCategory::Delimiter);
                sink.push(tail(node, 1), TokenCategory::Delimiter);
            }
            Some(NodeKind::ProcessingInstruction) => sink.push(node, TokenCategory::Delimiter),
            _ => {}
        }
    }

    sink.finish()
}

fn element(doc: &LocatedDocument, id: NodeId, sink: &mut HighlightSink) {
    let (Some(start), Some(end), Some(name)) = (
        doc.range(id, LocationKind::Start),
        doc.range(id, LocationKind::End),
        doc.range(id, LocationKind::Name),
    ) else {
        return;
    };

    // `<name`
    sink.push(Range::new(start.start, name.end), TokenCategory::Delimiter);
    for aid in doc.attribute_ids(id) {
        if let Some(range) = doc.attribute_range(aid, LocationKind::Name) {
            sink.push(range, TokenCategory::AttributeName);
        }
        if let Some(range) = doc.attribute_range(aid, LocationKind::Value) {
            sink.push(with_quotes(range), TokenCategory::AttributeValue);
        }
    }

    if start == end {
        sink.push(tail(start, 2), TokenCategory::Delimiter);
    } else {
        sink.push(tail(start, 1), TokenCategory::Delimiter);
        sink.push(end, TokenCategory::Delimiter);
    }
}

/// First `n` ASCII characters of a range
fn head(range: Range, n: usize) -> Range {
    let n = n.min(range.len());
    let end = Position::new(range.start.line, range.start.column + n, range.start.offset + n);
    Range::new(range.start, end)
}

/// Last `n` ASCII characters of a range
fn tail(range: Range, n: usize) -> Range {
    let n = n.min(range.len()).min(range.end.column);
    let start = Position::new(range.end.line, range.end.column - n, range.end.offset - n);
    Range::new(start, range.end)
}

/// Widen an attribute value range by one character on each side
fn with_quotes(value: Range) -> Range {
    Range::new(
        Position::new(
            value.start.line,
            value.start.column.saturating_sub(1),
            value.start.offset.saturating_sub(1),
        ),
        Position::new(value.end.line, value.end.column + 1, value.end.offset + 1),
    )
}

#[derive(Default)]
struct HighlightSink {
    highlights: Vec<Highlight>,
}

impl HighlightSink {
    fn push(&mut self, range: Range, category: TokenCategory) {
        if !range.is_empty() {
            self.highlights.push(Highlight { range, category });
        }
    }

    fn finish(mut self) -> Vec<Highlight> {
        self.highlights.sort_by_key(|h| h.range.start.offset);
        self.highlights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<(&str, TokenCategory)> {
        let doc = LocatedDocument::parse(source).unwrap();
        highlight(&doc)
            .into_iter()
            .map(|h| (h.range.slice(source), h.category))
            .collect()
    }

    use TokenCategory::*;

    #[test]
    fn test_element_with_attribute() {
        assert_eq!(
            tokens("<a b=\"1\">x</a>"),
            vec![
                ("<a", Delimiter),
                ("b", AttributeName),
                ("\"1\"", AttributeValue),
                (">", Delimiter),
                ("</a>", Delimiter),
            ]
        );
    }

    #[test]
    fn test_self_closing() {
        assert_eq!(
            tokens("<a c='x'/>"),
            vec![("<a", Delimiter), ("c", AttributeName), ("'x'", AttributeValue), ("/>", Delimiter)]
        );
    }

    #[test]
    fn test_comment_and_cdata() {
        assert_eq!(
            tokens("<r><!-- hi --><![CDATA[x]]></r>"),
            vec![
                ("<r", Delimiter),
                (">", Delimiter),
                ("<!--", Delimiter),
                (" hi ", StructuredComment),
                ("-->", Delimiter),
                ("<![CDATA[", Delimiter),
                ("]]>", Delimiter),
                ("</r>", Delimiter),
            ]
        );
    }

    #[test]
    fn test_prolog_doctype_and_pi() {
        let source = "<?xml version=\"1.0\"?>\n<!DOCTYPE r>\n<?pi data?><r/>";
        assert_eq!(
            tokens(source),
            vec![
                ("<?xml", Delimiter),
                ("version", AttributeName),
                ("\"1.0\"", AttributeValue),
                ("?>", Delimiter),
                ("<!DOCTYPE", Delimiter),
                (">", Delimiter),
                ("<?pi data?>", Delimiter),
                ("<r", Delimiter),
                ("/>", Delimiter),
            ]
        );
    }

    #[test]
    fn test_spans_are_disjoint_across_lines() {
        let source = "<a\n  x='1'\n  y=\"2\">\n<!--\nmulti\n--></a>";
        let doc = LocatedDocument::parse(source).unwrap();
        let highlights = highlight(&doc);
        for pair in highlights.windows(2) {
            assert!(pair[0].range.end.offset <= pair[1].range.start.offset);
        }
        let body = highlights.iter().find(|h| h.category == StructuredComment).unwrap();
        assert_eq!(body.range.slice(source), "\nmulti\n");
        assert_eq!(body.range.start.line, 4);
    }
}
