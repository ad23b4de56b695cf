//! Coarse Event Types
//!
//! One event per markup construct or character-data run, carrying the byte
//! span the streaming parser consumed for it. Spans are only approximate
//! locations: the reconciler rescans the text to find exact sub-ranges.

use std::ops::Range as ByteSpan;

/// Coarse parsing event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoarseKind {
    /// Start of an element: <name attrs...>
    Start(CoarseTag),
    /// Empty element: <name attrs.../>
    Empty(CoarseTag),
    /// End of an element: </name>
    End { name: String },
    /// Character data between markup (entities not yet expanded)
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// DOCTYPE declaration, including any internal subset
    DocType,
    /// Processing instruction other than the XML declaration
    ProcessingInstruction,
    /// XML declaration: <?xml version="1.0"?>
    Declaration,
}

/// Tag name and attributes as reported by the streaming parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoarseTag {
    /// Full element name (may include prefix)
    pub name: String,
    /// Attributes in source order: (qualified name, raw value)
    pub attributes: Vec<(String, String)>,
}

/// A coarse event with the byte span it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoarseEvent {
    pub kind: CoarseKind,
    pub span: ByteSpan<usize>,
}

impl CoarseEvent {
    pub fn new(kind: CoarseKind, span: ByteSpan<usize>) -> Self {
        CoarseEvent { kind, span }
    }

    /// Check if this is character data
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, CoarseKind::Text)
    }
}

/// Split a qualified name into (prefix, local name)
#[inline]
pub fn split_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("ns:item"), (Some("ns"), "item"));
        assert_eq!(split_name("item"), (None, "item"));
    }

    #[test]
    fn test_is_text() {
        assert!(CoarseEvent::new(CoarseKind::Text, 0..3).is_text());
        assert!(!CoarseEvent::new(CoarseKind::Comment, 0..7).is_text());
    }
}
