//! Located Document - Arena-based DOM with source ranges
//!
//! Efficient DOM storage with:
//! - Arena allocation for nodes and attributes
//! - NodeId indices for traversal
//! - String interning for names and values
//! - An out-of-band `LocationMap` holding every recorded range
//!
//! The document is immutable once built. Namespace-aware and unaware views
//! borrow it, so both see the same node ids and the same ranges.

use super::namespace::ns;
use super::node::{AttrId, LocatedAttribute, LocatedNode, NodeId, NodeKind};
use super::strings::StringPool;
use super::view::{NamespaceAwareView, NamespaceUnawareView};
use crate::core::encoding;
use crate::core::range::{LocationKind, Range};
use crate::error::{ParseError, ResourceResolutionWarning};
use crate::options::ParseOptions;
use std::collections::HashMap;

/// The document node is always the first node in the arena
pub const DOCUMENT_NODE: NodeId = 0;

/// Something a range can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Locatable {
    Node(NodeId),
    Attribute(AttrId),
}

/// (node-or-attribute, kind) -> range
#[derive(Debug, Clone, Default)]
pub struct LocationMap {
    ranges: HashMap<(Locatable, LocationKind), Range>,
}

impl LocationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, target: Locatable, kind: LocationKind, range: Range) {
        self.ranges.insert((target, kind), range);
    }

    #[inline]
    pub fn get(&self, target: Locatable, kind: LocationKind) -> Option<Range> {
        self.ranges.get(&(target, kind)).copied()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// One pseudo-attribute of the XML declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrologAttribute {
    pub name: String,
    pub value: String,
    pub name_range: Range,
    /// Excludes the quotes
    pub value_range: Range,
}

/// The `<?xml ...?>` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prolog {
    /// The `<?xml` token
    pub start: Range,
    /// The `?>` token
    pub end: Range,
    pub attributes: Vec<PrologAttribute>,
}

impl Prolog {
    /// Whole declaration
    pub fn range(&self) -> Range {
        Range::spanning(self.start, self.end)
    }

    pub fn attribute(&self, name: &str) -> Option<&PrologAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// An XML document stored in arena format, with exact source locations
#[derive(Debug, Clone)]
pub struct LocatedDocument {
    /// Decoded source text every range points into
    pub(crate) source: String,
    pub(crate) nodes: Vec<LocatedNode>,
    pub(crate) attributes: Vec<LocatedAttribute>,
    pub(crate) strings: StringPool,
    pub(crate) locations: LocationMap,
    pub(crate) prolog: Option<Prolog>,
    /// Root element node ID (not document node)
    pub(crate) root_element: Option<NodeId>,
    pub(crate) warnings: Vec<ResourceResolutionWarning>,
}

impl LocatedDocument {
    /// Parse source text with default options
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        Self::parse_with(source, &ParseOptions::default())
    }

    /// Parse already-decoded source text
    pub fn parse_with(source: &str, options: &ParseOptions) -> Result<Self, ParseError> {
        crate::reconcile::reconcile(source, options)
    }

    /// Detect the encoding, decode, and parse raw file bytes
    pub fn from_bytes(bytes: &[u8], options: &ParseOptions) -> Result<Self, ParseError> {
        let source = encoding::decode(bytes, options.default_encoding)?;
        Self::parse_with(&source, options)
    }

    /// Namespace-aware view: prefixes resolved, local names exposed
    pub fn aware(&self) -> NamespaceAwareView<'_> {
        NamespaceAwareView::new(self)
    }

    /// Namespace-unaware view: qualified names are opaque strings
    pub fn unaware(&self) -> NamespaceUnawareView<'_> {
        NamespaceUnawareView::new(self)
    }

    /// The decoded source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Extract the text a range covers
    pub fn slice(&self, range: Range) -> &str {
        range.slice(&self.source)
    }

    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    pub fn locations(&self) -> &LocationMap {
        &self.locations
    }

    pub fn prolog(&self) -> Option<&Prolog> {
        self.prolog.as_ref()
    }

    /// Non-fatal problems found while parsing
    pub fn warnings(&self) -> &[ResourceResolutionWarning] {
        &self.warnings
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    #[inline]
    pub fn document_node(&self) -> NodeId {
        DOCUMENT_NODE
    }

    /// Get root element ID
    #[inline]
    pub fn root_element(&self) -> Option<NodeId> {
        self.root_element
    }

    /// Get a node by ID
    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&LocatedNode> {
        self.nodes.get(id as usize)
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|n| n.kind)
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    #[inline]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.next_sibling
    }

    #[inline]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.prev_sibling
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        ChildIter {
            doc: self,
            next: self.node(id).and_then(|n| n.first_child),
        }
    }

    /// Iterate over all descendants of a node, in document order
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        if let Some(node) = self.node(id) {
            let mut child_id = node.last_child;
            while let Some(cid) = child_id {
                stack.push(cid);
                child_id = self.node(cid).and_then(|n| n.prev_sibling);
            }
        }
        DescendantIter { doc: self, stack }
    }

    /// Element children only
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .filter(move |&c| self.kind(c) == Some(NodeKind::Element))
    }

    /// Qualified name of an element, PI target, or doctype root name
    pub fn name(&self, id: NodeId) -> &str {
        self.node(id).map_or("", |n| self.strings.get(n.name_id))
    }

    /// Local part of an element name
    pub fn local_name(&self, id: NodeId) -> &str {
        self.node(id).map_or("", |n| self.strings.get(n.local_id))
    }

    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        self.node(id)
            .filter(|n| n.prefix_id != 0)
            .map(|n| self.strings.get(n.prefix_id))
    }

    /// Resolved namespace URI of an element
    pub fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        self.node(id)
            .filter(|n| n.namespace_id != 0)
            .map(|n| self.strings.get(n.namespace_id))
    }

    /// Decoded text of text/CDATA nodes, comment bodies, PI data, doctype text
    pub fn value(&self, id: NodeId) -> &str {
        self.node(id).map_or("", |n| self.strings.get(n.value_id))
    }

    /// Get attributes for an element
    pub fn attributes(&self, id: NodeId) -> &[LocatedAttribute] {
        self.node(id)
            .and_then(|n| {
                self.attributes
                    .get(n.attr_start as usize..(n.attr_start + n.attr_count) as usize)
            })
            .unwrap_or(&[])
    }

    /// Ids of the attributes of an element, in source order
    pub fn attribute_ids(&self, id: NodeId) -> std::ops::Range<AttrId> {
        self.node(id).map_or(0..0, |n| n.attribute_ids())
    }

    #[inline]
    pub fn attribute(&self, id: AttrId) -> Option<&LocatedAttribute> {
        self.attributes.get(id as usize)
    }

    pub fn attribute_name(&self, id: AttrId) -> &str {
        self.attribute(id).map_or("", |a| self.strings.get(a.name_id))
    }

    pub fn attribute_local_name(&self, id: AttrId) -> &str {
        self.attribute(id).map_or("", |a| self.strings.get(a.local_id))
    }

    pub fn attribute_namespace_uri(&self, id: AttrId) -> Option<&str> {
        self.attribute(id)
            .filter(|a| a.namespace_id != 0)
            .map(|a| self.strings.get(a.namespace_id))
    }

    pub fn attribute_value(&self, id: AttrId) -> &str {
        self.attribute(id).map_or("", |a| self.strings.get(a.value_id))
    }

    /// Find an attribute by its qualified name
    pub fn attribute_by_name(&self, node: NodeId, name: &str) -> Option<AttrId> {
        let name_id = self.strings.find(name)?;
        self.attribute_ids(node)
            .find(|&aid| self.attribute(aid).is_some_and(|a| a.name_id == name_id))
    }

    /// Find an attribute by namespace URI and local name
    pub fn attribute_by_qname(&self, node: NodeId, uri: Option<&str>, local: &str) -> Option<AttrId> {
        self.attribute_ids(node).find(|&aid| {
            self.attribute_local_name(aid) == local && self.attribute_namespace_uri(aid) == uri
        })
    }

    /// XPath string-value of a node
    pub fn string_value(&self, id: NodeId) -> String {
        match self.kind(id) {
            Some(NodeKind::Element | NodeKind::Document) => self
                .descendants(id)
                .filter(|&d| self.node(d).is_some_and(|n| n.is_character_data()))
                .map(|d| self.value(d))
                .collect(),
            Some(NodeKind::DocType) | None => String::new(),
            Some(_) => self.value(id).to_string(),
        }
    }

    /// Recorded range for a node or attribute
    #[inline]
    pub fn location(&self, target: Locatable, kind: LocationKind) -> Option<Range> {
        self.locations.get(target, kind)
    }

    /// Recorded range for a node
    #[inline]
    pub fn range(&self, id: NodeId, kind: LocationKind) -> Option<Range> {
        self.locations.get(Locatable::Node(id), kind)
    }

    /// Recorded range for an attribute
    #[inline]
    pub fn attribute_range(&self, id: AttrId, kind: LocationKind) -> Option<Range> {
        self.locations.get(Locatable::Attribute(id), kind)
    }

    /// First line of a node, for file-level reporting
    pub fn line_of(&self, id: NodeId) -> Option<usize> {
        self.range(id, LocationKind::Node).map(|r| r.start.line)
    }

    /// Is this attribute an `xml:*` attribute?
    pub fn is_xml_attribute(&self, id: AttrId) -> bool {
        self.attribute_namespace_uri(id) == Some(ns::XML)
    }
}

/// Iterator over child nodes
pub struct ChildIter<'a> {
    doc: &'a LocatedDocument,
    next: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.next_sibling(current);
        Some(current)
    }
}

/// Iterator over descendant nodes (pre-order)
pub struct DescendantIter<'a> {
    doc: &'a LocatedDocument,
    stack: Vec<NodeId>,
}

impl Iterator for DescendantIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        if let Some(node) = self.doc.node(current) {
            let mut child_id = node.last_child;
            while let Some(id) = child_id {
                self.stack.push(id);
                child_id = self.doc.node(id).and_then(|n| n.prev_sibling);
            }
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> LocatedDocument {
        LocatedDocument::parse(source).unwrap()
    }

    #[test]
    fn test_simple_parse() {
        let doc = parse("<root><child/></root>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.name(root), "root");
        assert_eq!(doc.children(root).count(), 1);
        assert_eq!(doc.parent(root), Some(DOCUMENT_NODE));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let doc = parse("<r><a><b/></a><c/></r>");
        let root = doc.root_element().unwrap();
        let names: Vec<_> = doc.descendants(root).map(|id| doc.name(id)).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_attributes() {
        let doc = parse("<r a=\"1\" b='x &amp; y'/>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.attributes(root).len(), 2);
        let b = doc.attribute_by_name(root, "b").unwrap();
        assert_eq!(doc.attribute_value(b), "x & y");
        assert_eq!(doc.attribute_by_name(root, "c"), None);
    }

    #[test]
    fn test_string_value() {
        let doc = parse("<r>a<b>b<![CDATA[<c>]]></b><!--no--></r>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.string_value(root), "ab<c>");
        assert_eq!(doc.string_value(DOCUMENT_NODE), "ab<c>");
    }

    #[test]
    fn test_namespaces() {
        let doc = parse("<r xmlns='urn:d' xmlns:p='urn:p'><p:a p:x='1' y='2'/></r>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.namespace_uri(root), Some("urn:d"));
        let a = doc.child_elements(root).next().unwrap();
        assert_eq!(doc.prefix(a), Some("p"));
        assert_eq!(doc.local_name(a), "a");
        assert_eq!(doc.namespace_uri(a), Some("urn:p"));
        let x = doc.attribute_by_qname(a, Some("urn:p"), "x").unwrap();
        assert_eq!(doc.attribute_value(x), "1");
        let y = doc.attribute_by_name(a, "y").unwrap();
        assert_eq!(doc.attribute_namespace_uri(y), None);
    }

    #[test]
    fn test_line_of() {
        let doc = parse("<r>\n\n  <a/>\n</r>");
        let a = doc.child_elements(doc.root_element().unwrap()).next().unwrap();
        assert_eq!(doc.line_of(a), Some(3));
        assert_eq!(doc.slice(doc.range(a, LocationKind::Node).unwrap()), "<a/>");
    }

    #[test]
    fn test_from_bytes_with_bom() {
        let doc = LocatedDocument::from_bytes(b"\xEF\xBB\xBF<r/>", &ParseOptions::default()).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.range(root, LocationKind::Start).unwrap().start.offset, 0);
    }
}
