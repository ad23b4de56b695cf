//! Document Builder
//!
//! Assembles a [`LocatedDocument`] from reconciled constructs: links nodes
//! into the arena, interns names and values, resolves namespaces, and records
//! every range in the `LocationMap`.

use super::document::{Locatable, LocatedDocument, LocationMap, Prolog, DOCUMENT_NODE};
use super::namespace::{ns, NamespaceResolver};
use super::node::{LocatedAttribute, LocatedNode, NodeId, NodeKind};
use super::strings::StringPool;
use crate::core::range::{LocationKind, Position, Range};
use crate::error::{ParseError, ResourceResolutionWarning};
use crate::reader::split_name;

/// Deepest element allowed; leaves below it still fit a `u16` depth
pub const MAX_ELEMENT_DEPTH: u16 = u16::MAX - 1;

/// An attribute ready to be stored, with its value already decoded
#[derive(Debug, Clone)]
pub struct AttributeInput<'a> {
    pub name: &'a str,
    pub value: String,
    pub name_range: Range,
    pub value_range: Range,
}

/// Incremental builder used by the reconciler
pub struct DocumentBuilder {
    nodes: Vec<LocatedNode>,
    attributes: Vec<LocatedAttribute>,
    strings: StringPool,
    locations: LocationMap,
    resolver: NamespaceResolver,
    /// Open elements, document node at the bottom
    stack: Vec<NodeId>,
    prolog: Option<Prolog>,
    root_element: Option<NodeId>,
    warnings: Vec<ResourceResolutionWarning>,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder {
    pub fn new() -> Self {
        let mut strings = StringPool::new();
        let resolver = NamespaceResolver::new(&mut strings);
        let mut nodes = Vec::with_capacity(256);
        nodes.push(LocatedNode::document());
        DocumentBuilder {
            nodes,
            attributes: Vec::with_capacity(128),
            strings,
            locations: LocationMap::new(),
            resolver,
            stack: vec![DOCUMENT_NODE],
            prolog: None,
            root_element: None,
            warnings: Vec::new(),
        }
    }

    /// Number of currently open elements
    #[inline]
    pub fn open_elements(&self) -> usize {
        self.stack.len() - 1
    }

    #[inline]
    pub fn has_root(&self) -> bool {
        self.root_element.is_some()
    }

    /// Innermost open element, if any
    pub fn current_element(&self) -> Option<NodeId> {
        self.stack.last().copied().filter(|&id| id != DOCUMENT_NODE)
    }

    /// Qualified name of an element already in the arena
    pub fn element_name(&self, id: NodeId) -> &str {
        self.nodes
            .get(id as usize)
            .map_or("", |n| self.strings.get(n.name_id))
    }

    pub fn range(&self, id: NodeId, kind: LocationKind) -> Option<Range> {
        self.locations.get(Locatable::Node(id), kind)
    }

    /// Open an element. Self-closing elements are closed right after with
    /// `end_element(start)`.
    pub fn start_element(
        &mut self,
        name: &str,
        name_range: Range,
        start: Range,
        attributes: Vec<AttributeInput<'_>>,
    ) -> Result<NodeId, ParseError> {
        let parent_id = *self.stack.last().unwrap_or(&DOCUMENT_NODE);
        let depth = self
            .child_depth()
            .filter(|&depth| depth <= MAX_ELEMENT_DEPTH)
            .ok_or_else(|| {
                ParseError::structure(
                    format!("elements nest deeper than {MAX_ELEMENT_DEPTH} levels"),
                    start.start,
                )
            })?;

        self.resolver.push_scope();

        // Namespace declarations apply to the element carrying them
        for attr in &attributes {
            if attr.name == "xmlns" {
                let uri_id = self.strings.intern(&attr.value);
                self.resolver.declare_default(uri_id);
            } else if let Some(prefix) = attr.name.strip_prefix("xmlns:") {
                let prefix_id = self.strings.intern(prefix);
                let uri_id = self.strings.intern(&attr.value);
                self.resolver.declare(prefix_id, uri_id);
            }
        }

        let mut node = LocatedNode::new(NodeKind::Element, Some(parent_id), depth);
        let (prefix, local) = split_name(name);
        node.name_id = self.strings.intern(name);
        node.local_id = self.strings.intern(local);
        match prefix {
            Some(prefix) => {
                node.prefix_id = self.strings.intern(prefix);
                node.namespace_id = self.resolve_prefix(prefix, node.prefix_id, name_range.start)?;
            }
            None => node.namespace_id = self.resolver.resolve_default(),
        }

        let node_id = self.nodes.len() as NodeId;
        node.attr_start = self.attributes.len() as u32;
        node.attr_count = attributes.len() as u32;

        for attr in attributes {
            let attr_id = self.attributes.len() as u32;
            let (prefix, local) = split_name(attr.name);
            let is_namespace_decl = attr.name == "xmlns" || prefix == Some("xmlns");
            let prefix_id = prefix.map_or(0, |p| self.strings.intern(p));
            let namespace_id = match prefix {
                _ if is_namespace_decl => self.strings.intern(ns::XMLNS),
                Some(p) => self.resolve_prefix(p, prefix_id, attr.name_range.start)?,
                // Default namespaces never apply to attributes
                None => 0,
            };
            self.attributes.push(LocatedAttribute {
                owner: node_id,
                name_id: self.strings.intern(attr.name),
                prefix_id,
                local_id: self.strings.intern(local),
                namespace_id,
                value_id: self.strings.intern(&attr.value),
                is_namespace_decl,
            });

            let target = Locatable::Attribute(attr_id);
            self.locations.insert(target, LocationKind::Name, attr.name_range);
            self.locations.insert(target, LocationKind::Value, attr.value_range);
            self.locations.insert(
                target,
                LocationKind::Node,
                Range::new(attr.name_range.start, attr.value_range.end),
            );
        }

        self.nodes.push(node);
        self.link_child(parent_id, node_id);

        let target = Locatable::Node(node_id);
        self.locations.insert(target, LocationKind::Start, start);
        self.locations.insert(target, LocationKind::Name, name_range);

        if parent_id == DOCUMENT_NODE && self.root_element.is_none() {
            self.root_element = Some(node_id);
        }
        self.stack.push(node_id);
        Ok(node_id)
    }

    /// Close the innermost element, recording its END and NODE ranges
    pub fn end_element(&mut self, end: Range) -> Option<NodeId> {
        let node_id = self.current_element()?;
        self.stack.pop();
        self.resolver.pop_scope();

        let target = Locatable::Node(node_id);
        let start = self.locations.get(target, LocationKind::Start).unwrap_or(end);
        self.locations.insert(target, LocationKind::End, end);
        self.locations.insert(target, LocationKind::Node, Range::spanning(start, end));
        Some(node_id)
    }

    /// Append a text or CDATA node
    pub fn character_data(
        &mut self,
        kind: NodeKind,
        value: &str,
        node: Range,
        delimiters: Option<(Range, Range)>,
    ) -> NodeId {
        let node_id = self.leaf(kind, "", value, node);
        if let Some((start, end)) = delimiters {
            let target = Locatable::Node(node_id);
            self.locations.insert(target, LocationKind::Start, start);
            self.locations.insert(target, LocationKind::End, end);
        }
        node_id
    }

    /// Append a childless node (comment, PI, doctype, text) under the
    /// innermost open element
    pub fn leaf(&mut self, kind: NodeKind, name: &str, value: &str, node: Range) -> NodeId {
        let parent_id = *self.stack.last().unwrap_or(&DOCUMENT_NODE);
        // Open elements stop at MAX_ELEMENT_DEPTH, so this always fits
        let depth = self.child_depth().unwrap_or(u16::MAX);
        let mut leaf = LocatedNode::new(kind, Some(parent_id), depth);
        leaf.name_id = self.strings.intern(name);
        leaf.local_id = leaf.name_id;
        leaf.value_id = self.strings.intern(value);

        let node_id = self.nodes.len() as NodeId;
        self.nodes.push(leaf);
        self.link_child(parent_id, node_id);
        self.locations.insert(Locatable::Node(node_id), LocationKind::Node, node);
        node_id
    }

    pub fn set_prolog(&mut self, prolog: Prolog) {
        self.prolog = Some(prolog);
    }

    pub fn warn(&mut self, warning: ResourceResolutionWarning) {
        self.warnings.push(warning);
    }

    /// Seal the arena. `end` is the position just past the source text.
    pub fn finish(mut self, source: &str, end: Position) -> LocatedDocument {
        self.locations.insert(
            Locatable::Node(DOCUMENT_NODE),
            LocationKind::Node,
            Range::new(Position::start(), end),
        );
        LocatedDocument {
            source: source.to_string(),
            nodes: self.nodes,
            attributes: self.attributes,
            strings: self.strings,
            locations: self.locations,
            prolog: self.prolog,
            root_element: self.root_element,
            warnings: self.warnings,
        }
    }

    /// Depth of a node added under the innermost open element
    fn child_depth(&self) -> Option<u16> {
        u16::try_from(self.stack.len()).ok()
    }

    fn resolve_prefix(&self, prefix: &str, prefix_id: u32, at: Position) -> Result<u32, ParseError> {
        match self.resolver.resolve(prefix_id) {
            Some(uri_id) if uri_id != 0 => Ok(uri_id),
            _ => Err(ParseError::UnboundPrefix {
                prefix: prefix.to_string(),
                position: at,
            }),
        }
    }

    /// Link a child node to its parent
    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        // Get parent's last_child first to avoid borrow issues
        let last_child_opt = self.nodes[parent_id as usize].last_child;

        if let Some(last_child_id) = last_child_opt {
            self.nodes[child_id as usize].prev_sibling = Some(last_child_id);
            self.nodes[last_child_id as usize].next_sibling = Some(child_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: usize, end: usize) -> Range {
        Range::new(Position::new(1, start, start), Position::new(1, end, end))
    }

    #[test]
    fn test_build_element_with_text() {
        let mut builder = DocumentBuilder::new();
        let r = builder.start_element("r", range(1, 2), range(0, 3), Vec::new()).unwrap();
        builder.character_data(NodeKind::Text, "hi", range(3, 5), None);
        assert_eq!(builder.end_element(range(5, 9)), Some(r));

        let doc = builder.finish("<r>hi</r>", Position::new(1, 9, 9));
        assert_eq!(doc.root_element(), Some(r));
        assert_eq!(doc.range(r, LocationKind::Node), Some(range(0, 9)));
        assert_eq!(doc.string_value(r), "hi");
    }

    #[test]
    fn test_unbound_prefix() {
        let mut builder = DocumentBuilder::new();
        let err = builder
            .start_element("p:r", range(1, 4), range(0, 5), Vec::new())
            .unwrap_err();
        assert!(matches!(err, ParseError::UnboundPrefix { ref prefix, .. } if prefix == "p"));
    }

    #[test]
    fn test_attribute_node_range() {
        let mut builder = DocumentBuilder::new();
        let attrs = vec![AttributeInput {
            name: "a",
            value: "1".to_string(),
            name_range: range(3, 4),
            value_range: range(6, 7),
        }];
        let r = builder.start_element("r", range(1, 2), range(0, 11), attrs).unwrap();
        builder.end_element(range(0, 11));
        let doc = builder.finish("<r a=\"1\"/>", Position::new(1, 11, 11));
        let a = doc.attribute_ids(r).next().unwrap();
        assert_eq!(doc.attribute_range(a, LocationKind::Node), Some(range(3, 7)));
    }

    #[test]
    fn test_nesting_depth_is_capped() {
        let mut builder = DocumentBuilder::new();
        for _ in 0..MAX_ELEMENT_DEPTH {
            builder.start_element("d", range(1, 2), range(0, 3), Vec::new()).unwrap();
        }
        let text = builder.character_data(NodeKind::Text, "x", range(3, 4), None);
        assert_eq!(builder.nodes[text as usize].depth, u16::MAX);

        let err = builder
            .start_element("d", range(1, 2), range(0, 3), Vec::new())
            .unwrap_err();
        assert!(matches!(err, ParseError::Structure { .. }));
    }
}
