//! Located node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references. Ranges are
//! not stored here: they live in the document's `LocationMap`.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Compact attribute identifier (index into the attribute arena)
pub type AttrId = u32;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Text content (entity references expanded)
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// DOCTYPE declaration
    DocType,
    /// Processing instruction
    ProcessingInstruction,
}

/// A node in the arena
#[derive(Debug, Clone)]
pub struct LocatedNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Parent node (None for document root)
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// Qualified name (elements), target (PIs), or root name (doctype)
    pub name_id: u32,
    /// Namespace prefix, or 0
    pub prefix_id: u32,
    /// Local part of the name
    pub local_id: u32,
    /// Resolved namespace URI, or 0
    pub namespace_id: u32,
    /// Decoded text (text, CDATA), comment body, PI data, or doctype text
    pub value_id: u32,
    /// Start of attributes in attribute arena (for elements)
    pub attr_start: AttrId,
    /// Number of attributes
    pub attr_count: u32,
    /// Depth in document tree
    pub depth: u16,
}

impl LocatedNode {
    /// Create an unlinked node of the given kind
    pub fn new(kind: NodeKind, parent: Option<NodeId>, depth: u16) -> Self {
        LocatedNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            prefix_id: 0,
            local_id: 0,
            namespace_id: 0,
            value_id: 0,
            attr_start: 0,
            attr_count: 0,
            depth,
        }
    }

    /// Create a new document root node
    pub fn document() -> Self {
        Self::new(NodeKind::Document, None, 0)
    }

    /// Check if this is an element node
    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Text or CDATA
    #[inline]
    pub fn is_character_data(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::CData)
    }

    /// Check if this node has children
    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    /// Range of attribute ids owned by this node
    #[inline]
    pub fn attribute_ids(&self) -> std::ops::Range<AttrId> {
        self.attr_start..self.attr_start + self.attr_count
    }
}

/// Stored attribute
#[derive(Debug, Clone)]
pub struct LocatedAttribute {
    /// Owning element
    pub owner: NodeId,
    /// Qualified attribute name
    pub name_id: u32,
    pub prefix_id: u32,
    pub local_id: u32,
    /// Resolved namespace URI, or 0 (unprefixed attributes have none)
    pub namespace_id: u32,
    /// Decoded value
    pub value_id: u32,
    /// `xmlns` or `xmlns:*` declaration
    pub is_namespace_decl: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let doc = LocatedNode::document();
        assert_eq!(doc.kind, NodeKind::Document);
        assert!(doc.parent.is_none());
        assert_eq!(doc.depth, 0);
    }

    #[test]
    fn test_attribute_ids() {
        let mut elem = LocatedNode::new(NodeKind::Element, Some(0), 1);
        elem.attr_start = 4;
        elem.attr_count = 2;
        assert_eq!(elem.attribute_ids(), 4..6);
        assert!(elem.is_element());
        assert!(!elem.has_children());
    }
}
