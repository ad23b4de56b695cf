//! DOM Module - Located, arena-based XML Document
//!
//! Implements an efficient DOM representation using:
//! - Arena allocation for nodes and attributes
//! - NodeId (u32) indices for cache-friendly traversal
//! - String interning for names and values
//! - A location map holding every range the reconciler recorded
//! - Namespace-aware and namespace-unaware views over one arena

pub mod builder;
pub mod document;
pub mod namespace;
pub mod node;
pub mod strings;
pub mod view;

pub use builder::{AttributeInput, DocumentBuilder};
pub use document::{
    Locatable, LocatedDocument, LocationMap, Prolog, PrologAttribute, DOCUMENT_NODE,
};
pub use namespace::{ns, NamespaceContext};
pub use node::{AttrId, LocatedAttribute, LocatedNode, NodeId, NodeKind};
pub use strings::StringPool;
pub use view::{NamespaceAwareView, NamespaceUnawareView};

/// A name as one view exposes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameParts<'a> {
    /// Name as written in the source
    pub qualified: &'a str,
    pub prefix: Option<&'a str>,
    pub local: &'a str,
    /// Resolved namespace URI
    pub namespace: Option<&'a str>,
}

impl<'a> NameParts<'a> {
    /// A name with no namespace structure
    pub fn opaque(qualified: &'a str) -> Self {
        NameParts {
            qualified,
            prefix: None,
            local: qualified,
            namespace: None,
        }
    }
}

/// Trait for document access - lets XPath and checks work against either view
pub trait DocumentAccess {
    /// The underlying document (ranges, values, tree links)
    fn document(&self) -> &LocatedDocument;

    fn is_namespace_aware(&self) -> bool;

    /// Name of an element, PI, or doctype
    fn node_name(&self, id: NodeId) -> NameParts<'_>;

    fn attribute_name(&self, id: AttrId) -> NameParts<'_>;

    /// Attributes visible through this view, in source order
    fn attribute_ids(&self, id: NodeId) -> Vec<AttrId>;

    #[inline]
    fn root_element_id(&self) -> Option<NodeId> {
        self.document().root_element()
    }

    #[inline]
    fn node_kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.document().kind(id)
    }

    #[inline]
    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.document().parent(id)
    }

    #[inline]
    fn next_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.document().next_sibling(id)
    }

    #[inline]
    fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.document().prev_sibling(id)
    }

    /// Iterate over children - returns collected Vec for trait object compatibility
    fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.document().children(id).collect()
    }

    /// Iterate over descendants - returns collected Vec for trait object compatibility
    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.document().descendants(id).collect()
    }

    fn string_value(&self, id: NodeId) -> String {
        self.document().string_value(id)
    }
}
