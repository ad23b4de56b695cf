//! Document views
//!
//! Both views borrow the same arena, so node ids and ranges are shared. They
//! differ only in how names and namespace declarations are exposed.

use super::document::LocatedDocument;
use super::node::{AttrId, NodeId};
use super::{DocumentAccess, NameParts};

/// Prefixes resolved against in-scope declarations; `xmlns` attributes hidden
#[derive(Debug, Clone, Copy)]
pub struct NamespaceAwareView<'d> {
    doc: &'d LocatedDocument,
}

impl<'d> NamespaceAwareView<'d> {
    pub fn new(doc: &'d LocatedDocument) -> Self {
        NamespaceAwareView { doc }
    }
}

impl DocumentAccess for NamespaceAwareView<'_> {
    #[inline]
    fn document(&self) -> &LocatedDocument {
        self.doc
    }

    fn is_namespace_aware(&self) -> bool {
        true
    }

    fn node_name(&self, id: NodeId) -> NameParts<'_> {
        NameParts {
            qualified: self.doc.name(id),
            prefix: self.doc.prefix(id),
            local: self.doc.local_name(id),
            namespace: self.doc.namespace_uri(id),
        }
    }

    fn attribute_name(&self, id: AttrId) -> NameParts<'_> {
        let doc = self.doc;
        let prefix = doc
            .attribute(id)
            .filter(|a| a.prefix_id != 0)
            .map(|a| doc.strings().get(a.prefix_id));
        NameParts {
            qualified: doc.attribute_name(id),
            prefix,
            local: doc.attribute_local_name(id),
            namespace: doc.attribute_namespace_uri(id),
        }
    }

    fn attribute_ids(&self, id: NodeId) -> Vec<AttrId> {
        self.doc
            .attribute_ids(id)
            .filter(|&aid| self.doc.attribute(aid).is_some_and(|a| !a.is_namespace_decl))
            .collect()
    }
}

/// Qualified names as opaque strings; `xmlns` attributes are ordinary attributes
#[derive(Debug, Clone, Copy)]
pub struct NamespaceUnawareView<'d> {
    doc: &'d LocatedDocument,
}

impl<'d> NamespaceUnawareView<'d> {
    pub fn new(doc: &'d LocatedDocument) -> Self {
        NamespaceUnawareView { doc }
    }
}

impl DocumentAccess for NamespaceUnawareView<'_> {
    #[inline]
    fn document(&self) -> &LocatedDocument {
        self.doc
    }

    fn is_namespace_aware(&self) -> bool {
        false
    }

    fn node_name(&self, id: NodeId) -> NameParts<'_> {
        NameParts::opaque(self.doc.name(id))
    }

    fn attribute_name(&self, id: AttrId) -> NameParts<'_> {
        NameParts::opaque(self.doc.attribute_name(id))
    }

    fn attribute_ids(&self, id: NodeId) -> Vec<AttrId> {
        self.doc.attribute_ids(id).collect()
    }
}
