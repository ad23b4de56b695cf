//! XPath Axes Implementation
//!
//! All 13 XPath 1.0 axes:
//! - child, parent, self
//! - descendant, descendant-or-self
//! - ancestor, ancestor-or-self
//! - following, following-sibling
//! - preceding, preceding-sibling
//! - attribute, namespace (always empty)
//!
//! Every axis returns nodes in proximity order: document order for forward
//! axes, reverse document order for reverse axes. Node ids are assigned in
//! document order, so following/preceding are id ranges.

use super::compiler::CompiledNodeTest;
use super::parser::Axis;
use super::value::XPathNode;
use crate::dom::{DocumentAccess, NodeId, NodeKind};

/// Navigate along an axis from a context node
pub fn navigate<D: DocumentAccess + ?Sized>(doc: &D, context: XPathNode, axis: Axis) -> Vec<XPathNode> {
    match context {
        XPathNode::Node(id) => navigate_node(doc, id, axis),
        XPathNode::Attribute { owner, .. } => navigate_attribute(doc, context, owner, axis),
    }
}

fn navigate_node<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId, axis: Axis) -> Vec<XPathNode> {
    let ids = match axis {
        Axis::Child => doc.children_vec(context),
        Axis::Descendant => doc.descendants_vec(context),
        Axis::DescendantOrSelf => descendant_or_self_axis(doc, context),
        Axis::Parent => doc.parent_of(context).into_iter().collect(),
        Axis::Ancestor => ancestor_axis(doc, context),
        Axis::AncestorOrSelf => {
            let mut result = vec![context];
            result.extend(ancestor_axis(doc, context));
            result
        }
        Axis::FollowingSibling => sibling_axis(context, |id| doc.next_sibling_of(id)),
        Axis::PrecedingSibling => sibling_axis(context, |id| doc.prev_sibling_of(id)),
        Axis::Following => following_axis(doc, context),
        Axis::Preceding => preceding_axis(doc, context),
        Axis::Self_ => vec![context],
        Axis::Attribute => {
            return doc
                .attribute_ids(context)
                .into_iter()
                .map(|attr| XPathNode::Attribute { owner: context, attr })
                .collect()
        }
        Axis::Namespace => Vec::new(),
    };
    in_data_model(doc, ids)
}

/// Drop nodes the XPath data model has no place for: the doctype is
/// recorded for ranges and highlighting, but never selected
fn in_data_model<D: DocumentAccess + ?Sized>(doc: &D, ids: Vec<NodeId>) -> Vec<XPathNode> {
    ids.into_iter()
        .filter(|&id| doc.node_kind_of(id) != Some(NodeKind::DocType))
        .map(XPathNode::Node)
        .collect()
}

/// Axes from an attribute node: it has a parent but no children or siblings
fn navigate_attribute<D: DocumentAccess + ?Sized>(
    doc: &D,
    context: XPathNode,
    owner: NodeId,
    axis: Axis,
) -> Vec<XPathNode> {
    let ids = match axis {
        Axis::Self_ | Axis::DescendantOrSelf => return vec![context],
        Axis::Parent => vec![owner],
        Axis::Ancestor => {
            let mut result = vec![owner];
            result.extend(ancestor_axis(doc, owner));
            result
        }
        Axis::AncestorOrSelf => {
            let mut result = vec![context];
            result.push(XPathNode::Node(owner));
            result.extend(ancestor_axis(doc, owner).into_iter().map(XPathNode::Node));
            return result;
        }
        // The owner's content follows its attributes
        Axis::Following => {
            let mut result = doc.descendants_vec(owner);
            result.extend(following_axis(doc, owner));
            result
        }
        Axis::Preceding => preceding_axis(doc, owner),
        Axis::Child
        | Axis::Descendant
        | Axis::FollowingSibling
        | Axis::PrecedingSibling
        | Axis::Attribute
        | Axis::Namespace => Vec::new(),
    };
    in_data_model(doc, ids)
}

/// descendant-or-self:: axis - context node plus all descendants
fn descendant_or_self_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let descendants = doc.descendants_vec(context);
    let mut result = Vec::with_capacity(1 + descendants.len());
    result.push(context);
    result.extend(descendants);
    result
}

/// ancestor:: axis - parent, grandparent, ... up to the document node
fn ancestor_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = context;

    while let Some(parent) = doc.parent_of(current) {
        result.push(parent);
        current = parent;
    }

    result
}

/// following-sibling:: / preceding-sibling::, walking with `next`
fn sibling_axis(context: NodeId, next: impl Fn(NodeId) -> Option<NodeId>) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut sibling = next(context);
    while let Some(sib_id) = sibling {
        result.push(sib_id);
        sibling = next(sib_id);
    }
    result
}

/// Last node in the subtree rooted at `id`
fn subtree_end<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> NodeId {
    let document = doc.document();
    let mut last = id;
    while let Some(child) = document.node(last).and_then(|n| n.last_child) {
        last = child;
    }
    last
}

/// following:: axis - everything after the context's subtree
fn following_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let start = subtree_end(doc, context) + 1;
    let end = doc.document().node_count() as NodeId;
    (start..end).collect()
}

/// preceding:: axis - everything before the context that is not an ancestor,
/// nearest first
fn preceding_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let ancestors = ancestor_axis(doc, context);
    (0..context).rev().filter(|id| !ancestors.contains(id)).collect()
}

/// Check if a node matches a node test. `axis` decides the principal node type.
pub fn matches_node_test<D: DocumentAccess + ?Sized>(
    doc: &D,
    node: XPathNode,
    axis: Axis,
    test: &CompiledNodeTest,
) -> bool {
    match node {
        XPathNode::Attribute { attr, .. } => match test {
            CompiledNodeTest::Node => true,
            CompiledNodeTest::Any => axis == Axis::Attribute,
            CompiledNodeTest::Name(_)
            | CompiledNodeTest::QName { .. }
            | CompiledNodeTest::NamespaceWildcard { .. } => {
                axis == Axis::Attribute && matches_name(doc, doc.attribute_name(attr), test)
            }
            _ => false,
        },
        XPathNode::Node(id) => {
            let Some(kind) = doc.node_kind_of(id) else {
                return false;
            };
            match test {
                CompiledNodeTest::Node => true,
                CompiledNodeTest::Text => matches!(kind, NodeKind::Text | NodeKind::CData),
                CompiledNodeTest::Comment => kind == NodeKind::Comment,
                CompiledNodeTest::ProcessingInstruction(target) => {
                    kind == NodeKind::ProcessingInstruction
                        && target
                            .as_deref()
                            .is_none_or(|t| doc.document().name(id) == t)
                }
                CompiledNodeTest::Any => kind == NodeKind::Element && axis != Axis::Attribute,
                _ => {
                    kind == NodeKind::Element
                        && axis != Axis::Attribute
                        && matches_name(doc, doc.node_name(id), test)
                }
            }
        }
    }
}

/// Name tests. The aware view compares (namespace, local name); the unaware
/// view compares qualified names literally.
fn matches_name<D: DocumentAccess + ?Sized>(
    doc: &D,
    name: crate::dom::NameParts<'_>,
    test: &CompiledNodeTest,
) -> bool {
    let aware = doc.is_namespace_aware();
    match test {
        CompiledNodeTest::Name(n) if aware => name.local == n && name.namespace.is_none(),
        CompiledNodeTest::Name(n) => name.qualified == n,
        CompiledNodeTest::QName { local, uri, .. } if aware => match uri {
            Some(uri) => name.local == local && name.namespace == Some(uri.as_str()),
            None => false,
        },
        CompiledNodeTest::QName { prefix, local, .. } => name
            .qualified
            .split_once(':')
            .is_some_and(|(p, l)| p == prefix && l == local),
        CompiledNodeTest::NamespaceWildcard { uri, .. } if aware => {
            uri.is_some() && name.namespace == uri.as_deref()
        }
        CompiledNodeTest::NamespaceWildcard { prefix, .. } => name
            .qualified
            .split_once(':')
            .is_some_and(|(p, _)| p == prefix),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::LocatedDocument;

    fn ids(nodes: Vec<XPathNode>) -> Vec<NodeId> {
        nodes.into_iter().filter_map(|n| n.as_node()).collect()
    }

    #[test]
    fn test_child_axis() {
        let doc = LocatedDocument::parse("<root><a/><b/></root>").unwrap();
        let view = doc.aware();
        let root = doc.root_element().unwrap();
        assert_eq!(navigate(&view, XPathNode::Node(root), Axis::Child).len(), 2);
    }

    #[test]
    fn test_ancestor_axis() {
        let doc = LocatedDocument::parse("<root><a><b/></a></root>").unwrap();
        let view = doc.aware();
        let b = doc.descendants(0).find(|&id| doc.name(id) == "b").unwrap();
        let ancestors = navigate(&view, XPathNode::Node(b), Axis::Ancestor);
        assert_eq!(ancestors.len(), 3); // a, root, document
    }

    #[test]
    fn test_following_and_preceding() {
        let doc = LocatedDocument::parse("<r><a><x/></a><b/><c><y/></c></r>").unwrap();
        let view = doc.aware();
        let find = |name: &str| doc.descendants(0).find(|&id| doc.name(id) == name).unwrap();

        let following: Vec<_> = ids(navigate(&view, XPathNode::Node(find("a")), Axis::Following))
            .into_iter()
            .map(|id| doc.name(id))
            .collect();
        assert_eq!(following, vec!["b", "c", "y"]);

        let preceding: Vec<_> = ids(navigate(&view, XPathNode::Node(find("y")), Axis::Preceding))
            .into_iter()
            .map(|id| doc.name(id))
            .collect();
        assert_eq!(preceding, vec!["b", "x", "a"]);
    }

    #[test]
    fn test_proximity_order() {
        let doc = LocatedDocument::parse("<r><a/><b><c/><d><e/></d></b><f/></r>").unwrap();
        let view = doc.aware();
        let d = XPathNode::Node(doc.descendants(0).find(|&id| doc.name(id) == "d").unwrap());
        for axis in [
            Axis::Ancestor,
            Axis::AncestorOrSelf,
            Axis::Preceding,
            Axis::PrecedingSibling,
            Axis::Following,
            Axis::Descendant,
        ] {
            let nodes = navigate(&view, d, axis);
            assert!(!nodes.is_empty(), "{axis:?}");
            let descending = nodes.windows(2).all(|w| w[0] > w[1]);
            let ascending = nodes.windows(2).all(|w| w[0] < w[1]);
            if axis.is_reverse() {
                assert!(descending, "{axis:?}");
            } else {
                assert!(ascending, "{axis:?}");
            }
        }
    }

    #[test]
    fn test_doctype_is_not_selected() {
        let doc = LocatedDocument::parse("<!DOCTYPE r><r><a/></r>").unwrap();
        let view = doc.unaware();
        let root = doc.root_element().unwrap();
        let a = doc.descendants(0).find(|&id| doc.name(id) == "a").unwrap();

        assert_eq!(ids(navigate(&view, XPathNode::Node(0), Axis::Child)), vec![root]);
        assert_eq!(ids(navigate(&view, XPathNode::Node(0), Axis::Descendant)), vec![root, a]);
        assert!(navigate(&view, XPathNode::Node(root), Axis::PrecedingSibling).is_empty());
        assert!(navigate(&view, XPathNode::Node(a), Axis::Preceding).is_empty());
    }

    #[test]
    fn test_attribute_axis_follows_view() {
        let doc = LocatedDocument::parse("<r xmlns:p='urn:p' p:a='1' b='2'/>").unwrap();
        let root = XPathNode::Node(doc.root_element().unwrap());
        assert_eq!(navigate(&doc.aware(), root, Axis::Attribute).len(), 2);
        assert_eq!(navigate(&doc.unaware(), root, Axis::Attribute).len(), 3);
    }

    #[test]
    fn test_attribute_parent() {
        let doc = LocatedDocument::parse("<r a='1'/>").unwrap();
        let view = doc.aware();
        let root = doc.root_element().unwrap();
        let attr = navigate(&view, XPathNode::Node(root), Axis::Attribute)[0];
        assert_eq!(navigate(&view, attr, Axis::Parent), vec![XPathNode::Node(root)]);
        assert!(navigate(&view, attr, Axis::Child).is_empty());
    }

    #[test]
    fn test_name_tests_per_view() {
        let doc = LocatedDocument::parse("<r xmlns:p='urn:p'><p:a/></r>").unwrap();
        let a = XPathNode::Node(doc.descendants(0).find(|&id| doc.local_name(id) == "a").unwrap());
        let qname = CompiledNodeTest::QName {
            prefix: "q".to_string(),
            local: "a".to_string(),
            uri: Some("urn:p".to_string()),
        };
        // The aware view matches by namespace, whatever the prefix
        assert!(matches_node_test(&doc.aware(), a, Axis::Child, &qname));
        assert!(!matches_node_test(&doc.unaware(), a, Axis::Child, &qname));

        let literal = CompiledNodeTest::Name("p:a".to_string());
        assert!(matches_node_test(&doc.unaware(), a, Axis::Child, &literal));
        assert!(!matches_node_test(&doc.aware(), a, Axis::Child, &literal));
    }
}
