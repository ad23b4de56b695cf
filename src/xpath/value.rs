//! XPath Value Types
//!
//! XPath 1.0 has four data types: node-set, boolean, number, and string.
//! Node-sets hold real attribute nodes alongside tree nodes.

use crate::core::range::{LocationKind, Range};
use crate::dom::{AttrId, DocumentAccess, NodeId, NodeKind};
use std::cmp::Ordering;

/// A member of a node-set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XPathNode {
    /// Document, element, text, CDATA, comment, PI or doctype node
    Node(NodeId),
    /// An attribute, owned by an element
    Attribute { owner: NodeId, attr: AttrId },
}

impl XPathNode {
    /// Position in document order: an element's attributes sit after the
    /// element and before its children
    #[inline]
    fn order_key(&self) -> (NodeId, u64) {
        match *self {
            XPathNode::Node(id) => (id, 0),
            XPathNode::Attribute { owner, attr } => (owner, attr as u64 + 1),
        }
    }

    /// The tree node itself, or the owning element of an attribute
    #[inline]
    pub fn anchor(&self) -> NodeId {
        match *self {
            XPathNode::Node(id) => id,
            XPathNode::Attribute { owner, .. } => owner,
        }
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match *self {
            XPathNode::Node(id) => Some(id),
            XPathNode::Attribute { .. } => None,
        }
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self, XPathNode::Attribute { .. })
    }

    /// XPath string-value
    pub fn string_value<D: DocumentAccess + ?Sized>(&self, doc: &D) -> String {
        match *self {
            XPathNode::Node(id) => doc.string_value(id),
            XPathNode::Attribute { attr, .. } => doc.document().attribute_value(attr).to_string(),
        }
    }

    /// Range of this node: START for elements, NODE for everything else
    pub fn report_range<D: DocumentAccess + ?Sized>(&self, doc: &D) -> Option<Range> {
        let document = doc.document();
        match *self {
            XPathNode::Node(id) if document.kind(id) == Some(NodeKind::Element) => {
                document.range(id, LocationKind::Start)
            }
            XPathNode::Node(id) => document.range(id, LocationKind::Node),
            XPathNode::Attribute { attr, .. } => document.attribute_range(attr, LocationKind::Node),
        }
    }
}

impl Ord for XPathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

impl PartialOrd for XPathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<NodeId> for XPathNode {
    fn from(id: NodeId) -> Self {
        XPathNode::Node(id)
    }
}

/// Sort into document order and drop duplicates
pub fn document_order(nodes: &mut Vec<XPathNode>) {
    nodes.sort_unstable();
    nodes.dedup();
}

/// XPath value types
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum XPathValue {
    /// A set of nodes (document order, no duplicates)
    NodeSet(Vec<XPathNode>),
    /// Boolean value
    Boolean(bool),
    /// Floating-point number
    Number(f64),
    /// String value
    String(String),
}

impl XPathValue {
    /// Create an empty node set
    pub fn empty_nodeset() -> Self {
        XPathValue::NodeSet(Vec::new())
    }

    /// Create a node set with a single node
    pub fn single_node(node: impl Into<XPathNode>) -> Self {
        XPathValue::NodeSet(vec![node.into()])
    }

    /// Convert to boolean (XPath boolean() function semantics)
    pub fn to_boolean(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::Boolean(b) => *b,
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::String(s) => !s.is_empty(),
        }
    }

    /// Convert to number (XPath number() function semantics)
    pub fn to_number<D: DocumentAccess + ?Sized>(&self, doc: &D) -> f64 {
        match self {
            XPathValue::NodeSet(_) => parse_number(&self.to_string_value(doc)),
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => parse_number(s),
        }
    }

    /// Convert to string (XPath string() function semantics). A node-set
    /// converts to the string-value of its first node.
    pub fn to_string_value<D: DocumentAccess + ?Sized>(&self, doc: &D) -> String {
        match self {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|node| node.string_value(doc))
                .unwrap_or_default(),
            XPathValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            XPathValue::Number(n) => format_number(*n),
            XPathValue::String(s) => s.clone(),
        }
    }

    /// Check if this is a node set
    pub fn is_nodeset(&self) -> bool {
        matches!(self, XPathValue::NodeSet(_))
    }

    /// Get as node set, or None
    pub fn as_nodeset(&self) -> Option<&[XPathNode]> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// Consume into a node set, or None
    pub fn into_nodeset(self) -> Option<Vec<XPathNode>> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// Type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::Boolean(_) => "boolean",
            XPathValue::Number(_) => "number",
            XPathValue::String(_) => "string",
        }
    }
}

impl Default for XPathValue {
    fn default() -> Self {
        XPathValue::NodeSet(Vec::new())
    }
}

impl From<bool> for XPathValue {
    fn from(b: bool) -> Self {
        XPathValue::Boolean(b)
    }
}

impl From<f64> for XPathValue {
    fn from(n: f64) -> Self {
        XPathValue::Number(n)
    }
}

impl From<String> for XPathValue {
    fn from(s: String) -> Self {
        XPathValue::String(s)
    }
}

impl From<&str> for XPathValue {
    fn from(s: &str) -> Self {
        XPathValue::String(s.to_string())
    }
}

impl From<Vec<XPathNode>> for XPathValue {
    fn from(nodes: Vec<XPathNode>) -> Self {
        XPathValue::NodeSet(nodes)
    }
}

/// Parse a string as an XPath number: optional whitespace, optional minus,
/// digits with an optional fraction. Anything else is NaN.
pub fn parse_number(s: &str) -> f64 {
    let s = s.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r'));
    let digits = s.strip_prefix('-').unwrap_or(s);
    let valid = !digits.is_empty()
        && digits != "."
        && digits.bytes().filter(|&b| b == b'.').count() <= 1
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.');
    if valid {
        s.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// Format a number per XPath string() rules
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::LocatedDocument;

    #[test]
    fn test_boolean_conversion() {
        assert!(XPathValue::single_node(XPathNode::Node(1)).to_boolean());
        assert!(!XPathValue::NodeSet(vec![]).to_boolean());
        assert!(XPathValue::Boolean(true).to_boolean());
        assert!(XPathValue::Number(1.0).to_boolean());
        assert!(!XPathValue::Number(0.0).to_boolean());
        assert!(!XPathValue::Number(f64::NAN).to_boolean());
        assert!(XPathValue::String("false".to_string()).to_boolean());
        assert!(!XPathValue::String(String::new()).to_boolean());
    }

    #[test]
    fn test_number_parsing() {
        assert_eq!(parse_number(" 42 "), 42.0);
        assert_eq!(parse_number("-1.5"), -1.5);
        assert_eq!(parse_number(".5"), 0.5);
        assert!(parse_number("abc").is_nan());
        assert!(parse_number("1e3").is_nan());
        assert!(parse_number("+1").is_nan());
        assert!(parse_number("").is_nan());
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(3.25), "3.25");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn test_node_set_string_value() {
        let doc = LocatedDocument::parse("<r a='7'><b>x</b><b>y</b></r>").unwrap();
        let view = doc.aware();
        let root = doc.root_element().unwrap();
        let bs: Vec<_> = doc.child_elements(root).map(XPathNode::Node).collect();
        assert_eq!(XPathValue::NodeSet(bs).to_string_value(&view), "x");

        let attr = doc.attribute_by_name(root, "a").unwrap();
        let value = XPathValue::single_node(XPathNode::Attribute { owner: root, attr });
        assert_eq!(value.to_number(&view), 7.0);
    }

    #[test]
    fn test_attributes_order_between_owner_and_children() {
        let owner = XPathNode::Node(3);
        let attr = XPathNode::Attribute { owner: 3, attr: 0 };
        let child = XPathNode::Node(4);
        let mut nodes = vec![child, attr, owner, attr];
        document_order(&mut nodes);
        assert_eq!(nodes, vec![owner, attr, child]);
    }
}
