//! Namespace Resolution
//!
//! Stack-based namespace resolver used while the document is built, and the
//! prefix map queries carry for namespace-aware name tests.

use super::strings::StringPool;
use std::collections::BTreeMap;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Namespace binding (prefix -> URI)
#[derive(Debug, Clone)]
struct NsBinding {
    prefix_id: u32,
    /// 0 undeclares (`xmlns=""`)
    uri_id: u32,
    depth: u16,
}

/// Stack-based namespace resolver
#[derive(Debug)]
pub struct NamespaceResolver {
    bindings: Vec<NsBinding>,
    depth: u16,
    xml_prefix_id: u32,
    xmlns_prefix_id: u32,
}

impl NamespaceResolver {
    /// Create a new namespace resolver with pre-declared xml and xmlns namespaces
    pub fn new(strings: &mut StringPool) -> Self {
        let xml_prefix_id = strings.intern("xml");
        let xmlns_prefix_id = strings.intern("xmlns");
        let xml_uri_id = strings.intern(ns::XML);
        let xmlns_uri_id = strings.intern(ns::XMLNS);

        NamespaceResolver {
            bindings: vec![
                NsBinding {
                    prefix_id: xml_prefix_id,
                    uri_id: xml_uri_id,
                    depth: 0,
                },
                NsBinding {
                    prefix_id: xmlns_prefix_id,
                    uri_id: xmlns_uri_id,
                    depth: 0,
                },
            ],
            depth: 0,
            xml_prefix_id,
            xmlns_prefix_id,
        }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, removing any bindings declared in it
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a namespace binding for the current scope
    pub fn declare(&mut self, prefix_id: u32, uri_id: u32) {
        // Don't allow redeclaring xml or xmlns
        if prefix_id == self.xml_prefix_id || prefix_id == self.xmlns_prefix_id {
            return;
        }
        self.bindings.push(NsBinding {
            prefix_id,
            uri_id,
            depth: self.depth,
        });
    }

    /// Declare the default namespace for current scope (0 clears it)
    pub fn declare_default(&mut self, uri_id: u32) {
        self.declare(0, uri_id);
    }

    /// Resolve a prefix to a namespace URI ID. `Some(0)` means explicitly unbound.
    pub fn resolve(&self, prefix_id: u32) -> Option<u32> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix_id == prefix_id)
            .map(|b| b.uri_id)
    }

    /// Resolve the default namespace, 0 when there is none
    pub fn resolve_default(&self) -> u32 {
        self.resolve(0).unwrap_or(0)
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }
}

/// Prefix bindings a query uses to resolve `p:name` tests in the
/// namespace-aware view
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NamespaceContext {
    bindings: BTreeMap<String, String>,
}

impl NamespaceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.bind(prefix, uri);
        self
    }

    pub fn bind(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.bindings.insert(prefix.into(), uri.into());
    }

    /// Resolve a prefix. `xml` is always bound.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        match self.bindings.get(prefix) {
            Some(uri) => Some(uri.as_str()),
            None if prefix == "xml" => Some(ns::XML),
            None => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }
}

impl<P: Into<String>, U: Into<String>> FromIterator<(P, U)> for NamespaceContext {
    fn from_iter<I: IntoIterator<Item = (P, U)>>(iter: I) -> Self {
        let mut context = NamespaceContext::new();
        for (prefix, uri) in iter {
            context.bind(prefix, uri);
        }
        context
    }
}
