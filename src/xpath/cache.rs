//! Compiled queries and the shared compile cache

use super::compiler::{self, CompiledExpr};
use super::eval::{evaluate_compiled, EvalContext};
use super::value::{XPathNode, XPathValue};
use crate::dom::{DocumentAccess, NamespaceContext};
use crate::error::{ConfigurationError, QueryError};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

/// A compiled XPath expression together with the text it came from
#[derive(Debug, Clone, PartialEq)]
pub struct XPathQuery {
    expression: String,
    compiled: CompiledExpr,
}

impl XPathQuery {
    /// Compile with no prefix bindings
    pub fn compile(expression: &str) -> Result<Self, ConfigurationError> {
        Self::compile_with_namespaces(expression, &NamespaceContext::new())
    }

    /// Compile, resolving `p:name` tests against `namespaces`
    pub fn compile_with_namespaces(
        expression: &str,
        namespaces: &NamespaceContext,
    ) -> Result<Self, ConfigurationError> {
        let compiled = compiler::compile(expression, namespaces).map_err(|message| {
            ConfigurationError::InvalidExpression {
                expression: expression.to_string(),
                message,
            }
        })?;
        Ok(XPathQuery {
            expression: expression.to_string(),
            compiled,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// A name-test prefix left unresolved at compile time. Such a test
    /// matches nothing in the namespace-aware view.
    pub fn unbound_prefix(&self) -> Option<&str> {
        self.compiled.unbound_prefix()
    }

    /// Evaluate from `context` against a document view
    pub fn evaluate<D: DocumentAccess + ?Sized>(
        &self,
        view: &D,
        context: impl Into<XPathNode>,
    ) -> Result<XPathValue, QueryError> {
        evaluate_compiled(&self.compiled, &EvalContext::new(view, context))
    }
}

/// LRU cache of compiled queries, shared across worker threads.
///
/// The key includes the prefix bindings: the same text compiles differently
/// under different namespace contexts.
pub struct QueryCache {
    entries: Mutex<LruCache<(String, NamespaceContext), Arc<XPathQuery>>>,
}

impl QueryCache {
    pub const DEFAULT_CAPACITY: usize = 256;

    /// A capacity of 0 is treated as 1
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        QueryCache {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Return the cached query, compiling and caching it on a miss.
    /// Compile errors are not cached.
    pub fn get_or_compile(
        &self,
        expression: &str,
        namespaces: &NamespaceContext,
    ) -> Result<Arc<XPathQuery>, ConfigurationError> {
        let key = (expression.to_string(), namespaces.clone());
        if let Some(query) = self.lock().get(&key) {
            return Ok(Arc::clone(query));
        }

        // Compile outside the lock; a racing thread may compile the same text
        let query = Arc::new(XPathQuery::compile_with_namespaces(expression, namespaces)?);
        self.lock().put(key, Arc::clone(&query));
        Ok(query)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<(String, NamespaceContext), Arc<XPathQuery>>> {
        // Entries are immutable once inserted, so a poisoned lock is still usable
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache").field("len", &self.len()).finish()
    }
}
