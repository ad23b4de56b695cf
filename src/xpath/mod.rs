//! XPath 1.0 Engine
//!
//! Full XPath 1.0 implementation with:
//! - All 13 axes (namespace is always empty)
//! - The core function library
//! - Attribute nodes in node-sets, with their source ranges
//! - Compiled expression caching

pub mod axes;
pub mod cache;
pub mod compiler;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use cache::{QueryCache, XPathQuery};
pub use eval::EvalContext;
pub use value::{XPathNode, XPathValue};

use crate::dom::DocumentAccess;
use crate::error::{ConfigurationError, QueryError};

/// Why a one-off evaluation failed
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvaluateError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Compile and evaluate an expression once, with no prefix bindings.
///
/// Each call is a fresh evaluation; use [`XPathQuery`] or [`QueryCache`]
/// to compile once and evaluate many times.
pub fn evaluate<D: DocumentAccess + ?Sized>(
    expression: &str,
    context: impl Into<XPathNode>,
    view: &D,
) -> Result<XPathValue, EvaluateError> {
    let query = XPathQuery::compile(expression)?;
    Ok(query.evaluate(view, context)?)
}
