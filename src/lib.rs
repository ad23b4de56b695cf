//! locatedxml - location-precise XML parsing and XPath querying
//!
//! Pipeline:
//! 1. Encoding detection: BOM, then the prolog `encoding`, then a default
//! 2. Coarse events from quick-xml, with approximate byte spans
//! 3. Reconciliation: a text cursor rescans each event for exact ranges
//! 4. Located document: one arena, namespace-aware and unaware views
//! 5. XPath 1.0 over either view, highlighting, and rule checks
//!
//! ```
//! use locatedxml::{LocatedDocument, LocationKind};
//!
//! let doc = LocatedDocument::parse("<foo attr=\"1\">\n </foo>").unwrap();
//! let root = doc.root_element().unwrap();
//! let start = doc.range(root, LocationKind::Start).unwrap();
//! assert_eq!(start.slice(doc.source()), "<foo attr=\"1\">");
//! assert_eq!((start.end.line, start.end.column), (1, 14));
//! ```

pub mod analyzer;
pub mod check;
pub mod core;
pub mod dom;
pub mod error;
pub mod highlight;
pub mod options;
pub mod reader;
mod reconcile;
pub mod xpath;

pub use crate::analyzer::{Analyzer, FileAnalysis, FileReport, InputFile};
pub use crate::check::{
    Check, CheckContext, Issue, IssueLocation, RuleKey, RuleParams, RuleRegistry,
    SecondaryLocation, XPathCheck,
};
pub use crate::core::{Cursor, CursorError, Encoding, EntityTable, LocationKind, Position, Range};
pub use crate::dom::{
    DocumentAccess, Locatable, LocatedDocument, NamespaceAwareView, NamespaceContext,
    NamespaceUnawareView, NodeId, NodeKind, DOCUMENT_NODE,
};
pub use crate::error::{
    ConfigurationError, EncodingError, ParseError, QueryError, ResourceResolutionWarning,
};
pub use crate::highlight::{highlight, Highlight, TokenCategory};
pub use crate::options::{AnalyzerConfig, ParseOptions};
pub use crate::xpath::{evaluate, QueryCache, XPathNode, XPathQuery, XPathValue};
