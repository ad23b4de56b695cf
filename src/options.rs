//! Parse and analysis options

use crate::core::{Encoding, EntityTable};
use std::sync::Arc;

/// How source bytes are turned into a located document
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Used when neither a BOM nor a declaration names the encoding
    pub default_encoding: Option<Encoding>,
    /// Named entities recognised in text and attribute values
    pub entities: Arc<EntityTable>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            default_encoding: None,
            entities: EntityTable::standard(),
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_encoding(mut self, encoding: Encoding) -> Self {
        self.default_encoding = Some(encoding);
        self
    }

    pub fn with_entities(mut self, entities: Arc<EntityTable>) -> Self {
        self.entities = entities;
        self
    }
}

/// Settings for a batch [`Analyzer`](crate::analyzer::Analyzer)
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub parse: ParseOptions,
    /// Compiled expressions kept in the shared query cache
    pub query_cache_capacity: usize,
    /// Analyze files on the rayon pool instead of the calling thread
    pub parallel: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            parse: ParseOptions::default(),
            query_cache_capacity: 256,
            parallel: true,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_parse_options(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }

    pub fn with_query_cache_capacity(mut self, capacity: usize) -> Self {
        self.query_cache_capacity = capacity;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}
