//! Batch analysis
//!
//! Each file goes decode -> parse -> checks -> highlight on one worker.
//! Files are independent: a parse failure is logged and reported for that
//! file only, and reports come back in input order.

use crate::check::{Issue, RuleRegistry};
use crate::dom::LocatedDocument;
use crate::error::{ParseError, ResourceResolutionWarning};
use crate::highlight::{highlight, Highlight};
use crate::options::AnalyzerConfig;
use crate::xpath::QueryCache;
use rayon::prelude::*;
use std::sync::Arc;

/// One file to analyze. The id only appears in reports and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub id: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(id: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        InputFile {
            id: id.into(),
            bytes: bytes.into(),
        }
    }
}

/// Results for a file that parsed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileAnalysis {
    pub issues: Vec<Issue>,
    pub highlights: Vec<Highlight>,
    pub warnings: Vec<ResourceResolutionWarning>,
}

/// Outcome for one input file
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub file_id: String,
    pub outcome: Result<FileAnalysis, ParseError>,
}

impl FileReport {
    pub fn analysis(&self) -> Option<&FileAnalysis> {
        self.outcome.as_ref().ok()
    }

    pub fn parse_error(&self) -> Option<&ParseError> {
        self.outcome.as_ref().err()
    }

    /// Issues found, empty for a file that failed to parse
    pub fn issues(&self) -> &[Issue] {
        self.analysis().map(|a| a.issues.as_slice()).unwrap_or_default()
    }
}

/// Runs the registered rules and the highlighter over many files
#[derive(Debug)]
pub struct Analyzer {
    config: AnalyzerConfig,
    registry: RuleRegistry,
    cache: Arc<QueryCache>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let cache = Arc::new(QueryCache::new(config.query_cache_capacity));
        Analyzer {
            config,
            registry: RuleRegistry::new(),
            cache,
        }
    }

    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RuleRegistry {
        &mut self.registry
    }

    /// Compiled-expression cache for configuring XPath rules
    pub fn query_cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Analyze one file
    pub fn analyze(&self, file: &InputFile) -> FileReport {
        let outcome = self.analyze_document(file);
        if let Err(error) = &outcome {
            tracing::warn!(
                file = %file.id,
                line = error.line(),
                error = %error,
                "skipping file that failed to parse"
            );
        }
        FileReport {
            file_id: file.id.clone(),
            outcome,
        }
    }

    /// Analyze every file, on the rayon pool unless configured sequential.
    /// Reports are in input order.
    pub fn analyze_all(&self, files: &[InputFile]) -> Vec<FileReport> {
        if self.config.parallel {
            files.par_iter().map(|file| self.analyze(file)).collect()
        } else {
            files.iter().map(|file| self.analyze(file)).collect()
        }
    }

    fn analyze_document(&self, file: &InputFile) -> Result<FileAnalysis, ParseError> {
        let document = LocatedDocument::from_bytes(&file.bytes, &self.config.parse)?;
        let issues = self.registry.scan(&file.id, &document);
        let highlights = highlight(&document);
        tracing::debug!(
            file = %file.id,
            nodes = document.node_count(),
            issues = issues.len(),
            highlights = highlights.len(),
            "analyzed file"
        );
        Ok(FileAnalysis {
            issues,
            highlights,
            warnings: document.warnings().to_vec(),
        })
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}
