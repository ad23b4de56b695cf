//! Generic XPath-driven rule
//!
//! Parameters:
//! - `expression` (required): XPath 1.0 expression, evaluated from the document node
//! - `message`: issue message
//! - `filePattern`: regex matched against the file id; other files are skipped
//! - `namespaceAware`: evaluate against the namespace-aware view (default false)
//! - `namespaces`: prefix bindings for the aware view, `p=uri` separated by
//!   whitespace or commas. With `namespaceAware`, every prefix in the
//!   expression must be bound here.
//!
//! A node-set result reports one issue per node: elements at their start
//! tag, everything else at its full range. A boolean `true` reports a
//! file-level issue.

use super::{Check, CheckContext, RuleKey, RuleParams};
use crate::dom::{DocumentAccess, NamespaceContext, DOCUMENT_NODE};
use crate::error::ConfigurationError;
use crate::xpath::{QueryCache, XPathQuery, XPathValue};
use regex::Regex;
use std::sync::Arc;

pub struct XPathCheck {
    key: RuleKey,
    query: Arc<XPathQuery>,
    message: String,
    file_pattern: Option<Regex>,
    namespace_aware: bool,
}

impl XPathCheck {
    pub const DEFAULT_MESSAGE: &'static str = "The XPath expression matches this piece of code";

    /// A check for `expression` with the default message, on the unaware view
    pub fn new(key: impl Into<RuleKey>, expression: &str) -> Result<Self, ConfigurationError> {
        Ok(XPathCheck {
            key: key.into(),
            query: Arc::new(XPathQuery::compile(expression)?),
            message: Self::DEFAULT_MESSAGE.to_string(),
            file_pattern: None,
            namespace_aware: false,
        })
    }

    /// Configure from host parameters, compiling through the shared cache
    pub fn from_params(
        key: impl Into<RuleKey>,
        params: &RuleParams,
        cache: &QueryCache,
    ) -> Result<Self, ConfigurationError> {
        let expression = params.required_str("expression")?;
        let namespaces = match params.get_str("namespaces") {
            Some(raw) => parse_namespaces(raw)?,
            None => NamespaceContext::new(),
        };
        let check = XPathCheck {
            key: key.into(),
            query: cache.get_or_compile(expression, &namespaces)?,
            message: params
                .get_str("message")
                .unwrap_or(Self::DEFAULT_MESSAGE)
                .to_string(),
            file_pattern: params.get_regex("filePattern")?,
            namespace_aware: false,
        };
        check.namespace_aware(params.get_bool("namespaceAware")?.unwrap_or(false))
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_file_pattern(mut self, pattern: Regex) -> Self {
        self.file_pattern = Some(pattern);
        self
    }

    /// Switch views. The aware view needs every prefix in the expression
    /// bound to a namespace.
    pub fn namespace_aware(mut self, aware: bool) -> Result<Self, ConfigurationError> {
        if aware {
            if let Some(prefix) = self.query.unbound_prefix() {
                return Err(ConfigurationError::InvalidExpression {
                    expression: self.query.expression().to_string(),
                    message: format!("namespace prefix '{prefix}' is not bound"),
                });
            }
        }
        self.namespace_aware = aware;
        Ok(self)
    }

    pub fn expression(&self) -> &str {
        self.query.expression()
    }

    fn report<D: DocumentAccess>(&self, view: &D, ctx: &mut CheckContext<'_>) {
        let value = match self.query.evaluate(view, DOCUMENT_NODE) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(
                    rule = %self.key,
                    file = ctx.file_id(),
                    error = %error,
                    "XPath evaluation failed; rule skipped for this file"
                );
                return;
            }
        };

        match value {
            XPathValue::NodeSet(nodes) => {
                for node in nodes {
                    if let Some(range) = node.report_range(view) {
                        ctx.report_issue(range, self.message.as_str(), Vec::new());
                    }
                }
            }
            XPathValue::Boolean(true) => ctx.report_issue_on_file(self.message.as_str(), Vec::new()),
            other => {
                tracing::debug!(rule = %self.key, result = other.type_name(), "no issue for result");
            }
        }
    }
}

impl Check for XPathCheck {
    fn rule_key(&self) -> &RuleKey {
        &self.key
    }

    fn scan_file(&self, ctx: &mut CheckContext<'_>) {
        if let Some(pattern) = &self.file_pattern {
            if !pattern.is_match(ctx.file_id()) {
                return;
            }
        }
        if self.namespace_aware {
            let view = ctx.aware();
            self.report(&view, ctx);
        } else {
            let view = ctx.unaware();
            self.report(&view, ctx);
        }
    }
}

/// `p=urn:a q=urn:b` or `p=urn:a,q=urn:b`
fn parse_namespaces(raw: &str) -> Result<NamespaceContext, ConfigurationError> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|binding| !binding.is_empty())
        .map(|binding| {
            binding
                .split_once('=')
                .filter(|(prefix, uri)| !prefix.is_empty() && !uri.is_empty())
                .ok_or_else(|| ConfigurationError::InvalidParameter {
                    parameter: "namespaces".to_string(),
                    value: binding.to_string(),
                    expected: "prefix=uri",
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::LocatedDocument;
    use crate::check::{Issue, RuleRegistry};

    fn scan(check: XPathCheck, file_id: &str, source: &str) -> Vec<(String, bool)> {
        let doc = LocatedDocument::parse(source).unwrap();
        let mut registry = RuleRegistry::new();
        registry.register(Box::new(check)).unwrap();
        registry
            .scan(file_id, &doc)
            .iter()
            .map(|issue: &Issue| {
                let text = issue.range().map(|r| r.slice(source).to_string()).unwrap_or_default();
                (text, issue.is_file_level())
            })
            .collect()
    }

    #[test]
    fn test_elements_reported_at_start_tag() {
        let check = XPathCheck::new("no-b", "//b").unwrap();
        let issues = scan(check, "f.xml", "<a><b x='1'>text</b><b/></a>");
        assert_eq!(
            issues,
            vec![("<b x='1'>".to_string(), false), ("<b/>".to_string(), false)]
        );
    }

    #[test]
    fn test_attributes_and_text_reported_at_node() {
        let check = XPathCheck::new("attr", "//@x | //b/text()").unwrap();
        let issues = scan(check, "f.xml", "<a><b x=\"1\">text</b></a>");
        assert_eq!(
            issues,
            vec![("x=\"1".to_string(), false), ("text".to_string(), false)]
        );
    }

    #[test]
    fn test_boolean_result_is_file_level() {
        let check = XPathCheck::new("too-many", "count(//b) > 1").unwrap();
        assert_eq!(
            scan(check, "f.xml", "<a><b/><b/></a>"),
            vec![(String::new(), true)]
        );
        let check = XPathCheck::new("too-many", "count(//b) > 1").unwrap();
        assert!(scan(check, "f.xml", "<a><b/></a>").is_empty());
    }

    #[test]
    fn test_file_pattern() {
        let params = RuleParams::new()
            .with("expression", "//b")
            .with("filePattern", r"pom\.xml$");
        let cache = QueryCache::default();
        let check = XPathCheck::from_params("pom-only", &params, &cache).unwrap();
        assert!(scan(check, "web.xml", "<a><b/></a>").is_empty());
        let check = XPathCheck::from_params("pom-only", &params, &cache).unwrap();
        assert_eq!(scan(check, "module/pom.xml", "<a><b/></a>").len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_namespace_aware_params() {
        let params = RuleParams::new()
            .with("expression", "//m:b")
            .with("namespaceAware", "true")
            .with("namespaces", "m=urn:m");
        let check = XPathCheck::from_params("ns", &params, &QueryCache::default()).unwrap();
        let source = "<a xmlns:x='urn:m'><x:b/><b/></a>";
        assert_eq!(scan(check, "f.xml", source), vec![("<x:b/>".to_string(), false)]);
    }

    #[test]
    fn test_configuration_errors() {
        let cache = QueryCache::default();
        let missing = XPathCheck::from_params("r", &RuleParams::new(), &cache);
        assert!(matches!(missing, Err(ConfigurationError::MissingParameter(_))));

        let malformed = RuleParams::new().with("expression", "//b[");
        assert!(matches!(
            XPathCheck::from_params("r", &malformed, &cache),
            Err(ConfigurationError::InvalidExpression { .. })
        ));

        let bad_namespaces = RuleParams::new().with("expression", "//b").with("namespaces", "m");
        assert!(matches!(
            XPathCheck::from_params("r", &bad_namespaces, &cache),
            Err(ConfigurationError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_unbound_prefix_rejected_in_aware_view() {
        let cache = QueryCache::default();
        let unbound = RuleParams::new()
            .with("expression", "//m:b")
            .with("namespaceAware", "true");
        match XPathCheck::from_params("ns", &unbound, &cache) {
            Err(ConfigurationError::InvalidExpression { expression, message }) => {
                assert_eq!(expression, "//m:b");
                assert!(message.contains("'m'"), "{message}");
            }
            Err(other) => panic!("unexpected {other:?}"),
            Ok(_) => panic!("unbound prefix accepted"),
        }

        // The unaware view still matches the prefix literally
        let literal = RuleParams::new().with("expression", "//m:b");
        let check = XPathCheck::from_params("ns", &literal, &cache).unwrap();
        let source = "<a xmlns:m='urn:m'><m:b/></a>";
        assert_eq!(scan(check, "f.xml", source), vec![("<m:b/>".to_string(), false)]);

        assert!(XPathCheck::new("ns", "//m:b").unwrap().namespace_aware(true).is_err());
        assert!(XPathCheck::new("ns", "//b").unwrap().namespace_aware(true).is_ok());
    }

    #[test]
    fn test_query_error_suppresses_rule_for_file() {
        let check = XPathCheck::new("var", "//b[$x]").unwrap();
        assert!(scan(check, "f.xml", "<a><b/></a>").is_empty());
    }
}
