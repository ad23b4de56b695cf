//! Rule interface
//!
//! A rule is a [`Check`]: it receives a [`CheckContext`] for one parsed
//! file and reports [`Issue`]s through it. Checks are shared across worker
//! threads, so `scan_file` takes `&self`.

pub mod params;
pub mod registry;
pub mod xpath_check;

pub use params::RuleParams;
pub use registry::RuleRegistry;
pub use xpath_check::XPathCheck;

use crate::core::range::Range;
use crate::dom::{LocatedDocument, NamespaceAwareView, NamespaceUnawareView};
use std::fmt;

/// Stable identifier of a rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleKey(String);

impl RuleKey {
    pub fn new(key: impl Into<String>) -> Self {
        RuleKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleKey {
    fn from(key: &str) -> Self {
        RuleKey::new(key)
    }
}

impl From<String> for RuleKey {
    fn from(key: String) -> Self {
        RuleKey(key)
    }
}

/// A secondary location in an issue's flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryLocation {
    pub range: Range,
    pub message: String,
}

impl SecondaryLocation {
    pub fn new(range: Range, message: impl Into<String>) -> Self {
        SecondaryLocation {
            range,
            message: message.into(),
        }
    }
}

/// Where an issue points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueLocation {
    /// A primary range with an ordered flow of secondary locations
    Range {
        primary: Range,
        secondaries: Vec<SecondaryLocation>,
    },
    /// A file-level issue, optionally naming lines
    File { lines: Vec<usize> },
}

/// One reported problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub rule: RuleKey,
    pub message: String,
    pub location: IssueLocation,
}

impl Issue {
    /// Primary range, if this is not a file-level issue
    pub fn range(&self) -> Option<Range> {
        match &self.location {
            IssueLocation::Range { primary, .. } => Some(*primary),
            IssueLocation::File { .. } => None,
        }
    }

    pub fn is_file_level(&self) -> bool {
        matches!(self.location, IssueLocation::File { .. })
    }
}

/// A rule
pub trait Check: Send + Sync {
    fn rule_key(&self) -> &RuleKey;

    /// Inspect one file and report issues through `ctx`
    fn scan_file(&self, ctx: &mut CheckContext<'_>);
}

/// What a check sees of one file, and where its issues go
pub struct CheckContext<'a> {
    file_id: &'a str,
    document: &'a LocatedDocument,
    rule: RuleKey,
    issues: Vec<Issue>,
}

impl<'a> CheckContext<'a> {
    pub fn new(file_id: &'a str, document: &'a LocatedDocument) -> Self {
        CheckContext {
            file_id,
            document,
            rule: RuleKey::new(""),
            issues: Vec::new(),
        }
    }

    pub fn file_id(&self) -> &'a str {
        self.file_id
    }

    pub fn document(&self) -> &'a LocatedDocument {
        self.document
    }

    pub fn aware(&self) -> NamespaceAwareView<'a> {
        self.document.aware()
    }

    pub fn unaware(&self) -> NamespaceUnawareView<'a> {
        self.document.unaware()
    }

    /// Rule that issues are currently attributed to
    pub fn rule(&self) -> &RuleKey {
        &self.rule
    }

    pub(crate) fn set_rule(&mut self, rule: RuleKey) {
        self.rule = rule;
    }

    pub fn report_issue(
        &mut self,
        range: Range,
        message: impl Into<String>,
        secondaries: Vec<SecondaryLocation>,
    ) {
        self.issues.push(Issue {
            rule: self.rule.clone(),
            message: message.into(),
            location: IssueLocation::Range {
                primary: range,
                secondaries,
            },
        });
    }

    pub fn report_issue_on_file(&mut self, message: impl Into<String>, lines: Vec<usize>) {
        self.issues.push(Issue {
            rule: self.rule.clone(),
            message: message.into(),
            location: IssueLocation::File { lines },
        });
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }
}
