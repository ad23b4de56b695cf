//! Rule registry
//!
//! Maps rule keys to checks, in registration order. A rule whose
//! configuration fails is logged once here and left out; every other rule
//! still runs.

use super::{Check, CheckContext, Issue, RuleKey};
use crate::dom::LocatedDocument;
use crate::error::ConfigurationError;
use std::collections::HashMap;

/// Registry of active rules
#[derive(Default)]
pub struct RuleRegistry {
    checks: Vec<Box<dyn Check>>,
    index: HashMap<RuleKey, usize>,
    disabled: Vec<(RuleKey, ConfigurationError)>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check. Keys must be unique.
    pub fn register(&mut self, check: Box<dyn Check>) -> Result<(), ConfigurationError> {
        let key = check.rule_key().clone();
        if self.index.contains_key(&key) {
            return Err(ConfigurationError::DuplicateRule(key.to_string()));
        }
        self.index.insert(key, self.checks.len());
        self.checks.push(check);
        Ok(())
    }

    /// Build and register a rule. A configuration error disables the rule:
    /// it is logged and kept in [`disabled`](Self::disabled). Returns
    /// whether the rule is active.
    pub fn register_configured(
        &mut self,
        key: impl Into<RuleKey>,
        build: impl FnOnce() -> Result<Box<dyn Check>, ConfigurationError>,
    ) -> bool {
        let key = key.into();
        match build().and_then(|check| self.register(check)) {
            Ok(()) => true,
            Err(error) => {
                tracing::error!(rule = %key, error = %error, "rule disabled by invalid configuration");
                self.disabled.push((key, error));
                false
            }
        }
    }

    pub fn get(&self, key: &RuleKey) -> Option<&dyn Check> {
        self.index.get(key).map(|&i| self.checks[i].as_ref())
    }

    /// Active rule keys in registration order
    pub fn keys(&self) -> impl Iterator<Item = &RuleKey> {
        self.checks.iter().map(|c| c.rule_key())
    }

    pub fn disabled(&self) -> &[(RuleKey, ConfigurationError)] {
        &self.disabled
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run every active rule on one file
    pub fn scan(&self, file_id: &str, document: &LocatedDocument) -> Vec<Issue> {
        let mut ctx = CheckContext::new(file_id, document);
        for check in &self.checks {
            ctx.set_rule(check.rule_key().clone());
            check.scan_file(&mut ctx);
        }
        ctx.into_issues()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.keys().collect::<Vec<_>>())
            .field("disabled", &self.disabled)
            .finish()
    }
}
