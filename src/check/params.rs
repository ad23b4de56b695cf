//! Rule parameters
//!
//! Parameters arrive as strings from the host's rule configuration. The
//! typed accessors fail with a [`ConfigurationError`] naming the parameter.

use crate::error::ConfigurationError;
use regex::Regex;
use std::collections::HashMap;

/// String key/value parameters for one rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleParams {
    values: HashMap<String, String>,
}

impl RuleParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Raw value; empty strings count as unset
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn required_str(&self, key: &str) -> Result<&str, ConfigurationError> {
        self.get_str(key)
            .ok_or_else(|| ConfigurationError::MissingParameter(key.to_string()))
    }

    pub fn get_int(&self, key: &str) -> Result<Option<i64>, ConfigurationError> {
        self.parse(key, "an integer", |v| v.parse().ok())
    }

    /// `true` / `false`, case-insensitive
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigurationError> {
        self.parse(key, "true or false", |v| match v.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        })
    }

    pub fn get_regex(&self, key: &str) -> Result<Option<Regex>, ConfigurationError> {
        self.get_str(key)
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigurationError::InvalidRegex {
                    parameter: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn parse<T>(
        &self,
        key: &str,
        expected: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>, ConfigurationError> {
        let Some(raw) = self.get_str(key) else {
            return Ok(None);
        };
        parse(raw.trim())
            .map(Some)
            .ok_or_else(|| ConfigurationError::InvalidParameter {
                parameter: key.to_string(),
                value: raw.to_string(),
                expected,
            })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RuleParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = RuleParams::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let params: RuleParams = [("max", "12"), ("strict", "TRUE"), ("pattern", r"\.xml$")]
            .into_iter()
            .collect();
        assert_eq!(params.get_int("max").unwrap(), Some(12));
        assert_eq!(params.get_bool("strict").unwrap(), Some(true));
        assert!(params.get_regex("pattern").unwrap().unwrap().is_match("pom.xml"));
        assert_eq!(params.get_int("missing").unwrap(), None);
    }

    #[test]
    fn test_errors_name_the_parameter() {
        let params = RuleParams::new().with("max", "twelve").with("pattern", "(");
        match params.get_int("max") {
            Err(ConfigurationError::InvalidParameter { parameter, value, .. }) => {
                assert_eq!(parameter, "max");
                assert_eq!(value, "twelve");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            params.get_regex("pattern"),
            Err(ConfigurationError::InvalidRegex { .. })
        ));
        assert!(matches!(
            params.required_str("expression"),
            Err(ConfigurationError::MissingParameter(_))
        ));
    }

    #[test]
    fn test_blank_is_unset() {
        let params = RuleParams::new().with("message", "  ");
        assert_eq!(params.get_str("message"), None);
    }
}
