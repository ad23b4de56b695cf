//! Error types
//!
//! Parsing, encoding, configuration, and query failures are separate enums so
//! callers can tell a broken file from a broken rule.

use crate::core::range::{Position, Range};
use thiserror::Error;

/// Bytes could not be turned into source text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("unsupported encoding '{0}'")]
    Unsupported(String),
    #[error("declared encoding '{declared}' conflicts with detected {detected}")]
    Inconsistent {
        declared: String,
        detected: &'static str,
    },
    #[error("invalid {encoding} byte sequence at byte {offset}")]
    Undecodable {
        encoding: &'static str,
        offset: usize,
    },
}

/// A file could not be parsed into a located document.
///
/// Fatal for the file only: the analyzer logs it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{message} at {position}")]
    Syntax { message: String, position: Position },

    #[error("undeclared entity reference '&{name};' at {position}")]
    UndeclaredEntity { name: String, position: Position },

    #[error("invalid character reference '&{reference};' at {position}")]
    InvalidReference { reference: String, position: Position },

    #[error("unterminated {construct} starting at {position}")]
    Unterminated {
        construct: &'static str,
        position: Position,
    },

    #[error("{message} at {position}")]
    Structure { message: String, position: Position },

    #[error("cannot locate {construct} at {position}: {message}")]
    Mismatch {
        construct: &'static str,
        message: String,
        position: Position,
    },

    #[error("unbound namespace prefix '{prefix}' at {position}")]
    UnboundPrefix { prefix: String, position: Position },

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, position: Position) -> Self {
        ParseError::Syntax {
            message: message.into(),
            position,
        }
    }

    pub fn structure(message: impl Into<String>, position: Position) -> Self {
        ParseError::Structure {
            message: message.into(),
            position,
        }
    }

    /// Where the error was detected, when known
    pub fn position(&self) -> Option<Position> {
        match self {
            ParseError::Syntax { position, .. }
            | ParseError::UndeclaredEntity { position, .. }
            | ParseError::InvalidReference { position, .. }
            | ParseError::Unterminated { position, .. }
            | ParseError::Structure { position, .. }
            | ParseError::Mismatch { position, .. }
            | ParseError::UnboundPrefix { position, .. } => Some(*position),
            ParseError::Encoding(_) => None,
        }
    }

    /// 1-based line of the error
    pub fn line(&self) -> Option<usize> {
        self.position().map(|p| p.line)
    }

    /// 0-based column of the error
    pub fn column(&self) -> Option<usize> {
        self.position().map(|p| p.column)
    }
}

/// A rule or query is misconfigured. The rule is disabled; other rules run.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error("invalid XPath expression '{expression}': {message}")]
    InvalidExpression { expression: String, message: String },

    #[error("invalid regular expression for parameter '{parameter}'")]
    InvalidRegex {
        parameter: String,
        #[source]
        source: regex::Error,
    },

    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("parameter '{parameter}' has value '{value}', expected {expected}")]
    InvalidParameter {
        parameter: String,
        value: String,
        expected: &'static str,
    },

    #[error("rule '{0}' is registered twice")]
    DuplicateRule(String),
}

/// Runtime failure while evaluating a compiled XPath expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown function {0}()")]
    UnknownFunction(String),

    #[error("{function}() expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: &'static str,
        found: usize,
    },

    #[error("{context} requires {expected}")]
    Type {
        context: String,
        expected: &'static str,
    },

    #[error("unbound variable ${0}")]
    UnknownVariable(String),

    #[error("{0}() is not supported without DTD processing")]
    Unsupported(String),
}

/// A DOCTYPE refers to an external DTD that is never fetched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("external DTD '{system_id}' referenced at {} is not resolved", range.start)]
pub struct ResourceResolutionWarning {
    pub system_id: String,
    pub range: Range,
}
