//! Error types with fix suggestions
//!
//! Every resolution failure is fatal at startup. Messages start with a
//! stable `CFG-NNN` code so the CLI (and log scrapers) can match on them.

use std::path::PathBuf;

use thiserror::Error;

use crate::binding::Location;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum ConfigError {
    // ─────────────────────────────────────────────────────────────
    // Syntax errors (CFG-010 to CFG-020)
    // ─────────────────────────────────────────────────────────────

    #[error("CFG-010: {location}: cannot parse line `{line}`: {reason}")]
    Parse {
        location: Location,
        line: String,
        reason: String,
    },

    #[error("CFG-011: {location}: invalid identifier '{name}': {reason}")]
    InvalidIdentifier {
        location: Location,
        name: String,
        reason: String,
    },

    #[error("CFG-020: {location}: malformed value `{expression}`: {reason}")]
    Value {
        location: Location,
        expression: String,
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Registry errors (CFG-030 to CFG-033)
    // ─────────────────────────────────────────────────────────────

    #[error("CFG-030: {location}: unknown scope '{scope}'")]
    UnknownScope { scope: String, location: Location },

    #[error("CFG-031: {location}: scope '{scope}' has no parameter '{parameter}'")]
    UnknownParameter {
        scope: String,
        parameter: String,
        location: Location,
    },

    #[error("CFG-032: {location}: scope '{scope}' is ambiguous, matches: {}", candidates.join(", "))]
    AmbiguousScope {
        scope: String,
        candidates: Vec<String>,
        location: Location,
    },

    #[error("CFG-033: scope '{scope}' is already registered")]
    DuplicateScope { scope: String },

    // ─────────────────────────────────────────────────────────────
    // Reference errors (CFG-040 to CFG-042)
    // ─────────────────────────────────────────────────────────────

    #[error("CFG-040: {location}: @{scope}() cannot be constructed, required parameter '{parameter}' is unbound")]
    UnresolvedReference {
        scope: String,
        parameter: String,
        location: Location,
    },

    #[error("CFG-041: cyclic reference: {cycle}")]
    CyclicReference { cycle: String },

    #[error("CFG-042: {location}: macro '%{name}' is not defined")]
    UndefinedMacro { name: String, location: Location },

    // ─────────────────────────────────────────────────────────────
    // Construction errors (CFG-050 to CFG-051)
    // ─────────────────────────────────────────────────────────────

    #[error("CFG-050: required parameter '{scope}.{parameter}' has no value")]
    MissingParameter { scope: String, parameter: String },

    #[error("CFG-051: '{scope}.{parameter}' expected {expected}, found {found}")]
    TypeMismatch {
        scope: String,
        parameter: String,
        expected: &'static str,
        found: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Loading errors (CFG-060 to CFG-061)
    // ─────────────────────────────────────────────────────────────

    #[error("CFG-060: {location}: cannot include \"{path}\": {reason}")]
    Include {
        path: String,
        reason: String,
        location: Location,
    },

    #[error("CFG-061: cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// The stable `CFG-NNN` code of this error
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Parse { .. } => "CFG-010",
            ConfigError::InvalidIdentifier { .. } => "CFG-011",
            ConfigError::Value { .. } => "CFG-020",
            ConfigError::UnknownScope { .. } => "CFG-030",
            ConfigError::UnknownParameter { .. } => "CFG-031",
            ConfigError::AmbiguousScope { .. } => "CFG-032",
            ConfigError::DuplicateScope { .. } => "CFG-033",
            ConfigError::UnresolvedReference { .. } => "CFG-040",
            ConfigError::CyclicReference { .. } => "CFG-041",
            ConfigError::UndefinedMacro { .. } => "CFG-042",
            ConfigError::MissingParameter { .. } => "CFG-050",
            ConfigError::TypeMismatch { .. } => "CFG-051",
            ConfigError::Include { .. } => "CFG-060",
            ConfigError::Io { .. } => "CFG-061",
        }
    }
}

impl FixSuggestion for ConfigError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ConfigError::Parse { .. } => {
                Some("Use `scope.parameter = value`, `NAME = value`, `include \"file\"` or a # comment")
            }
            ConfigError::InvalidIdentifier { .. } => {
                Some("Names are letters, digits and underscores, and cannot start with a digit")
            }
            ConfigError::Value { .. } => Some(
                "Use an int, float, True/False/None, a quoted string, a [list], %MACRO or @scope()",
            ),
            ConfigError::UnknownScope { .. } => {
                Some("Check the scope name for typos; only registered scopes can be configured")
            }
            ConfigError::UnknownParameter { .. } => {
                Some("Check the parameter name against the scope's declared parameters")
            }
            ConfigError::AmbiguousScope { .. } => {
                Some("Write more of the dotted scope name so it matches exactly one scope")
            }
            ConfigError::DuplicateScope { .. } => Some("Register each scope exactly once"),
            ConfigError::UnresolvedReference { .. } => {
                Some("Bind the missing parameter of the referenced scope")
            }
            ConfigError::CyclicReference { .. } => {
                Some("Break the cycle - a scope cannot (indirectly) construct itself")
            }
            ConfigError::UndefinedMacro { .. } => Some("Define the macro with `NAME = value`"),
            ConfigError::MissingParameter { .. } => {
                Some("Bind the parameter in the config file or pass --bind")
            }
            ConfigError::TypeMismatch { .. } => Some("Change the bound value to the expected type"),
            ConfigError::Include { .. } => {
                Some("Check the include path; it is relative to the including file or an --include-dir")
            }
            ConfigError::Io { .. } => Some("Check file path and permissions"),
        }
    }
}
