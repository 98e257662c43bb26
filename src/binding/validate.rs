//! Identifier Validation
//!
//! Scope segments, parameter names and macro names follow the usual
//! identifier rule:
//! - Start with an ASCII letter or underscore
//! - Contain only ASCII letters, digits, underscores
//!
//! Dots are reserved as the separator in `scope.sub.parameter`.
//!
//! Manual single-pass check, no regex and no allocations on the happy path.

use crate::binding::Location;
use crate::error::ConfigError;

/// Validate one identifier segment
pub fn validate_identifier(name: &str, location: &Location) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::InvalidIdentifier {
            location: location.clone(),
            name: name.to_string(),
            reason: "cannot be empty".into(),
        });
    }

    let first = name.as_bytes()[0];
    if !first.is_ascii_alphabetic() && first != b'_' {
        return Err(ConfigError::InvalidIdentifier {
            location: location.clone(),
            name: name.to_string(),
            reason: "must start with a letter or underscore".into(),
        });
    }

    for &byte in &name.as_bytes()[1..] {
        if !byte.is_ascii_alphanumeric() && byte != b'_' {
            return Err(ConfigError::InvalidIdentifier {
                location: location.clone(),
                name: name.to_string(),
                reason: "may only contain letters, digits and underscores".into(),
            });
        }
    }

    Ok(())
}

/// Split `a.b.c` into validated segments
pub fn split_dotted<'a>(path: &'a str, location: &Location) -> Result<Vec<&'a str>, ConfigError> {
    let segments: Vec<&str> = path.split('.').collect();
    for segment in &segments {
        validate_identifier(segment, location).map_err(|_| ConfigError::InvalidIdentifier {
            location: location.clone(),
            name: path.to_string(),
            reason: format!("segment '{}' is not a valid identifier", segment),
        })?;
    }
    Ok(segments)
}
