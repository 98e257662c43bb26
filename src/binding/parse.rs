//! Line parser
//!
//! One statement per line. `#` starts a comment unless it sits inside a
//! string literal; blank and comment-only lines produce nothing.

use std::sync::Arc;

use crate::binding::{
    evaluate_at, split_dotted, Binding, Include, Location, MacroDef, Statement, Value,
};
use crate::error::ConfigError;

/// Parse configuration text into statements, in file order
///
/// `source` names the text in error locations (usually the file path).
pub fn parse(text: &str, source: &str) -> Result<Vec<Statement>, ConfigError> {
    let source: Arc<str> = Arc::from(source);
    let mut statements = Vec::new();
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    for (idx, raw) in text.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        let location = Location {
            source: Arc::clone(&source),
            line: idx + 1,
        };
        statements.push(parse_line(line, location)?);
    }

    Ok(statements)
}

/// Parse text that may only contain bindings (no macros, no includes)
pub fn parse_bindings(text: &str) -> Result<Vec<Binding>, ConfigError> {
    parse(text, "<string>")?
        .into_iter()
        .map(|statement| match statement {
            Statement::Binding(binding) => Ok(binding),
            Statement::Macro(m) => Err(ConfigError::Parse {
                location: m.location,
                line: format!("{} = {}", m.name, m.value),
                reason: "expected `scope.parameter = value`".into(),
            }),
            Statement::Include(i) => Err(ConfigError::Parse {
                location: i.location,
                line: format!("include \"{}\"", i.path),
                reason: "expected `scope.parameter = value`".into(),
            }),
        })
        .collect()
}

fn parse_line(line: &str, location: Location) -> Result<Statement, ConfigError> {
    let Some(eq) = find_outside_quotes(line, '=') else {
        if let Some(rest) = line.strip_prefix("include") {
            if rest.starts_with(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
                return parse_include(line, rest.trim(), location);
            }
        }
        return Err(ConfigError::Parse {
            location,
            line: line.to_string(),
            reason: "expected `scope.parameter = value`".into(),
        });
    };

    let lhs = line[..eq].trim();
    let rhs = line[eq + 1..].trim();

    if lhs.is_empty() {
        return Err(ConfigError::Parse {
            location,
            line: line.to_string(),
            reason: "missing name before '='".into(),
        });
    }
    if rhs.is_empty() {
        return Err(ConfigError::Parse {
            location,
            line: line.to_string(),
            reason: "missing value after '='".into(),
        });
    }

    let segments = split_dotted(lhs, &location)?;
    let value = evaluate_at(rhs, &location)?;

    let statement = match segments.split_last() {
        Some((name, [])) => Statement::Macro(MacroDef {
            name: name.to_string(),
            value,
            location,
        }),
        Some((parameter, scope)) => Statement::Binding(Binding {
            scope: scope.join("."),
            parameter: parameter.to_string(),
            value,
            location,
        }),
        None => {
            return Err(ConfigError::Parse {
                location,
                line: line.to_string(),
                reason: "missing parameter name".into(),
            })
        }
    };

    Ok(statement)
}

fn parse_include(line: &str, target: &str, location: Location) -> Result<Statement, ConfigError> {
    match evaluate_at(target, &location)? {
        Value::Str(path) if !path.is_empty() => Ok(Statement::Include(Include { path, location })),
        _ => Err(ConfigError::Parse {
            location,
            line: line.to_string(),
            reason: "include expects a quoted file path".into(),
        }),
    }
}

/// Drop a trailing `# comment`, keeping `#` inside string literals
fn strip_comment(line: &str) -> &str {
    match find_outside_quotes(line, '#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Byte position of `target` outside of quoted strings
///
/// Handles both quote styles and backslash escapes inside quotes.
fn find_outside_quotes(s: &str, target: char) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escape_next = false;

    for (pos, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
        } else if quote.is_some() && ch == '\\' {
            escape_next = true;
        } else if Some(ch) == quote {
            quote = None;
        } else if quote.is_none() && (ch == '"' || ch == '\'') {
            quote = Some(ch);
        } else if quote.is_none() && ch == target {
            return Some(pos);
        }
    }

    None
}
