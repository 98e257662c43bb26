//! Right-hand side grammar
//!
//! ```text
//! value     := scalar | list | tuple | reference | macro
//! scalar    := int | float | True | False | None | string
//! list      := '[' (value (',' value)* ','?)? ']'
//! tuple     := '(' (value (',' value)* ','?)? ')'
//! reference := '@' dotted ( '()' )?
//! macro     := '%' identifier
//! ```

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::binding::{split_dotted, validate_identifier, Location};
use crate::error::ConfigError;

static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+$").expect("valid regex"));

static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?(?:[0-9]+\.[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$|^-?[0-9]+[eE][+-]?[0-9]+$")
        .expect("valid regex")
});

/// Deepest list nesting a value expression may use
pub const MAX_NESTING_DEPTH: usize = 64;

/// A configuration value
///
/// `Macro` and evaluated `Reference`s only exist before resolution; the
/// resolver replaces them with the macro's value and an [`Instance`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Macro(String),
    Reference(Reference),
    Instance(Instance),
}

/// `@scope()` (evaluate) or `@scope` (handle)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub scope: String,
    pub evaluate: bool,
}

/// A constructed scope: every parameter resolved to a concrete value
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Instance {
    pub scope: String,
    pub params: BTreeMap<String, Value>,
}

impl Instance {
    pub fn get(&self, parameter: &str) -> Option<&Value> {
        self.params.get(parameter)
    }
}

impl Value {
    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Macro(_) => "macro",
            Value::Reference(_) => "reference",
            Value::Instance(_) => "instance",
        }
    }

    /// Visit this value and every nested list element
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Value)) {
        visit(self);
        if let Value::List(items) = self {
            for item in items {
                item.walk(visit);
            }
        }
    }

    /// Scopes this value constructs (`@scope()`), nested lists included
    pub fn constructed_scopes(&self) -> Vec<&str> {
        let mut scopes = Vec::new();
        self.walk(&mut |v| {
            if let Value::Reference(Reference {
                scope,
                evaluate: true,
            }) = v
            {
                scopes.push(scope.as_str());
            }
        });
        scopes
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            // Debug keeps the decimal point (200.0) and short exponents (1e-7)
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            }
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Macro(name) => write!(f, "%{}", name),
            Value::Reference(r) if r.evaluate => write!(f, "@{}()", r.scope),
            Value::Reference(r) => write!(f, "@{}", r.scope),
            Value::Instance(instance) => write!(f, "@{}()", instance.scope),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Macro(_) | Value::Reference(_) => serializer.collect_str(self),
            Value::Instance(instance) => instance.serialize(serializer),
        }
    }
}

/// Evaluate a value expression that did not come from a file
pub fn evaluate(expression: &str) -> Result<Value, ConfigError> {
    evaluate_at(expression, &Location::inline())
}

/// Evaluate a value expression, reporting errors at `location`
pub fn evaluate_at(expression: &str, location: &Location) -> Result<Value, ConfigError> {
    let mut parser = ValueParser {
        src: expression,
        pos: 0,
        depth: 0,
        location,
    };
    let value = parser.parse_value().map_err(|reason| ConfigError::Value {
        location: location.clone(),
        expression: expression.trim().to_string(),
        reason,
    })?;
    parser.skip_ws();
    if parser.pos < parser.src.len() {
        return Err(ConfigError::Value {
            location: location.clone(),
            expression: expression.trim().to_string(),
            reason: format!("unexpected trailing input `{}`", &parser.src[parser.pos..]),
        });
    }
    Ok(value)
}

/// Recursive-descent parser over one expression
struct ValueParser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    location: &'a Location,
}

impl<'a> ValueParser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn parse_value(&mut self) -> Result<Value, String> {
        self.skip_ws();
        match self.peek() {
            None => Err("expected a value".into()),
            Some(open @ ('[' | '(')) => {
                self.bump();
                self.parse_sequence(if open == '[' { ']' } else { ')' })
            }
            Some(q @ ('"' | '\'')) => {
                self.bump();
                self.parse_string(q)
            }
            Some('@') => {
                self.bump();
                self.parse_reference()
            }
            Some('%') => {
                self.bump();
                let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                validate_identifier(name, self.location).map_err(|e| e.to_string())?;
                Ok(Value::Macro(name.to_string()))
            }
            Some(_) => {
                let token = self.take_while(|c| !c.is_whitespace() && !matches!(c, ',' | ']' | ')'));
                parse_scalar(token)
            }
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if keep(c)) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn parse_sequence(&mut self, close: char) -> Result<Value, String> {
        if self.depth == MAX_NESTING_DEPTH {
            return Err(format!("lists nested deeper than {}", MAX_NESTING_DEPTH));
        }
        self.depth += 1;
        let result = self.parse_items(close);
        self.depth -= 1;
        result
    }

    fn parse_items(&mut self, close: char) -> Result<Value, String> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(Value::List(items));
            }
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(Value::List(items)),
                Some(c) => return Err(format!("expected ',' or '{}', found '{}'", close, c)),
                None => return Err(format!("unterminated list, missing '{}'", close)),
            }
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<Value, String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err("unterminated string literal".into()),
                Some(c) if c == quote => return Ok(Value::Str(out)),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c @ ('\\' | '"' | '\'')) => out.push(c),
                    Some(c) => return Err(format!("unknown escape '\\{}'", c)),
                    None => return Err("unterminated string literal".into()),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_reference(&mut self) -> Result<Value, String> {
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if name.is_empty() {
            return Err("expected a scope name after '@'".into());
        }
        split_dotted(name, self.location).map_err(|e| e.to_string())?;

        let evaluate = if self.peek() == Some('(') {
            self.bump();
            self.skip_ws();
            if self.bump() != Some(')') {
                return Err("constructor references take no arguments, use `@scope()`".into());
            }
            true
        } else {
            false
        };

        Ok(Value::Reference(Reference {
            scope: name.to_string(),
            evaluate,
        }))
    }
}

fn parse_scalar(token: &str) -> Result<Value, String> {
    match token {
        "True" => return Ok(Value::Bool(true)),
        "False" => return Ok(Value::Bool(false)),
        "None" => return Ok(Value::None),
        "" => return Err("expected a value".into()),
        _ => {}
    }

    if INT_RE.is_match(token) {
        return token
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("integer {} is out of range", token));
    }

    if FLOAT_RE.is_match(token) {
        let x = token
            .parse::<f64>()
            .map_err(|e| format!("invalid float: {}", e))?;
        if !x.is_finite() {
            return Err(format!("float {} is out of range", token));
        }
        return Ok(Value::Float(x));
    }

    match token {
        "true" | "false" => Err(format!("booleans are written True/False, not {}", token)),
        _ => Err("not a number, boolean, None, string, list, %macro or @reference".into()),
    }
}
