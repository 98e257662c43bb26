//! Typed access to resolved parameters
//!
//! A [`Configurable`] type declares its scope name and parameter list and
//! builds itself from [`Params`]. No reflection: each type reads its own
//! fields by name through [`FromValue`].

use std::collections::BTreeMap;

use crate::binding::{Instance, Value};
use crate::error::ConfigError;
use crate::registry::Parameter;

/// A struct whose fields are set from one configuration scope
pub trait Configurable: Sized {
    /// Full dotted scope name, e.g. `train_maze_lib.loss_fn`
    const SCOPE: &'static str;

    fn parameters() -> Vec<Parameter>;

    fn from_params(params: &Params) -> Result<Self, ConfigError>;
}

/// Conversion from a resolved [`Value`]
pub trait FromValue: Sized {
    fn expected() -> &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    fn expected() -> &'static str {
        "any value"
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    fn expected() -> &'static str {
        "bool"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    fn expected() -> &'static str {
        "int"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for u64 {
    fn expected() -> &'static str {
        "non-negative int"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }
}

impl FromValue for usize {
    fn expected() -> &'static str {
        "non-negative int"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => usize::try_from(*i).ok(),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn expected() -> &'static str {
        "float"
    }

    // Ints widen: `max_global_norm = 200` is a valid float setting
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn expected() -> &'static str {
        "string"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn expected() -> &'static str {
        "value or None"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::None => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn expected() -> &'static str {
        "list"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

/// Resolved parameter values of one scope
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    scope: String,
    values: BTreeMap<String, Value>,
}

impl Params {
    pub fn new(scope: impl Into<String>, values: BTreeMap<String, Value>) -> Self {
        Self {
            scope: scope.into(),
            values,
        }
    }

    pub fn from_instance(instance: &Instance) -> Self {
        Self::new(instance.scope.clone(), instance.params.clone())
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn raw(&self, name: &str) -> Result<&Value, ConfigError> {
        self.values
            .get(name)
            .ok_or_else(|| ConfigError::MissingParameter {
                scope: self.scope.clone(),
                parameter: name.to_string(),
            })
    }

    /// Typed read of one parameter
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T, ConfigError> {
        let value = self.raw(name)?;
        T::from_value(value).ok_or_else(|| self.mismatch(name, T::expected(), value))
    }

    /// Build a nested configurable from an `@scope()` parameter
    pub fn construct<C: Configurable>(&self, name: &str) -> Result<C, ConfigError> {
        match self.raw(name)? {
            Value::Instance(instance) if instance.scope == C::SCOPE => {
                C::from_params(&Params::from_instance(instance))
            }
            other => Err(self.mismatch(name, "a constructed scope", other)),
        }
    }

    fn mismatch(&self, name: &str, expected: &'static str, found: &Value) -> ConfigError {
        ConfigError::TypeMismatch {
            scope: self.scope.clone(),
            parameter: name.to_string(),
            expected,
            found: format!("{} `{}`", found.type_name(), found),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Params {
        let mut values = BTreeMap::new();
        values.insert("steps".to_string(), Value::Int(1000));
        values.insert("norm".to_string(), Value::Int(200));
        values.insert("noise".to_string(), Value::Float(0.2));
        values.insert("legacy".to_string(), Value::Bool(false));
        values.insert("scaling".to_string(), Value::Str("none".into()));
        values.insert("limit".to_string(), Value::None);
        values.insert("negative".to_string(), Value::Int(-1));
        values.insert(
            "sizes".to_string(),
            Value::List(vec![Value::Int(1), Value::Int(2)]),
        );
        Params::new("test.scope", values)
    }

    #[test]
    fn typed_reads() {
        let p = params();
        assert_eq!(p.get::<u64>("steps").unwrap(), 1000);
        assert_eq!(p.get::<f64>("norm").unwrap(), 200.0);
        assert_eq!(p.get::<f64>("noise").unwrap(), 0.2);
        assert!(!p.get::<bool>("legacy").unwrap());
        assert_eq!(p.get::<String>("scaling").unwrap(), "none");
        assert_eq!(p.get::<Option<u64>>("limit").unwrap(), None);
        assert_eq!(p.get::<Option<u64>>("steps").unwrap(), Some(1000));
        assert_eq!(p.get::<Vec<usize>>("sizes").unwrap(), vec![1, 2]);
    }

    #[test]
    fn type_mismatch_names_parameter() {
        let p = params();
        let err = p.get::<bool>("steps").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("CFG-051"));
        assert!(msg.contains("test.scope.steps"));
        assert!(msg.contains("expected bool"));
        assert!(p.get::<u64>("negative").is_err());
        assert!(p.get::<i64>("noise").is_err());
    }

    #[test]
    fn missing_parameter() {
        let err = params().get::<u64>("absent").unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter { .. }));
    }
}
