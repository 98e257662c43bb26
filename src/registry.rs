//! Registry of configurable scopes
//!
//! The program registers every configurable entity (scope name + ordered
//! parameter list with optional defaults) before any configuration is
//! applied. [`Registry::bind_defaults`] is the only mutation performed by
//! the resolver, and typed structs are read back with
//! [`Registry::construct`].

use std::collections::BTreeMap;

use tracing::debug;

use crate::binding::{split_dotted, validate_identifier, Location, Value};
use crate::configurable::{Configurable, Params};
use crate::error::ConfigError;
use crate::resolve::ResolvedConfiguration;

/// One keyword parameter of a scope
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    /// `None` marks the parameter as required
    pub default: Option<Value>,
}

impl Parameter {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A registered scope and its parameters, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeSpec {
    pub name: String,
    pub parameters: Vec<Parameter>,
}

impl ScopeSpec {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameter(name).is_some()
    }
}

/// Table of known scopes, keyed by full dotted name
#[derive(Debug, Clone, Default)]
pub struct Registry {
    scopes: BTreeMap<String, ScopeSpec>,
}

fn registry_location() -> Location {
    Location::new("<registry>", 0)
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scope with its parameters
    ///
    /// Defaults must be concrete values: macros and `@references` are only
    /// meaningful inside configuration text.
    pub fn register(
        &mut self,
        scope: impl Into<String>,
        parameters: Vec<Parameter>,
    ) -> Result<(), ConfigError> {
        let scope = scope.into();
        let location = registry_location();
        split_dotted(&scope, &location)?;

        if self.scopes.contains_key(&scope) {
            return Err(ConfigError::DuplicateScope { scope });
        }

        for parameter in &parameters {
            validate_identifier(&parameter.name, &location)?;
            if let Some(default) = &parameter.default {
                let mut concrete = true;
                default.walk(&mut |v| {
                    if matches!(v, Value::Macro(_) | Value::Reference(_)) {
                        concrete = false;
                    }
                });
                if !concrete {
                    return Err(ConfigError::Value {
                        location,
                        expression: format!("{}.{} = {}", scope, parameter.name, default),
                        reason: "registered defaults must be concrete values".into(),
                    });
                }
            }
        }

        debug!(scope = %scope, parameters = parameters.len(), "registered scope");
        self.scopes.insert(scope.clone(), ScopeSpec { name: scope, parameters });
        Ok(())
    }

    /// Register a [`Configurable`] type under its own scope name
    pub fn register_configurable<T: Configurable>(&mut self) -> Result<(), ConfigError> {
        self.register(T::SCOPE, T::parameters())
    }

    /// Exact lookup by full scope name
    pub fn scope(&self, name: &str) -> Option<&ScopeSpec> {
        self.scopes.get(name)
    }

    pub fn scopes(&self) -> impl Iterator<Item = &ScopeSpec> {
        self.scopes.values()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Resolve a scope name as written in a config file
    ///
    /// An exact match wins; otherwise the name must be a dotted suffix of
    /// exactly one registered scope (`training_loop` matches
    /// `simple_runner.training_loop`).
    pub fn lookup(&self, name: &str, location: &Location) -> Result<&ScopeSpec, ConfigError> {
        if let Some(spec) = self.scopes.get(name) {
            return Ok(spec);
        }

        let suffix = format!(".{}", name);
        let matches: Vec<&ScopeSpec> = self
            .scopes
            .values()
            .filter(|spec| spec.name.ends_with(&suffix))
            .collect();

        match matches.as_slice() {
            [spec] => Ok(*spec),
            [] => Err(ConfigError::UnknownScope {
                scope: name.to_string(),
                location: location.clone(),
            }),
            many => Err(ConfigError::AmbiguousScope {
                scope: name.to_string(),
                candidates: many.iter().map(|s| s.name.clone()).collect(),
                location: location.clone(),
            }),
        }
    }

    /// Overwrite declared defaults with resolved values
    ///
    /// Parameters without a resolved value keep their original default.
    pub fn bind_defaults(&mut self, resolved: &ResolvedConfiguration) {
        for (scope, values) in resolved.iter() {
            let Some(spec) = self.scopes.get_mut(scope) else {
                debug!(scope = %scope, "resolved scope is not registered here, skipping");
                continue;
            };
            for parameter in spec.parameters.iter_mut() {
                if let Some(value) = values.get(&parameter.name) {
                    debug!(scope = %scope, parameter = %parameter.name, value = %value, "bound default");
                    parameter.default = Some(value.clone());
                }
            }
        }
    }

    /// Current parameter values of a scope
    ///
    /// Fails with `MissingParameter` if a required parameter is still unbound.
    pub fn params(&self, scope: &str) -> Result<Params, ConfigError> {
        let spec = self.scopes.get(scope).ok_or_else(|| ConfigError::UnknownScope {
            scope: scope.to_string(),
            location: registry_location(),
        })?;

        let mut values = BTreeMap::new();
        for parameter in &spec.parameters {
            let value = parameter
                .default
                .clone()
                .ok_or_else(|| ConfigError::MissingParameter {
                    scope: spec.name.clone(),
                    parameter: parameter.name.clone(),
                })?;
            values.insert(parameter.name.clone(), value);
        }

        Ok(Params::new(spec.name.clone(), values))
    }

    /// Build a typed struct from the scope's current (bound) defaults
    pub fn construct<T: Configurable>(&self) -> Result<T, ConfigError> {
        T::from_params(&self.params(T::SCOPE)?)
    }
}
