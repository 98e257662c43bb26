//! Resolver - statements + registry → ResolvedConfiguration
//!
//! Data flow:
//! ```text
//! statements ──▶ macro table + last-write-wins binding table
//!                          ↓
//!             macro expansion, scope canonicalization
//!                          ↓
//!        construction graph (cycle check, topological order)
//!                          ↓
//!         @scope() replaced by Instance ──▶ ResolvedConfiguration
//! ```
//!
//! `apply` never touches the registry; binding the result is a separate,
//! explicit step ([`crate::Registry::bind_defaults`]).

mod graph;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, info};

use crate::binding::{Instance, Location, MacroDef, Reference, Statement, Value};
use crate::error::ConfigError;
use crate::registry::Registry;

pub use graph::ReferenceGraph;

/// Final (scope, parameter) → value table
///
/// Scope names are the registry's full names, whatever suffix the file used.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolvedConfiguration {
    scopes: BTreeMap<String, BTreeMap<String, Value>>,
}

impl ResolvedConfiguration {
    pub fn get(&self, scope: &str, parameter: &str) -> Option<&Value> {
        self.scopes.get(scope)?.get(parameter)
    }

    pub fn scope(&self, scope: &str) -> Option<&BTreeMap<String, Value>> {
        self.scopes.get(scope)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, Value>)> {
        self.scopes.iter()
    }

    /// Number of bound parameters across all scopes
    pub fn len(&self) -> usize {
        self.scopes.values().map(|params| params.len()).sum()
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

/// A bound value and the statement it came from
#[derive(Debug, Clone)]
struct Bound {
    value: Value,
    location: Location,
    /// Index of the statement in input order
    order: usize,
}

type Table = BTreeMap<String, BTreeMap<String, Bound>>;

/// Resolve statements against a registry
///
/// Statements apply in order; later bindings of the same key win. Include
/// statements must already be expanded (see [`crate::Loader`]).
pub fn apply(statements: &[Statement], registry: &Registry) -> Result<ResolvedConfiguration, ConfigError> {
    let macros = collect_macros(statements);
    let mut table = collect_bindings(statements, registry)?;

    for params in table.values_mut() {
        for bound in params.values_mut() {
            let mut stack = Vec::new();
            bound.value = expand(&bound.value, &macros, registry, &bound.location, &mut stack)?;
        }
    }

    let instances = construct_referenced(&table, registry)?;

    let mut scopes = BTreeMap::new();
    for (scope, params) in table {
        let resolved: BTreeMap<String, Value> = params
            .into_iter()
            .map(|(name, bound)| (name, substitute(&bound.value, &instances)))
            .collect();
        scopes.insert(scope, resolved);
    }

    let resolved = ResolvedConfiguration { scopes };
    info!(
        scopes = resolved.scope_count(),
        bindings = resolved.len(),
        instances = instances.len(),
        "configuration resolved"
    );
    Ok(resolved)
}

fn collect_macros(statements: &[Statement]) -> HashMap<&str, &MacroDef> {
    let mut macros: HashMap<&str, &MacroDef> = HashMap::new();
    for statement in statements {
        if let Statement::Macro(def) = statement {
            if let Some(previous) = macros.insert(def.name.as_str(), def) {
                debug!(
                    name = %def.name,
                    previous = %previous.location,
                    current = %def.location,
                    "macro redefined"
                );
            }
        }
    }
    macros
}

fn collect_bindings(statements: &[Statement], registry: &Registry) -> Result<Table, ConfigError> {
    let mut table = Table::new();

    for (order, statement) in statements.iter().enumerate() {
        let binding = match statement {
            Statement::Binding(binding) => binding,
            Statement::Macro(_) => continue,
            Statement::Include(include) => {
                return Err(ConfigError::Include {
                    path: include.path.clone(),
                    reason: "include statements must be expanded before resolution".into(),
                    location: include.location.clone(),
                });
            }
        };

        let spec = registry.lookup(&binding.scope, &binding.location)?;
        if !spec.has_parameter(&binding.parameter) {
            return Err(ConfigError::UnknownParameter {
                scope: spec.name.clone(),
                parameter: binding.parameter.clone(),
                location: binding.location.clone(),
            });
        }

        let bound = Bound {
            value: binding.value.clone(),
            location: binding.location.clone(),
            order,
        };
        let previous = table
            .entry(spec.name.clone())
            .or_default()
            .insert(binding.parameter.clone(), bound);

        if let Some(previous) = previous {
            debug!(
                scope = %spec.name,
                parameter = %binding.parameter,
                previous = %previous.location,
                current = %binding.location,
                "binding overridden"
            );
        }
    }

    Ok(table)
}

/// Replace `%MACRO`s and canonicalize `@scope` names
fn expand<'a>(
    value: &Value,
    macros: &HashMap<&str, &'a MacroDef>,
    registry: &Registry,
    location: &Location,
    stack: &mut Vec<&'a str>,
) -> Result<Value, ConfigError> {
    match value {
        Value::Macro(name) => {
            let def = *macros
                .get(name.as_str())
                .ok_or_else(|| ConfigError::UndefinedMacro {
                    name: name.clone(),
                    location: location.clone(),
                })?;
            if let Some(start) = stack.iter().position(|n| *n == def.name) {
                let chain: Vec<String> = stack[start..].iter().map(|n| format!("%{}", n)).collect();
                return Err(ConfigError::CyclicReference {
                    cycle: format!("{} → %{}", chain.join(" → "), def.name),
                });
            }
            stack.push(def.name.as_str());
            let expanded = expand(&def.value, macros, registry, &def.location, stack)?;
            stack.pop();
            Ok(expanded)
        }
        Value::Reference(reference) => {
            let spec = registry.lookup(&reference.scope, location)?;
            Ok(Value::Reference(Reference {
                scope: spec.name.clone(),
                evaluate: reference.evaluate,
            }))
        }
        Value::List(items) => items
            .iter()
            .map(|item| expand(item, macros, registry, location, stack))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        other => Ok(other.clone()),
    }
}

/// Build an Instance for every scope constructed via `@scope()`
fn construct_referenced(table: &Table, registry: &Registry) -> Result<HashMap<String, Instance>, ConfigError> {
    let mut graph = ReferenceGraph::new();
    // earliest statement constructing each scope, for error reporting
    let mut referenced_at: HashMap<&str, &Bound> = HashMap::new();

    for (scope, params) in table {
        graph.add_node(scope);
        for bound in params.values() {
            for target in bound.value.constructed_scopes() {
                graph.add_edge(scope, target);
                let first = referenced_at.entry(target).or_insert(bound);
                if bound.order < first.order {
                    *first = bound;
                }
            }
        }
    }

    let mut instances: HashMap<String, Instance> = HashMap::new();

    for scope in graph.construction_order()? {
        let Some(referrer) = referenced_at.get(scope) else {
            continue;
        };
        let Some(spec) = registry.scope(scope) else {
            continue;
        };

        let mut params = BTreeMap::new();
        for parameter in &spec.parameters {
            let bound = table.get(scope).and_then(|p| p.get(&parameter.name));
            let value = match (bound, &parameter.default) {
                (Some(bound), _) => substitute(&bound.value, &instances),
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(ConfigError::UnresolvedReference {
                        scope: scope.to_string(),
                        parameter: parameter.name.clone(),
                        location: referrer.location.clone(),
                    });
                }
            };
            params.insert(parameter.name.clone(), value);
        }

        debug!(scope = %scope, params = params.len(), "constructed instance");
        instances.insert(
            scope.to_string(),
            Instance {
                scope: scope.to_string(),
                params,
            },
        );
    }

    Ok(instances)
}

/// Replace `@scope()` with its constructed Instance
fn substitute(value: &Value, instances: &HashMap<String, Instance>) -> Value {
    match value {
        Value::Reference(Reference {
            scope,
            evaluate: true,
        }) => match instances.get(scope) {
            Some(instance) => Value::Instance(instance.clone()),
            None => value.clone(),
        },
        Value::List(items) => Value::List(items.iter().map(|v| substitute(v, instances)).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::parse;
    use crate::registry::Parameter;
    use pretty_assertions::assert_eq;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(
                "simple_runner.training_loop",
                vec![
                    Parameter::required("batch_size_per_device"),
                    Parameter::optional("steps_per_save", Value::Int(100)),
                    Parameter::required("learning_rate_schedule"),
                ],
            )
            .unwrap();
        registry
            .register(
                "learning_rate_schedules.ConstantLearningRateSchedule",
                vec![Parameter::required("learning_rate")],
            )
            .unwrap();
        registry
            .register(
                "automaton_layer.FiniteStateGraphAutomaton",
                vec![
                    Parameter::required("num_intermediate_states"),
                    Parameter::optional("num_out_edges", Value::Int(1)),
                ],
            )
            .unwrap();
        registry
    }

    fn resolve(text: &str) -> Result<ResolvedConfiguration, ConfigError> {
        apply(&parse(text, "test.gin")?, &registry())
    }

    // ═══════════════════════════════════════════════════════════════
    // Override semantics
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn last_write_wins() {
        let resolved = resolve(
            "automaton_layer.FiniteStateGraphAutomaton.num_intermediate_states = 3\n\
             automaton_layer.FiniteStateGraphAutomaton.num_out_edges = 4\n\
             automaton_layer.FiniteStateGraphAutomaton.num_intermediate_states = 2\n",
        )
        .unwrap();
        assert_eq!(
            resolved.get("automaton_layer.FiniteStateGraphAutomaton", "num_intermediate_states"),
            Some(&Value::Int(2))
        );
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn suffix_scope_is_canonicalized() {
        let resolved = resolve("FiniteStateGraphAutomaton.num_out_edges = 4").unwrap();
        assert_eq!(
            resolved.get("automaton_layer.FiniteStateGraphAutomaton", "num_out_edges"),
            Some(&Value::Int(4))
        );
    }

    #[test]
    fn empty_text_resolves_to_empty() {
        let resolved = resolve("# nothing here\n\n   # still nothing\n").unwrap();
        assert!(resolved.is_empty());
        assert_eq!(resolved.len(), 0);
    }

    #[test]
    fn apply_is_idempotent() {
        let text = "training_loop.batch_size_per_device = 4\nFiniteStateGraphAutomaton.num_intermediate_states = 2\n";
        assert_eq!(resolve(text).unwrap(), resolve(text).unwrap());
    }

    // ═══════════════════════════════════════════════════════════════
    // Unknown names
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn unknown_parameter() {
        let err = resolve("simple_runner.training_loop.batch_size = 4").unwrap_err();
        match err {
            ConfigError::UnknownParameter {
                scope,
                parameter,
                location,
            } => {
                assert_eq!(scope, "simple_runner.training_loop");
                assert_eq!(parameter, "batch_size");
                assert_eq!(location.line, 1);
            }
            other => panic!("Expected UnknownParameter, got {other}"),
        }
    }

    #[test]
    fn unknown_scope() {
        let err = resolve("train_maze_lib.loss_fn.num_goals = 16").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownScope { .. }));
    }

    #[test]
    fn unknown_reference_target() {
        let err = resolve("training_loop.learning_rate_schedule = @schedules.Cosine()").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownScope { ref scope, .. } if scope == "schedules.Cosine"));
    }

    #[test]
    fn unexpanded_include_is_rejected() {
        let err = resolve("include \"base.gin\"").unwrap_err();
        assert!(matches!(err, ConfigError::Include { .. }));
    }

    // ═══════════════════════════════════════════════════════════════
    // Constructor references
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn constructor_reference_becomes_instance() {
        let resolved = resolve(
            "simple_runner.training_loop.learning_rate_schedule = @learning_rate_schedules.ConstantLearningRateSchedule()\n\
             learning_rate_schedules.ConstantLearningRateSchedule.learning_rate = 0.001\n",
        )
        .unwrap();
        match resolved.get("simple_runner.training_loop", "learning_rate_schedule") {
            Some(Value::Instance(instance)) => {
                assert_eq!(instance.scope, "learning_rate_schedules.ConstantLearningRateSchedule");
                assert_eq!(instance.get("learning_rate"), Some(&Value::Float(0.001)));
            }
            other => panic!("Expected Instance, got {other:?}"),
        }
    }

    #[test]
    fn instance_uses_defaults_for_unbound_parameters() {
        let resolved = resolve(
            "training_loop.learning_rate_schedule = @FiniteStateGraphAutomaton()\n\
             FiniteStateGraphAutomaton.num_intermediate_states = 2\n",
        )
        .unwrap();
        match resolved.get("simple_runner.training_loop", "learning_rate_schedule") {
            Some(Value::Instance(instance)) => {
                assert_eq!(instance.get("num_out_edges"), Some(&Value::Int(1)));
                assert_eq!(instance.get("num_intermediate_states"), Some(&Value::Int(2)));
            }
            other => panic!("Expected Instance, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_reference() {
        let err = resolve(
            "simple_runner.training_loop.learning_rate_schedule = @learning_rate_schedules.ConstantLearningRateSchedule()",
        )
        .unwrap_err();
        match err {
            ConfigError::UnresolvedReference {
                scope,
                parameter,
                location,
            } => {
                assert_eq!(scope, "learning_rate_schedules.ConstantLearningRateSchedule");
                assert_eq!(parameter, "learning_rate");
                assert_eq!(location.line, 1);
            }
            other => panic!("Expected UnresolvedReference, got {other}"),
        }
    }

    #[test]
    fn unresolved_reference_cites_earliest_line() {
        // automaton_layer sorts before simple_runner but references it later
        let err = resolve(
            "training_loop.learning_rate_schedule = @ConstantLearningRateSchedule()\n\
             FiniteStateGraphAutomaton.num_out_edges = @ConstantLearningRateSchedule()\n",
        )
        .unwrap_err();
        match err {
            ConfigError::UnresolvedReference { location, .. } => assert_eq!(location.line, 1),
            other => panic!("Expected UnresolvedReference, got {other}"),
        }
    }

    #[test]
    fn handle_reference_is_kept_as_handle() {
        let resolved =
            resolve("training_loop.learning_rate_schedule = @ConstantLearningRateSchedule").unwrap();
        assert_eq!(
            resolved.get("simple_runner.training_loop", "learning_rate_schedule"),
            Some(&Value::Reference(Reference {
                scope: "learning_rate_schedules.ConstantLearningRateSchedule".into(),
                evaluate: false,
            }))
        );
    }

    #[test]
    fn nested_references_resolve_in_order() {
        let resolved = resolve(
            "training_loop.learning_rate_schedule = [@ConstantLearningRateSchedule(), @FiniteStateGraphAutomaton()]\n\
             FiniteStateGraphAutomaton.num_intermediate_states = 2\n\
             ConstantLearningRateSchedule.learning_rate = 0.5\n",
        )
        .unwrap();
        match resolved.get("simple_runner.training_loop", "learning_rate_schedule") {
            Some(Value::List(items)) => {
                assert!(items.iter().all(|v| matches!(v, Value::Instance(_))));
            }
            other => panic!("Expected List, got {other:?}"),
        }
    }

    #[test]
    fn reference_cycle() {
        let err = resolve(
            "ConstantLearningRateSchedule.learning_rate = @FiniteStateGraphAutomaton()\n\
             FiniteStateGraphAutomaton.num_intermediate_states = @ConstantLearningRateSchedule()\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::CyclicReference { .. }));
    }

    // ═══════════════════════════════════════════════════════════════
    // Macros
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn macros_expand_and_may_be_defined_later() {
        let resolved = resolve(
            "FiniteStateGraphAutomaton.num_intermediate_states = %STATES\n\
             STATES = %BASE\n\
             BASE = 5\n",
        )
        .unwrap();
        assert_eq!(
            resolved.get("automaton_layer.FiniteStateGraphAutomaton", "num_intermediate_states"),
            Some(&Value::Int(5))
        );
    }

    #[test]
    fn undefined_macro() {
        let err = resolve("FiniteStateGraphAutomaton.num_out_edges = %EDGES").unwrap_err();
        assert!(matches!(err, ConfigError::UndefinedMacro { ref name, .. } if name == "EDGES"));
    }

    #[test]
    fn macro_cycle() {
        let err = resolve(
            "A = %B\nB = %A\nFiniteStateGraphAutomaton.num_out_edges = %A\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::CyclicReference { ref cycle } if cycle == "%A → %B → %A"));
    }
}
