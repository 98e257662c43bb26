//! Operative configuration output
//!
//! Text output uses the input grammar, so it can be fed back in:
//!
//! ```text
//! # Parameters for train_maze_lib.loss_fn:
//! # ==============================================================================
//! train_maze_lib.loss_fn.num_goals = 16
//! ```

use crate::binding::Value;
use crate::resolve::ResolvedConfiguration;

const RULE: &str =
    "# ==============================================================================";

/// Render as config text; scopes and parameters in sorted order
///
/// Instances render as `@scope()`; scopes reached only through a reference
/// get a block of their own, so the output resolves to the same values.
pub fn operative_config(resolved: &ResolvedConfiguration) -> String {
    let mut out = String::new();
    let mut nested: Vec<(String, Vec<(String, Value)>)> = Vec::new();

    for (scope, params) in resolved.iter() {
        collect_instances(params.values(), &mut nested);
        write_block(&mut out, scope, params.iter().map(|(k, v)| (k.as_str(), v)));
    }

    // Scopes only reached through @scope() and never bound directly
    nested.retain(|(scope, _)| resolved.scope(scope).is_none());
    nested.sort_by(|a, b| a.0.cmp(&b.0));
    nested.dedup_by(|a, b| a.0 == b.0);
    for (scope, params) in &nested {
        write_block(&mut out, scope, params.iter().map(|(k, v)| (k.as_str(), v)));
    }

    out
}

/// Render as pretty JSON
pub fn to_json(resolved: &ResolvedConfiguration) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(resolved)
}

/// Render as YAML
pub fn to_yaml(resolved: &ResolvedConfiguration) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(resolved)
}

fn write_block<'a>(out: &mut String, scope: &str, params: impl Iterator<Item = (&'a str, &'a Value)>) {
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&format!("# Parameters for {}:\n{}\n", scope, RULE));
    for (name, value) in params {
        out.push_str(&format!("{}.{} = {}\n", scope, name, value));
    }
}

fn collect_instances<'a>(
    values: impl Iterator<Item = &'a Value>,
    nested: &mut Vec<(String, Vec<(String, Value)>)>,
) {
    for value in values {
        value.walk(&mut |v| {
            if let Value::Instance(instance) = v {
                let params: Vec<(String, Value)> = instance
                    .params
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                nested.push((instance.scope.clone(), params));
                collect_instances(instance.params.values(), &mut *nested);
            }
        });
    }
}
