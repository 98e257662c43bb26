//! Construction graph between scopes
//!
//! An edge `a → b` means a value bound on scope `a` constructs `@b()`.
//! Referenced scopes must be constructed before the scopes that use them,
//! so the construction order is a DFS post-order; a back edge is a cycle.

use std::collections::{BTreeMap, HashSet};

use crate::error::ConfigError;

#[derive(Debug, Default)]
pub struct ReferenceGraph {
    /// scope -> scopes it constructs
    edges: BTreeMap<String, Vec<String>>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, scope: &str) {
        self.edges.entry(scope.to_string()).or_default();
    }

    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.add_node(to);
        let targets = self.edges.entry(from.to_string()).or_default();
        if !targets.iter().any(|t| t == to) {
            targets.push(to.to_string());
        }
    }

    pub fn successors(&self, scope: &str) -> &[String] {
        static EMPTY: &[String] = &[];
        self.edges.get(scope).map(|v| v.as_slice()).unwrap_or(EMPTY)
    }

    /// All scopes, dependencies before dependents
    ///
    /// Fails with `CyclicReference` naming the first cycle found, e.g.
    /// `a → b → a`.
    pub fn construction_order(&self) -> Result<Vec<&str>, ConfigError> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut on_path: HashSet<&str> = HashSet::new();
        let mut path: Vec<&str> = Vec::new();
        let mut order: Vec<&str> = Vec::with_capacity(self.edges.len());

        for node in self.edges.keys() {
            if !visited.contains(node.as_str()) {
                self.visit(node, &mut visited, &mut on_path, &mut path, &mut order)?;
            }
        }

        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        visited: &mut HashSet<&'a str>,
        on_path: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
        order: &mut Vec<&'a str>,
    ) -> Result<(), ConfigError> {
        visited.insert(node);
        on_path.insert(node);
        path.push(node);

        for next in self.successors(node) {
            let next = next.as_str();
            if on_path.contains(next) {
                let start = path.iter().position(|&n| n == next).unwrap_or(0);
                return Err(ConfigError::CyclicReference {
                    cycle: format!("{} → {}", path[start..].join(" → "), next),
                });
            }
            if !visited.contains(next) {
                self.visit(next, visited, on_path, path, order)?;
            }
        }

        on_path.remove(node);
        path.pop();
        order.push(node);
        Ok(())
    }
}
