//! Binding Module - the `scope.parameter = value` file grammar
//!
//! - `parse`: line tokenizer producing [`Statement`]s
//! - `value`: right-hand side grammar ([`Value`], [`evaluate`])
//! - `validate`: identifier and dotted-name checks
//!
//! ```text
//! # Parameters for train_maze_lib.loss_fn:
//! train_maze_lib.loss_fn.num_goals = 16          # Binding
//! NUM_GOALS = 16                                 # Macro
//! loss_fn.num_goals = %NUM_GOALS                 # Macro reference
//! training_loop.learning_rate_schedule = @learning_rate_schedules.ConstantLearningRateSchedule()
//! include "base.gin"                             # Include
//! ```

mod parse;
mod validate;
mod value;

use std::fmt;
use std::sync::Arc;

pub use parse::{parse, parse_bindings};
pub use validate::{split_dotted, validate_identifier};
pub use value::{evaluate, evaluate_at, Instance, Reference, Value};

/// Where a statement came from (source name + 1-based line)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub source: Arc<str>,
    pub line: usize,
}

impl Location {
    pub fn new(source: impl Into<Arc<str>>, line: usize) -> Self {
        Self {
            source: source.into(),
            line,
        }
    }

    /// Location used for values that did not come from any file
    pub fn inline() -> Self {
        Self::new("<string>", 1)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.source)
        } else {
            write!(f, "{}:{}", self.source, self.line)
        }
    }
}

/// One `scope.parameter = value` declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Dotted scope as written (may be a suffix of the registered name)
    pub scope: String,
    pub parameter: String,
    pub value: Value,
    pub location: Location,
}

impl Binding {
    /// `scope.parameter`, as written in the file
    pub fn key(&self) -> String {
        format!("{}.{}", self.scope, self.parameter)
    }
}

/// `NAME = value`
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDef {
    pub name: String,
    pub value: Value,
    pub location: Location,
}

/// `include "path"`
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    pub path: String,
    pub location: Location,
}

/// A parsed, non-comment line
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Binding(Binding),
    Macro(MacroDef),
    Include(Include),
}

impl Statement {
    pub fn location(&self) -> &Location {
        match self {
            Statement::Binding(b) => &b.location,
            Statement::Macro(m) => &m.location,
            Statement::Include(i) => &i.location,
        }
    }
}
