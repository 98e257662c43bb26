//! ginconf - binding-file configuration resolver
//!
//! Text bindings → validated parameter table → defaults injected into a
//! registry of configurable scopes, once, before training starts.
//!
//! ```no_run
//! use ginconf::{apply, maze, Loader};
//!
//! # fn main() -> Result<(), ginconf::ConfigError> {
//! let mut registry = maze::registry()?;
//! let statements = Loader::default().load_file("configs/maze_fsm.gin")?;
//! let resolved = apply(&statements, &registry)?;
//! registry.bind_defaults(&resolved);
//! let run = maze::MazeTrainingRun::from_registry(&registry)?;
//! assert_eq!(run.automaton.num_intermediate_states, 2);
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod configurable;
pub mod error;
pub mod loader;
pub mod maze;
pub mod registry;
pub mod render;
pub mod resolve;

pub use binding::{evaluate, parse, parse_bindings, Binding, Instance, Location, Statement, Value};
pub use configurable::{Configurable, FromValue, Params};
pub use error::{ConfigError, FixSuggestion};
pub use loader::{Loader, LoaderOptions};
pub use registry::{Parameter, Registry, ScopeSpec};
pub use resolve::{apply, ResolvedConfiguration};
