//! Loader - files, includes and command-line overrides
//!
//! Produces a flat statement list for [`crate::apply`]:
//! - `include "x.gin"` is replaced by the statements of `x.gin`, resolved
//!   relative to the including file, then each search path
//! - `--bind` overrides are appended last so they win over the file

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::binding::{parse, Include, Statement};
use crate::error::ConfigError;

/// Environment variable holding extra include directories (`:`-separated)
pub const INCLUDE_PATH_ENV: &str = "GINCONF_INCLUDE_PATH";

/// Source name used for override bindings in error messages
pub const OVERRIDE_SOURCE: &str = "<command line>";

#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Directories searched for includes after the including file's own
    pub search_paths: Vec<PathBuf>,
    /// Extra statements applied after the file, one per entry
    pub overrides: Vec<String>,
}

impl LoaderOptions {
    /// Options with search paths taken from `GINCONF_INCLUDE_PATH`
    pub fn from_env() -> Self {
        let search_paths = std::env::var_os(INCLUDE_PATH_ENV)
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();
        Self {
            search_paths,
            overrides: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Loader {
    options: LoaderOptions,
}

impl Loader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.search_paths.push(path.into());
        self
    }

    pub fn with_overrides<I, S>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options
            .overrides
            .extend(bindings.into_iter().map(Into::into));
        self
    }

    /// Load a config file, its includes and the overrides
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Vec<Statement>, ConfigError> {
        let path = path.as_ref();
        let mut statements = Vec::new();
        let mut stack = Vec::new();
        self.load_into(path, &mut stack, &mut statements)?;
        statements.extend(self.override_statements()?);

        info!(
            file = %path.display(),
            statements = statements.len(),
            overrides = self.options.overrides.len(),
            "configuration loaded"
        );
        Ok(statements)
    }

    /// Load in-memory text; includes resolve against the search paths
    pub fn load_str(&self, text: &str, source: &str) -> Result<Vec<Statement>, ConfigError> {
        let mut statements = Vec::new();
        let mut stack = Vec::new();
        self.expand(parse(text, source)?, None, &mut stack, &mut statements)?;
        statements.extend(self.override_statements()?);
        Ok(statements)
    }

    fn load_into(
        &self,
        path: &Path,
        stack: &mut Vec<PathBuf>,
        out: &mut Vec<Statement>,
    ) -> Result<(), ConfigError> {
        let canonical = std::fs::canonicalize(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if stack.contains(&canonical) {
            let mut chain: Vec<String> = stack.iter().map(|p| p.display().to_string()).collect();
            chain.push(canonical.display().to_string());
            return Err(ConfigError::CyclicReference {
                cycle: chain.join(" → "),
            });
        }

        debug!(file = %path.display(), "reading config file");
        let text = std::fs::read_to_string(&canonical).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let statements = parse(&text, &path.display().to_string())?;

        stack.push(canonical.clone());
        self.expand(statements, canonical.parent(), stack, out)?;
        stack.pop();
        Ok(())
    }

    fn expand(
        &self,
        statements: Vec<Statement>,
        base_dir: Option<&Path>,
        stack: &mut Vec<PathBuf>,
        out: &mut Vec<Statement>,
    ) -> Result<(), ConfigError> {
        for statement in statements {
            match statement {
                Statement::Include(include) => {
                    let target = self.find_include(&include, base_dir)?;
                    debug!(include = %include.path, resolved = %target.display(), "expanding include");
                    self.load_into(&target, stack, out)?;
                }
                other => out.push(other),
            }
        }
        Ok(())
    }

    fn find_include(&self, include: &Include, base_dir: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let requested = Path::new(&include.path);
        if requested.is_absolute() {
            return if requested.is_file() {
                Ok(requested.to_path_buf())
            } else {
                Err(self.include_error(include, "file not found"))
            };
        }

        base_dir
            .into_iter()
            .chain(self.options.search_paths.iter().map(PathBuf::as_path))
            .map(|dir| dir.join(requested))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| self.include_error(include, "not found next to the including file or in any search path"))
    }

    fn include_error(&self, include: &Include, reason: &str) -> ConfigError {
        ConfigError::Include {
            path: include.path.clone(),
            reason: reason.to_string(),
            location: include.location.clone(),
        }
    }

    fn override_statements(&self) -> Result<Vec<Statement>, ConfigError> {
        if self.options.overrides.is_empty() {
            return Ok(Vec::new());
        }
        let text = self.options.overrides.join("\n");
        let mut statements = Vec::new();
        let mut stack = Vec::new();
        let base_dir = std::env::current_dir().ok();
        self.expand(parse(&text, OVERRIDE_SOURCE)?, base_dir.as_deref(), &mut stack, &mut statements)?;
        for statement in &statements {
            debug!(at = %statement.location(), "override statement");
        }
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Value;
    use std::fs;
    use tempfile::TempDir;

    fn bindings(statements: &[Statement]) -> Vec<(String, Value)> {
        statements
            .iter()
            .filter_map(|s| match s {
                Statement::Binding(b) => Some((b.key(), b.value.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn include_is_spliced_in_place() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("base.gin"), "a.x = 1\na.y = 2\n").unwrap();
        fs::write(
            dir.path().join("main.gin"),
            "a.w = 0\ninclude \"base.gin\"\na.x = 3\n",
        )
        .unwrap();

        let statements = Loader::default().load_file(dir.path().join("main.gin")).unwrap();
        assert_eq!(
            bindings(&statements),
            vec![
                ("a.w".to_string(), Value::Int(0)),
                ("a.x".to_string(), Value::Int(1)),
                ("a.y".to_string(), Value::Int(2)),
                ("a.x".to_string(), Value::Int(3)),
            ]
        );
    }

    #[test]
    fn include_errors_point_into_the_included_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("base.gin"), "a.x = 1\na.y = oops\n").unwrap();
        fs::write(dir.path().join("main.gin"), "include \"base.gin\"\n").unwrap();

        let err = Loader::default()
            .load_file(dir.path().join("main.gin"))
            .unwrap_err();
        assert!(err.to_string().contains("base.gin:2"));
    }

    #[test]
    fn include_from_search_path() {
        let shared = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(shared.path().join("common.gin"), "a.shared = True\n").unwrap();
        fs::write(project.path().join("main.gin"), "include 'common.gin'\n").unwrap();

        let statements = Loader::default()
            .with_search_path(shared.path())
            .load_file(project.path().join("main.gin"))
            .unwrap();
        assert_eq!(bindings(&statements), vec![("a.shared".to_string(), Value::Bool(true))]);
    }

    #[test]
    fn missing_include() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.gin"), "\ninclude \"nope.gin\"\n").unwrap();
        let err = Loader::default()
            .load_file(dir.path().join("main.gin"))
            .unwrap_err();
        match err {
            ConfigError::Include { path, location, .. } => {
                assert_eq!(path, "nope.gin");
                assert_eq!(location.line, 2);
            }
            other => panic!("Expected Include, got {other}"),
        }
    }

    #[test]
    fn include_cycle() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.gin"), "include \"b.gin\"\n").unwrap();
        fs::write(dir.path().join("b.gin"), "include \"a.gin\"\n").unwrap();
        let err = Loader::default()
            .load_file(dir.path().join("a.gin"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::CyclicReference { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = Loader::default()
            .load_file(dir.path().join("absent.gin"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("absent.gin"));
    }

    #[test]
    fn overrides_come_last() {
        let statements = Loader::default()
            .with_overrides(["a.x = 9", "a.z = \"cli\""])
            .load_str("a.x = 1\n", "inline.gin")
            .unwrap();
        let keys = bindings(&statements);
        assert_eq!(keys.last().unwrap(), &("a.z".to_string(), Value::Str("cli".into())));
        assert_eq!(keys[1], ("a.x".to_string(), Value::Int(9)));
        assert_eq!(&*statements[1].location().source, OVERRIDE_SOURCE);
    }

    #[test]
    fn malformed_override_reports_command_line() {
        let err = Loader::default()
            .with_overrides(["a.x = 1", "a.y"])
            .load_str("", "inline.gin")
            .unwrap_err();
        assert!(err.to_string().contains("<command line>:2"));
    }
}
