use std::cell::{Cell, RefCell};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::CfgError;
use crate::file::{self, LoadingRules};
use crate::model::Config;
use crate::persist;
use crate::resolve::{self, ResolveInput, Resolved};

pub const DEFAULT_ENV_VAR: &str = "KUBECONFIG";
pub const DEFAULT_RELATIVE_PATH: &str = ".kube/config";

/// Read and write access to a kubeconfig, whatever stores it.
///
/// Operations only go through this trait, so they run the same against the
/// real file chain and against an in-memory document.
pub trait ConfigAccess {
    /// The merged view every operation starts from.
    fn starting_config(&self) -> Result<Config, CfgError>;

    /// Make `config` the new merged view.
    fn modify_config(&self, config: &Config) -> Result<(), CfgError>;

    /// Where the config lives, for messages only.
    fn location(&self) -> String;
}

/// Builder for the file-backed [`ConfigAccess`].
///
/// Inputs are captured once here and passed down explicitly; nothing reads
/// process state after [`build()`](Self::build).
#[derive(Debug, Clone)]
pub struct PathOptions {
    env_var: String,
    env_value: Option<Option<OsString>>,
    default_path: Option<PathBuf>,
    explicit_path: Option<PathBuf>,
}

impl PathOptions {
    pub fn new() -> Self {
        Self {
            env_var: DEFAULT_ENV_VAR.into(),
            env_value: None,
            default_path: file::home_relative(Path::new(DEFAULT_RELATIVE_PATH)),
            explicit_path: None,
        }
    }

    /// Name of the path list variable (default: `KUBECONFIG`).
    pub fn env_var(mut self, name: &str) -> Self {
        self.env_var = name.to_string();
        self
    }

    /// Use this value instead of reading the path list variable.
    /// `None` behaves like an unset variable.
    pub fn env_value(mut self, value: Option<OsString>) -> Self {
        self.env_value = Some(value);
        self
    }

    /// The file used when the path list is empty (default: `~/.kube/config`).
    pub fn default_path(mut self, path: Option<PathBuf>) -> Self {
        self.default_path = path;
        self
    }

    /// An explicit file that replaces the whole chain. `None` values are ignored.
    pub fn explicit_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.explicit_path = path;
        }
        self
    }

    fn effective_env_value(&self) -> Option<OsString> {
        match &self.env_value {
            Some(value) => value.clone(),
            None => std::env::var_os(&self.env_var),
        }
    }

    pub fn rules(&self) -> LoadingRules {
        LoadingRules::new(
            self.explicit_path.clone(),
            self.effective_env_value().as_deref(),
            self.default_path.clone(),
        )
    }

    pub fn build(self) -> FileAccess {
        let rules = self.rules();
        tracing::debug!(chain = ?rules.chain(), explicit = rules.explicit_path.is_some(), "kubeconfig chain");
        FileAccess::new(rules)
    }
}

impl Default for PathOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Kubeconfig access over a chain of files.
///
/// Stateless: every call re-reads the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAccess {
    rules: LoadingRules,
}

impl FileAccess {
    pub fn new(rules: LoadingRules) -> Self {
        FileAccess { rules }
    }

    pub fn resolve(&self) -> Result<Resolved, CfgError> {
        resolve::resolve(ResolveInput {
            files: self.rules.load()?,
        })
    }
}

impl ConfigAccess for FileAccess {
    fn starting_config(&self) -> Result<Config, CfgError> {
        Ok(self.resolve()?.config)
    }

    /// Write the difference between the files on disk and `config`.
    ///
    /// Only files whose content changes are rewritten. An update that leaves
    /// every entry as it was writes nothing, so the files keep their exact
    /// bytes rather than being re-encoded.
    fn modify_config(&self, config: &Config) -> Result<(), CfgError> {
        let resolved = self.resolve()?;
        let destination = self.rules.default_destination()?;
        let plan = persist::plan_writes(&resolved, config, &destination)?;
        if plan.is_empty() {
            tracing::debug!("nothing changed, no file written");
            return Ok(());
        }
        persist::apply_plan(&plan, &resolved)?;
        Ok(())
    }

    fn location(&self) -> String {
        match self.rules.default_destination() {
            Ok(path) => path.display().to_string(),
            Err(_) => "<no kubeconfig>".into(),
        }
    }
}

/// In-memory kubeconfig, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryAccess {
    config: RefCell<Config>,
    writes: Cell<usize>,
}

impl MemoryAccess {
    pub fn new(config: Config) -> Self {
        MemoryAccess {
            config: RefCell::new(config),
            writes: Cell::new(0),
        }
    }

    pub fn config(&self) -> Config {
        self.config.borrow().clone()
    }

    /// How many times [`modify_config`](ConfigAccess::modify_config) ran.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl ConfigAccess for MemoryAccess {
    fn starting_config(&self) -> Result<Config, CfgError> {
        Ok(self.config())
    }

    fn modify_config(&self, config: &Config) -> Result<(), CfgError> {
        *self.config.borrow_mut() = config.clone();
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{FILE_A, FILE_B, TWO_CLUSTERS, read, write};
    use std::fs;
    use tempfile::TempDir;

    fn options(dir: &TempDir) -> PathOptions {
        PathOptions::new()
            .env_value(None)
            .default_path(Some(dir.path().join("config")))
    }

    #[test]
    fn explicit_path_wins_over_env() {
        let env = std::env::join_paths(["/a", "/b"]).unwrap();
        let rules = PathOptions::new()
            .env_value(Some(env))
            .explicit_path(Some("/explicit".into()))
            .rules();
        assert_eq!(rules.chain(), vec![PathBuf::from("/explicit")]);
    }

    #[test]
    fn explicit_none_is_ignored() {
        let rules = PathOptions::new()
            .explicit_path(Some("/x".into()))
            .explicit_path(None)
            .rules();
        assert_eq!(rules.explicit_path, Some(PathBuf::from("/x")));
    }

    #[test]
    fn missing_default_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let access = options(&dir).build();
        let config = access.starting_config().unwrap();
        assert!(config.clusters.is_empty());
        assert_eq!(config.api_version, "v1");
    }

    #[test]
    fn modify_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let access = options(&dir).build();
        let mut config = access.starting_config().unwrap();
        config.current_context = "x".into();
        access.modify_config(&config).unwrap();
        assert_eq!(read(&dir.path().join("config")).current_context, "x");
    }

    #[test]
    fn unchanged_modify_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "config", TWO_CLUSTERS);
        let access = options(&dir).build();
        let config = access.starting_config().unwrap();
        access.modify_config(&config).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), TWO_CLUSTERS);
    }

    #[test]
    fn env_chain_merges_first_wins() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.yaml", FILE_A);
        let b = write(dir.path(), "b.yaml", FILE_B);
        let env = std::env::join_paths([&a, &b]).unwrap();
        let access = options(&dir).env_value(Some(env)).build();

        let config = access.starting_config().unwrap();
        assert_eq!(config.clusters["a"].server, "https://from-a");
        assert_eq!(config.current_context, "b");
        assert_eq!(access.location(), a.display().to_string());
    }

    #[test]
    fn memory_access_counts_writes() {
        let access = MemoryAccess::new(Config::new());
        let mut config = access.starting_config().unwrap();
        config.current_context = "c".into();
        access.modify_config(&config).unwrap();
        assert_eq!(access.writes(), 1);
        assert_eq!(access.config().current_context, "c");
        assert_eq!(access.location(), "<memory>");
    }
}
