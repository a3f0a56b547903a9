//! Kubeconfig location discovery and loading.
//!
//! # Discovery
//!
//! The set of files an invocation reads is described by [`LoadingRules`]:
//!
//! - An **explicit path** (`--kubeconfig`) replaces everything else. It must
//!   exist; a missing explicit file is [`CfgError::FileNotFound`].
//! - Otherwise the **path list** from the environment (by default
//!   `KUBECONFIG`) is split with the platform separator. Empty entries are
//!   dropped and duplicates keep their first position.
//! - If the list is empty, the chain is the single **default path**
//!   (`~/.kube/config`).
//!
//! The chain is ordered by precedence: the first file wins any conflict.
//!
//! # Loading
//!
//! Files in a chain that do not exist are skipped silently. Only real I/O
//! errors (permissions, etc.) are propagated. Loading returns `(path,
//! content)` pairs and does no parsing; see [`resolve`](crate::resolve).
//!
//! # Write destination
//!
//! Entries that have no owning file go to the [default
//! destination](LoadingRules::default_destination): the first file of the
//! chain that exists, or the last path when none exist yet.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::CfgError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadingRules {
    pub explicit_path: Option<PathBuf>,
    pub precedence: Vec<PathBuf>,
}

impl LoadingRules {
    /// Build the rules from the raw inputs.
    ///
    /// `env_value` is the unsplit value of the path list variable.
    /// `default_path` is only used when that list yields no paths.
    pub fn new(
        explicit_path: Option<PathBuf>,
        env_value: Option<&OsStr>,
        default_path: Option<PathBuf>,
    ) -> Self {
        let mut precedence = env_value.map(split_path_list).unwrap_or_default();
        if precedence.is_empty() {
            precedence.extend(default_path);
        }
        LoadingRules {
            explicit_path: explicit_path.filter(|p| !p.as_os_str().is_empty()),
            precedence,
        }
    }

    /// Rules over a fixed list of files, highest precedence first.
    pub fn from_files(files: Vec<PathBuf>) -> Self {
        LoadingRules {
            explicit_path: None,
            precedence: files,
        }
    }

    /// The ordered list of files this invocation reads and may write.
    pub fn chain(&self) -> Vec<PathBuf> {
        match &self.explicit_path {
            Some(p) => vec![p.clone()],
            None => self.precedence.clone(),
        }
    }

    /// Where an entry without an owning file is written.
    pub fn default_destination(&self) -> Result<PathBuf, CfgError> {
        if let Some(p) = &self.explicit_path {
            return Ok(p.clone());
        }
        if let Some(existing) = self.precedence.iter().find(|p| p.exists()) {
            return Ok(existing.clone());
        }
        self.precedence
            .last()
            .cloned()
            .ok_or(CfgError::NoKubeconfigLocation)
    }

    /// Read every file of the chain, in precedence order.
    pub fn load(&self) -> Result<Vec<(PathBuf, String)>, CfgError> {
        if let Some(explicit) = &self.explicit_path {
            let content = read_required(explicit)?;
            return Ok(vec![(explicit.clone(), content)]);
        }
        if self.precedence.is_empty() {
            return Err(CfgError::NoKubeconfigLocation);
        }
        load_all(&self.precedence)
    }
}

/// Split an env-style path list, dropping empty entries and duplicates.
pub fn split_path_list(value: &OsStr) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    std::env::split_paths(value)
        .filter(|p| !p.as_os_str().is_empty())
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

/// Resolve a path relative to the user's home directory.
///
/// Absolute paths are returned unchanged. Returns `None` if no home
/// directory can be determined.
pub fn home_relative(path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        return Some(path.to_path_buf());
    }
    let user = directories::UserDirs::new()?;
    Some(user.home_dir().join(path))
}

/// Read each existing file. Missing files are skipped.
pub fn load_all(paths: &[PathBuf]) -> Result<Vec<(PathBuf, String)>, CfgError> {
    let mut results = Vec::new();
    for path in paths {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                tracing::debug!(path = %path.display(), "loaded kubeconfig");
                results.push((path.clone(), content));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "kubeconfig not present, skipping");
            }
            Err(e) => return Err(CfgError::io(path, e)),
        }
    }
    Ok(results)
}

/// Read a file that must exist.
pub fn read_required(path: &Path) -> Result<String, CfgError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CfgError::FileNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(CfgError::io(path, e)),
    }
}
