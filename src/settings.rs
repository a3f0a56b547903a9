//! The tool's own settings, separate from any kubeconfig.
//!
//! Loaded from `kubectl-cfg.toml` in the platform config directory (for
//! example `~/.config/kubectl-cfg/` on Linux) over compiled defaults. A
//! missing file is fine. `kubectl-cfg settings` prints a commented template.

use std::path::{Path, PathBuf};

use confique::Config;

use crate::access::{DEFAULT_ENV_VAR, DEFAULT_RELATIVE_PATH};
use crate::error::CfgError;
use crate::file;
use crate::observer::BackupFile;

pub const APP_NAME: &str = "kubectl-cfg";
pub const FILE_NAME: &str = "kubectl-cfg.toml";

#[derive(Config, Debug, Clone, PartialEq)]
pub struct Settings {
    /// Environment variable holding the list of kubeconfig files to merge.
    #[config(default = "KUBECONFIG")]
    pub kubeconfig_env: String,

    /// Kubeconfig used when that variable is empty. Relative paths are
    /// resolved against the home directory.
    #[config(default = ".kube/config")]
    pub default_path: PathBuf,

    /// Backups of deleted entries.
    #[config(nested)]
    pub backup: BackupSettings,

    /// Diagnostic logging.
    #[config(nested)]
    pub log: LogSettings,
}

#[derive(Config, Debug, Clone, PartialEq)]
pub struct BackupSettings {
    /// Append every deleted entry to the backup file.
    #[config(default = true)]
    pub enabled: bool,

    /// Backup file. Defaults to ~/.kube/kubectl-cfg-delete-bak.yaml.
    pub file: Option<PathBuf>,
}

#[derive(Config, Debug, Clone, PartialEq)]
pub struct LogSettings {
    /// Log filter, e.g. "warn" or "kubectl_cfg=debug". RUST_LOG takes precedence.
    #[config(default = "warn", env = "KUBECTL_CFG_LOG")]
    pub level: String,
}

impl Settings {
    /// `<platform config dir>/kubectl-cfg.toml`, if the platform has one.
    pub fn path() -> Option<PathBuf> {
        let proj = directories::ProjectDirs::from("", "", APP_NAME)?;
        Some(proj.config_dir().join(FILE_NAME))
    }

    /// Load from the platform location and the environment.
    pub fn load() -> Result<Self, CfgError> {
        let mut builder = Self::builder().env();
        if let Some(path) = Self::path() {
            builder = builder.file(path);
        }
        Ok(builder.load()?)
    }

    /// Load from one specific file (missing is fine), ignoring the environment.
    pub fn load_from(path: &Path) -> Result<Self, CfgError> {
        Ok(Self::builder().file(path).load()?)
    }

    pub fn template() -> String {
        confique::toml::template::<Self>(confique::toml::FormatOptions::default())
    }

    /// The default kubeconfig location, resolved against the home directory.
    pub fn default_kubeconfig(&self) -> Option<PathBuf> {
        if self.default_path.as_os_str().is_empty() {
            return file::home_relative(Path::new(DEFAULT_RELATIVE_PATH));
        }
        file::home_relative(&self.default_path)
    }

    pub fn kubeconfig_env(&self) -> &str {
        if self.kubeconfig_env.is_empty() {
            DEFAULT_ENV_VAR
        } else {
            &self.kubeconfig_env
        }
    }

    /// The backup observer, unless backups are disabled or no path is known.
    pub fn backup_observer(&self) -> Option<BackupFile> {
        if !self.backup.enabled {
            return None;
        }
        let path = match &self.backup.file {
            Some(p) => file::home_relative(p)?,
            None => BackupFile::default_path()?,
        };
        Some(BackupFile::new(path))
    }
}
