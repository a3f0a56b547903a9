//! Hook run with each entry a delete operation removes.
//!
//! The stock observer, [`BackupFile`], appends the removed entry to a YAML
//! file as a small standalone kubeconfig document, so a deleted entry can be
//! restored by hand.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::CfgError;
use crate::model::{AuthInfo, Cluster, Config, Context};
use crate::persist;
use crate::types::EntityKind;

pub const BACKUP_FILE_NAME: &str = "kubectl-cfg-delete-bak.yaml";

/// An entry that is about to be removed.
#[derive(Debug, Clone, Copy)]
pub enum Removed<'a> {
    Cluster(&'a Cluster),
    AuthInfo(&'a AuthInfo),
    Context(&'a Context),
}

impl Removed<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Removed::Cluster(_) => EntityKind::Cluster,
            Removed::AuthInfo(_) => EntityKind::AuthInfo,
            Removed::Context(_) => EntityKind::Context,
        }
    }

    /// A document holding only this entry.
    fn to_document(self, name: &str) -> Config {
        let mut config = Config::new();
        match self {
            Removed::Cluster(c) => {
                config.clusters.insert(name.into(), c.clone());
            }
            Removed::AuthInfo(a) => {
                config.auth_infos.insert(name.into(), a.clone());
            }
            Removed::Context(c) => {
                config.contexts.insert(name.into(), c.clone());
            }
        }
        config
    }
}

/// Observes entries removed by delete operations.
///
/// Called before the modified document is written. A failing observer does
/// not stop the delete; its error becomes a warning on the result.
pub trait DeleteObserver {
    fn on_delete(&self, name: &str, removed: Removed<'_>) -> Result<(), CfgError>;
}

/// Appends each removed entry to a backup file.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupFile {
    path: PathBuf,
}

impl BackupFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        BackupFile { path: path.into() }
    }

    /// `~/.kube/kubectl-cfg-delete-bak.yaml`, if a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        let user = directories::UserDirs::new()?;
        Some(user.home_dir().join(".kube").join(BACKUP_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render(name: &str, removed: Removed<'_>, at: DateTime<Local>) -> Result<String, CfgError> {
        let yaml = persist::serialize(&removed.to_document(name))?;
        let command = match removed.kind() {
            EntityKind::AuthInfo => "auth",
            EntityKind::Cluster => "cluster",
            EntityKind::Context => "context",
        };
        Ok(format!(
            "---\n# [{}] delete backup of 'kubectl cfg delete {command} {name}'\n{yaml}",
            at.format("%Y-%m-%d %H:%M"),
        ))
    }
}

impl DeleteObserver for BackupFile {
    fn on_delete(&self, name: &str, removed: Removed<'_>) -> Result<(), CfgError> {
        let entry = Self::render(name, removed, Local::now())?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CfgError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CfgError::io(&self.path, e))?;
        file.write_all(entry.as_bytes())
            .map_err(|e| CfgError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), %name, "backed up deleted entry");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn cluster() -> Cluster {
        Cluster {
            server: "https://dev".into(),
            ..Cluster::default()
        }
    }

    #[test]
    fn render_has_header_and_entry() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let c = cluster();
        let text = BackupFile::render("dev", Removed::Cluster(&c), at).unwrap();
        assert!(text.starts_with("---\n# [2024-03-09 14:05] delete backup of 'kubectl cfg delete cluster dev'\n"));
        assert!(text.contains("server: https://dev"));
        assert!(text.contains("name: dev"));
    }

    #[test]
    fn backups_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kube").join(BACKUP_FILE_NAME);
        let backup = BackupFile::new(&path);

        let c = cluster();
        backup.on_delete("dev", Removed::Cluster(&c)).unwrap();
        let ctx = Context {
            cluster: "dev".into(),
            ..Context::default()
        };
        backup.on_delete("dev-ctx", Removed::Context(&ctx)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("delete backup of").count(), 2);
        assert!(content.contains("'kubectl cfg delete context dev-ctx'"));

        // Each entry is a loadable kubeconfig document.
        let docs: Vec<Config> = serde_yaml::Deserializer::from_str(&content)
            .map(|doc| serde::Deserialize::deserialize(doc).unwrap())
            .collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].clusters["dev"].server, "https://dev");
        assert_eq!(docs[1].contexts["dev-ctx"].cluster, "dev");
    }

    #[test]
    fn auth_backup_uses_auth_command() {
        let a = AuthInfo::default();
        let at = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let text = BackupFile::render("me", Removed::AuthInfo(&a), at).unwrap();
        assert!(text.contains("'kubectl cfg delete auth me'"));
    }
}
