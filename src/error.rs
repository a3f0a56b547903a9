use std::path::PathBuf;
use thiserror::Error;

use crate::types::EntityKind;

#[derive(Debug, Error)]
pub enum CfgError {
    #[error("the file {path} does not exist")]
    FileNotFound { path: PathBuf },

    #[error("no {kind} exists with the name {name:?} in {location}")]
    EntityNotFound {
        kind: EntityKind,
        name: String,
        location: String,
    },

    #[error("failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("failed to access {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Validation(String),

    #[error("no current context is set")]
    NoCurrentContext,

    #[error("{0}")]
    Conflict(String),

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("no kubeconfig location: set --kubeconfig, the path list variable, or a home directory")]
    NoKubeconfigLocation,

    #[error("settings error: {0}")]
    Settings(#[from] confique::Error),

    #[error("failed to encode output: {0}")]
    Encode(String),
}

impl CfgError {
    /// True for both a missing file and a missing named entity.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CfgError::FileNotFound { .. } | CfgError::EntityNotFound { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CfgError::IoError {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_not_found_formats_correctly() {
        let err = CfgError::EntityNotFound {
            kind: EntityKind::Context,
            name: "prod".into(),
            location: "/home/user/.kube/config".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("context"));
        assert!(msg.contains("\"prod\""));
        assert!(msg.contains(".kube/config"));
        assert!(err.is_not_found());
    }

    #[test]
    fn file_not_found_is_not_found() {
        let err = CfgError::FileNotFound {
            path: "/tmp/missing.yaml".into(),
        };
        assert!(err.to_string().contains("missing.yaml"));
        assert!(err.is_not_found());
    }

    #[test]
    fn validation_is_not_not_found() {
        let err = CfgError::Validation("you must specify a non-empty cluster name".into());
        assert_eq!(err.to_string(), "you must specify a non-empty cluster name");
        assert!(!err.is_not_found());
    }

    #[test]
    fn invalid_value_formats() {
        let err = CfgError::InvalidValue {
            key: "exec-env".into(),
            reason: "expected key=value or key-".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exec-env"));
        assert!(msg.contains("key=value"));
    }

    #[test]
    fn io_error_carries_path() {
        let err = CfgError::io(
            "/etc/ca.crt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/etc/ca.crt"));
        assert!(msg.contains("denied"));
    }
}
