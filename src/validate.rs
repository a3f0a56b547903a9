//! Pre-write validation.
//!
//! Every check here runs before anything is loaded or written, so a rejected
//! action leaves all files untouched. Checks that depend on the stored
//! document (an entry must exist, the current context must be set) live with
//! the operations in [`ops`](crate::ops).

use std::path::Path;

use crate::error::CfgError;
use crate::model::Cluster;
use crate::patch::{AuthInfoPatch, ClusterPatch};
use crate::types::{Action, EntityKind};

/// Validate an action without touching any kubeconfig file.
pub fn validate_action(action: &Action) -> Result<(), CfgError> {
    match action {
        Action::AddCluster { name, patch } => validate_cluster_patch(name, patch),
        Action::AddAuthInfo { name, patch } => validate_auth_info_patch(name, patch),
        Action::AddContext { name, current, .. } => {
            validate_context_target(name.as_deref(), *current)
        }
        Action::Delete { kind, name } => validate_name(*kind, name),
        Action::RenameContext { from, to } => {
            validate_name(EntityKind::Context, from)?;
            if to.is_empty() {
                return Err(CfgError::Validation(
                    "you must specify a non-empty new context name".into(),
                ));
            }
            Ok(())
        }
        Action::UseContext { name } => {
            if name.is_empty() {
                return Err(CfgError::Validation("empty context names are not allowed".into()));
            }
            Ok(())
        }
        Action::Merge { files, .. } => {
            if files.is_empty() {
                return Err(CfgError::Validation(
                    "at least one kubeconfig file is required to merge".into(),
                ));
            }
            Ok(())
        }
        Action::CurrentContext | Action::List { .. } | Action::Settings => Ok(()),
    }
}

pub fn validate_name(kind: EntityKind, name: &str) -> Result<(), CfgError> {
    if name.is_empty() {
        return Err(CfgError::Validation(format!(
            "you must specify a non-empty {kind} name"
        )));
    }
    Ok(())
}

pub fn validate_cluster_patch(name: &str, patch: &ClusterPatch) -> Result<(), CfgError> {
    validate_name(EntityKind::Cluster, name)?;

    let ca = patch.certificate_authority.as_deref().unwrap_or_default();
    if patch.insecure_skip_tls_verify.value() && !ca.is_empty() {
        return Err(CfgError::Validation(
            "you cannot specify a certificate authority and insecure mode at the same time".into(),
        ));
    }
    if patch.embed_certs.value() {
        if ca.is_empty() {
            return Err(CfgError::Validation(
                "you must specify a certificate authority file to embed".into(),
            ));
        }
        require_readable(ca)?;
    }
    Ok(())
}

/// Checks the cluster as it will be stored, after the patch is applied.
pub fn validate_cluster(name: &str, cluster: &Cluster) -> Result<(), CfgError> {
    if cluster.insecure() && cluster.has_certificate_authority() {
        return Err(CfgError::Validation(format!(
            "cluster {name:?} cannot have both a certificate authority and insecure-skip-tls-verify"
        )));
    }
    Ok(())
}

pub fn validate_auth_info_patch(name: &str, patch: &AuthInfoPatch) -> Result<(), CfgError> {
    validate_name(EntityKind::AuthInfo, name)?;

    if patch.sets_token() && patch.sets_basic() {
        return Err(CfgError::Validation(
            "you cannot specify more than one authentication method at the same time".into(),
        ));
    }

    if patch.embed_certs.value() {
        let cert = patch.client_certificate.as_deref().unwrap_or_default();
        let key = patch.client_key.as_deref().unwrap_or_default();
        if cert.is_empty() && key.is_empty() {
            return Err(CfgError::Validation(
                "you must specify a client certificate or client key to embed".into(),
            ));
        }
        for path in [cert, key] {
            if !path.is_empty() {
                require_readable(path)?;
            }
        }
    }
    Ok(())
}

/// A context is targeted either by name or by `--current`, never both.
pub fn validate_context_target(name: Option<&str>, current: bool) -> Result<(), CfgError> {
    let named = name.is_some_and(|n| !n.is_empty());
    match (named, current) {
        (true, true) => Err(CfgError::Conflict(
            "you cannot specify a context name and --current at the same time".into(),
        )),
        (false, false) => Err(CfgError::Validation(
            "you must specify a non-empty context name or --current".into(),
        )),
        _ => Ok(()),
    }
}

fn require_readable(path: &str) -> Result<(), CfgError> {
    std::fs::File::open(Path::new(path))
        .map(drop)
        .map_err(|e| CfgError::io(path, e))
}
