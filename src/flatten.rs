//! Inline file references so a document stands on its own.
//!
//! Certificate authority, client certificate and client key paths are read
//! into their `*-data` twins and the paths dropped. A relative path is
//! resolved against the directory of the file that defines the entry, which
//! is where kubectl itself would look for it.

use std::path::{Path, PathBuf};

use crate::error::CfgError;
use crate::model::Config;
use crate::resolve::Origins;
use crate::types::EntityKind;

/// Replace every file reference in `config` with the file's bytes.
pub fn flatten(config: &mut Config, origins: &Origins) -> Result<(), CfgError> {
    for (name, cluster) in &mut config.clusters {
        let base = base_dir(origins, EntityKind::Cluster, name);
        inline(
            &mut cluster.certificate_authority,
            &mut cluster.certificate_authority_data,
            base,
        )?;
    }
    for (name, auth) in &mut config.auth_infos {
        let base = base_dir(origins, EntityKind::AuthInfo, name);
        inline(
            &mut auth.client_certificate,
            &mut auth.client_certificate_data,
            base,
        )?;
        inline(&mut auth.client_key, &mut auth.client_key_data, base)?;
    }
    Ok(())
}

fn base_dir<'a>(origins: &'a Origins, kind: EntityKind, name: &str) -> Option<&'a Path> {
    origins.owner(kind, name).and_then(Path::parent)
}

fn inline(path: &mut String, data: &mut Vec<u8>, base: Option<&Path>) -> Result<(), CfgError> {
    if path.is_empty() {
        return Ok(());
    }
    let target = resolve_reference(path, base);
    *data = std::fs::read(&target).map_err(|e| CfgError::io(&target, e))?;
    path.clear();
    Ok(())
}

fn resolve_reference(path: &str, base: Option<&Path>) -> PathBuf {
    let path = Path::new(path);
    match base {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}
