//! Writeback: route each change to the file that owns it, then write files
//! atomically.
//!
//! Planning ([`plan_writes`]) is pure. It diffs the merged view as loaded
//! against the modified view:
//!
//! - A new or changed entry is written to the file that first defines it, or
//!   to the default destination when no file does.
//! - A field that a change clears is also removed from the same entry in
//!   every lower-precedence file, so the merge does not fill it back in.
//! - A removed entry is removed from every file that defines it, so it does
//!   not reappear from a lower-precedence file.
//! - A changed `current-context` goes to the file that first sets it, or to
//!   the default destination.
//! - Unchanged entries cause no write.
//!
//! Applying a plan ([`apply_plan`]) patches each destination's own content
//! and writes it through a temp file in the same directory, creating parent
//! directories as needed.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use tempfile::NamedTempFile;

use crate::error::CfgError;
use crate::model::{AuthInfo, Cluster, Config, Context};
use crate::resolve::Resolved;
use crate::types::EntityKind;

/// Changes destined for one file. `None` removes the entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileEdit {
    pub clusters: BTreeMap<String, Option<Cluster>>,
    pub auth_infos: BTreeMap<String, Option<AuthInfo>>,
    pub contexts: BTreeMap<String, Option<Context>>,
    pub current_context: Option<String>,
}

impl FileEdit {
    /// Patch one file's own document in place.
    pub fn apply_to(&self, config: &mut Config) {
        apply_section(&mut config.clusters, &self.clusters);
        apply_section(&mut config.auth_infos, &self.auth_infos);
        apply_section(&mut config.contexts, &self.contexts);
        if let Some(current) = &self.current_context {
            config.current_context = current.clone();
        }
        config.ensure_header();
    }
}

fn apply_section<T: Clone>(target: &mut BTreeMap<String, T>, edits: &BTreeMap<String, Option<T>>) {
    for (name, edit) in edits {
        match edit {
            Some(entity) => {
                target.insert(name.clone(), entity.clone());
            }
            None => {
                target.remove(name);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WritePlan {
    pub edits: BTreeMap<PathBuf, FileEdit>,
}

impl WritePlan {
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn destinations(&self) -> impl Iterator<Item = &Path> {
        self.edits.keys().map(PathBuf::as_path)
    }

    fn edit(&mut self, path: &Path) -> &mut FileEdit {
        self.edits.entry(path.to_path_buf()).or_default()
    }
}

/// Compute which files must change for `modified` to become the merged view.
pub fn plan_writes(
    resolved: &Resolved,
    modified: &Config,
    default_destination: &Path,
) -> Result<WritePlan, CfgError> {
    let mut plan = WritePlan::default();

    plan_section(
        &mut plan,
        EntityKind::Cluster,
        resolved,
        modified,
        default_destination,
        |config| &config.clusters,
        |edit| &mut edit.clusters,
    )?;
    plan_section(
        &mut plan,
        EntityKind::AuthInfo,
        resolved,
        modified,
        default_destination,
        |config| &config.auth_infos,
        |edit| &mut edit.auth_infos,
    )?;
    plan_section(
        &mut plan,
        EntityKind::Context,
        resolved,
        modified,
        default_destination,
        |config| &config.contexts,
        |edit| &mut edit.contexts,
    )?;

    let starting = &resolved.config;
    if starting.current_context != modified.current_context {
        let dest = resolved
            .origins
            .current_context_owner()
            .unwrap_or(default_destination);
        plan.edit(dest).current_context = Some(modified.current_context.clone());
    }

    Ok(plan)
}

fn plan_section<T>(
    plan: &mut WritePlan,
    kind: EntityKind,
    resolved: &Resolved,
    modified: &Config,
    default_destination: &Path,
    entries: fn(&Config) -> &BTreeMap<String, T>,
    section: fn(&mut FileEdit) -> &mut BTreeMap<String, Option<T>>,
) -> Result<(), CfgError>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned,
{
    let starting = entries(&resolved.config);
    let modified = entries(modified);

    for (name, entity) in modified {
        let before = starting.get(name);
        if before == Some(entity) {
            continue;
        }
        let dest = resolved
            .origins
            .owner(kind, name)
            .unwrap_or(default_destination);
        section(plan.edit(dest)).insert(name.clone(), Some(entity.clone()));

        let Some(before) = before else { continue };
        let cleared = cleared_fields(&to_value(before)?, &to_value(entity)?);
        if cleared.is_empty() {
            continue;
        }
        for source in resolved.sources.iter().filter(|s| s.path.as_path() != dest) {
            let Some(lower) = entries(&source.config).get(name) else {
                continue;
            };
            let mut value = to_value(lower)?;
            let mut stripped = false;
            for path in &cleared {
                stripped |= remove_field(&mut value, path);
            }
            if stripped {
                let lower: T =
                    serde_yaml::from_value(value).map_err(|e| CfgError::Encode(e.to_string()))?;
                tracing::debug!(%kind, name, path = %source.path.display(), "clearing shadowed fields");
                section(plan.edit(&source.path)).insert(name.clone(), Some(lower));
            }
        }
    }

    for name in starting.keys().filter(|name| !modified.contains_key(*name)) {
        for source in &resolved.sources {
            if source.config.contains(kind, name) {
                section(plan.edit(&source.path)).insert(name.clone(), None);
            }
        }
    }
    Ok(())
}

fn to_value<T: Serialize>(entity: &T) -> Result<Value, CfgError> {
    serde_yaml::to_value(entity).map_err(|e| CfgError::Encode(e.to_string()))
}

/// Key paths present in `before` but gone from `after`.
fn cleared_fields(before: &Value, after: &Value) -> Vec<Vec<Value>> {
    let mut out = Vec::new();
    collect_cleared(before, after, &mut Vec::new(), &mut out);
    out
}

fn collect_cleared(before: &Value, after: &Value, prefix: &mut Vec<Value>, out: &mut Vec<Vec<Value>>) {
    let (Value::Mapping(before), Value::Mapping(after)) = (before, after) else {
        return;
    };
    for (key, old) in before {
        prefix.push(key.clone());
        match after.get(key) {
            None => out.push(prefix.clone()),
            Some(new) => collect_cleared(old, new, prefix, out),
        }
        prefix.pop();
    }
}

fn remove_field(value: &mut Value, path: &[Value]) -> bool {
    match path {
        [] => false,
        [key] => value
            .as_mapping_mut()
            .is_some_and(|m| m.remove(key).is_some()),
        [key, rest @ ..] => value
            .get_mut(key)
            .is_some_and(|inner| remove_field(inner, rest)),
    }
}

/// Apply `plan` to the files' loaded content and write every destination.
///
/// All documents are encoded before the first write, so an encoding failure
/// leaves every file untouched.
pub fn apply_plan(plan: &WritePlan, resolved: &Resolved) -> Result<Vec<PathBuf>, CfgError> {
    let mut outputs = Vec::with_capacity(plan.edits.len());
    for (path, edit) in &plan.edits {
        let mut document = resolved.source(path).cloned().unwrap_or_default();
        edit.apply_to(&mut document);
        outputs.push((path, serialize(&document)?));
    }

    let mut written = Vec::with_capacity(outputs.len());
    for (path, content) in outputs {
        write_atomic(path, &content)?;
        tracing::debug!(path = %path.display(), "wrote kubeconfig");
        written.push(path.clone());
    }
    Ok(written)
}

/// Encode a document as kubeconfig YAML.
pub fn serialize(config: &Config) -> Result<String, CfgError> {
    serde_yaml::to_string(config).map_err(|e| CfgError::Encode(e.to_string()))
}

/// Replace `path` with `content` through a temp file in the same directory.
///
/// An existing file keeps its permissions. A symlink is followed: the link
/// stays in place and its target is replaced.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), CfgError> {
    let is_link = std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink());
    let resolved;
    let path = if is_link {
        resolved = std::fs::canonicalize(path).map_err(|e| CfgError::io(path, e))?;
        resolved.as_path()
    } else {
        path
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| CfgError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| CfgError::io(dir, e))?;
    tmp.write_all(content.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| CfgError::io(tmp.path(), e))?;

    if let Ok(meta) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(|e| CfgError::io(path, e))?;
    }

    tmp.persist(path).map_err(|e| CfgError::io(path, e.error))?;
    Ok(())
}
