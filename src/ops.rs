//! Kubeconfig operations and the result types callers display.
//!
//! Every mutating operation follows the same shape: load the merged view
//! through [`ConfigAccess`], change it in memory, hand it back through
//! [`ConfigAccess::modify_config`], and return a [`CfgResult`] summary.
//! Input checks that need no document run first, in [`handle`].

use std::fmt;
use std::path::PathBuf;

use crate::access::ConfigAccess;
use crate::error::CfgError;
use crate::file::{self, LoadingRules};
use crate::flatten::flatten;
use crate::model::Config;
use crate::observer::{DeleteObserver, Removed};
use crate::patch::{AuthInfoPatch, ClusterPatch, ContextPatch, patch_entry};
use crate::persist;
use crate::resolve::{ResolveInput, resolve};
use crate::settings::Settings;
use crate::types::{Action, EntityKind};
use crate::validate;

/// Result of an operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum CfgResult {
    ClusterSet { name: String, existed: bool },
    AuthInfoSet { name: String, existed: bool },
    ContextSet { name: String, existed: bool },
    Deleted {
        kind: EntityKind,
        name: String,
        location: String,
        warnings: Vec<String>,
    },
    Renamed { from: String, to: String },
    Switched { name: String },
    CurrentContext(String),
    Listing {
        listing: Listing,
        warnings: Vec<String>,
    },
    /// A merged, self-contained kubeconfig.
    Merged(String),
    MergedWritten { path: PathBuf },
    /// The commented settings template.
    Settings(String),
}

impl CfgResult {
    /// Non-fatal problems the caller should show next to the result.
    pub fn warnings(&self) -> &[String] {
        match self {
            CfgResult::Deleted { warnings, .. } | CfgResult::Listing { warnings, .. } => warnings,
            _ => &[],
        }
    }
}

impl fmt::Display for CfgResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CfgResult::ClusterSet { name, existed } => {
                write!(f, "Cluster {name:?} {}.", set_verb(*existed))
            }
            CfgResult::AuthInfoSet { name, existed } => {
                write!(f, "User {name:?} {}.", set_verb(*existed))
            }
            CfgResult::ContextSet { name, existed } => {
                write!(f, "Context {name:?} {}.", set_verb(*existed))
            }
            CfgResult::Deleted {
                kind,
                name,
                location,
                ..
            } => write!(f, "deleted {kind} {name:?} from {location}"),
            CfgResult::Renamed { from, to } => write!(f, "Context {from:?} renamed to {to:?}."),
            CfgResult::Switched { name } => write!(f, "Switched to context {name:?}."),
            CfgResult::CurrentContext(name) => write!(f, "{name}"),
            CfgResult::Listing { listing, .. } => write!(f, "{listing}"),
            CfgResult::Merged(yaml) => write!(f, "{yaml}"),
            CfgResult::MergedWritten { path } => {
                write!(f, "Merged kubeconfig written to {}", path.display())
            }
            CfgResult::Settings(template) => write!(f, "{template}"),
        }
    }
}

fn set_verb(existed: bool) -> &'static str {
    if existed { "modified" } else { "created" }
}

/// How a listing is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ListOutput {
    #[default]
    Table,
    /// Only entry names, one per line.
    Name,
    /// A JSON array of rows.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Only these entries; all entries when empty.
    pub names: Vec<String>,
    pub show_headers: bool,
    pub output: ListOutput,
}

impl Default for ListOptions {
    fn default() -> Self {
        ListOptions {
            names: Vec::new(),
            show_headers: true,
            output: ListOutput::Table,
        }
    }
}

/// Rows of one entry kind, sorted by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub kind: EntityKind,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    pub show_headers: bool,
    pub output: ListOutput,
}

/// Column holding the entry name.
const NAME_COLUMN: usize = 1;
const CURRENT_MARK: &str = "*";

impl Listing {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row[NAME_COLUMN].as_str())
    }

    fn to_json(&self) -> serde_json::Value {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let object = self
                    .headers
                    .iter()
                    .zip(row)
                    .map(|(header, cell)| {
                        let value = if *header == "CURRENT" {
                            serde_json::Value::Bool(cell == CURRENT_MARK)
                        } else {
                            serde_json::Value::String(cell.clone())
                        };
                        (header.to_lowercase(), value)
                    })
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::Value::Array(rows)
    }

    fn fmt_table(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = if self.show_headers {
            self.headers.iter().map(|h| h.len()).collect()
        } else {
            vec![0; self.headers.len()]
        };
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let headers: Vec<String> = self.headers.iter().map(|h| h.to_string()).collect();
        let mut lines: Vec<&Vec<String>> = Vec::with_capacity(self.rows.len() + 1);
        if self.show_headers {
            lines.push(&headers);
        }
        lines.extend(&self.rows);

        for (i, cells) in lines.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let mut line = String::new();
            for (j, (cell, &width)) in cells.iter().zip(&widths).enumerate() {
                if j > 0 {
                    line.push_str("   ");
                }
                line.push_str(&format!("{cell:<width$}"));
            }
            write!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.output {
            ListOutput::Table => self.fmt_table(f),
            ListOutput::Name => {
                for (i, name) in self.names().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{name}")?;
                }
                Ok(())
            }
            ListOutput::Json => {
                let text =
                    serde_json::to_string_pretty(&self.to_json()).map_err(|_| fmt::Error)?;
                write!(f, "{text}")
            }
        }
    }
}

/// Validate and run an action.
///
/// `observer` sees every entry a delete removes.
pub fn handle(
    action: &Action,
    access: &dyn ConfigAccess,
    observer: Option<&dyn DeleteObserver>,
) -> Result<CfgResult, CfgError> {
    validate::validate_action(action)?;
    match action {
        Action::AddCluster { name, patch } => add_cluster(access, name, patch),
        Action::AddAuthInfo { name, patch } => add_auth_info(access, name, patch),
        Action::AddContext {
            name,
            current,
            patch,
        } => add_context(access, name.as_deref(), *current, patch),
        Action::Delete { kind, name } => delete(access, *kind, name, observer),
        Action::RenameContext { from, to } => rename_context(access, from, to),
        Action::UseContext { name } => use_context(access, name),
        Action::CurrentContext => current_context(access),
        Action::List { kind, options } => list(access, *kind, options),
        Action::Merge { files, output } => merge_files(files, output.as_ref()),
        Action::Settings => Ok(CfgResult::Settings(Settings::template())),
    }
}

pub(crate) fn add_cluster(
    access: &dyn ConfigAccess,
    name: &str,
    patch: &ClusterPatch,
) -> Result<CfgResult, CfgError> {
    let mut config = access.starting_config()?;
    let patched = patch_entry(&config.clusters, name, |c| patch.apply(c))?;
    validate::validate_cluster(name, &patched.entity)?;
    config.clusters.insert(name.to_string(), patched.entity);
    access.modify_config(&config)?;
    tracing::info!(%name, existed = patched.existed, "cluster set");
    Ok(CfgResult::ClusterSet {
        name: name.to_string(),
        existed: patched.existed,
    })
}

pub(crate) fn add_auth_info(
    access: &dyn ConfigAccess,
    name: &str,
    patch: &AuthInfoPatch,
) -> Result<CfgResult, CfgError> {
    let mut config = access.starting_config()?;
    let patched = patch_entry(&config.auth_infos, name, |a| patch.apply(a))?;
    config.auth_infos.insert(name.to_string(), patched.entity);
    access.modify_config(&config)?;
    tracing::info!(%name, existed = patched.existed, "user set");
    Ok(CfgResult::AuthInfoSet {
        name: name.to_string(),
        existed: patched.existed,
    })
}

pub(crate) fn add_context(
    access: &dyn ConfigAccess,
    name: Option<&str>,
    current: bool,
    patch: &ContextPatch,
) -> Result<CfgResult, CfgError> {
    let mut config = access.starting_config()?;
    let name = if current {
        if config.current_context.is_empty() {
            return Err(CfgError::NoCurrentContext);
        }
        config.current_context.clone()
    } else {
        name.unwrap_or_default().to_string()
    };

    let patched = patch_entry(&config.contexts, &name, |c| Ok(patch.apply(c)))?;
    config.contexts.insert(name.clone(), patched.entity);
    access.modify_config(&config)?;
    tracing::info!(%name, existed = patched.existed, "context set");
    Ok(CfgResult::ContextSet {
        name,
        existed: patched.existed,
    })
}

pub(crate) fn delete(
    access: &dyn ConfigAccess,
    kind: EntityKind,
    name: &str,
    observer: Option<&dyn DeleteObserver>,
) -> Result<CfgResult, CfgError> {
    let mut config = access.starting_config()?;
    let location = access.location();
    let not_found = || CfgError::EntityNotFound {
        kind,
        name: name.to_string(),
        location: location.clone(),
    };

    let active = config.current_context.clone();
    let active_context = config.active_context().cloned();
    let mut warnings = Vec::new();

    match kind {
        EntityKind::Cluster => {
            let removed = config.clusters.remove(name).ok_or_else(not_found)?;
            if active_context.as_ref().is_some_and(|c| c.cluster == name) {
                warnings.push(format!(
                    "this removed the cluster of your active context {active:?}"
                ));
            }
            notify(observer, name, Removed::Cluster(&removed), &mut warnings);
        }
        EntityKind::AuthInfo => {
            let removed = config.auth_infos.remove(name).ok_or_else(not_found)?;
            if active_context.as_ref().is_some_and(|c| c.auth_info == name) {
                warnings.push(format!(
                    "this removed the credentials of your active context {active:?}"
                ));
            }
            notify(observer, name, Removed::AuthInfo(&removed), &mut warnings);
        }
        EntityKind::Context => {
            let removed = config.contexts.remove(name).ok_or_else(not_found)?;
            if active == name {
                warnings.push(
                    "this removed your active context, use \"kubectl cfg use\" to select a different one"
                        .to_string(),
                );
            }
            notify(observer, name, Removed::Context(&removed), &mut warnings);
        }
    }

    access.modify_config(&config)?;
    tracing::info!(%kind, %name, %location, warnings = warnings.len(), "deleted");
    Ok(CfgResult::Deleted {
        kind,
        name: name.to_string(),
        location,
        warnings,
    })
}

fn notify(
    observer: Option<&dyn DeleteObserver>,
    name: &str,
    removed: Removed<'_>,
    warnings: &mut Vec<String>,
) {
    let Some(observer) = observer else {
        return;
    };
    if let Err(e) = observer.on_delete(name, removed) {
        warnings.push(format!(
            "could not back up the deleted {} {name:?}: {e}",
            removed.kind()
        ));
    }
}

pub(crate) fn rename_context(
    access: &dyn ConfigAccess,
    from: &str,
    to: &str,
) -> Result<CfgResult, CfgError> {
    let mut config = access.starting_config()?;
    if config.contexts.contains_key(to) {
        return Err(CfgError::Validation(format!(
            "cannot rename the context {from:?}, the context {to:?} already exists in {}",
            access.location()
        )));
    }
    let Some(context) = config.contexts.remove(from) else {
        return Err(CfgError::EntityNotFound {
            kind: EntityKind::Context,
            name: from.to_string(),
            location: access.location(),
        });
    };
    config.contexts.insert(to.to_string(), context);
    if config.current_context == from {
        config.current_context = to.to_string();
    }
    access.modify_config(&config)?;
    tracing::info!(%from, %to, "context renamed");
    Ok(CfgResult::Renamed {
        from: from.to_string(),
        to: to.to_string(),
    })
}

pub(crate) fn use_context(access: &dyn ConfigAccess, name: &str) -> Result<CfgResult, CfgError> {
    let mut config = access.starting_config()?;
    if !config.contexts.contains_key(name) {
        return Err(CfgError::EntityNotFound {
            kind: EntityKind::Context,
            name: name.to_string(),
            location: access.location(),
        });
    }
    config.current_context = name.to_string();
    access.modify_config(&config)?;
    tracing::info!(%name, "switched context");
    Ok(CfgResult::Switched {
        name: name.to_string(),
    })
}

pub(crate) fn current_context(access: &dyn ConfigAccess) -> Result<CfgResult, CfgError> {
    let config = access.starting_config()?;
    if config.current_context.is_empty() {
        return Err(CfgError::NoCurrentContext);
    }
    Ok(CfgResult::CurrentContext(config.current_context))
}

pub(crate) fn list(
    access: &dyn ConfigAccess,
    kind: EntityKind,
    options: &ListOptions,
) -> Result<CfgResult, CfgError> {
    let config = access.starting_config()?;
    let wanted = |name: &str| options.names.is_empty() || options.names.iter().any(|n| n == name);

    let (headers, rows) = match kind {
        EntityKind::Cluster => cluster_rows(&config, wanted),
        EntityKind::AuthInfo => auth_info_rows(&config, wanted),
        EntityKind::Context => context_rows(&config, wanted),
    };

    let warnings = options
        .names
        .iter()
        .filter(|name| !config.contains(kind, name))
        .map(|name| format!("{kind} {name:?} not found"))
        .collect();

    Ok(CfgResult::Listing {
        listing: Listing {
            kind,
            headers,
            rows,
            show_headers: options.show_headers,
            output: options.output,
        },
        warnings,
    })
}

type Rows = (Vec<&'static str>, Vec<Vec<String>>);

fn mark(current: bool) -> String {
    let mark = if current { CURRENT_MARK } else { "" };
    mark.to_string()
}

fn cluster_rows(config: &Config, wanted: impl Fn(&str) -> bool) -> Rows {
    let active = config.active_context().map(|c| c.cluster.as_str());
    let rows = config
        .clusters
        .iter()
        .filter(|(name, _)| wanted(name))
        .map(|(name, cluster)| {
            vec![
                mark(active == Some(name.as_str())),
                name.clone(),
                cluster.server.clone(),
            ]
        })
        .collect();
    (vec!["CURRENT", "NAME", "SERVER"], rows)
}

fn auth_info_rows(config: &Config, wanted: impl Fn(&str) -> bool) -> Rows {
    let active = config.active_context().map(|c| c.auth_info.as_str());
    let rows = config
        .auth_infos
        .iter()
        .filter(|(name, _)| wanted(name))
        .map(|(name, auth)| {
            vec![
                mark(active == Some(name.as_str())),
                name.clone(),
                auth.username.clone(),
            ]
        })
        .collect();
    (vec!["CURRENT", "NAME", "USERNAME"], rows)
}

fn context_rows(config: &Config, wanted: impl Fn(&str) -> bool) -> Rows {
    let rows = config
        .contexts
        .iter()
        .filter(|(name, _)| wanted(name))
        .map(|(name, context)| {
            vec![
                mark(*name == config.current_context),
                name.clone(),
                context.cluster.clone(),
                context.auth_info.clone(),
                context.namespace.clone(),
            ]
        })
        .collect();
    (
        vec!["CURRENT", "NAME", "CLUSTER", "AUTHINFO", "NAMESPACE"],
        rows,
    )
}

/// Merge `files` (first wins) into one self-contained kubeconfig.
pub(crate) fn merge_files(
    files: &[PathBuf],
    output: Option<&PathBuf>,
) -> Result<CfgResult, CfgError> {
    let rules = LoadingRules::from_files(files.to_vec());
    let mut loaded = Vec::with_capacity(files.len());
    for path in rules.chain() {
        let content = file::read_required(&path)?;
        loaded.push((path, content));
    }

    let resolved = resolve(ResolveInput { files: loaded })?;
    let mut config = resolved.config;
    flatten(&mut config, &resolved.origins)?;
    let yaml = persist::serialize(&config)?;

    match output {
        Some(path) => {
            persist::write_atomic(path, &yaml)?;
            Ok(CfgResult::MergedWritten { path: path.clone() })
        }
        None => Ok(CfgResult::Merged(yaml)),
    }
}
