//! Core resolution pipeline: parse every file of the chain and merge them into
//! one view, remembering which file owns each entry.
//!
//! Operates on pre-loaded data (`ResolveInput`) with no I/O, making the full
//! pipeline testable with synthetic inputs. Steps:
//!
//! 1. Parse each file (empty content is an empty document)
//! 2. Record the first file that defines each entry and `current-context`
//! 3. Fold the files together, first file wins (see [`merge`](crate::merge))
//! 4. Fill in the v1 header on the merged view

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::CfgError;
use crate::merge::merge_into;
use crate::model::Config;
use crate::types::EntityKind;

/// All pre-loaded data needed to resolve a kubeconfig. No I/O happens here.
pub struct ResolveInput {
    /// File contents in precedence order: first = highest priority.
    pub files: Vec<(PathBuf, String)>,
}

/// One parsed file of the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub config: Config,
}

/// Which file first defines each entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Origins {
    clusters: BTreeMap<String, PathBuf>,
    auth_infos: BTreeMap<String, PathBuf>,
    contexts: BTreeMap<String, PathBuf>,
    current_context: Option<PathBuf>,
}

impl Origins {
    pub fn owner(&self, kind: EntityKind, name: &str) -> Option<&Path> {
        let table = match kind {
            EntityKind::Cluster => &self.clusters,
            EntityKind::AuthInfo => &self.auth_infos,
            EntityKind::Context => &self.contexts,
        };
        table.get(name).map(PathBuf::as_path)
    }

    /// The first file that sets a non-empty `current-context`.
    pub fn current_context_owner(&self) -> Option<&Path> {
        self.current_context.as_deref()
    }

    fn record(&mut self, source: &SourceFile) {
        let config = &source.config;
        for name in config.clusters.keys() {
            self.clusters
                .entry(name.clone())
                .or_insert_with(|| source.path.clone());
        }
        for name in config.auth_infos.keys() {
            self.auth_infos
                .entry(name.clone())
                .or_insert_with(|| source.path.clone());
        }
        for name in config.contexts.keys() {
            self.contexts
                .entry(name.clone())
                .or_insert_with(|| source.path.clone());
        }
        if self.current_context.is_none() && !config.current_context.is_empty() {
            self.current_context = Some(source.path.clone());
        }
    }
}

/// The merged view plus everything writeback needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub config: Config,
    pub origins: Origins,
    pub sources: Vec<SourceFile>,
}

impl Resolved {
    /// The parsed content of `path`, if it was part of the chain and existed.
    pub fn source(&self, path: &Path) -> Option<&Config> {
        self.sources
            .iter()
            .find(|s| s.path == path)
            .map(|s| &s.config)
    }
}

/// Parse a single kubeconfig file.
pub fn parse_document(path: &Path, content: &str) -> Result<Config, CfgError> {
    if content.trim().is_empty() {
        return Ok(Config::new());
    }
    // A file holding only comments parses as null.
    let parsed: Option<Config> =
        serde_yaml::from_str(content).map_err(|e| CfgError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(parsed.unwrap_or_default())
}

/// Resolve the merged view from pre-loaded inputs.
pub fn resolve(input: ResolveInput) -> Result<Resolved, CfgError> {
    let mut sources = Vec::with_capacity(input.files.len());
    for (path, content) in input.files {
        let config = parse_document(&path, &content)?;
        sources.push(SourceFile { path, config });
    }

    let mut origins = Origins::default();
    let mut merged: Option<Config> = None;
    for source in &sources {
        origins.record(source);
        match merged.as_mut() {
            None => merged = Some(source.config.clone()),
            Some(view) => {
                merge_into(view, &source.config).map_err(|e| CfgError::ParseError {
                    path: source.path.clone(),
                    source: e,
                })?
            }
        }
    }

    let mut config = merged.unwrap_or_default();
    config.ensure_header();
    tracing::debug!(
        files = sources.len(),
        clusters = config.clusters.len(),
        users = config.auth_infos.len(),
        contexts = config.contexts.len(),
        "resolved kubeconfig"
    );
    Ok(Resolved {
        config,
        origins,
        sources,
    })
}
