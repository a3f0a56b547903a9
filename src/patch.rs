//! Field-patch engine: apply a partial update to one entry.
//!
//! A patch only names the fields the user provided. Applying it to the
//! existing entry (or an empty one) yields the new entry; nothing else in the
//! document is touched. A few fields are mutually exclusive on disk, and
//! setting one clears its counterpart:
//!
//! - a path and its inline `*-data` twin (cluster CA, client cert, client key)
//! - `insecure-skip-tls-verify: true` and any certificate authority
//! - a bearer token and basic-auth username/password
//!
//! Patches never validate; see [`validate`](crate::validate). The only failure
//! here is I/O while reading a file that is being embedded.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::CfgError;
use crate::model::{AuthInfo, AuthProvider, Cluster, Context, ExecConfig, ExecEnvVar};
use crate::types::Tristate;

/// The result of patching one named entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Patched<T> {
    pub entity: T,
    pub existed: bool,
}

/// Look up `name` (or start from an empty entry) and run `apply` on a copy.
pub fn patch_entry<T, F>(
    entries: &BTreeMap<String, T>,
    name: &str,
    apply: F,
) -> Result<Patched<T>, CfgError>
where
    T: Clone + Default,
    F: FnOnce(T) -> Result<T, CfgError>,
{
    let existing = entries.get(name);
    let existed = existing.is_some();
    let entity = apply(existing.cloned().unwrap_or_default())?;
    Ok(Patched { entity, existed })
}

/// Ordered `key=value` upserts and `key-` removals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairUpdate {
    pub upserts: Vec<(String, String)>,
    pub removals: Vec<String>,
}

impl PairUpdate {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }

    fn apply_to_map(&self, map: &mut BTreeMap<String, String>) {
        for key in &self.removals {
            map.remove(key);
        }
        for (key, value) in &self.upserts {
            map.insert(key.clone(), value.clone());
        }
    }

    /// Existing variables keep their position; new ones are appended.
    fn apply_to_env(&self, env: &mut Vec<ExecEnvVar>) {
        env.retain(|var| !self.removals.contains(&var.name));
        for (name, value) in &self.upserts {
            match env.iter_mut().find(|var| &var.name == name) {
                Some(var) => var.value = value.clone(),
                None => env.push(ExecEnvVar {
                    name: name.clone(),
                    value: value.clone(),
                }),
            }
        }
    }
}

/// Parse `key=value` and `key-` arguments for the option named `flag`.
///
/// Anything containing `=` is an upsert (the value may itself end in `-`).
/// The key must be non-empty in both forms.
pub fn parse_pairs<S: AsRef<str>>(args: &[S], flag: &str) -> Result<PairUpdate, CfgError> {
    let mut update = PairUpdate::default();
    for arg in args {
        let arg = arg.as_ref();
        let invalid = |reason: &str| CfgError::InvalidValue {
            key: flag.into(),
            reason: format!("{arg:?}: {reason}"),
        };
        if let Some((key, value)) = arg.split_once('=') {
            if key.is_empty() {
                return Err(invalid("the key before '=' is empty"));
            }
            update.upserts.push((key.into(), value.into()));
        } else if let Some(key) = arg.strip_suffix('-') {
            if key.is_empty() {
                return Err(invalid("the key before '-' is empty"));
            }
            update.removals.push(key.into());
        } else {
            return Err(invalid("expected key=value or key-"));
        }
    }
    Ok(update)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterPatch {
    pub server: Option<String>,
    pub insecure_skip_tls_verify: Tristate,
    pub certificate_authority: Option<String>,
    pub embed_certs: Tristate,
}

impl ClusterPatch {
    pub fn apply(&self, mut cluster: Cluster) -> Result<Cluster, CfgError> {
        if let Some(server) = &self.server {
            cluster.server = server.clone();
        }

        if let Some(insecure) = self.insecure_skip_tls_verify.as_option() {
            cluster.insecure_skip_tls_verify = Some(insecure);
            if insecure {
                cluster.certificate_authority.clear();
                cluster.certificate_authority_data.clear();
            }
        }

        if let Some(ca) = &self.certificate_authority {
            if self.embed_certs.value() {
                cluster.certificate_authority_data = read_embedded(ca)?;
                cluster.certificate_authority.clear();
                cluster.insecure_skip_tls_verify = None;
            } else if ca.is_empty() {
                cluster.certificate_authority.clear();
            } else {
                cluster.certificate_authority = absolute(ca)?;
                cluster.certificate_authority_data.clear();
                cluster.insecure_skip_tls_verify = None;
            }
        }

        Ok(cluster)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthInfoPatch {
    pub client_certificate: Option<String>,
    pub client_key: Option<String>,
    pub embed_certs: Tristate,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_provider: Option<String>,
    pub auth_provider_args: PairUpdate,
    pub exec_command: Option<String>,
    pub exec_api_version: Option<String>,
    pub exec_args: Option<Vec<String>>,
    pub exec_env: PairUpdate,
}

impl AuthInfoPatch {
    /// True when a non-empty token was given.
    pub fn sets_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// True when a non-empty username or password was given.
    pub fn sets_basic(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
            || self.password.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn apply(&self, mut auth: AuthInfo) -> Result<AuthInfo, CfgError> {
        let embed = self.embed_certs.value();
        if let Some(cert) = &self.client_certificate {
            set_path_or_data(
                cert,
                embed,
                &mut auth.client_certificate,
                &mut auth.client_certificate_data,
            )?;
        }
        if let Some(key) = &self.client_key {
            set_path_or_data(key, embed, &mut auth.client_key, &mut auth.client_key_data)?;
        }

        if let Some(token) = &self.token {
            auth.token = token.clone();
        }
        if let Some(username) = &self.username {
            auth.username = username.clone();
        }
        if let Some(password) = &self.password {
            auth.password = password.clone();
        }

        self.apply_auth_provider(&mut auth);
        self.apply_exec(&mut auth);

        let (set_token, set_basic) = (self.sets_token(), self.sets_basic());
        if set_token != set_basic {
            if set_token {
                auth.username.clear();
                auth.password.clear();
            } else {
                auth.token.clear();
            }
        }

        Ok(auth)
    }

    fn apply_auth_provider(&self, auth: &mut AuthInfo) {
        if let Some(name) = &self.auth_provider {
            let same = auth.auth_provider.as_ref().is_some_and(|p| &p.name == name);
            if !same {
                auth.auth_provider = Some(AuthProvider {
                    name: name.clone(),
                    ..AuthProvider::default()
                });
            }
        }
        if let Some(provider) = auth.auth_provider.as_mut() {
            self.auth_provider_args.apply_to_map(&mut provider.config);
        }
    }

    fn apply_exec(&self, auth: &mut AuthInfo) {
        if let Some(command) = &self.exec_command {
            match auth.exec.as_mut() {
                Some(exec) => {
                    exec.command = command.clone();
                    exec.args.clear();
                }
                None => {
                    auth.exec = Some(ExecConfig {
                        command: command.clone(),
                        ..ExecConfig::default()
                    });
                }
            }
        }

        let Some(exec) = auth.exec.as_mut() else {
            return;
        };
        if let Some(version) = &self.exec_api_version {
            exec.api_version = version.clone();
        }
        if let Some(args) = &self.exec_args {
            exec.args = args.clone();
        }
        self.exec_env.apply_to_env(&mut exec.env);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextPatch {
    pub cluster: Option<String>,
    pub auth_info: Option<String>,
    pub namespace: Option<String>,
}

impl ContextPatch {
    pub fn apply(&self, mut context: Context) -> Context {
        if let Some(cluster) = &self.cluster {
            context.cluster = cluster.clone();
        }
        if let Some(auth_info) = &self.auth_info {
            context.auth_info = auth_info.clone();
        }
        if let Some(namespace) = &self.namespace {
            context.namespace = namespace.clone();
        }
        context
    }
}

fn set_path_or_data(
    value: &str,
    embed: bool,
    path: &mut String,
    data: &mut Vec<u8>,
) -> Result<(), CfgError> {
    if embed {
        *data = read_embedded(value)?;
        path.clear();
    } else if value.is_empty() {
        path.clear();
    } else {
        *path = absolute(value)?;
        data.clear();
    }
    Ok(())
}

fn read_embedded(path: &str) -> Result<Vec<u8>, CfgError> {
    std::fs::read(path).map_err(|e| CfgError::io(path, e))
}

fn absolute(path: &str) -> Result<String, CfgError> {
    let abs = std::path::absolute(Path::new(path)).map_err(|e| CfgError::io(path, e))?;
    Ok(abs.to_string_lossy().into_owned())
}
