//! The kubeconfig document model.
//!
//! On disk a kubeconfig keeps its entries in named lists
//! (`clusters: [{name, cluster}]`). In memory every section is a
//! `BTreeMap` keyed by entry name, so lookups are direct and serialization is
//! deterministic. The conversion lives in the private `named` serde helpers.
//!
//! Inline credential bytes (`*-data` fields) are base64 on disk and raw bytes
//! here. Keys this model does not know about are kept in each record's
//! `extra` map and written back unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::EntityKind;

/// Unknown keys preserved verbatim across a load/save cycle.
pub type Extra = BTreeMap<String, serde_yaml::Value>;

pub const API_VERSION: &str = "v1";
pub const KIND: &str = "Config";

/// A complete kubeconfig document, either one file or the merged view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "apiVersion", default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "serde_yaml::Mapping::is_empty")]
    pub preferences: serde_yaml::Mapping,
    #[serde(default, with = "named", skip_serializing_if = "BTreeMap::is_empty")]
    pub clusters: BTreeMap<String, Cluster>,
    #[serde(
        rename = "users",
        default,
        with = "named",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub auth_infos: BTreeMap<String, AuthInfo>,
    #[serde(default, with = "named", skip_serializing_if = "BTreeMap::is_empty")]
    pub contexts: BTreeMap<String, Context>,
    #[serde(
        rename = "current-context",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub current_context: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<serde_yaml::Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Config {
    /// An empty document carrying the v1 header.
    pub fn new() -> Self {
        Config {
            api_version: API_VERSION.into(),
            kind: KIND.into(),
            preferences: serde_yaml::Mapping::new(),
            clusters: BTreeMap::new(),
            auth_infos: BTreeMap::new(),
            contexts: BTreeMap::new(),
            current_context: String::new(),
            extensions: Vec::new(),
            extra: Extra::new(),
        }
    }

    /// Fill in the v1 header when a file omitted it.
    pub fn ensure_header(&mut self) {
        if self.api_version.is_empty() {
            self.api_version = API_VERSION.into();
        }
        if self.kind.is_empty() {
            self.kind = KIND.into();
        }
    }

    pub fn contains(&self, kind: EntityKind, name: &str) -> bool {
        match kind {
            EntityKind::Cluster => self.clusters.contains_key(name),
            EntityKind::AuthInfo => self.auth_infos.contains_key(name),
            EntityKind::Context => self.contexts.contains_key(name),
        }
    }

    /// The context `current-context` points at, if it exists.
    pub fn active_context(&self) -> Option<&Context> {
        if self.current_context.is_empty() {
            return None;
        }
        self.contexts.get(&self.current_context)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

/// Connection details for one API server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Cluster {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure_skip_tls_verify: Option<bool>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub certificate_authority: String,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub certificate_authority_data: Vec<u8>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Cluster {
    pub fn insecure(&self) -> bool {
        self.insecure_skip_tls_verify.unwrap_or(false)
    }

    /// True when a CA is configured either by path or inline.
    pub fn has_certificate_authority(&self) -> bool {
        !self.certificate_authority.is_empty() || !self.certificate_authority_data.is_empty()
    }
}

/// Credentials for one user ("auth info").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AuthInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_certificate: String,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub client_certificate_data: Vec<u8>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_key: String,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub client_key_data: Vec<u8>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_provider: Option<AuthProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecConfig>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthProvider {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// An external credential plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecConfig {
    #[serde(default)]
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<ExecEnvVar>,
    #[serde(rename = "apiVersion", default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecEnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// A (cluster, user, namespace) triple.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster: String,
    #[serde(rename = "user", default, skip_serializing_if = "String::is_empty")]
    pub auth_info: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Ties a record type to its key inside a named-list entry.
pub trait Named {
    const FIELD: &'static str;
    const KIND: EntityKind;
}

impl Named for Cluster {
    const FIELD: &'static str = "cluster";
    const KIND: EntityKind = EntityKind::Cluster;
}

impl Named for AuthInfo {
    const FIELD: &'static str = "user";
    const KIND: EntityKind = EntityKind::AuthInfo;
}

impl Named for Context {
    const FIELD: &'static str = "context";
    const KIND: EntityKind = EntityKind::Context;
}

mod named {
    use std::collections::BTreeMap;

    use serde::de::{DeserializeOwned, Error as _};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_yaml::Value;

    use super::Named;

    struct Entry<'a, T> {
        name: &'a str,
        value: &'a T,
    }

    impl<T: Named + Serialize> Serialize for Entry<'_, T> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(2))?;
            map.serialize_entry("name", self.name)?;
            map.serialize_entry(T::FIELD, self.value)?;
            map.end()
        }
    }

    pub fn serialize<S, T>(entries: &BTreeMap<String, T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Named + Serialize,
    {
        serializer.collect_seq(entries.iter().map(|(name, value)| Entry { name, value }))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Named + DeserializeOwned + Default,
    {
        let raw: Option<Vec<serde_yaml::Mapping>> = Option::deserialize(deserializer)?;
        let mut entries = BTreeMap::new();
        for mut item in raw.unwrap_or_default() {
            let name = match item.remove("name") {
                Some(Value::String(s)) => s,
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::Bool(b)) => b.to_string(),
                _ => {
                    return Err(D::Error::custom(format!(
                        "every {} entry needs a string name",
                        T::KIND
                    )));
                }
            };
            let value = match item.remove(T::FIELD) {
                Some(Value::Null) | None => T::default(),
                Some(v) => T::deserialize(v).map_err(D::Error::custom)?,
            };
            if entries.contains_key(&name) {
                tracing::warn!(kind = %T::KIND, %name, "duplicate entry in file, keeping the first");
                continue;
            }
            entries.insert(name, value);
        }
        Ok(entries)
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw else {
            return Ok(Vec::new());
        };
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(compact).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::TWO_CLUSTERS;

    #[test]
    fn named_lists_load_into_maps() {
        let config: Config = serde_yaml::from_str(TWO_CLUSTERS).unwrap();
        assert_eq!(config.clusters.len(), 2);
        assert_eq!(config.clusters["dev"].server, "https://dev.example.com");
        assert_eq!(config.auth_infos["admin"].token, "secret");
        assert_eq!(config.contexts["dev"].auth_info, "admin");
        assert_eq!(config.current_context, "dev");
    }

    #[test]
    fn inline_data_is_base64_on_disk() {
        let mut config = Config::new();
        config.clusters.insert(
            "c".into(),
            Cluster {
                certificate_authority_data: b"PEM".to_vec(),
                ..Cluster::default()
            },
        );
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("certificate-authority-data: UEVN"));
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.clusters["c"].certificate_authority_data, b"PEM");
    }

    #[test]
    fn empty_fields_are_omitted() {
        let mut config = Config::new();
        config.contexts.insert("ctx".into(), Context::default());
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("namespace"));
        assert!(!yaml.contains("current-context"));
        assert!(!yaml.contains("clusters"));
        assert!(yaml.contains("apiVersion: v1"));
        assert!(yaml.contains("kind: Config"));
    }

    #[test]
    fn unknown_keys_survive_round_trip() {
        let yaml = r#"
apiVersion: v1
kind: Config
clusters:
- name: c
  cluster:
    server: https://c
    proxy-url: http://proxy:3128
users:
- name: u
  user:
    exec:
      command: aws
      apiVersion: client.authentication.k8s.io/v1beta1
      interactiveMode: Never
custom-top-level: 7
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let out = serde_yaml::to_string(&config).unwrap();
        let again: Config = serde_yaml::from_str(&out).unwrap();
        assert_eq!(config, again);
        assert!(out.contains("proxy-url: http://proxy:3128"));
        assert!(out.contains("interactiveMode: Never"));
        assert!(out.contains("custom-top-level: 7"));
    }

    #[test]
    fn null_sections_load_as_empty() {
        let yaml = "apiVersion: v1\nkind: Config\nclusters: null\nusers: null\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.clusters.is_empty());
        assert!(config.auth_infos.is_empty());
    }

    #[test]
    fn duplicate_names_keep_first() {
        let yaml = r#"
clusters:
- name: c
  cluster:
    server: https://first
- name: c
  cluster:
    server: https://second
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.clusters["c"].server, "https://first");
    }

    #[test]
    fn entry_without_name_is_an_error() {
        let yaml = "clusters:\n- cluster:\n    server: https://x\n";
        let err = serde_yaml::from_str::<Config>(yaml).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn active_context_follows_pointer() {
        let mut config: Config = serde_yaml::from_str(TWO_CLUSTERS).unwrap();
        assert_eq!(config.active_context().unwrap().cluster, "dev");
        config.current_context = "gone".into();
        assert!(config.active_context().is_none());
    }
}
