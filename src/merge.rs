//! First-wins merging of kubeconfig documents.
//!
//! Entries from different files are combined by name. When two files define
//! the same entry, the merge is field-level: a field set by the
//! higher-precedence file wins, and fields it leaves unset are filled in from
//! the lower one. Sequences (exec args, env) are leaves and are not combined.
//!
//! Mutually exclusive fields never mix across files. When the higher file
//! sets one member of a group, the lower file's members of that group are
//! dropped before the fields are combined (see [`Exclusive`]). The groups:
//!
//! - certificate authority (path or inline data) against insecure mode
//! - a client certificate path against its inline `*-data` twin, and the same
//!   for the client key
//! - bearer token against basic auth

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

use crate::model::{AuthInfo, Cluster, Config, Context};

/// Deep-merge `overlay` on top of `base`.
/// If both sides have a mapping for the same key, recurse.
/// Otherwise, `overlay`'s value wins.
pub fn deep_merge(mut base: Mapping, overlay: Mapping) -> Mapping {
    for (key, overlay_val) in overlay {
        match (base.remove(&key), overlay_val) {
            (Some(Value::Mapping(base_map)), Value::Mapping(overlay_map)) => {
                base.insert(key, Value::Mapping(deep_merge(base_map, overlay_map)));
            }
            (_, overlay_val) => {
                base.insert(key, overlay_val);
            }
        }
    }
    base
}

/// Fold `lower` into `higher`; whatever `higher` already sets is kept.
pub fn merge_into(higher: &mut Config, lower: &Config) -> Result<(), serde_yaml::Error> {
    merge_entries(&mut higher.clusters, &lower.clusters)?;
    merge_entries(&mut higher.auth_infos, &lower.auth_infos)?;
    merge_entries(&mut higher.contexts, &lower.contexts)?;

    if higher.current_context.is_empty() {
        higher.current_context = lower.current_context.clone();
    }
    if !lower.preferences.is_empty() {
        let preferences = std::mem::take(&mut higher.preferences);
        higher.preferences = deep_merge(lower.preferences.clone(), preferences);
    }
    if higher.extensions.is_empty() {
        higher.extensions = lower.extensions.clone();
    }
    for (key, value) in &lower.extra {
        higher
            .extra
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
    Ok(())
}

/// Entries whose fields form mutually exclusive groups.
pub trait Exclusive {
    /// Clear from `lower` every group that `self` sets or competes with.
    fn shadow(&self, lower: &mut Self);
}

impl Exclusive for Cluster {
    fn shadow(&self, lower: &mut Cluster) {
        if self.has_certificate_authority() || self.insecure() {
            lower.certificate_authority.clear();
            lower.certificate_authority_data.clear();
        }
        if self.has_certificate_authority() {
            lower.insecure_skip_tls_verify = None;
        }
    }
}

impl Exclusive for AuthInfo {
    fn shadow(&self, lower: &mut AuthInfo) {
        if !self.client_certificate.is_empty() || !self.client_certificate_data.is_empty() {
            lower.client_certificate.clear();
            lower.client_certificate_data.clear();
        }
        if !self.client_key.is_empty() || !self.client_key_data.is_empty() {
            lower.client_key.clear();
            lower.client_key_data.clear();
        }
        if !self.token.is_empty() || !self.username.is_empty() || !self.password.is_empty() {
            lower.token.clear();
            lower.username.clear();
            lower.password.clear();
        }
    }
}

impl Exclusive for Context {
    fn shadow(&self, _lower: &mut Context) {}
}

fn merge_entries<T>(
    higher: &mut BTreeMap<String, T>,
    lower: &BTreeMap<String, T>,
) -> Result<(), serde_yaml::Error>
where
    T: Serialize + DeserializeOwned + Clone + Exclusive,
{
    for (name, low) in lower {
        let merged = match higher.get(name) {
            Some(high) => {
                let mut low = low.clone();
                high.shadow(&mut low);
                merge_entry(high, &low)?
            }
            None => low.clone(),
        };
        higher.insert(name.clone(), merged);
    }
    Ok(())
}

fn merge_entry<T>(higher: &T, lower: &T) -> Result<T, serde_yaml::Error>
where
    T: Serialize + DeserializeOwned,
{
    let merged = match (serde_yaml::to_value(lower)?, serde_yaml::to_value(higher)?) {
        (Value::Mapping(base), Value::Mapping(overlay)) => Value::Mapping(deep_merge(base, overlay)),
        (_, overlay) => overlay,
    };
    serde_yaml::from_value(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{FILE_A, FILE_B, parse};

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn disjoint_keys_merge() {
        let merged = deep_merge(mapping("host: localhost"), mapping("port: 3000"));
        assert_eq!(merged["host"].as_str().unwrap(), "localhost");
        assert_eq!(merged["port"].as_u64().unwrap(), 3000);
    }

    #[test]
    fn nested_mappings_recurse() {
        let base = mapping("config:\n  a: '1'\n  b: '2'\n");
        let overlay = mapping("config:\n  b: '3'\n");
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["config"]["a"].as_str().unwrap(), "1");
        assert_eq!(merged["config"]["b"].as_str().unwrap(), "3");
    }

    #[test]
    fn sequences_are_replaced() {
        let merged = deep_merge(mapping("args: [a, b]"), mapping("args: [c]"));
        assert_eq!(merged["args"].as_sequence().unwrap().len(), 1);
    }

    #[test]
    fn first_file_wins_per_field() {
        let mut higher = parse(FILE_A);
        let lower = parse(FILE_B);
        merge_into(&mut higher, &lower).unwrap();

        let a = &higher.clusters["a"];
        assert_eq!(a.server, "https://from-a");
        // Unset in the higher file, so the lower file fills it in.
        assert_eq!(a.insecure_skip_tls_verify, Some(true));
        assert_eq!(higher.clusters["b"].server, "https://from-b");
        assert_eq!(higher.current_context, "b");
    }

    #[test]
    fn current_context_first_setter_wins() {
        let mut higher = parse("current-context: mine\n");
        let lower = parse(FILE_B);
        merge_into(&mut higher, &lower).unwrap();
        assert_eq!(higher.current_context, "mine");
    }

    #[test]
    fn inline_data_survives_field_merge() {
        let mut higher = parse(
            "clusters:\n- name: c\n  cluster:\n    server: https://hi\n",
        );
        let lower = parse(
            "clusters:\n- name: c\n  cluster:\n    certificate-authority-data: UEVN\n",
        );
        merge_into(&mut higher, &lower).unwrap();
        let c = &higher.clusters["c"];
        assert_eq!(c.server, "https://hi");
        assert_eq!(c.certificate_authority_data, b"PEM");
    }

    #[test]
    fn higher_certificate_authority_hides_lower_insecure() {
        let mut higher = parse(
            "clusters:\n- name: x\n  cluster:\n    certificate-authority: /etc/ca.crt\n",
        );
        let lower = parse(
            "clusters:\n- name: x\n  cluster:\n    server: https://x\n    insecure-skip-tls-verify: true\n",
        );
        merge_into(&mut higher, &lower).unwrap();
        let x = &higher.clusters["x"];
        assert_eq!(x.certificate_authority, "/etc/ca.crt");
        assert_eq!(x.insecure_skip_tls_verify, None);
        assert_eq!(x.server, "https://x");
    }

    #[test]
    fn higher_insecure_hides_lower_certificate_authority() {
        let mut higher = parse(
            "clusters:\n- name: x\n  cluster:\n    insecure-skip-tls-verify: true\n",
        );
        let lower = parse(
            "clusters:\n- name: x\n  cluster:\n    certificate-authority: /etc/ca.crt\n    certificate-authority-data: UEVN\n",
        );
        merge_into(&mut higher, &lower).unwrap();
        let x = &higher.clusters["x"];
        assert_eq!(x.insecure_skip_tls_verify, Some(true));
        assert!(!x.has_certificate_authority());
    }

    #[test]
    fn ca_path_and_data_come_from_one_file() {
        let mut higher = parse(
            "clusters:\n- name: x\n  cluster:\n    certificate-authority-data: UEVN\n",
        );
        let lower = parse(
            "clusters:\n- name: x\n  cluster:\n    certificate-authority: /etc/ca.crt\n",
        );
        merge_into(&mut higher, &lower).unwrap();
        let x = &higher.clusters["x"];
        assert_eq!(x.certificate_authority_data, b"PEM");
        assert!(x.certificate_authority.is_empty());
    }

    #[test]
    fn auth_method_comes_from_one_file() {
        let mut higher = parse("users:\n- name: u\n  user:\n    token: t\n");
        let lower = parse(
            "users:\n- name: u\n  user:\n    username: bob\n    password: pw\n    client-key: /k\n",
        );
        merge_into(&mut higher, &lower).unwrap();
        let u = &higher.auth_infos["u"];
        assert_eq!(u.token, "t");
        assert!(u.username.is_empty());
        assert!(u.password.is_empty());
        assert_eq!(u.client_key, "/k");

        let mut higher = parse("users:\n- name: u\n  user:\n    username: alice\n");
        let lower = parse("users:\n- name: u\n  user:\n    token: t\n    password: pw\n");
        merge_into(&mut higher, &lower).unwrap();
        let u = &higher.auth_infos["u"];
        assert_eq!(u.username, "alice");
        assert!(u.token.is_empty());
        assert!(u.password.is_empty());
    }
}
