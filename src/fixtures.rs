#[cfg(test)]
pub mod test {
    use std::path::{Path, PathBuf};

    use crate::model::Config;

    /// Two clusters, one token user, one context pointing at `dev`.
    pub const TWO_CLUSTERS: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: dev
  cluster:
    server: https://dev.example.com
- name: prod
  cluster:
    server: https://prod.example.com
    certificate-authority: /etc/kube/prod-ca.crt
users:
- name: admin
  user:
    token: secret
contexts:
- name: dev
  context:
    cluster: dev
    user: admin
    namespace: default
current-context: dev
"#;

    /// Holds only the cluster `a` and no current context.
    pub const FILE_A: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: a
  cluster:
    server: https://from-a
"#;

    /// Redefines cluster `a`, adds cluster `b`, sets current-context.
    pub const FILE_B: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: a
  cluster:
    server: https://from-b
    insecure-skip-tls-verify: true
- name: b
  cluster:
    server: https://from-b
contexts:
- name: b
  context:
    cluster: b
current-context: b
"#;

    pub fn parse(yaml: &str) -> Config {
        serde_yaml::from_str(yaml).unwrap()
    }

    pub fn write(dir: &Path, name: &str, yaml: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, yaml).unwrap();
        path
    }

    pub fn read(path: &Path) -> Config {
        parse(&std::fs::read_to_string(path).unwrap())
    }
}
