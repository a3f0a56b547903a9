use std::fmt;
use std::path::PathBuf;

use crate::ops::ListOptions;
use crate::patch::{AuthInfoPatch, ClusterPatch, ContextPatch};

/// A boolean flag that may also be absent from the invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tristate {
    #[default]
    Unset,
    False,
    True,
}

impl Tristate {
    /// The effective value; an unset flag reads as `false`.
    pub fn value(self) -> bool {
        self == Tristate::True
    }

    pub fn as_option(self) -> Option<bool> {
        match self {
            Tristate::Unset => None,
            Tristate::False => Some(false),
            Tristate::True => Some(true),
        }
    }
}

impl From<Option<bool>> for Tristate {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Tristate::Unset,
            Some(false) => Tristate::False,
            Some(true) => Tristate::True,
        }
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        Tristate::from(Some(value))
    }
}

/// The three kinds of named entries a kubeconfig holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum EntityKind {
    Cluster,
    #[cfg_attr(feature = "clap", value(name = "auth", alias = "user"))]
    AuthInfo,
    Context,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = match self {
            EntityKind::Cluster => "cluster",
            EntityKind::AuthInfo => "user",
            EntityKind::Context => "context",
        };
        f.write_str(noun)
    }
}

/// A kubeconfig operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddCluster {
        name: String,
        patch: ClusterPatch,
    },
    AddAuthInfo {
        name: String,
        patch: AuthInfoPatch,
    },
    AddContext {
        name: Option<String>,
        current: bool,
        patch: ContextPatch,
    },
    Delete {
        kind: EntityKind,
        name: String,
    },
    RenameContext {
        from: String,
        to: String,
    },
    UseContext {
        name: String,
    },
    CurrentContext,
    List {
        kind: EntityKind,
        options: ListOptions,
    },
    Merge {
        files: Vec<PathBuf>,
        output: Option<PathBuf>,
    },
    Settings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tristate_from_option() {
        assert_eq!(Tristate::from(None), Tristate::Unset);
        assert_eq!(Tristate::from(Some(false)), Tristate::False);
        assert_eq!(Tristate::from(Some(true)), Tristate::True);
    }

    #[test]
    fn unset_reads_as_false_but_is_not_provided() {
        assert!(!Tristate::Unset.value());
        assert_eq!(Tristate::Unset.as_option(), None);
        assert_eq!(Tristate::False.as_option(), Some(false));
        assert!(!Tristate::False.value());
        assert!(Tristate::True.value());
    }

    #[test]
    fn entity_kind_nouns() {
        assert_eq!(EntityKind::AuthInfo.to_string(), "user");
        assert_eq!(EntityKind::Cluster.to_string(), "cluster");
        assert_eq!(EntityKind::Context.to_string(), "context");
    }
}
