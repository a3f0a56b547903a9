//! Mutate kubeconfig files the way `kubectl config` does, across every file
//! in the path list.
//!
//! A kubeconfig is usually not one file. The `KUBECONFIG` variable can name
//! several, and kubectl reads them as one merged document. kubectl-cfg
//! loads that chain, applies one [`Action`] to the merged view, and writes
//! each change back to the file it came from.
//!
//! ```ignore
//! let access = PathOptions::new().build();
//! let result = handle(&Action::CurrentContext, &access, None)?;
//! println!("{result}");
//! ```
//!
//! # Merging
//!
//! Files are merged in chain order and the **first file to define a value
//! wins**, down to individual fields. A cluster defined in two files takes
//! its `server` from the first one that sets it, and a field only the second
//! file sets still shows up in the merged entry. `current-context` comes from
//! the first file that sets it. Missing files are skipped. When the chain is
//! empty the default file (`~/.kube/config`) is used. An explicit
//! `--kubeconfig` replaces the chain entirely and must exist.
//!
//! # Writing back
//!
//! After an action, the merged view before and after are compared:
//!
//! - a changed entry is written to the file that defined it;
//! - a new entry goes to the default destination (the explicit file, else
//!   the first existing file in the chain, else the last one);
//! - a deleted entry is removed from every file that defines it;
//! - a changed `current-context` goes to the file that held it.
//!
//! Files without changes are left alone. Every file is written atomically
//! (temporary file, then rename), and unknown keys survive a load and save.
//!
//! # Partial updates
//!
//! `add` never replaces an entry wholesale. Each flag that is given updates
//! one field; everything else stays as it was. A few fields are mutually
//! exclusive and setting one clears its rivals:
//!
//! - `--insecure-skip-tls-verify=true` drops the certificate authority;
//! - a certificate authority or client credential is stored either as a
//!   path or (with `--embed-certs`) as inline data, never both;
//! - a token clears basic auth and vice versa.
//!
//! # Core library, optional CLI
//!
//! Everything above works through [`handle`] and the [`ConfigAccess`] trait,
//! with no CLI framework involved. [`MemoryAccess`] runs the same operations
//! against an in-memory document. The clap adapter ([`Cli`]) and the
//! `kubectl-cfg` binary sit behind the `clap` Cargo feature, on by default.
//!
//! # Settings
//!
//! The tool's own preferences (the path list variable, the default file,
//! delete backups, log filter) live in `kubectl-cfg.toml` and load through
//! [`Settings`]. `kubectl-cfg settings` prints a commented template.

pub mod error;
pub mod model;
pub mod observer;
pub mod patch;
pub mod settings;
pub mod types;

mod access;
#[cfg(feature = "clap")]
mod cli;
mod file;
mod flatten;
pub(crate) mod merge;
mod ops;
mod persist;
mod resolve;
mod validate;

#[cfg(test)]
mod fixtures;

pub use access::{ConfigAccess, FileAccess, MemoryAccess, PathOptions};
#[cfg(feature = "clap")]
pub use cli::{
    AddAuthArgs, AddClusterArgs, AddCommand, AddContextArgs, Cli, Command, ListArgs, MergeArgs,
    RenameCommand,
};
pub use error::CfgError;
pub use file::LoadingRules;
pub use flatten::flatten;
pub use model::Config;
pub use observer::{BackupFile, DeleteObserver, Removed};
pub use ops::{CfgResult, ListOptions, ListOutput, Listing, handle};
pub use persist::{FileEdit, WritePlan, plan_writes};
pub use resolve::{Origins, ResolveInput, Resolved, SourceFile, resolve};
pub use settings::Settings;
pub use types::{Action, EntityKind, Tristate};
pub use validate::validate_action;
