//! Clap adapter for kubectl-cfg.
//!
//! Compiled only with the `clap` Cargo feature (on by default). The derive
//! types here describe the command line; the only bridge to the core is
//! [`Command::into_action()`], which turns parsed arguments into an
//! [`Action`]. That step also parses `key=value` / `key-` pair arguments, so
//! malformed pairs fail before anything is loaded.
//!
//! Boolean flags such as `--embed-certs` and `--insecure-skip-tls-verify`
//! are three-way: absent, `--flag` / `--flag=true`, or `--flag=false`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::CfgError;
use crate::ops::{ListOptions, ListOutput};
use crate::patch::{AuthInfoPatch, ClusterPatch, ContextPatch, parse_pairs};
use crate::types::{Action, EntityKind};

#[derive(Debug, Parser)]
#[command(
    name = "kubectl-cfg",
    version,
    about = "Add, delete, rename, merge and switch kubeconfig entries"
)]
pub struct Cli {
    /// Use this kubeconfig file instead of the path list or ~/.kube/config.
    #[arg(long, global = true, value_name = "FILE")]
    pub kubeconfig: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create or update a cluster, user or context.
    #[command(subcommand)]
    Add(AddCommand),
    /// Delete a cluster, user or context.
    Delete {
        kind: EntityKind,
        name: String,
    },
    /// Rename an entry.
    #[command(subcommand)]
    Rename(RenameCommand),
    /// Switch the current context.
    #[command(alias = "use-context")]
    Use { name: String },
    /// Print the current context.
    #[command(alias = "current-context")]
    Current,
    /// List clusters, users or contexts.
    #[command(alias = "ls")]
    List(ListArgs),
    /// Merge kubeconfig files into one self-contained kubeconfig.
    Merge(MergeArgs),
    /// Print a commented template of the settings file.
    Settings,
}

#[derive(Debug, Subcommand)]
pub enum AddCommand {
    /// Create or update a cluster.
    Cluster(AddClusterArgs),
    /// Create or update user credentials.
    #[command(alias = "user")]
    Auth(AddAuthArgs),
    /// Create or update a context.
    Context(AddContextArgs),
}

#[derive(Debug, Args)]
pub struct AddClusterArgs {
    pub name: String,

    /// API server address.
    #[arg(long)]
    pub server: Option<String>,

    /// Certificate authority file.
    #[arg(long, value_name = "FILE")]
    pub certificate_authority: Option<String>,

    /// Store the certificate authority's content instead of its path.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub embed_certs: Option<bool>,

    /// Do not verify the server's certificate.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub insecure_skip_tls_verify: Option<bool>,
}

#[derive(Debug, Args)]
pub struct AddAuthArgs {
    pub name: String,

    /// Client certificate file.
    #[arg(long, value_name = "FILE")]
    pub client_certificate: Option<String>,

    /// Client key file.
    #[arg(long, value_name = "FILE")]
    pub client_key: Option<String>,

    /// Store the client certificate and key content instead of their paths.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub embed_certs: Option<bool>,

    /// Bearer token.
    #[arg(long)]
    pub token: Option<String>,

    /// Basic auth username.
    #[arg(long)]
    pub username: Option<String>,

    /// Basic auth password.
    #[arg(long)]
    pub password: Option<String>,

    /// Auth provider name, e.g. oidc.
    #[arg(long)]
    pub auth_provider: Option<String>,

    /// Auth provider setting as key=value; key- removes it.
    #[arg(long = "auth-provider-arg", value_delimiter = ',')]
    pub auth_provider_args: Vec<String>,

    /// Credential plugin command.
    #[arg(long)]
    pub exec_command: Option<String>,

    /// API version of the credential plugin.
    #[arg(long)]
    pub exec_api_version: Option<String>,

    /// Credential plugin argument; replaces all stored arguments.
    #[arg(long = "exec-arg", allow_hyphen_values = true)]
    pub exec_args: Vec<String>,

    /// Credential plugin environment variable as key=value; key- removes it.
    #[arg(long = "exec-env")]
    pub exec_env: Vec<String>,
}

#[derive(Debug, Args)]
pub struct AddContextArgs {
    pub name: Option<String>,

    /// Update the current context instead of a named one.
    #[arg(long)]
    pub current: bool,

    /// Cluster the context points at.
    #[arg(long)]
    pub cluster: Option<String>,

    /// User the context authenticates as.
    #[arg(long)]
    pub user: Option<String>,

    /// Default namespace.
    #[arg(long)]
    pub namespace: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum RenameCommand {
    /// Rename a context.
    Context { old: String, new: String },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    pub kind: EntityKind,

    /// Only these entries.
    pub names: Vec<String>,

    /// Omit the header row.
    #[arg(long)]
    pub no_headers: bool,

    /// Output format.
    #[arg(short, long, value_enum)]
    pub output: Option<ListOutput>,
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Kubeconfig file to merge; the first file wins conflicts.
    #[arg(short = 'f', long = "file", value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Write the result here instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl Command {
    /// Convert parsed arguments into an [`Action`].
    pub fn into_action(self) -> Result<Action, CfgError> {
        let action = match self {
            Command::Add(AddCommand::Cluster(args)) => Action::AddCluster {
                name: args.name,
                patch: ClusterPatch {
                    server: args.server,
                    insecure_skip_tls_verify: args.insecure_skip_tls_verify.into(),
                    certificate_authority: args.certificate_authority,
                    embed_certs: args.embed_certs.into(),
                },
            },
            Command::Add(AddCommand::Auth(args)) => {
                let auth_provider_args = parse_pairs(&args.auth_provider_args, "auth-provider-arg")?;
                let exec_env = parse_pairs(&args.exec_env, "exec-env")?;
                Action::AddAuthInfo {
                    name: args.name,
                    patch: AuthInfoPatch {
                        client_certificate: args.client_certificate,
                        client_key: args.client_key,
                        embed_certs: args.embed_certs.into(),
                        token: args.token,
                        username: args.username,
                        password: args.password,
                        auth_provider: args.auth_provider,
                        auth_provider_args,
                        exec_command: args.exec_command,
                        exec_api_version: args.exec_api_version,
                        exec_args: (!args.exec_args.is_empty()).then_some(args.exec_args),
                        exec_env,
                    },
                }
            }
            Command::Add(AddCommand::Context(args)) => Action::AddContext {
                name: args.name,
                current: args.current,
                patch: ContextPatch {
                    cluster: args.cluster,
                    auth_info: args.user,
                    namespace: args.namespace,
                },
            },
            Command::Delete { kind, name } => Action::Delete { kind, name },
            Command::Rename(RenameCommand::Context { old, new }) => Action::RenameContext {
                from: old,
                to: new,
            },
            Command::Use { name } => Action::UseContext { name },
            Command::Current => Action::CurrentContext,
            Command::List(args) => Action::List {
                kind: args.kind,
                options: ListOptions {
                    names: args.names,
                    show_headers: !args.no_headers,
                    output: args.output.unwrap_or_default(),
                },
            },
            Command::Merge(args) => Action::Merge {
                files: args.files,
                output: args.output,
            },
            Command::Settings => Action::Settings,
        };
        Ok(action)
    }
}
