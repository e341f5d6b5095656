//! Clap derive structures for the `vmevent` CLI.
//!
//! Connection flags are optional here: unset flags fall through to the
//! config file, the environment and finally built-in defaults (see
//! [`crate::config`]).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vmevent -- forward vSphere events to Loki
#[derive(Debug, Parser)]
#[command(
    name = "vmevent",
    version,
    about = "Forward vSphere events to Loki",
    long_about = "Reads the event history of a vCenter or ESXi endpoint over the vim25 SOAP API.\n\n\
        Inspect the event catalog, tail new events, or run a long-lived\n\
        forwarder that pushes every event to a Loki instance.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// vSphere SDK URL [default: https://127.0.0.1/sdk]
    #[arg(long, env = "VMEVENT_URL", global = true)]
    pub url: Option<String>,

    /// vSphere username
    #[arg(long, short = 'u', env = "VMEVENT_USER", global = true)]
    pub user: Option<String>,

    /// vSphere password
    #[arg(long, env = "VMEVENT_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Skip TLS certificate verification for the vSphere endpoint
    #[arg(long, short = 'k', env = "VMEVENT_NO_VERIFY_SSL", global = true)]
    pub no_verify_ssl: bool,

    /// PEM CA certificate used to verify the vSphere endpoint
    #[arg(long, env = "VMEVENT_CA_CERT", global = true)]
    pub ca_cert: Option<PathBuf>,

    /// API call timeout in seconds [default: 10]
    #[arg(long, env = "VMEVENT_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Session locale for event messages (e.g. en_US, ja_JP)
    #[arg(long, env = "VMEVENT_LOCALE", global = true)]
    pub locale: Option<String>,

    /// Log level: error, warn, info, debug, trace [default: info]
    #[arg(long, env = "VMEVENT_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "VMEVENT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Config file (TOML) [default: platform config dir]
    #[arg(long, env = "VMEVENT_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

// ── Output Format ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one record per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List event severity categories
    Category,

    /// List enumerated types used in event arguments
    Enumerated,

    /// Describe every known event type, including extension events
    Info,

    /// Show the latest page of events
    #[command(alias = "events")]
    Event,

    /// Print new events as they arrive
    Wait(WaitArgs),

    /// Push events to Loki
    Loki(LokiArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Wait ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WaitArgs {
    /// Stop after this many seconds without a new event
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(i32).range(1..))]
    pub wait_timeout: i32,

    /// Resume after this event key instead of skipping the backlog
    #[arg(long, default_value_t = 0)]
    pub after: i32,
}

// ── Loki ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LokiArgs {
    #[command(flatten)]
    pub opts: LokiOpts,

    #[command(subcommand)]
    pub command: LokiCommand,
}

#[derive(Debug, Args)]
pub struct LokiOpts {
    /// Loki push URL [default: http://127.0.0.1:3100/loki/api/v1/push]
    #[arg(long, env = "VMEVENT_LOKI_URL", global = true)]
    pub loki_url: Option<String>,

    /// Loki tenant (X-Scope-OrgID)
    #[arg(long, env = "VMEVENT_TENANT", global = true)]
    pub tenant: Option<String>,

    /// Skip TLS certificate verification for Loki
    #[arg(long, env = "VMEVENT_LOKI_NO_VERIFY_SSL", global = true)]
    pub loki_no_verify_ssl: bool,

    /// Value of the service_name label [default: vmevent]
    #[arg(long, env = "VMEVENT_LOKI_SERVICE_NAME", global = true)]
    pub loki_service_name: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum LokiCommand {
    /// Push a single test line
    Test {
        /// Line to push
        #[arg(long, default_value = "Test message")]
        message: String,
    },

    /// Forward events until interrupted (Ctrl-C)
    Collect {
        /// Forward the backlog after this event key instead of skipping it
        #[arg(long, default_value_t = 0)]
        after: i32,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
