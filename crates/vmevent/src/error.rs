//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use vmevent_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to vSphere endpoint at {url}")]
    #[diagnostic(
        code(vmevent::connection_failed),
        help(
            "Check that the endpoint is reachable and the URL ends in /sdk.\n\
             URL: {url}\n\
             Self-signed certificate? Try: --no-verify-ssl"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Could not reach Loki: {reason}")]
    #[diagnostic(
        code(vmevent::loki_unreachable),
        help("Check --loki-url. Self-signed certificate? Try: --loki-no-verify-ssl")
    )]
    LokiUnreachable { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(vmevent::auth_failed),
        help("Verify --user and --password (or VMEVENT_USER / VMEVENT_PASSWORD).")
    )]
    AuthFailed { message: String },

    #[error("No username configured for {url}")]
    #[diagnostic(
        code(vmevent::no_credentials),
        help(
            "Pass --user and --password, set VMEVENT_USER and VMEVENT_PASSWORD,\n\
             or add `user` and `password` to the config file."
        )
    )]
    NoCredentials { url: String },

    // ── Endpoint ─────────────────────────────────────────────────────
    #[error("vSphere error ({code}): {message}")]
    #[diagnostic(code(vmevent::api_error))]
    ApiError { code: String, message: String },

    #[error("Loki rejected the push (HTTP {status}): {message}")]
    #[diagnostic(code(vmevent::delivery_failed))]
    Delivery { status: u16, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vmevent::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(vmevent::no_config),
        help("Check the --config path or VMEVENT_CONFIG.")
    )]
    ConfigNotFound { path: String },

    #[error(transparent)]
    #[diagnostic(code(vmevent::config))]
    Config(Box<figment::Error>),

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(vmevent::timeout),
        help("Increase timeout with --timeout or check endpoint responsiveness.")
    )]
    Timeout { seconds: u64 },

    #[error("Interrupted")]
    #[diagnostic(code(vmevent::interrupted))]
    Cancelled,

    #[error("Internal error: {0}")]
    #[diagnostic(code(vmevent::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(vmevent::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(vmevent::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::LokiUnreachable { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ConfigNotFound { .. } | Self::Config(_) => {
                exit_code::USAGE
            }
            Self::Cancelled => exit_code::INTERRUPTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Api {
                message,
                fault,
                status,
            } => CliError::ApiError {
                code: fault
                    .or_else(|| status.map(|s| format!("HTTP {s}")))
                    .unwrap_or_else(|| "unknown".into()),
                message,
            },

            CoreError::Delivery { status, message } => CliError::Delivery { status, message },

            CoreError::DeliveryTransport(reason) => CliError::LokiUnreachable { reason },

            CoreError::Cancelled => CliError::Cancelled,

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
