use thiserror::Error;

/// Top-level error type for the `vmevent-api` crate.
///
/// Covers every failure mode of the vim25 SOAP surface: authentication,
/// transport, SOAP faults, and XML decoding. `vmevent-core` maps these
/// into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected by the endpoint (`InvalidLogin` fault).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Session cookie no longer valid (`NotAuthenticated` fault).
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-success HTTP status without a SOAP fault body.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    // ── SOAP ────────────────────────────────────────────────────────
    /// A SOAP fault returned by the endpoint.
    #[error("SOAP fault {code}: {message}")]
    Fault {
        code: String,
        message: String,
        /// Concrete vim25 fault type from `<detail>`, e.g. `InvalidArgument`.
        kind: Option<String>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// Malformed XML in a response body or embedded document.
    #[error("XML error: {0}")]
    Xml(String),

    /// A response parsed as XML but was missing required content.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::SessionExpired)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The vim25 fault type name, if this is a SOAP fault carrying one.
    pub fn fault_kind(&self) -> Option<&str> {
        match self {
            Self::Fault { kind, .. } => kind.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn missing(what: &str, body: &str) -> Self {
        Self::Deserialization {
            message: format!("missing {what}"),
            body: body.to_owned(),
        }
    }
}
