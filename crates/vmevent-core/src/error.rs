// ── Core error types ──
//
// Domain errors for the event pipeline. Consumers never see SOAP faults or
// XML decode failures directly; the `From<vmevent_api::Error>` impl
// translates transport-layer errors into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to endpoint at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Endpoint call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Endpoint errors ──────────────────────────────────────────────
    #[error("Endpoint error: {message}")]
    Api {
        message: String,
        /// vim25 fault type, e.g. `ManagedObjectNotFound`.
        fault: Option<String>,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Delivery errors ──────────────────────────────────────────────
    #[error("Push to log backend failed (HTTP {status}): {message}")]
    Delivery { status: u16, message: String },

    #[error("Push to log backend failed: {0}")]
    DeliveryTransport(String),

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Operation cancelled")]
    Cancelled,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<vmevent_api::Error> for CoreError {
    fn from(err: vmevent_api::Error) -> Self {
        match err {
            vmevent_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            vmevent_api::Error::SessionExpired => CoreError::AuthenticationFailed {
                message: "Session expired -- re-authentication required".into(),
            },
            vmevent_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        fault: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            vmevent_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            vmevent_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            vmevent_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            vmevent_api::Error::Http { status, body } => CoreError::Api {
                message: body,
                fault: None,
                status: Some(status),
            },
            vmevent_api::Error::Fault {
                code: _,
                message,
                kind,
            } => CoreError::Api {
                message,
                fault: kind,
                status: None,
            },
            vmevent_api::Error::Xml(message) => {
                CoreError::Internal(format!("XML error: {message}"))
            }
            vmevent_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
