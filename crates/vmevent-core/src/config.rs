// ── Runtime connection configuration ──
//
// These types describe *how* to reach the vSphere endpoint and the log
// backend. They carry credential data and connection tuning, but never
// touch disk. The CLI resolves flags, env and config file into these
// and hands them in.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use vmevent_api::transport::{TlsMode, TransportConfig};

/// Default vim25 endpoint.
pub const DEFAULT_SDK_URL: &str = "https://127.0.0.1/sdk";
/// Default Loki push endpoint.
pub const DEFAULT_LOKI_URL: &str = "http://127.0.0.1:3100/loki/api/v1/push";
pub const DEFAULT_SERVICE_NAME: &str = "vmevent";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file (PEM).
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

impl TlsVerification {
    /// Skipping verification wins over a configured CA file.
    pub fn from_settings(no_verify: bool, ca_cert: Option<&Path>) -> Self {
        match ca_cert {
            _ if no_verify => Self::DangerAcceptInvalid,
            Some(path) => Self::CustomCa(path.to_path_buf()),
            None => Self::SystemDefaults,
        }
    }

    pub(crate) fn to_tls_mode(&self) -> TlsMode {
        match self {
            Self::SystemDefaults => TlsMode::System,
            Self::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            Self::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Connection settings for one vSphere endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// `/sdk` URL (e.g., `https://vcenter.example.com/sdk`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    /// Per-call timeout for ordinary SOAP calls.
    pub timeout: Duration,
    /// Session locale requested at login; `None` keeps the server default.
    pub locale: Option<String>,
}

impl EndpointConfig {
    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.to_tls_mode(),
            timeout: self.timeout,
            cookie_jar: None,
        }
        .with_cookie_jar()
    }
}

/// Settings for the Loki push endpoint.
#[derive(Debug, Clone)]
pub struct LokiConfig {
    pub url: Url,
    /// Sent as `X-Scope-OrgID` when set.
    pub tenant: Option<String>,
    pub tls: TlsVerification,
    /// Value of the `service_name` stream label.
    pub service_name: String,
    pub timeout: Duration,
}
