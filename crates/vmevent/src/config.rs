//! Settings resolution: defaults, TOML file, `VMEVENT_*` env, CLI flags.
//!
//! Later layers win. The result is translated into the core crate's
//! `EndpointConfig` / `LokiConfig`; nothing here touches the network.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use vmevent_core::config::{DEFAULT_LOKI_URL, DEFAULT_SDK_URL, DEFAULT_SERVICE_NAME};
use vmevent_core::{EndpointConfig, LokiConfig, TlsVerification};

use crate::cli::{GlobalOpts, LokiOpts};
use crate::error::CliError;

const ENV_PREFIX: &str = "VMEVENT_";

// ── Settings ────────────────────────────────────────────────────────

/// Fully resolved settings. Field names double as TOML keys and as the
/// lowercase suffix of the `VMEVENT_*` variables.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub url: String,
    pub user: String,
    pub password: Option<String>,
    pub no_verify_ssl: bool,
    pub ca_cert: Option<PathBuf>,
    pub timeout: u64,
    pub locale: Option<String>,
    pub log_level: String,

    pub loki_url: String,
    pub tenant: Option<String>,
    pub loki_no_verify_ssl: bool,
    pub loki_service_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: DEFAULT_SDK_URL.into(),
            user: String::new(),
            password: None,
            no_verify_ssl: false,
            ca_cert: None,
            timeout: 10,
            locale: None,
            log_level: "info".into(),
            loki_url: DEFAULT_LOKI_URL.into(),
            tenant: None,
            loki_no_verify_ssl: false,
            loki_service_name: DEFAULT_SERVICE_NAME.into(),
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("no_verify_ssl", &self.no_verify_ssl)
            .field("ca_cert", &self.ca_cert)
            .field("timeout", &self.timeout)
            .field("locale", &self.locale)
            .field("log_level", &self.log_level)
            .field("loki_url", &self.loki_url)
            .field("tenant", &self.tenant)
            .field("loki_no_verify_ssl", &self.loki_no_verify_ssl)
            .field("loki_service_name", &self.loki_service_name)
            .finish()
    }
}

/// Values given explicitly on the command line. Unset fields are skipped
/// so they don't mask lower layers.
#[derive(Debug, Default, Serialize)]
struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    no_verify_ssl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ca_cert: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loki_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tenant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loki_no_verify_ssl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loki_service_name: Option<String>,
}

impl Overrides {
    fn from_cli(global: &GlobalOpts, loki: Option<&LokiOpts>) -> Self {
        let mut overrides = Self {
            url: global.url.clone(),
            user: global.user.clone(),
            password: global.password.clone(),
            no_verify_ssl: global.no_verify_ssl.then_some(true),
            ca_cert: global.ca_cert.clone(),
            timeout: global.timeout,
            locale: global.locale.clone(),
            log_level: global.log_level.clone(),
            ..Self::default()
        };
        if let Some(loki) = loki {
            overrides.loki_url.clone_from(&loki.loki_url);
            overrides.tenant.clone_from(&loki.tenant);
            overrides.loki_no_verify_ssl = loki.loki_no_verify_ssl.then_some(true);
            overrides.loki_service_name.clone_from(&loki.loki_service_name);
        }
        overrides
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the default config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "vmevent").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("vmevent");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Resolve settings for this invocation.
///
/// An explicit `--config` must exist; the default path is optional.
pub fn load_settings(global: &GlobalOpts, loki: Option<&LokiOpts>) -> Result<Settings, CliError> {
    let path = match &global.config {
        Some(path) if !path.is_file() => {
            return Err(CliError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        Some(path) => path.clone(),
        None => config_path(),
    };
    load_from(&path, Overrides::from_cli(global, loki))
}

fn load_from(path: &Path, overrides: Overrides) -> Result<Settings, CliError> {
    let settings = Figment::new()
        .merge(Serialized::defaults(Settings::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
        .merge(Serialized::defaults(overrides))
        .extract()?;
    Ok(settings)
}

// ── Translation to core configs ─────────────────────────────────────

pub fn endpoint_config(settings: &Settings) -> Result<EndpointConfig, CliError> {
    let url = parse_url("url", &settings.url)?;
    if settings.user.is_empty() {
        return Err(CliError::NoCredentials {
            url: settings.url.clone(),
        });
    }

    Ok(EndpointConfig {
        url,
        username: settings.user.clone(),
        password: SecretString::from(settings.password.clone().unwrap_or_default()),
        tls: TlsVerification::from_settings(settings.no_verify_ssl, settings.ca_cert.as_deref()),
        timeout: Duration::from_secs(settings.timeout),
        locale: settings.locale.clone().filter(|l| !l.is_empty()),
    })
}

pub fn loki_config(settings: &Settings) -> Result<LokiConfig, CliError> {
    Ok(LokiConfig {
        url: parse_url("loki_url", &settings.loki_url)?,
        tenant: settings.tenant.clone().filter(|t| !t.is_empty()),
        tls: TlsVerification::from_settings(settings.loki_no_verify_ssl, None),
        service_name: settings.loki_service_name.clone(),
        timeout: Duration::from_secs(settings.timeout),
    })
}

fn parse_url(field: &str, value: &str) -> Result<url::Url, CliError> {
    value.parse().map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{value}': {e}"),
    })
}
