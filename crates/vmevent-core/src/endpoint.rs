// ── Endpoint abstraction ──
//
// Trait seam between the streaming engine and the vSphere endpoint. The
// engine only ever talks to these traits; `Vsphere*` types implement them
// over `vmevent_api::VimClient`, and tests substitute scripted fakes.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use vmevent_api::{
    EventDescription, ExtensionEvent, LocalizationCatalog, ManagedObjectReference, RawEvent,
    VimClient,
};

use crate::config::EndpointConfig;
use crate::error::CoreError;

/// Opens authenticated sessions.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    async fn login(&self) -> Result<Box<dyn EndpointSession>, CoreError>;
}

/// One authenticated session. Callers must call [`logout`](Self::logout)
/// when done; dropping the session does not end it server-side.
#[async_trait]
pub trait EndpointSession: Send + Sync {
    /// Locale the endpoint assigned to this session (e.g. `en`, `ja_JP`).
    fn locale(&self) -> &str;

    async fn event_description(&self) -> Result<EventDescription, CoreError>;

    /// Open a history cursor over all events.
    async fn create_cursor(&self) -> Result<Box<dyn HistoryCursor>, CoreError>;

    /// Subscribe to changes of the endpoint's latest event.
    async fn create_watcher(&self) -> Result<Box<dyn ChangeWatcher>, CoreError>;

    async fn localization_catalogs(&self) -> Result<Vec<LocalizationCatalog>, CoreError>;

    async fn extension_events(&self) -> Result<Vec<ExtensionEvent>, CoreError>;

    /// Downloader for catalog documents, sharing this session's transport.
    fn catalog_source(&self) -> Arc<dyn CatalogSource>;

    async fn logout(&self) -> Result<(), CoreError>;
}

/// Server-side paged iterator over event history.
#[async_trait]
pub trait HistoryCursor: Send + Sync {
    async fn set_page_size(&self, size: i32) -> Result<(), CoreError>;

    /// Next page after the cursor position; empty at end of history.
    async fn read_next_page(&self, max: i32) -> Result<Vec<RawEvent>, CoreError>;

    /// The most recent page, independent of the cursor position.
    async fn read_latest_page(&self) -> Result<Vec<RawEvent>, CoreError>;

    async fn destroy(&self) -> Result<(), CoreError>;
}

/// Blocking change notification on the endpoint's latest event.
#[async_trait]
pub trait ChangeWatcher: Send + Sync {
    /// `Ok(true)` on a change, `Ok(false)` once `max_wait_secs` passes
    /// without one. With no max wait the call blocks until a change.
    async fn wait_for_update(&mut self, max_wait_secs: Option<i32>) -> Result<bool, CoreError>;

    /// Release the filter, then its collector.
    async fn destroy(&self) -> Result<(), CoreError>;
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<String, CoreError>;
}

// ── vSphere implementation ───────────────────────────────────────────

/// Logs in to a vim25 endpoint with username/password.
#[derive(Debug, Clone)]
pub struct VsphereGateway {
    config: EndpointConfig,
}

impl VsphereGateway {
    pub fn new(config: EndpointConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }
}

#[async_trait]
impl SessionGateway for VsphereGateway {
    async fn login(&self) -> Result<Box<dyn EndpointSession>, CoreError> {
        let config = &self.config;
        let client = VimClient::connect(config.url.clone(), &config.transport())
            .await
            .map_err(|e| connect_error(config, e))?;

        let session = client
            .login(
                &config.username,
                &config.password,
                config.locale.as_deref(),
            )
            .await?;
        debug!(user = %session.user_name, locale = %session.locale, "session established");

        Ok(Box::new(VsphereSession {
            client: Arc::new(client),
            locale: session.locale,
        }))
    }
}

fn connect_error(config: &EndpointConfig, err: vmevent_api::Error) -> CoreError {
    match err {
        vmevent_api::Error::Transport(e) => CoreError::ConnectionFailed {
            url: config.url.to_string(),
            reason: e.to_string(),
        },
        vmevent_api::Error::Tls(msg) => CoreError::ConnectionFailed {
            url: config.url.to_string(),
            reason: format!("TLS error: {msg}"),
        },
        other => other.into(),
    }
}

struct VsphereSession {
    client: Arc<VimClient>,
    locale: String,
}

#[async_trait]
impl EndpointSession for VsphereSession {
    fn locale(&self) -> &str {
        &self.locale
    }

    async fn event_description(&self) -> Result<EventDescription, CoreError> {
        Ok(self.client.event_description().await?)
    }

    async fn create_cursor(&self) -> Result<Box<dyn HistoryCursor>, CoreError> {
        let collector = self.client.create_collector_for_events().await?;
        Ok(Box::new(VsphereCursor {
            client: Arc::clone(&self.client),
            collector,
        }))
    }

    async fn create_watcher(&self) -> Result<Box<dyn ChangeWatcher>, CoreError> {
        let collector = self.client.create_property_collector().await?;
        let filter = match self.client.create_latest_event_filter(&collector).await {
            Ok(filter) => filter,
            Err(e) => {
                if let Err(destroy) = self.client.destroy_property_collector(&collector).await {
                    warn!(error = %destroy, "failed to destroy property collector");
                }
                return Err(e.into());
            }
        };
        Ok(Box::new(VsphereWatcher {
            client: Arc::clone(&self.client),
            collector,
            filter,
            version: String::new(),
        }))
    }

    async fn localization_catalogs(&self) -> Result<Vec<LocalizationCatalog>, CoreError> {
        Ok(self.client.localization_catalogs().await?)
    }

    async fn extension_events(&self) -> Result<Vec<ExtensionEvent>, CoreError> {
        Ok(self.client.extension_events().await?)
    }

    fn catalog_source(&self) -> Arc<dyn CatalogSource> {
        Arc::new(VsphereCatalogSource {
            client: Arc::clone(&self.client),
        })
    }

    async fn logout(&self) -> Result<(), CoreError> {
        Ok(self.client.logout().await?)
    }
}

struct VsphereCursor {
    client: Arc<VimClient>,
    collector: ManagedObjectReference,
}

#[async_trait]
impl HistoryCursor for VsphereCursor {
    async fn set_page_size(&self, size: i32) -> Result<(), CoreError> {
        Ok(self
            .client
            .set_collector_page_size(&self.collector, size)
            .await?)
    }

    async fn read_next_page(&self, max: i32) -> Result<Vec<RawEvent>, CoreError> {
        Ok(self.client.read_next_events(&self.collector, max).await?)
    }

    async fn read_latest_page(&self) -> Result<Vec<RawEvent>, CoreError> {
        Ok(self.client.latest_page(&self.collector).await?)
    }

    async fn destroy(&self) -> Result<(), CoreError> {
        Ok(self.client.destroy_collector(&self.collector).await?)
    }
}

struct VsphereWatcher {
    client: Arc<VimClient>,
    collector: ManagedObjectReference,
    filter: ManagedObjectReference,
    version: String,
}

/// Only the latest-event property is watched, so one object update suffices.
const MAX_OBJECT_UPDATES: i32 = 1;

#[async_trait]
impl ChangeWatcher for VsphereWatcher {
    async fn wait_for_update(&mut self, max_wait_secs: Option<i32>) -> Result<bool, CoreError> {
        let update = self
            .client
            .wait_for_updates(
                &self.collector,
                &self.version,
                max_wait_secs,
                MAX_OBJECT_UPDATES,
            )
            .await?;

        Ok(match update {
            Some(set) => {
                self.version = set.version;
                true
            }
            None => false,
        })
    }

    async fn destroy(&self) -> Result<(), CoreError> {
        let filter = self.client.destroy_property_filter(&self.filter).await;
        let collector = self.client.destroy_property_collector(&self.collector).await;
        filter?;
        collector?;
        Ok(())
    }
}

struct VsphereCatalogSource {
    client: Arc<VimClient>,
}

#[async_trait]
impl CatalogSource for VsphereCatalogSource {
    async fn fetch(&self, uri: &str) -> Result<String, CoreError> {
        Ok(self.client.fetch_catalog(uri).await?)
    }
}
