// Scripted in-memory endpoint for engine and forwarder tests.
//
// Each login consumes one `Script`. Cursor reads pop queued pages (empty
// once the queue runs dry); each watcher wait plays the next `Step`.
// Lifecycle calls are appended to a shared log so tests can check
// cleanup order.
#![allow(clippy::unwrap_used, dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::DateTime;

use vmevent_api::{
    ElementDescription, EventDescription, EventDetail, EventHeader, EventKind, ExtensionEvent,
    LocalizationCatalog, RawEvent,
};
use vmevent_core::{
    CatalogSource, ChangeWatcher, CoreError, EndpointSession, HistoryCursor, SessionGateway,
};

// ── Fixtures ────────────────────────────────────────────────────────

/// A `VmPoweredOnEvent` whose creation time increases with `key`.
pub fn raw(key: i32) -> RawEvent {
    raw_at(key, i64::from(key))
}

pub fn raw_at(key: i32, secs: i64) -> RawEvent {
    RawEvent {
        header: EventHeader {
            key,
            chain_id: key,
            created_time: DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap(),
            user_name: "root".into(),
            full_formatted_message: format!("event {key}"),
            compute_resource: Some("Cluster".into()),
            datacenter: Some("DC1".into()),
            datastore: None,
            distributed_virtual_switch: None,
            host: Some("esx01".into()),
            network: None,
            vm: Some(format!("vm{key}")),
        },
        kind: EventKind::Typed {
            type_name: "VmPoweredOnEvent".into(),
        },
    }
}

pub fn page(keys: &[i32]) -> Vec<RawEvent> {
    keys.iter().copied().map(raw).collect()
}

pub fn description() -> EventDescription {
    let category = |key: &str, label: &str| ElementDescription {
        key: key.into(),
        label: label.into(),
        summary: String::new(),
    };
    EventDescription {
        category: vec![
            category("info", "Information"),
            category("warning", "Warning"),
            category("error", "Error"),
        ],
        event_info: vec![EventDetail {
            key: "VmPoweredOnEvent".into(),
            description: "VM powered on".into(),
            category: "info".into(),
            full_format: String::new(),
            long_description: Some(
                "<EventLongDescription><description>The VM is on</description>\
                 <cause><description>User action</description><action>None</action></cause>\
                 </EventLongDescription>"
                    .into(),
            ),
        }],
        enumerated_types: Vec::new(),
    }
}

// ── Script ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Step {
    /// Wait returns a change; the next read yields this page.
    Notify(Vec<RawEvent>),
    /// Wait returns a change; the next read fails.
    NotifyReadError,
    /// Wait returns `Ok(false)`.
    Timeout,
    /// Wait fails.
    WaitError,
}

#[derive(Debug, Clone, Default)]
pub struct Script {
    pub backlog: Vec<Vec<RawEvent>>,
    pub steps: Vec<Step>,
    pub fail_login: bool,
    pub latest_page: Vec<RawEvent>,
    pub extensions: Vec<ExtensionEvent>,
    pub catalogs: Vec<LocalizationCatalog>,
    pub catalog_text: String,
}

pub type CallLog = Arc<Mutex<Vec<String>>>;

fn record(log: &CallLog, call: &str) {
    log.lock().unwrap().push(call.to_owned());
}

// ── Gateway ─────────────────────────────────────────────────────────

pub struct FakeGateway {
    scripts: Mutex<VecDeque<Script>>,
    pub log: CallLog,
}

impl FakeGateway {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            log: Arc::default(),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|c| *c == call).count()
    }
}

#[async_trait]
impl SessionGateway for FakeGateway {
    async fn login(&self) -> Result<Box<dyn EndpointSession>, CoreError> {
        record(&self.log, "login");
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(script) if !script.fail_login => Ok(Box::new(FakeSession::new(
                script,
                Arc::clone(&self.log),
            ))),
            _ => Err(CoreError::ConnectionFailed {
                url: "https://fake/sdk".into(),
                reason: "connection refused".into(),
            }),
        }
    }
}

// ── Session ─────────────────────────────────────────────────────────

struct Shared {
    pages: VecDeque<Result<Vec<RawEvent>, ()>>,
    steps: VecDeque<Step>,
}

pub struct FakeSession {
    shared: Arc<Mutex<Shared>>,
    latest_page: Vec<RawEvent>,
    extensions: Vec<ExtensionEvent>,
    catalogs: Vec<LocalizationCatalog>,
    catalog_source: Arc<FakeCatalogSource>,
    log: CallLog,
}

impl FakeSession {
    pub fn new(script: Script, log: CallLog) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                pages: script.backlog.into_iter().map(Ok).collect(),
                steps: script.steps.into(),
            })),
            latest_page: script.latest_page,
            extensions: script.extensions,
            catalogs: script.catalogs,
            catalog_source: Arc::new(FakeCatalogSource {
                text: script.catalog_text,
                log: Arc::clone(&log),
            }),
            log,
        }
    }
}

#[async_trait]
impl EndpointSession for FakeSession {
    fn locale(&self) -> &str {
        "en_US"
    }

    async fn event_description(&self) -> Result<EventDescription, CoreError> {
        record(&self.log, "event_description");
        Ok(description())
    }

    async fn create_cursor(&self) -> Result<Box<dyn HistoryCursor>, CoreError> {
        record(&self.log, "create_cursor");
        Ok(Box::new(FakeCursor {
            shared: Arc::clone(&self.shared),
            latest_page: self.latest_page.clone(),
            log: Arc::clone(&self.log),
        }))
    }

    async fn create_watcher(&self) -> Result<Box<dyn ChangeWatcher>, CoreError> {
        record(&self.log, "create_watcher");
        Ok(Box::new(FakeWatcher {
            shared: Arc::clone(&self.shared),
            log: Arc::clone(&self.log),
        }))
    }

    async fn localization_catalogs(&self) -> Result<Vec<LocalizationCatalog>, CoreError> {
        Ok(self.catalogs.clone())
    }

    async fn extension_events(&self) -> Result<Vec<ExtensionEvent>, CoreError> {
        Ok(self.extensions.clone())
    }

    fn catalog_source(&self) -> Arc<dyn CatalogSource> {
        Arc::clone(&self.catalog_source) as Arc<dyn CatalogSource>
    }

    async fn logout(&self) -> Result<(), CoreError> {
        record(&self.log, "logout");
        Ok(())
    }
}

struct FakeCursor {
    shared: Arc<Mutex<Shared>>,
    latest_page: Vec<RawEvent>,
    log: CallLog,
}

#[async_trait]
impl HistoryCursor for FakeCursor {
    async fn set_page_size(&self, size: i32) -> Result<(), CoreError> {
        record(&self.log, &format!("set_page_size {size}"));
        Ok(())
    }

    async fn read_next_page(&self, _max: i32) -> Result<Vec<RawEvent>, CoreError> {
        match self.shared.lock().unwrap().pages.pop_front() {
            Some(Ok(page)) => Ok(page),
            Some(Err(())) => Err(CoreError::Api {
                message: "read failed".into(),
                fault: None,
                status: Some(500),
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn read_latest_page(&self) -> Result<Vec<RawEvent>, CoreError> {
        Ok(self.latest_page.clone())
    }

    async fn destroy(&self) -> Result<(), CoreError> {
        record(&self.log, "destroy_cursor");
        Ok(())
    }
}

struct FakeWatcher {
    shared: Arc<Mutex<Shared>>,
    log: CallLog,
}

#[async_trait]
impl ChangeWatcher for FakeWatcher {
    async fn wait_for_update(&mut self, max_wait_secs: Option<i32>) -> Result<bool, CoreError> {
        let step = self.shared.lock().unwrap().steps.pop_front();
        match step {
            Some(Step::Notify(page)) => {
                self.shared.lock().unwrap().pages.push_back(Ok(page));
                Ok(true)
            }
            Some(Step::NotifyReadError) => {
                self.shared.lock().unwrap().pages.push_back(Err(()));
                Ok(true)
            }
            Some(Step::Timeout) => Ok(false),
            Some(Step::WaitError) => Err(CoreError::ConnectionFailed {
                url: "https://fake/sdk".into(),
                reason: "connection reset".into(),
            }),
            None if max_wait_secs.is_some() => Ok(false),
            None => std::future::pending().await,
        }
    }

    async fn destroy(&self) -> Result<(), CoreError> {
        record(&self.log, "destroy_filter");
        record(&self.log, "destroy_property_collector");
        Ok(())
    }
}

pub struct FakeCatalogSource {
    text: String,
    log: CallLog,
}

#[async_trait]
impl CatalogSource for FakeCatalogSource {
    async fn fetch(&self, uri: &str) -> Result<String, CoreError> {
        record(&self.log, &format!("fetch {uri}"));
        Ok(self.text.clone())
    }
}
