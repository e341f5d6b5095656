// vmevent-core: event streaming, normalization and forwarding for vSphere endpoints.

pub mod config;
pub mod convert;
pub mod endpoint;
pub mod error;
pub mod forwarder;
pub mod localization;
pub mod loki;
pub mod model;
pub mod schema;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{EndpointConfig, LokiConfig, TlsVerification};
pub use endpoint::{
    CatalogSource, ChangeWatcher, EndpointSession, HistoryCursor, SessionGateway, VsphereGateway,
};
pub use error::CoreError;
pub use forwarder::{Forwarder, ForwarderOptions};
pub use localization::LocalizationCache;
pub use loki::{LokiClient, PushClient, PushMessage};
pub use stream::{EventStream, ResumePosition, StreamOptions, StreamState};

pub use model::{EnumeratedType, Event, EventCause, EventInfo, EventLongDescription};

// Raw endpoint types that appear in the trait signatures.
pub use vmevent_api::{EventDescription, ExtensionEvent, LocalizationCatalog, RawEvent};
