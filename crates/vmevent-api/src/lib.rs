// vmevent-api: Async Rust client for the vSphere vim25 SOAP API

pub mod error;
pub mod transport;
pub mod vim;
pub mod xml;

pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
pub use vim::VimClient;
pub use vim::models::{
    AboutInfo, ElementDescription, EnumDescription, EventDescription, EventDetail, EventHeader,
    EventKind, ExtensionEvent, LocalizationCatalog, ManagedObjectReference, RawEvent,
    ServiceContent, UpdateSet, UserSession,
};
