// ── Event type schema ──

use serde::{Deserialize, Serialize};

/// Static description of one event type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    pub key: String,
    pub description: String,
    /// Severity category key (`info`, `warning`, `error`, `user`).
    pub category: String,
    pub long_description: EventLongDescription,
}

/// Decoded `<EventLongDescription>` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLongDescription {
    pub description: String,
    pub causes: Vec<EventCause>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCause {
    pub description: String,
    pub actions: Vec<String>,
}

/// An enumeration used in event arguments, with its value labels in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumeratedType {
    pub key: String,
    pub labels: Vec<String>,
}
