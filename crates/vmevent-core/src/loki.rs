// ── Loki push client ──
//
// Builds push-API messages from normalized events and delivers them over
// HTTP. JSON encoding: one stream per event, labelled by service name and
// severity, with a single entry carrying structured metadata.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::ser::{SerializeMap, SerializeTuple};
use serde::{Serialize, Serializer};
use tracing::debug;
use url::Url;

use vmevent_api::transport::TransportConfig;

use crate::config::LokiConfig;
use crate::error::CoreError;
use crate::model::Event;

const TENANT_HEADER: &str = "X-Scope-OrgID";

// ── Wire types ───────────────────────────────────────────────────

/// Body of `POST /loki/api/v1/push`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub streams: Vec<PushStream>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushStream {
    /// Stream labels.
    pub stream: BTreeMap<String, String>,
    pub values: Vec<PushEntry>,
}

/// One log line, encoded as `["<unix nanos>", "<line>", {metadata}]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEntry {
    pub timestamp: DateTime<Utc>,
    pub line: String,
    /// Structured metadata, in insertion order.
    pub metadata: Vec<(String, String)>,
}

struct OrderedMap<'a>(&'a [(String, String)]);

impl Serialize for OrderedMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Serialize for PushEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = self.timestamp.timestamp_nanos_opt().unwrap_or_default();
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&nanos.to_string())?;
        tuple.serialize_element(&self.line)?;
        tuple.serialize_element(&OrderedMap(&self.metadata))?;
        tuple.end()
    }
}

// ── Event → message ──────────────────────────────────────────────

impl PushMessage {
    /// One stream per event, in batch order.
    pub fn from_events(events: &[Event], service_name: &str) -> Self {
        Self {
            streams: events
                .iter()
                .map(|e| PushStream::from_event(e, service_name))
                .collect(),
        }
    }

    /// A single free-form line, for connectivity checks.
    pub fn test_line(line: &str, service_name: &str) -> Self {
        Self {
            streams: vec![PushStream {
                stream: labels(service_name, "info"),
                values: vec![PushEntry {
                    timestamp: Utc::now(),
                    line: line.to_owned(),
                    metadata: Vec::new(),
                }],
            }],
        }
    }
}

impl PushStream {
    pub fn from_event(event: &Event, service_name: &str) -> Self {
        Self {
            stream: labels(service_name, &event.severity),
            values: vec![PushEntry {
                timestamp: event.created_time,
                line: event.full_formatted_message.clone(),
                metadata: event_metadata(event),
            }],
        }
    }
}

fn labels(service_name: &str, severity: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("service_name".to_owned(), service_name.to_owned()),
        ("severity".to_owned(), severity.to_owned()),
    ])
}

/// Structured metadata attached to an event's log line.
pub fn event_metadata(event: &Event) -> Vec<(String, String)> {
    let mut meta = vec![("internal_key".to_owned(), event.key.to_string())];
    let mut push = |name: &str, value: Option<&str>| {
        if let Some(value) = value {
            meta.push((name.to_owned(), value.to_owned()));
        }
    };

    push("cluster", event.cluster());
    push("datacenter", event.datacenter.as_deref());
    push("datastore", event.datastore.as_deref());
    push(
        "distributed_virtual_switch",
        event.distributed_virtual_switch.as_deref(),
    );
    push("host", event.host.as_deref());
    push("network", event.network.as_deref());
    push("user", Some(event.user_name.as_str()));
    push("vm", event.vm.as_deref());
    push("event_type_id", Some(event.event_type_id.as_str()));

    meta
}

// ── Delivery ─────────────────────────────────────────────────────

/// Delivers push messages to a log backend.
#[async_trait]
pub trait PushClient: Send + Sync {
    async fn push(&self, message: &PushMessage) -> Result<(), CoreError>;
}

/// HTTP client for the Loki push API.
pub struct LokiClient {
    http: reqwest::Client,
    url: Url,
    tenant: Option<String>,
    timeout: std::time::Duration,
}

impl LokiClient {
    pub fn new(config: &LokiConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: config.tls.to_tls_mode(),
            timeout: config.timeout,
            cookie_jar: None,
        };
        let http = transport.build_client()?;
        Ok(Self::with_client(http, config))
    }

    /// Use a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, config: &LokiConfig) -> Self {
        Self {
            http,
            url: config.url.clone(),
            tenant: config.tenant.clone().filter(|t| !t.is_empty()),
            timeout: config.timeout,
        }
    }
}

#[async_trait]
impl PushClient for LokiClient {
    async fn push(&self, message: &PushMessage) -> Result<(), CoreError> {
        let body = serde_json::to_vec(message)
            .map_err(|e| CoreError::Internal(format!("failed to encode push message: {e}")))?;
        debug!(streams = message.streams.len(), "POST {}", self.url);

        let mut req = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .body(body);
        if let Some(ref tenant) = self.tenant {
            req = req.header(TENANT_HEADER, tenant);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| CoreError::DeliveryTransport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(CoreError::Delivery {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn event() -> Event {
        Event {
            key: 4711,
            created_time: DateTime::from_timestamp(1_718_447_400, 5).unwrap(),
            user_name: "VSPHERE.LOCAL\\admin".into(),
            full_formatted_message: "web01 on esx01 is powered on".into(),
            severity: "info".into(),
            event_type_id: "VmPoweredOnEvent".into(),
            compute_resource: Some("Cluster".into()),
            datacenter: Some("DC1".into()),
            datastore: None,
            distributed_virtual_switch: None,
            host: Some("esx01".into()),
            network: None,
            vm: Some("web01".into()),
        }
    }

    #[test]
    fn metadata_in_fixed_order() {
        let names: Vec<String> = event_metadata(&event()).into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            names,
            vec![
                "internal_key",
                "cluster",
                "datacenter",
                "host",
                "user",
                "vm",
                "event_type_id"
            ]
        );
    }

    #[test]
    fn metadata_omits_cluster_for_standalone_host() {
        let e = Event {
            compute_resource: Some("esx01".into()),
            ..event()
        };
        assert!(event_metadata(&e).iter().all(|(k, _)| k != "cluster"));
    }

    #[test]
    fn serializes_push_json() {
        let msg = PushMessage::from_events(&[event()], "vmevent");
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(
            value,
            json!({
                "streams": [{
                    "stream": { "service_name": "vmevent", "severity": "info" },
                    "values": [[
                        "1718447400000000005",
                        "web01 on esx01 is powered on",
                        {
                            "internal_key": "4711",
                            "cluster": "Cluster",
                            "datacenter": "DC1",
                            "host": "esx01",
                            "user": "VSPHERE.LOCAL\\admin",
                            "vm": "web01",
                            "event_type_id": "VmPoweredOnEvent"
                        }
                    ]]
                }]
            })
        );
    }

    #[test]
    fn one_stream_per_event() {
        let mut second = event();
        second.severity = "warning".into();
        let msg = PushMessage::from_events(&[event(), second], "svc");
        assert_eq!(msg.streams.len(), 2);
        assert_eq!(msg.streams[1].stream["severity"], "warning");
    }
}
