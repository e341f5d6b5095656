// vim25 data objects
//
// Typed views over the XML returned by the SOAP endpoint. Only the fields the
// event pipeline consumes are modelled; everything else is ignored. vim25 is
// lax about element presence across releases, so most strings default to
// empty rather than failing the decode.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::error::Error;
use crate::xml::XmlNode;

// ── References ───────────────────────────────────────────────────────

/// A managed object reference: `<obj type="EventManager">EventManager</obj>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ManagedObjectReference {
    pub kind: String,
    pub value: String,
}

impl ManagedObjectReference {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub(crate) fn from_node(node: &XmlNode) -> Self {
        Self {
            kind: node.attr("type").unwrap_or_default().to_owned(),
            value: node.text.clone(),
        }
    }
}

fn text_of(node: &XmlNode, name: &str) -> String {
    node.child_text(name).unwrap_or_default().to_owned()
}

fn opt_text_of(node: &XmlNode, name: &str) -> Option<String> {
    node.child_text(name).map(str::to_owned)
}

// ── Service content & session ────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct AboutInfo {
    pub full_name: String,
    pub api_type: String,
    pub api_version: String,
    pub instance_uuid: Option<String>,
}

/// Root set of manager references returned by `RetrieveServiceContent`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceContent {
    pub about: AboutInfo,
    pub property_collector: ManagedObjectReference,
    pub session_manager: Option<ManagedObjectReference>,
    pub event_manager: Option<ManagedObjectReference>,
    pub localization_manager: Option<ManagedObjectReference>,
    pub extension_manager: Option<ManagedObjectReference>,
}

impl ServiceContent {
    pub(crate) fn from_node(node: &XmlNode) -> Result<Self, Error> {
        let property_collector = node
            .child("propertyCollector")
            .map(ManagedObjectReference::from_node)
            .ok_or_else(|| Error::missing("propertyCollector", &node.name))?;
        let moref = |name: &str| node.child(name).map(ManagedObjectReference::from_node);

        let about = node
            .child("about")
            .map(|a| AboutInfo {
                full_name: text_of(a, "fullName"),
                api_type: text_of(a, "apiType"),
                api_version: text_of(a, "apiVersion"),
                instance_uuid: opt_text_of(a, "instanceUuid"),
            })
            .unwrap_or_default();

        Ok(Self {
            about,
            property_collector,
            session_manager: moref("sessionManager"),
            event_manager: moref("eventManager"),
            localization_manager: moref("localizationManager"),
            extension_manager: moref("extensionManager"),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserSession {
    pub key: String,
    pub user_name: String,
    pub full_name: String,
    pub locale: String,
    pub message_locale: String,
}

impl UserSession {
    pub(crate) fn from_node(node: &XmlNode) -> Self {
        Self {
            key: text_of(node, "key"),
            user_name: text_of(node, "userName"),
            full_name: text_of(node, "fullName"),
            locale: text_of(node, "locale"),
            message_locale: text_of(node, "messageLocale"),
        }
    }
}

// ── Events ───────────────────────────────────────────────────────────

/// Fields common to every vim25 `Event` subtype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventHeader {
    pub key: i32,
    pub chain_id: i32,
    pub created_time: DateTime<Utc>,
    pub user_name: String,
    pub full_formatted_message: String,
    pub compute_resource: Option<String>,
    pub datacenter: Option<String>,
    pub datastore: Option<String>,
    pub distributed_virtual_switch: Option<String>,
    pub host: Option<String>,
    pub network: Option<String>,
    pub vm: Option<String>,
}

/// The discriminating part of a raw event, resolved once from `xsi:type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum EventKind {
    /// `EventEx`: caller-defined type id and optional explicit severity.
    EventEx {
        event_type_id: String,
        severity: Option<String>,
    },
    /// `ExtendedEvent`: extension-defined type id, no severity.
    Extended { event_type_id: String },
    /// Any other concrete subtype, e.g. `VmPoweredOnEvent`.
    Typed { type_name: String },
}

/// One event as returned by `ReadNextEvents` / `latestPage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawEvent {
    pub header: EventHeader,
    pub kind: EventKind,
}

impl RawEvent {
    pub fn from_node(node: &XmlNode) -> Result<Self, Error> {
        let key = node
            .child_text("key")
            .and_then(|k| k.trim().parse::<i32>().ok())
            .ok_or_else(|| Error::missing("event key", &node.name))?;
        let chain_id = node
            .child_text("chainId")
            .and_then(|k| k.trim().parse::<i32>().ok())
            .unwrap_or(key);
        let created = node
            .child_text("createdTime")
            .ok_or_else(|| Error::missing("event createdTime", &node.name))?;
        let created_time = DateTime::parse_from_rfc3339(created.trim())
            .map_err(|e| Error::Deserialization {
                message: format!("invalid createdTime: {e}"),
                body: created.to_owned(),
            })?
            .with_timezone(&Utc);

        // Entity arguments look like <vm><vm type="VirtualMachine">vm-1</vm><name>web</name></vm>.
        let entity = |name: &str| {
            node.child(name)
                .and_then(|arg| arg.child_text("name"))
                .map(str::to_owned)
        };

        let header = EventHeader {
            key,
            chain_id,
            created_time,
            user_name: text_of(node, "userName"),
            full_formatted_message: text_of(node, "fullFormattedMessage"),
            compute_resource: entity("computeResource"),
            datacenter: entity("datacenter"),
            datastore: entity("ds"),
            distributed_virtual_switch: entity("dvs"),
            host: entity("host"),
            network: entity("net"),
            vm: entity("vm"),
        };

        let kind = match node.xsi_type().unwrap_or("Event") {
            "EventEx" => EventKind::EventEx {
                event_type_id: text_of(node, "eventTypeId"),
                severity: opt_text_of(node, "severity").filter(|s| !s.is_empty()),
            },
            "ExtendedEvent" => EventKind::Extended {
                event_type_id: text_of(node, "eventTypeId"),
            },
            other => EventKind::Typed {
                type_name: other.to_owned(),
            },
        };

        Ok(Self { header, kind })
    }

    /// Decode every `returnval`-style child of `node` named `name`.
    ///
    /// Events that fail to decode are logged and skipped; the rest of the
    /// page is kept.
    pub(crate) fn list_from(node: &XmlNode, name: &str) -> Vec<Self> {
        node.children_named(name)
            .filter_map(|child| {
                Self::from_node(child)
                    .inspect_err(|e| {
                        warn!(key = ?child.child_text("key"), error = %e, "skipping undecodable event");
                    })
                    .ok()
            })
            .collect()
    }
}

// ── Event description catalog ────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ElementDescription {
    pub key: String,
    pub label: String,
    pub summary: String,
}

impl ElementDescription {
    fn from_node(node: &XmlNode) -> Self {
        Self {
            key: text_of(node, "key"),
            label: text_of(node, "label"),
            summary: text_of(node, "summary"),
        }
    }
}

/// `EventDescriptionEventDetail`: static schema of one event type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventDetail {
    pub key: String,
    pub description: String,
    pub category: String,
    pub full_format: String,
    /// Raw `<EventLongDescription>` XML, when the endpoint provides one.
    pub long_description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnumDescription {
    pub key: String,
    pub tags: Vec<ElementDescription>,
}

/// `EventManager.description`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventDescription {
    pub category: Vec<ElementDescription>,
    pub event_info: Vec<EventDetail>,
    pub enumerated_types: Vec<EnumDescription>,
}

impl EventDescription {
    pub(crate) fn from_node(node: &XmlNode) -> Self {
        let category = node
            .children_named("category")
            .map(ElementDescription::from_node)
            .collect();
        let event_info = node
            .children_named("eventInfo")
            .map(|e| EventDetail {
                key: text_of(e, "key"),
                description: text_of(e, "description"),
                category: text_of(e, "category"),
                full_format: text_of(e, "fullFormat"),
                long_description: opt_text_of(e, "longDescription").filter(|s| !s.is_empty()),
            })
            .collect();
        let enumerated_types = node
            .children_named("enumeratedTypes")
            .map(|e| EnumDescription {
                key: text_of(e, "key"),
                tags: e
                    .children_named("tags")
                    .map(ElementDescription::from_node)
                    .collect(),
            })
            .collect();

        Self {
            category,
            event_info,
            enumerated_types,
        }
    }
}

// ── Localization & extensions ────────────────────────────────────────

/// `LocalizationManagerMessageCatalog`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocalizationCatalog {
    pub module_name: String,
    pub catalog_name: String,
    pub locale: String,
    pub catalog_uri: String,
    pub version: Option<String>,
}

impl LocalizationCatalog {
    pub(crate) fn from_node(node: &XmlNode) -> Self {
        Self {
            module_name: text_of(node, "moduleName"),
            catalog_name: text_of(node, "catalogName"),
            locale: text_of(node, "locale"),
            catalog_uri: text_of(node, "catalogUri"),
            version: opt_text_of(node, "version"),
        }
    }
}

/// An event type registered by an extension (`Extension.eventList`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionEvent {
    /// Extension key; doubles as the localization module name.
    pub module_name: String,
    pub event_id: String,
    pub event_type_schema: Option<String>,
}

impl ExtensionEvent {
    pub(crate) fn list_from_extension(node: &XmlNode) -> Vec<Self> {
        let module = text_of(node, "key");
        node.children_named("eventList")
            .map(|e| Self {
                module_name: module.clone(),
                event_id: text_of(e, "eventID"),
                event_type_schema: opt_text_of(e, "eventTypeSchema").filter(|s| !s.is_empty()),
            })
            .collect()
    }
}

// ── Property collector ───────────────────────────────────────────────

/// Summary of a `WaitForUpdatesEx` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSet {
    pub version: String,
    pub truncated: bool,
    pub filter_count: usize,
}

impl UpdateSet {
    pub(crate) fn from_node(node: &XmlNode) -> Self {
        Self {
            version: text_of(node, "version"),
            truncated: node.child_text("truncated") == Some("true"),
            filter_count: node.children_named("filterSet").count(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn event_node(xml: &str) -> XmlNode {
        XmlNode::parse(xml).unwrap()
    }

    #[test]
    fn decodes_typed_event_with_entities() {
        let node = event_node(
            r#"<returnval xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="VmPoweredOnEvent">
                 <key>42</key><chainId>41</chainId>
                 <createdTime>2024-06-15T10:30:00.123Z</createdTime>
                 <userName>VSPHERE.LOCAL\admin</userName>
                 <datacenter><name>DC1</name><datacenter type="Datacenter">datacenter-1</datacenter></datacenter>
                 <computeResource><name>Cluster</name></computeResource>
                 <host><name>esx01</name></host>
                 <vm><name>web01</name><vm type="VirtualMachine">vm-9</vm></vm>
                 <fullFormattedMessage>web01 on esx01 in DC1 is powered on</fullFormattedMessage>
               </returnval>"#,
        );

        let raw = RawEvent::from_node(&node).unwrap();
        assert_eq!(raw.header.key, 42);
        assert_eq!(raw.header.chain_id, 41);
        assert_eq!(raw.header.user_name, "VSPHERE.LOCAL\\admin");
        assert_eq!(raw.header.datacenter.as_deref(), Some("DC1"));
        assert_eq!(raw.header.compute_resource.as_deref(), Some("Cluster"));
        assert_eq!(raw.header.vm.as_deref(), Some("web01"));
        assert_eq!(raw.header.datastore, None);
        assert_eq!(
            raw.kind,
            EventKind::Typed {
                type_name: "VmPoweredOnEvent".into()
            }
        );
    }

    #[test]
    fn decodes_event_ex_severity() {
        let node = event_node(
            r#"<returnval xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="EventEx">
                 <key>7</key><createdTime>2024-06-15T10:30:00Z</createdTime>
                 <eventTypeId>com.vmware.vc.Test</eventTypeId><severity>warning</severity>
               </returnval>"#,
        );

        let raw = RawEvent::from_node(&node).unwrap();
        assert_eq!(
            raw.kind,
            EventKind::EventEx {
                event_type_id: "com.vmware.vc.Test".into(),
                severity: Some("warning".into()),
            }
        );
        assert_eq!(raw.header.user_name, "");
    }

    #[test]
    fn page_skips_undecodable_events() {
        let node = event_node(
            r#"<ReadNextEventsResponse>
                 <returnval><key>1</key><createdTime>2024-06-15T10:30:00Z</createdTime></returnval>
                 <returnval><key>2</key><createdTime>yesterday</createdTime></returnval>
                 <returnval><key>3</key><createdTime>2024-06-15T10:31:00Z</createdTime></returnval>
               </ReadNextEventsResponse>"#,
        );

        let keys: Vec<i32> = RawEvent::list_from(&node, "returnval")
            .iter()
            .map(|e| e.header.key)
            .collect();
        assert_eq!(keys, vec![1, 3]);
    }

    #[test]
    fn rejects_event_without_key() {
        let node = event_node("<returnval><createdTime>2024-06-15T10:30:00Z</createdTime></returnval>");
        assert!(RawEvent::from_node(&node).is_err());
    }
}
