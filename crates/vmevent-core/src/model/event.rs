// ── Normalized event ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One endpoint event in fixed shape, whatever its vim25 subtype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Issued by the endpoint in increasing order; the resume cursor.
    pub key: i32,
    pub created_time: DateTime<Utc>,
    pub user_name: String,
    pub full_formatted_message: String,
    pub severity: String,
    pub event_type_id: String,

    // Associated inventory objects (display names)
    pub compute_resource: Option<String>,
    pub datacenter: Option<String>,
    pub datastore: Option<String>,
    pub distributed_virtual_switch: Option<String>,
    pub host: Option<String>,
    pub network: Option<String>,
    pub vm: Option<String>,
}

impl Event {
    /// Inventory path of the objects this event concerns, e.g. `DC1/Cluster/esx01/web01`.
    ///
    /// The host is omitted when it is the compute resource itself (standalone host).
    pub fn target(&self) -> String {
        let host = self
            .host
            .as_deref()
            .filter(|h| self.compute_resource.as_deref() != Some(*h));

        [
            self.datacenter.as_deref(),
            self.distributed_virtual_switch.as_deref(),
            self.compute_resource.as_deref(),
            host,
            self.network.as_deref(),
            self.datastore.as_deref(),
            self.vm.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("/")
    }

    /// Compute resource name when it names a cluster rather than the host itself.
    pub fn cluster(&self) -> Option<&str> {
        self.compute_resource
            .as_deref()
            .filter(|c| self.host.as_deref() != Some(*c))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn event() -> Event {
        Event {
            key: 1,
            created_time: DateTime::from_timestamp(1_718_447_400, 0).unwrap(),
            user_name: String::new(),
            full_formatted_message: String::new(),
            severity: "info".into(),
            event_type_id: "VmPoweredOnEvent".into(),
            compute_resource: None,
            datacenter: None,
            datastore: None,
            distributed_virtual_switch: None,
            host: None,
            network: None,
            vm: None,
        }
    }

    #[test]
    fn target_joins_present_fields_in_order() {
        let e = Event {
            datacenter: Some("DC1".into()),
            compute_resource: Some("Cluster".into()),
            host: Some("esx01".into()),
            datastore: Some("ds1".into()),
            vm: Some("web01".into()),
            ..event()
        };
        assert_eq!(e.target(), "DC1/Cluster/esx01/ds1/web01");
        assert_eq!(e.cluster(), Some("Cluster"));
    }

    #[test]
    fn target_omits_host_equal_to_compute_resource() {
        let e = Event {
            datacenter: Some("DC1".into()),
            compute_resource: Some("esx01".into()),
            host: Some("esx01".into()),
            ..event()
        };
        assert_eq!(e.target(), "DC1/esx01");
        assert_eq!(e.cluster(), None);
    }

    #[test]
    fn target_includes_host_without_compute_resource() {
        let e = Event {
            host: Some("esx01".into()),
            network: Some("VM Network".into()),
            distributed_virtual_switch: Some("dvs".into()),
            ..event()
        };
        assert_eq!(e.target(), "dvs/esx01/VM Network");
    }

    #[test]
    fn target_empty_without_associations() {
        assert_eq!(event().target(), "");
    }
}
