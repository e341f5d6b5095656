// ── Raw → domain conversion ──
//
// Normalizes polymorphic vim25 events into `Event`. Pure functions over
// the event description catalog; no I/O, no failure modes.

use vmevent_api::{EventDescription, EventKind, RawEvent};

use crate::model::Event;

const DEFAULT_SEVERITY: &str = "info";

/// Synthetic type identifier: the explicit `eventTypeId` for `EventEx` and
/// `ExtendedEvent`, otherwise the concrete subtype name.
pub fn event_type_id(kind: &EventKind) -> &str {
    match kind {
        EventKind::EventEx { event_type_id, .. } | EventKind::Extended { event_type_id } => {
            event_type_id
        }
        EventKind::Typed { type_name } => type_name,
    }
}

/// Severity for an event.
///
/// An explicit `EventEx` severity wins. Otherwise the event type's category is
/// used when it is itself a registered category key; anything else is `info`.
pub fn severity(kind: &EventKind, catalog: &EventDescription) -> String {
    if let EventKind::EventEx {
        severity: Some(severity),
        ..
    } = kind
    {
        if !severity.is_empty() {
            return severity.clone();
        }
    }

    let type_id = event_type_id(kind);
    catalog
        .event_info
        .iter()
        .find(|info| {
            info.key == type_id && catalog.category.iter().any(|c| c.key == info.category)
        })
        .map_or_else(|| DEFAULT_SEVERITY.to_owned(), |info| info.category.clone())
}

/// Convert one raw event.
pub fn normalize(raw: RawEvent, catalog: &EventDescription) -> Event {
    let severity = severity(&raw.kind, catalog);
    let event_type_id = event_type_id(&raw.kind).to_owned();
    let h = raw.header;

    Event {
        key: h.key,
        created_time: h.created_time,
        user_name: h.user_name,
        full_formatted_message: h.full_formatted_message,
        severity,
        event_type_id,
        compute_resource: h.compute_resource,
        datacenter: h.datacenter,
        datastore: h.datastore,
        distributed_virtual_switch: h.distributed_virtual_switch,
        host: h.host,
        network: h.network,
        vm: h.vm,
    }
}

/// Convert a page of raw events, ordered oldest first.
///
/// The sort is stable, so events sharing a timestamp keep endpoint order.
pub fn normalize_page(raw: Vec<RawEvent>, catalog: &EventDescription) -> Vec<Event> {
    let mut events: Vec<Event> = raw.into_iter().map(|r| normalize(r, catalog)).collect();
    events.sort_by_key(|e| e.created_time);
    events
}
