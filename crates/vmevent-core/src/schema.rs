// ── Category / schema lookup ──
//
// Read-only queries over the endpoint's event description catalog and its
// extension registry. Used by the CLI; the streaming path needs only the
// raw `EventDescription`.

use tracing::warn;

use vmevent_api::xml::XmlNode;
use vmevent_api::{EventDescription, ExtensionEvent, LocalizationCatalog};

use crate::convert::normalize_page;
use crate::endpoint::{CatalogSource, EndpointSession};
use crate::error::CoreError;
use crate::localization::LocalizationCache;
use crate::model::{EnumeratedType, Event, EventCause, EventInfo, EventLongDescription};

const DEFAULT_CATEGORY: &str = "info";

/// Labels of the registered severity categories.
pub async fn categories(session: &dyn EndpointSession) -> Result<Vec<String>, CoreError> {
    let description = session.event_description().await?;
    Ok(description.category.into_iter().map(|c| c.label).collect())
}

/// Enumerations referenced by event arguments.
pub async fn enumerated_types(
    session: &dyn EndpointSession,
) -> Result<Vec<EnumeratedType>, CoreError> {
    let description = session.event_description().await?;
    Ok(description
        .enumerated_types
        .into_iter()
        .map(|e| EnumeratedType {
            key: e.key,
            labels: e.tags.into_iter().map(|t| t.label).collect(),
        })
        .collect())
}

/// Every known event type: built-in ones, then those registered by extensions.
pub async fn event_info(
    session: &dyn EndpointSession,
    cache: &LocalizationCache,
) -> Result<Vec<EventInfo>, CoreError> {
    let description = session.event_description().await?;
    let mut infos = builtin_event_info(&description);

    let extensions = session.extension_events().await?;
    if !extensions.is_empty() {
        let catalogs = session.localization_catalogs().await?;
        let source = session.catalog_source();
        for ext in &extensions {
            let category = extension_category(
                cache,
                &catalogs,
                source.as_ref(),
                session.locale(),
                ext,
            )
            .await;
            infos.push(EventInfo {
                key: ext.event_id.clone(),
                description: ext
                    .event_type_schema
                    .as_deref()
                    .map(extension_description)
                    .unwrap_or_default(),
                category,
                long_description: EventLongDescription::default(),
            });
        }
    }

    Ok(infos)
}

/// The most recent page of events, oldest first.
pub async fn latest_events(session: &dyn EndpointSession) -> Result<Vec<Event>, CoreError> {
    let description = session.event_description().await?;
    let cursor = session.create_cursor().await?;
    let page = cursor.read_latest_page().await;
    if let Err(e) = cursor.destroy().await {
        warn!(error = %e, "failed to destroy event history collector");
    }
    Ok(normalize_page(page?, &description))
}

fn builtin_event_info(description: &EventDescription) -> Vec<EventInfo> {
    description
        .event_info
        .iter()
        .map(|detail| {
            let long_description = match detail.long_description.as_deref() {
                Some(xml) => parse_long_description(xml).unwrap_or_else(|e| {
                    warn!(error = %e, key = %detail.key, "could not parse long description");
                    EventLongDescription::default()
                }),
                None => EventLongDescription::default(),
            };
            EventInfo {
                key: detail.key.clone(),
                description: detail.description.clone(),
                category: detail.category.clone(),
                long_description,
            }
        })
        .collect()
}

/// Category of an extension event from its `<eventID>.category` catalog entry.
async fn extension_category(
    cache: &LocalizationCache,
    catalogs: &[LocalizationCatalog],
    source: &dyn CatalogSource,
    locale: &str,
    ext: &ExtensionEvent,
) -> String {
    let key = format!("{}.category", ext.event_id);
    match cache
        .lookup(catalogs, source, locale, &ext.module_name, &key)
        .await
    {
        Ok(Some(category)) => category,
        Ok(None) => DEFAULT_CATEGORY.to_owned(),
        Err(e) => {
            warn!(error = %e, module = %ext.module_name, key, "catalog lookup failed");
            DEFAULT_CATEGORY.to_owned()
        }
    }
}

fn extension_description(schema: &str) -> String {
    match XmlNode::parse(schema) {
        Ok(node) => node.child_text("description").unwrap_or_default().to_owned(),
        Err(e) => {
            warn!(error = %e, schema, "could not parse event type schema");
            String::new()
        }
    }
}

/// Decode an `<EventLongDescription>` document.
pub fn parse_long_description(xml: &str) -> Result<EventLongDescription, CoreError> {
    let node = XmlNode::parse(xml)?;
    Ok(EventLongDescription {
        description: node.child_text("description").unwrap_or_default().to_owned(),
        causes: node
            .children_named("cause")
            .map(|cause| EventCause {
                description: cause.child_text("description").unwrap_or_default().to_owned(),
                actions: cause
                    .children_named("action")
                    .map(|a| a.text.clone())
                    .collect(),
            })
            .collect(),
    })
}
