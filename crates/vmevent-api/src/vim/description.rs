// Static catalogs: event descriptions, localization catalogs, extensions.

use crate::error::Error;
use crate::vim::client::VimClient;
use crate::vim::models::{EventDescription, ExtensionEvent, LocalizationCatalog};

impl VimClient {
    /// `EventManager.description`: categories, event type details, enums.
    pub async fn event_description(&self) -> Result<EventDescription, Error> {
        let event_manager = self.event_manager()?.clone();
        let val = self
            .retrieve_property(&event_manager, "description")
            .await?;
        Ok(val
            .as_ref()
            .map(EventDescription::from_node)
            .unwrap_or_default())
    }

    /// `LocalizationManager.catalog`. Empty when the endpoint has no
    /// localization manager.
    pub async fn localization_catalogs(&self) -> Result<Vec<LocalizationCatalog>, Error> {
        let Some(manager) = self.service().localization_manager.clone() else {
            return Ok(Vec::new());
        };
        let val = self.retrieve_property(&manager, "catalog").await?;
        Ok(val
            .map(|v| {
                v.children
                    .iter()
                    .map(LocalizationCatalog::from_node)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Event types registered by extensions (`ExtensionManager.extensionList`).
    pub async fn extension_events(&self) -> Result<Vec<ExtensionEvent>, Error> {
        let Some(manager) = self.service().extension_manager.clone() else {
            return Ok(Vec::new());
        };
        let val = self.retrieve_property(&manager, "extensionList").await?;
        Ok(val
            .map(|v| {
                v.children
                    .iter()
                    .flat_map(ExtensionEvent::list_from_extension)
                    .collect()
            })
            .unwrap_or_default())
    }
}
