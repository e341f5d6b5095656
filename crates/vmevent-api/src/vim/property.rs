// PropertyCollector methods
//
// Used two ways: one-shot reads via `RetrievePropertiesEx` on the default
// collector, and change notification via a dedicated collector + filter
// blocked on `WaitForUpdatesEx`.

use std::time::Duration;

use tracing::debug;

use crate::error::Error;
use crate::vim::client::VimClient;
use crate::vim::models::{ManagedObjectReference, UpdateSet};
use crate::vim::soap::{self, Request};
use crate::xml::XmlNode;

fn property_spec(obj: &ManagedObjectReference, path: &str) -> String {
    format!(
        "<propSet>{}<all>false</all>{}</propSet><objectSet>{}<skip>false</skip></objectSet>",
        soap::text("type", &obj.kind),
        soap::text("pathSet", path),
        soap::moref("obj", obj),
    )
}

impl VimClient {
    /// Read a single property of a managed object.
    ///
    /// Returns the `<val>` node, or `None` when the property is unset.
    /// `PropertyCollector.RetrievePropertiesEx`
    pub async fn retrieve_property(
        &self,
        obj: &ManagedObjectReference,
        path: &str,
    ) -> Result<Option<XmlNode>, Error> {
        debug!(obj = %obj.value, path, "retrieving property");
        let spec = format!("<specSet>{}</specSet><options/>", property_spec(obj, path));
        let req = Request::new("RetrievePropertiesEx", &self.service().property_collector)
            .raw(&spec);
        let resp = self.call(req).await?;

        let val = resp
            .child("returnval")
            .into_iter()
            .flat_map(|r| r.children_named("objects"))
            .flat_map(|o| o.children_named("propSet"))
            .find(|p| p.child_text("name") == Some(path))
            .and_then(|p| p.child("val"))
            .cloned();
        Ok(val)
    }

    /// Create a private property collector for change notification.
    ///
    /// `PropertyCollector.CreatePropertyCollector`
    pub async fn create_property_collector(&self) -> Result<ManagedObjectReference, Error> {
        let req = Request::new("CreatePropertyCollector", &self.service().property_collector);
        let resp = self.call(req).await?;
        let collector = resp
            .child("returnval")
            .map(ManagedObjectReference::from_node)
            .ok_or_else(|| Error::missing("PropertyCollector", &resp.name))?;
        debug!(collector = %collector.value, "created property collector");
        Ok(collector)
    }

    /// Register interest in `path` of `obj` on `collector`.
    ///
    /// `PropertyCollector.CreateFilter`
    pub async fn create_filter(
        &self,
        collector: &ManagedObjectReference,
        obj: &ManagedObjectReference,
        path: &str,
    ) -> Result<ManagedObjectReference, Error> {
        let spec = format!(
            "<spec>{}</spec><partialUpdates>false</partialUpdates>",
            property_spec(obj, path)
        );
        let resp = self
            .call(Request::new("CreateFilter", collector).raw(&spec))
            .await?;
        let filter = resp
            .child("returnval")
            .map(ManagedObjectReference::from_node)
            .ok_or_else(|| Error::missing("PropertyFilter", &resp.name))?;
        debug!(filter = %filter.value, path, "created property filter");
        Ok(filter)
    }

    /// Filter on `EventManager.latestEvent`, the notification source for new events.
    pub async fn create_latest_event_filter(
        &self,
        collector: &ManagedObjectReference,
    ) -> Result<ManagedObjectReference, Error> {
        let event_manager = self.event_manager()?.clone();
        self.create_filter(collector, &event_manager, "latestEvent")
            .await
    }

    /// Block until the filters on `collector` report a change.
    ///
    /// `version` is the value from the previous update set (empty initially).
    /// With `max_wait_secs` set the call returns `None` once that long has
    /// passed without a change; without it the call blocks indefinitely and
    /// the HTTP request carries no timeout.
    /// `PropertyCollector.WaitForUpdatesEx`
    pub async fn wait_for_updates(
        &self,
        collector: &ManagedObjectReference,
        version: &str,
        max_wait_secs: Option<i32>,
        max_object_updates: i32,
    ) -> Result<Option<UpdateSet>, Error> {
        let mut options = String::from("<options>");
        if let Some(wait) = max_wait_secs {
            options.push_str(&soap::text("maxWaitSeconds", &wait.to_string()));
        }
        options.push_str(&soap::text(
            "maxObjectUpdates",
            &max_object_updates.to_string(),
        ));
        options.push_str("</options>");

        let req = Request::new("WaitForUpdatesEx", collector)
            .text("version", version)
            .raw(&options);

        let timeout = max_wait_secs
            .map(|w| Duration::from_secs(u64::try_from(w).unwrap_or(0)) + self.timeout());
        let resp = self.call_with_timeout(req, timeout).await?;

        let update = resp.child("returnval").map(UpdateSet::from_node);
        debug!(
            collector = %collector.value,
            version = update.as_ref().map_or("", |u| u.version.as_str()),
            "wait for updates returned"
        );
        Ok(update)
    }

    /// `PropertyFilter.DestroyPropertyFilter`
    pub async fn destroy_property_filter(
        &self,
        filter: &ManagedObjectReference,
    ) -> Result<(), Error> {
        debug!(filter = %filter.value, "destroying property filter");
        self.call(Request::new("DestroyPropertyFilter", filter))
            .await?;
        Ok(())
    }

    /// `PropertyCollector.DestroyPropertyCollector`
    pub async fn destroy_property_collector(
        &self,
        collector: &ManagedObjectReference,
    ) -> Result<(), Error> {
        debug!(collector = %collector.value, "destroying property collector");
        self.call(Request::new("DestroyPropertyCollector", collector))
            .await?;
        Ok(())
    }
}
