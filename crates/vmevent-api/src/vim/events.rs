// EventManager / EventHistoryCollector methods

use tracing::debug;

use crate::error::Error;
use crate::vim::client::VimClient;
use crate::vim::models::{ManagedObjectReference, RawEvent};
use crate::vim::soap::Request;

impl VimClient {
    pub(crate) fn event_manager(&self) -> Result<&ManagedObjectReference, Error> {
        self.service()
            .event_manager
            .as_ref()
            .ok_or_else(|| Error::missing("eventManager", "ServiceContent"))
    }

    /// Create a history collector with an empty filter (all events).
    ///
    /// `EventManager.CreateCollectorForEvents`
    pub async fn create_collector_for_events(&self) -> Result<ManagedObjectReference, Error> {
        let req = Request::new("CreateCollectorForEvents", self.event_manager()?).raw("<filter/>");
        let resp = self.call(req).await?;
        let collector = resp
            .child("returnval")
            .map(ManagedObjectReference::from_node)
            .ok_or_else(|| Error::missing("EventHistoryCollector", &resp.name))?;
        debug!(collector = %collector.value, "created event history collector");
        Ok(collector)
    }

    /// Set the size of the collector's `latestPage` window.
    ///
    /// `HistoryCollector.SetCollectorPageSize`
    pub async fn set_collector_page_size(
        &self,
        collector: &ManagedObjectReference,
        max_count: i32,
    ) -> Result<(), Error> {
        let req = Request::new("SetCollectorPageSize", collector)
            .text("maxCount", &max_count.to_string());
        self.call(req).await?;
        Ok(())
    }

    /// Read up to `max_count` events after the collector's current position.
    ///
    /// An empty vector means the cursor is at the end of history.
    /// `EventHistoryCollector.ReadNextEvents`
    pub async fn read_next_events(
        &self,
        collector: &ManagedObjectReference,
        max_count: i32,
    ) -> Result<Vec<RawEvent>, Error> {
        let req =
            Request::new("ReadNextEvents", collector).text("maxCount", &max_count.to_string());
        let resp = self.call(req).await?;
        let events = RawEvent::list_from(&resp, "returnval");
        debug!(count = events.len(), "read next events");
        Ok(events)
    }

    /// The collector's `latestPage` property (most recent events, newest first).
    pub async fn latest_page(
        &self,
        collector: &ManagedObjectReference,
    ) -> Result<Vec<RawEvent>, Error> {
        match self.retrieve_property(collector, "latestPage").await? {
            Some(val) => Ok(RawEvent::list_from(&val, "Event")),
            None => Ok(Vec::new()),
        }
    }

    /// `HistoryCollector.DestroyCollector`
    pub async fn destroy_collector(&self, collector: &ManagedObjectReference) -> Result<(), Error> {
        debug!(collector = %collector.value, "destroying event history collector");
        self.call(Request::new("DestroyCollector", collector))
            .await?;
        Ok(())
    }
}
