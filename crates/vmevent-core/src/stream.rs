// ── Event stream engine ──
//
// Catch-up then subscribe: drain the history cursor once, then block on
// change notification for `EventManager.latestEvent` and read whatever the
// same cursor yields after each change. Batches go out on a bounded channel
// in creation order. The channel closes when the engine stops, whatever the
// reason; the caller learns the reason from the join handle.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vmevent_api::EventDescription;

use crate::convert::normalize_page;
use crate::endpoint::{ChangeWatcher, EndpointSession, HistoryCursor, SessionGateway};
use crate::error::CoreError;
use crate::model::Event;

/// Page size for every cursor read.
pub const MAX_EVENT_COUNT: i32 = 1000;

/// One batch in flight at a time; the producer waits for the consumer.
const BATCH_CHANNEL_SIZE: usize = 1;

// ── StreamState ──────────────────────────────────────────────────

/// Engine lifecycle, observable via [`EventStream::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Logging in and opening the history cursor.
    Init,
    /// Reading the existing backlog.
    Draining,
    /// Blocked on change notification.
    Watching,
    /// Stopped; the output channel is closed.
    Closed,
}

#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Key of the last event already delivered. `0` skips the backlog.
    pub resume_key: i32,
    /// Stop after this many seconds without a change. `None` tails forever.
    pub max_wait_secs: Option<i32>,
}

// ── Resume filtering ─────────────────────────────────────────────

/// Where the drain is relative to the resume key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePosition {
    /// Resume key `0`: the whole backlog is dropped.
    Discard,
    /// Still looking for this key; pages are suppressed until it shows up.
    Seeking(i32),
    /// Key seen; everything from here on is new.
    Found,
}

impl ResumePosition {
    pub fn new(resume_key: i32) -> Self {
        if resume_key == 0 {
            Self::Discard
        } else {
            Self::Seeking(resume_key)
        }
    }

    /// Filter one drained page, advancing the position.
    pub fn filter(&mut self, page: Vec<Event>) -> Vec<Event> {
        match *self {
            Self::Discard => Vec::new(),
            Self::Found => page,
            Self::Seeking(key) => match filter_after_key(page, key) {
                Some(rest) => {
                    *self = Self::Found;
                    rest
                }
                None => Vec::new(),
            },
        }
    }
}

/// Events strictly after the one with `key`, or `None` if `key` is absent.
pub fn filter_after_key(mut events: Vec<Event>, key: i32) -> Option<Vec<Event>> {
    let idx = events.iter().position(|e| e.key == key)?;
    Some(events.split_off(idx + 1))
}

// ── EventStream ──────────────────────────────────────────────────

/// One run of the engine against one endpoint session.
pub struct EventStream {
    gateway: Arc<dyn SessionGateway>,
    options: StreamOptions,
    state: watch::Sender<StreamState>,
}

impl EventStream {
    pub fn new(gateway: Arc<dyn SessionGateway>, options: StreamOptions) -> Self {
        let (state, _) = watch::channel(StreamState::Init);
        Self {
            gateway,
            options,
            state,
        }
    }

    /// Subscribe to lifecycle changes.
    pub fn state(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    /// Run the engine on a new task.
    ///
    /// The receiver yields batches until the engine stops; the handle
    /// carries the reason (`Ok` for a clean end of a bounded wait).
    pub fn spawn(
        self,
        cancel: CancellationToken,
    ) -> (
        mpsc::Receiver<Vec<Event>>,
        JoinHandle<Result<(), CoreError>>,
    ) {
        let (tx, rx) = mpsc::channel(BATCH_CHANNEL_SIZE);
        let handle = tokio::spawn(async move { self.run(tx, cancel).await });
        (rx, handle)
    }

    /// Run the engine on the current task until it stops.
    ///
    /// `tx` is dropped on return, which closes the consumer's channel.
    pub async fn run(
        &self,
        tx: mpsc::Sender<Vec<Event>>,
        cancel: CancellationToken,
    ) -> Result<(), CoreError> {
        let result = self.run_session(&tx, &cancel).await;
        self.set_state(StreamState::Closed);
        match &result {
            Ok(()) => debug!("event stream finished"),
            Err(e) => debug!(error = %e, "event stream stopped"),
        }
        result
    }

    fn set_state(&self, state: StreamState) {
        self.state.send_replace(state);
    }

    async fn run_session(
        &self,
        tx: &mpsc::Sender<Vec<Event>>,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        self.set_state(StreamState::Init);
        let session = cancellable(cancel, self.gateway.login()).await?;

        let result = self.run_cursor(session.as_ref(), tx, cancel).await;

        if let Err(e) = session.logout().await {
            warn!(error = %e, "logout failed (non-fatal)");
        }
        result
    }

    async fn run_cursor(
        &self,
        session: &dyn EndpointSession,
        tx: &mpsc::Sender<Vec<Event>>,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        let catalog = cancellable(cancel, session.event_description()).await?;
        let cursor = cancellable(cancel, session.create_cursor()).await?;

        let result = self
            .drain_and_watch(session, cursor.as_ref(), &catalog, tx, cancel)
            .await;

        if let Err(e) = cursor.destroy().await {
            warn!(error = %e, "failed to destroy event history collector");
        }
        result
    }

    async fn drain_and_watch(
        &self,
        session: &dyn EndpointSession,
        cursor: &dyn HistoryCursor,
        catalog: &EventDescription,
        tx: &mpsc::Sender<Vec<Event>>,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        cancellable(cancel, cursor.set_page_size(MAX_EVENT_COUNT)).await?;

        self.set_state(StreamState::Draining);
        if !self.drain(cursor, catalog, tx, cancel).await? {
            debug!("consumer gone during drain");
            return Ok(());
        }

        let mut watcher = cancellable(cancel, session.create_watcher()).await?;
        self.set_state(StreamState::Watching);
        info!(max_wait_secs = ?self.options.max_wait_secs, "watching for new events");

        let result = self
            .watch(watcher.as_mut(), cursor, catalog, tx, cancel)
            .await;

        if let Err(e) = watcher.destroy().await {
            warn!(error = %e, "failed to destroy property filter/collector");
        }
        result
    }

    /// Read the backlog until an empty page. Returns `false` if the
    /// consumer went away.
    async fn drain(
        &self,
        cursor: &dyn HistoryCursor,
        catalog: &EventDescription,
        tx: &mpsc::Sender<Vec<Event>>,
        cancel: &CancellationToken,
    ) -> Result<bool, CoreError> {
        let mut position = ResumePosition::new(self.options.resume_key);
        let mut drained = 0usize;

        loop {
            let raw = cancellable(cancel, cursor.read_next_page(MAX_EVENT_COUNT)).await?;
            if raw.is_empty() {
                break;
            }
            drained += raw.len();

            let batch = position.filter(normalize_page(raw, catalog));
            if !batch.is_empty() && !send(tx, batch, cancel).await? {
                return Ok(false);
            }
        }

        if let ResumePosition::Seeking(key) = position {
            warn!(
                resume_key = key,
                drained, "resume key not found in backlog; backlog skipped"
            );
        } else {
            debug!(drained, ?position, "backlog drained");
        }
        Ok(true)
    }

    async fn watch(
        &self,
        watcher: &mut dyn ChangeWatcher,
        cursor: &dyn HistoryCursor,
        catalog: &EventDescription,
        tx: &mpsc::Sender<Vec<Event>>,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        loop {
            let changed = cancellable(
                cancel,
                watcher.wait_for_update(self.options.max_wait_secs),
            )
            .await?;
            if !changed {
                debug!("max wait elapsed without new events");
                return Ok(());
            }

            match cancellable(cancel, cursor.read_next_page(MAX_EVENT_COUNT)).await {
                Ok(raw) => {
                    if !raw.is_empty() && !send(tx, normalize_page(raw, catalog), cancel).await? {
                        debug!("consumer gone while watching");
                        return Ok(());
                    }
                }
                Err(CoreError::Cancelled) => return Err(CoreError::Cancelled),
                Err(e) => warn!(error = %e, "failed to read new events; waiting for next update"),
            }
        }
    }
}

/// Send a batch; `Ok(false)` when the receiver has been dropped.
async fn send(
    tx: &mpsc::Sender<Vec<Event>>,
    batch: Vec<Event>,
    cancel: &CancellationToken,
) -> Result<bool, CoreError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CoreError::Cancelled),
        sent = tx.send(batch) => Ok(sent.is_ok()),
    }
}

/// Race `fut` against cancellation.
async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, CoreError>
where
    F: Future<Output = Result<T, CoreError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CoreError::Cancelled),
        result = fut => result,
    }
}
