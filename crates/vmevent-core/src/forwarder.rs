// ── Forwarder loop ──
//
// Supervises the event stream engine: run it, push every batch to the log
// backend, and when it stops for any reason wait a fixed interval and start
// a fresh engine resuming after the last key seen. Runs until cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_SERVICE_NAME;
use crate::endpoint::SessionGateway;
use crate::error::CoreError;
use crate::loki::{PushClient, PushMessage};
use crate::model::Event;
use crate::stream::{EventStream, StreamOptions};

/// Pause between engine restarts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct ForwarderOptions {
    /// `service_name` label on every pushed stream.
    pub service_name: String,
    pub retry_interval: Duration,
    /// Resume key for the first engine run; `0` skips the backlog.
    pub start_key: i32,
}

impl Default for ForwarderOptions {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.into(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            start_key: 0,
        }
    }
}

/// Long-running endpoint → log backend pipeline.
pub struct Forwarder {
    gateway: Arc<dyn SessionGateway>,
    push: Arc<dyn PushClient>,
    options: ForwarderOptions,
    last_key: i32,
}

impl Forwarder {
    pub fn new(
        gateway: Arc<dyn SessionGateway>,
        push: Arc<dyn PushClient>,
        options: ForwarderOptions,
    ) -> Self {
        let last_key = options.start_key;
        Self {
            gateway,
            push,
            options,
            last_key,
        }
    }

    /// Key of the last event handed to the backend (the start key before
    /// the first).
    pub fn last_key(&self) -> i32 {
        self.last_key
    }

    /// Run until `cancel` fires. Endpoint and delivery failures are logged
    /// and retried; they never end the loop.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(service_name = %self.options.service_name, "forwarder started");
        let mut attempt: u32 = 0;

        while !cancel.is_cancelled() {
            attempt += 1;
            debug!(attempt, resume_key = self.last_key, "starting event stream");

            let stream = EventStream::new(
                Arc::clone(&self.gateway),
                StreamOptions {
                    resume_key: self.last_key,
                    max_wait_secs: None,
                },
            );
            let (mut batches, handle) = stream.spawn(cancel.child_token());

            while let Some(batch) = batches.recv().await {
                self.deliver(&batch).await;
            }

            match handle.await {
                Ok(Ok(())) => debug!("event stream ended"),
                Ok(Err(CoreError::Cancelled)) => {}
                Ok(Err(e)) => warn!(error = %e, "event stream failed"),
                Err(e) => warn!(error = %e, "event stream task aborted"),
            }

            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(self.options.retry_interval) => {}
            }
        }

        info!(last_key = self.last_key, "forwarder stopped");
    }

    /// Push one batch. At most once: a failed push is logged and dropped.
    async fn deliver(&mut self, batch: &[Event]) {
        let Some(last) = batch.last() else {
            return;
        };
        self.last_key = last.key;

        let message = PushMessage::from_events(batch, &self.options.service_name);
        match self.push.push(&message).await {
            Ok(()) => debug!(count = batch.len(), last_key = last.key, "pushed events"),
            Err(e) => warn!(
                error = %e,
                count = batch.len(),
                last_key = last.key,
                "failed to push events"
            ),
        }
    }
}
