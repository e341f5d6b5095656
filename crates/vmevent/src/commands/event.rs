//! Event commands: `event` (latest page) and `wait` (tail new events).

use std::sync::Arc;

use tracing::{debug, info};

use vmevent_core::schema;
use vmevent_core::{CoreError, EventStream, StreamOptions, VsphereGateway};

use crate::cli::{GlobalOpts, WaitArgs};
use crate::config::{self, Settings};
use crate::error::CliError;
use crate::output;

use super::{connect, disconnect, shutdown_token};

pub async fn latest(settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let session = connect(settings).await?;
    let result = schema::latest_events(session.as_ref()).await;
    let events = disconnect(session.as_ref(), result).await?;

    let out = output::render_events(global.output, &events)?;
    output::print_output(&out)
}

/// Stream events until `--wait-timeout` seconds pass without a new one, or
/// until interrupted.
pub async fn wait(args: &WaitArgs, settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let gateway = VsphereGateway::new(config::endpoint_config(settings)?);
    let stream = EventStream::new(
        Arc::new(gateway),
        StreamOptions {
            resume_key: args.after,
            max_wait_secs: Some(args.wait_timeout),
        },
    );

    let (mut batches, handle) = stream.spawn(shutdown_token());

    let mut printed = 0usize;
    while let Some(batch) = batches.recv().await {
        printed += batch.len();
        let out = output::render_event_batch(global.output, &batch)?;
        output::print_output(&out)?;
    }

    let result = handle
        .await
        .map_err(|e| CliError::Internal(format!("event stream task failed: {e}")))?;
    match result {
        Ok(()) => {
            debug!(printed, "no new events within wait timeout");
            Ok(())
        }
        Err(CoreError::Cancelled) => {
            info!(printed, "interrupted");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
