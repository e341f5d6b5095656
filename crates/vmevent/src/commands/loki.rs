//! Loki commands: `loki test` and `loki collect`.

use std::sync::Arc;

use tracing::info;

use vmevent_core::{
    Forwarder, ForwarderOptions, LokiClient, PushClient, PushMessage, VsphereGateway,
};

use crate::cli::LokiCommand;
use crate::config::{self, Settings};
use crate::error::CliError;

use super::shutdown_token;

pub async fn handle(cmd: LokiCommand, settings: &Settings) -> Result<(), CliError> {
    match cmd {
        LokiCommand::Test { message } => test(&message, settings).await,
        LokiCommand::Collect { after } => collect(after, settings).await,
    }
}

async fn test(message: &str, settings: &Settings) -> Result<(), CliError> {
    let loki = config::loki_config(settings)?;
    let client = LokiClient::new(&loki)?;

    client
        .push(&PushMessage::test_line(message, &loki.service_name))
        .await?;
    info!(url = %loki.url, "test message pushed");
    Ok(())
}

/// Run the forwarder until SIGINT/SIGTERM. Endpoint and push failures are
/// retried inside the loop; only configuration errors end it early.
async fn collect(after: i32, settings: &Settings) -> Result<(), CliError> {
    let endpoint = config::endpoint_config(settings)?;
    let loki = config::loki_config(settings)?;
    let client = LokiClient::new(&loki)?;

    info!(
        endpoint = %endpoint.url,
        loki = %loki.url,
        service_name = %loki.service_name,
        after,
        "starting collector"
    );

    let mut forwarder = Forwarder::new(
        Arc::new(VsphereGateway::new(endpoint)),
        Arc::new(client),
        ForwarderOptions {
            service_name: loki.service_name,
            start_key: after,
            ..ForwarderOptions::default()
        },
    );
    forwarder.run(shutdown_token()).await;
    Ok(())
}
