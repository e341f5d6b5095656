//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod catalog;
pub mod event;
pub mod loki;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vmevent_core::{CoreError, EndpointSession, SessionGateway, VsphereGateway};

use crate::cli::{Command, GlobalOpts};
use crate::config::{self, Settings};
use crate::error::CliError;

/// Dispatch an endpoint-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    settings: &Settings,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Category => catalog::categories(settings, global).await,
        Command::Enumerated => catalog::enumerated(settings, global).await,
        Command::Info => catalog::info(settings, global).await,
        Command::Event => event::latest(settings, global).await,
        Command::Wait(args) => event::wait(&args, settings, global).await,
        Command::Loki(args) => loki::handle(args.command, settings).await,
        // Completions are handled before dispatch
        Command::Completions(_) => Ok(()),
    }
}

/// Log in to the configured endpoint.
async fn connect(settings: &Settings) -> Result<Box<dyn EndpointSession>, CliError> {
    let gateway = VsphereGateway::new(config::endpoint_config(settings)?);
    Ok(gateway.login().await?)
}

/// Log out, keeping the outcome of the operation that ran on the session.
async fn disconnect<T>(
    session: &dyn EndpointSession,
    result: Result<T, CoreError>,
) -> Result<T, CliError> {
    if let Err(e) = session.logout().await {
        warn!(error = %e, "logout failed (non-fatal)");
    }
    Ok(result?)
}

/// Cancelled on the first SIGINT (or SIGTERM on unix).
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.cancel();
    });
    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    let ctrl_c = signal::ctrl_c();
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => info!("received SIGINT, shutting down"),
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            }
        }
        Err(e) => {
            warn!(error = %e, "could not install SIGTERM handler");
            if ctrl_c.await.is_ok() {
                info!("received SIGINT, shutting down");
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if signal::ctrl_c().await.is_ok() {
        info!("received Ctrl-C, shutting down");
    }
}
