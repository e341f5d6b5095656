mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(level.to_lowercase()))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    // Shell completions need no settings
    if let Command::Completions(args) = &cli.command {
        use clap::CommandFactory;
        use clap_complete::generate;

        let mut cmd = Cli::command();
        generate(args.shell, &mut cmd, "vmevent", &mut std::io::stdout());
        return Ok(());
    }

    let loki_opts = match &cli.command {
        Command::Loki(args) => Some(&args.opts),
        _ => None,
    };
    let settings = config::load_settings(&cli.global, loki_opts)?;
    init_tracing(&settings.log_level);

    tracing::debug!(command = ?cli.command, url = %settings.url, "dispatching command");
    commands::dispatch(cli.command, &settings, &cli.global).await
}
