mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use handylink_core::Handy;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands never touch the relay
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "handylink", &mut std::io::stdout());
            Ok(())
        }

        // Everything else pairs first
        cmd => {
            let cfg = config::load_config_or_default();
            let format = config::output_format(&cli.global, &cfg);
            let resolved = config::resolve(&cli.global, &cfg)?;

            let handy = Handy::new(resolved.session);
            let info = handy.pair(&resolved.connection_key).await?;
            tracing::debug!(fw = %info.fw_version, command = ?cmd, "paired, dispatching command");

            commands::dispatch(cmd, &handy, &info, format).await
        }
    }
}
