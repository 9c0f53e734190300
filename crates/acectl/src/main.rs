mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::{CommandFactory, FromArgMatches};
use tracing_subscriber::EnvFilter;

use acectl_config::Config;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let matches = Cli::command().get_matches();
    let mut cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    init_tracing(&cli.global);

    let cfg = config::load_config_or_default();
    config::apply_display_defaults(&mut cli.global, &matches, &cfg.defaults);

    if let Err(err) = run(cli, &cfg).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `RUST_LOG` wins; otherwise `-q` and `-v` pick the level.
fn init_tracing(global: &GlobalOpts) {
    let level = match (global.quiet, global.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, cfg: &Config) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a host connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "acectl", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let controller_config = config::build_controller_config(&cli.global, cfg)?;

            tracing::debug!(command = ?cmd, url = %controller_config.url, "dispatching command");
            commands::dispatch(cmd, controller_config, &cfg.defaults, &cli.global).await
        }
    }
}
