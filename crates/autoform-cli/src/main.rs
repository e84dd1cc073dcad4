//! CLI entrypoint for autoform.

mod cli;
mod commands;
mod style;

use autoform_runtime::config::UiConfig;
use clap::Parser;

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    if let Err(err) = run() {
        eprintln!("{}", style::failure(&format!("Error: {err:#}")));
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = match &cli.config {
        Some(path) => UiConfig::load(path)?,
        None => UiConfig::default(),
    };
    match cli.command {
        Command::Fields { schema } => commands::run_fields(&schema),
        Command::Defaults { schema } => commands::run_defaults(&schema),
        Command::Validate { schema, value } => commands::run_validate(&schema, &value),
        Command::Grid {
            schema,
            field,
            data,
            transpose,
            order,
        } => commands::run_grid(
            &config,
            &commands::GridArgs {
                schema,
                field,
                data,
                transpose,
                order,
            },
        ),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}
