mod backend;
mod cli;
mod commands;
mod config;
mod errors;
mod form;
mod ipc;
mod panel;
mod settings;
mod status;
mod ui;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // The dashboard owns the terminal; only log there when RUST_LOG asks for it.
    let default_level = if matches!(cli.command, Commands::Ui { .. }) {
        "off"
    } else {
        "info"
    };
    init_tracing(default_level);

    let config = AppConfig::load()?;

    commands::run(cli.command, &config).await
}

fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
