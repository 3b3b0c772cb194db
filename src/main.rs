//! Mailforge - asset and export backend for an email-template studio.

#![allow(dead_code)]

mod cli;
mod config;
mod error;
mod export;
mod logger;
mod mail;
mod server;
mod store;
mod upload;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::StudioConfig;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = Arc::new(StudioConfig::load(cli)?);

    match &cli.command {
        Commands::Serve { .. } => server::serve(config).await,
        Commands::Check { .. } => cli::check::run(&config).await,
    }
}
