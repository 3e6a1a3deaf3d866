// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! ece-adm: platform administration CLI

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::AllocatorCommand;
use config::ConnectionArgs;

#[derive(Parser)]
#[command(name = "ece-adm", version, about = "Platform administration CLI")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocator operations
    Allocator {
        #[command(subcommand)]
        action: AllocatorCommand,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "ece_adm=debug,allocator_vacate=debug,ece_platform_client=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Progress lines go to stdout; logs stay on stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Allocator { action } => action.run(&cli.connection).await,
    }
}
