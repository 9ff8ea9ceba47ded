// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Labelwerk — ZPL label printer emulator and relay.
//
// Entry point. Initialises logging, loads the configuration, builds the print
// pipeline, and runs the requested command.
//
//   labelwerk                         start the listener if auto_start_server is set
//   labelwerk serve                   start the listener until Ctrl-C
//   labelwerk print <file>            dispatch a ZPL file once
//   labelwerk status                  check whether a listener is accepting
//   labelwerk --write-default-config  write defaults to the config path

mod services;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use labelwerk_core::AppConfig;
use labelwerk_print::probe_listener;

use services::app_services::AppServices;
use services::data_dir;

#[derive(Parser, Debug)]
#[command(name = "labelwerk", version, about = "ZPL label printer emulator and relay")]
struct Cli {
    /// Path to the JSON configuration file (default: data dir config.json).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listening port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Write the default configuration to the config path and exit.
    #[arg(long)]
    write_default_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Run the label listener until interrupted.
    Serve,
    /// Route the labels in a ZPL file using the configured print mode.
    Print { file: PathBuf },
    /// Report whether a listener is accepting on the configured port.
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(data_dir::config_path);

    if cli.write_default_config {
        AppConfig::default().save(&config_path)?;
        println!("{}", config_path.display());
        return Ok(());
    }

    let mut config = AppConfig::load_or_default(&config_path);
    if let Some(port) = cli.port {
        config.server_port = port;
    }

    info!(config = %config_path.display(), "Labelwerk starting");

    match cli.command {
        Some(Command::Serve) => serve(config).await?,
        Some(Command::Print { file }) => {
            let services = AppServices::init(config)?;
            services.print_file(&file).await?;
        }
        Some(Command::Status) => {
            let up = probe_listener(&config.bind_host, config.server_port).await;
            let state = if up { "running" } else { "not running" };
            println!("{}:{} {state}", config.bind_host, config.server_port);
        }
        None if config.auto_start_server => serve(config).await?,
        None => {
            info!("auto_start_server is off; use `labelwerk serve` to start the listener");
        }
    }

    Ok(())
}

async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut services = AppServices::init(config)?;
    let previews = services.spawn_preview_logger();

    let addr = match services.start_server().await {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, "label server failed to start");
            return Err(e.into());
        }
    };
    info!(%addr, mode = ?services.config().print_mode, "ready for labels, Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    services.stop_server().await?;
    previews.abort();
    Ok(())
}
