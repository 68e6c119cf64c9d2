//! twin-ftp server - Entry Point

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use twin_ftp::Server;
use twin_ftp::config::ServerConfig;
use twin_ftp::utils::logging::setup_logging;

/// Serve an upload directory over the twin-ftp protocol
#[derive(Debug, Parser)]
#[command(name = "twin-ftp-server", version)]
struct Args {
    /// TOML config file; `twin-ftp.toml` is read if present when omitted
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging();

    info!("Launching twin-ftp server...");

    let config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let server = match Server::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    server.run().await;
    ExitCode::SUCCESS
}
