//! twin-ftp interactive client
//!
//! Reads commands from stdin and prints every status line the server sends.
//! End of input ends the session with QUIT.

use clap::Parser;
use log::{debug, error};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use twin_ftp::FtpClient;
use twin_ftp::client::{Reply, TransferOutcome};
use twin_ftp::config::{ClientConfig, DEFAULT_ACCEPT_TIMEOUT_SECS};
use twin_ftp::protocol::responses::describe_code;
use twin_ftp::utils::logging::setup_logging;

#[derive(Debug, Parser)]
#[command(name = "twin-ftp", version, about = "Interactive twin-ftp client")]
struct Args {
    /// Server host name or IP address
    server_address: String,

    /// Server control port
    server_port: u16,

    /// Directory downloads are written to and uploads are read from
    #[arg(long, default_value = ".")]
    local_dir: PathBuf,

    /// Seconds to wait for the server to open a data connection
    #[arg(long, default_value_t = DEFAULT_ACCEPT_TIMEOUT_SECS)]
    accept_timeout: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging();

    let config = ClientConfig {
        local_dir: args.local_dir,
        accept_timeout: Duration::from_secs(args.accept_timeout),
    };

    let address = format!("{}:{}", args.server_address, args.server_port);
    let mut client = match FtpClient::connect(address.as_str(), config).await {
        Ok(client) => client,
        Err(e) => {
            error!("Could not connect to {}: {}", address, e);
            return ExitCode::FAILURE;
        }
    };
    println!("Connected to {}", client.server_addr());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while !client.is_closed() {
        prompt();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("stdin closed; sending QUIT");
                "QUIT".to_string()
            }
            Err(e) => {
                error!("Failed to read input: {}", e);
                "QUIT".to_string()
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match client.execute(&line).await {
            Ok(reply) => print_reply(&reply),
            Err(e) => {
                eprintln!("Error: {}", e);
                if client.is_closed() {
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}

fn prompt() {
    print!("ftp> ");
    let _ = std::io::stdout().flush();
}

fn print_reply(reply: &Reply) {
    for status in &reply.statuses {
        println!(
            "Server: {} ({})",
            status.as_received(),
            describe_code(status.code())
        );
    }

    match &reply.outcome {
        TransferOutcome::Downloaded { path, bytes } => {
            println!("Saved {} ({} bytes)", path.display(), bytes);
        }
        TransferOutcome::Uploaded { bytes } => println!("Sent {} bytes", bytes),
        TransferOutcome::Listing(entries) if entries.is_empty() => println!("(no files)"),
        TransferOutcome::Listing(entries) => {
            for entry in entries {
                println!("{}", entry);
            }
        }
        TransferOutcome::Closed => println!("Connection closed"),
        TransferOutcome::None => {}
    }
}
