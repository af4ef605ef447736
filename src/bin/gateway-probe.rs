//! Container health check client for gateway-server.
//!
//! Exits 0 when the probe answers 2xx, 1 otherwise.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "gateway-probe")]
#[command(about = "Query gateway-server probe endpoints", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Request timeout in milliseconds.
    #[arg(short, long, default_value_t = 2000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Has the process started (is it live)?
    Startup,
    /// Is the process live?
    Live,
    /// Is the process ready for traffic?
    Ready,
}

impl Commands {
    fn path(self) -> &'static str {
        match self {
            Commands::Startup => "/probe/startup",
            Commands::Live => "/probe/live",
            Commands::Ready => "/probe/ready",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match probe(&cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn probe(cli: &Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(cli.timeout_ms))
        .build()?;

    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.command.path());
    let res = client.get(&url).send().await?;
    let status = res.status();

    match res.json::<Value>().await {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => eprintln!("{url} returned a non-JSON body"),
    }

    if !status.is_success() {
        eprintln!("Probe {url} returned status {status}");
    }
    Ok(status.is_success())
}
