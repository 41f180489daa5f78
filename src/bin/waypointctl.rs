//! Admin CLI for a running waypoint instance.

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "waypointctl")]
#[command(version, about = "Query the waypoint admin API", long_about = None)]
struct Cli {
    /// Admin API base URL.
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show overall proxy health
    Status,
    /// List backends with health and connection counts
    Backends,
    /// Show request statistics
    Stats,
    /// Show circuit breaker states
    Circuits,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let path = match cli.command {
        Commands::Status => "/health",
        Commands::Backends => "/backends",
        Commands::Stats => "/stats",
        Commands::Circuits => "/circuits",
    };

    let response = client.get(format!("{}{}", cli.url, path)).send().await?;

    let status = response.status();
    let json: Value = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);

    // /health answers 503 when no backend is left; reflect that in the
    // exit code so scripts can branch on it.
    if status.is_server_error() {
        std::process::exit(1);
    }

    Ok(())
}
