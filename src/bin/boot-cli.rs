use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "boot-cli")]
#[command(about = "Inspect a running boot host", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:7001")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show lifecycle state and pending gate tasks
    Status,
    /// Show recorded boot timings
    Timings,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let path = match cli.command {
        Commands::Status => "status",
        Commands::Timings => "timings",
    };

    let res = client
        .get(format!("{}/{}", cli.url.trim_end_matches('/'), path))
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let json: Value = match res.json().await {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error: boot host returned status {} ({})", status, e);
            return Ok(());
        }
    };

    // /status answers 503 with a full body while the host is not ready.
    if !status.is_success() {
        eprintln!("Boot host not ready (status {})", status);
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
