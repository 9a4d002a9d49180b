use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;

use edge_image_gateway::config::{load_config, GatewayConfig};
use edge_image_gateway::observability::logging;
use edge_image_gateway::{EdgeEvent, Pipeline};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the edge image gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one invocation in-process and print the response object
    Invoke {
        /// Trigger event JSON file
        #[arg(short, long)]
        event: PathBuf,

        /// Gateway configuration (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the decoded image here instead of printing the base64 body
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Send a trigger event to a running gateway
    Post {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,

        /// Trigger event JSON file
        #[arg(short, long)]
        event: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Invoke {
            event,
            config,
            output,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => GatewayConfig::default(),
            };
            logging::init_logging(&config.observability)?;

            let event = read_event(&event)?;
            let pipeline = Pipeline::from_config(&config)?;
            let mut response = pipeline.invoke(&event).await;

            if let Some(path) = output {
                if let Some(bytes) = response.decoded_body()? {
                    std::fs::write(&path, &bytes)?;
                    eprintln!("wrote {} bytes to {}", bytes.len(), path.display());
                    response.body = Some(format!("<{} bytes>", bytes.len()));
                }
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Post { url, event } => {
            let event = read_event(&event)?;
            let res = reqwest::Client::new()
                .post(format!("{}/invoke", url.trim_end_matches('/')))
                .json(&event)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn read_event(path: &Path) -> Result<EdgeEvent, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
