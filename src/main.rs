//! dehug - command-line client for the DeHug content registry

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dehug_client::{
    config::{Args, Command},
    ContentCard, DiscoveryOptions, NetworkCheck, RegistryClient, H256,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("dehug_client={},dehug={},info", log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Registry: {}", config.registry_address);
    info!("RPC: {} (chain id {})", config.rpc_url, config.chain_id);

    let client = RegistryClient::new(config)?;

    match args.command {
        Command::Discover {
            category,
            limit,
            max_scan,
            batch,
            json,
        } => {
            let discovery = client.discovery(DiscoveryOptions { use_batch: batch })?;
            let results = discovery.discover(category, limit, max_scan).await?;
            if results.is_empty() {
                info!("No {} records found", category);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                let cards: Vec<ContentCard> = results.iter().map(ContentCard::from).collect();
                println!("{}", serde_json::to_string_pretty(&cards)?);
            }
        }
        Command::Record { id } => {
            let record = client.record(id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::ResolveId { tx_hash } => {
            let hash: H256 = tx_hash.parse()?;
            match client.resolve_transaction(&hash).await {
                Ok(resolution) => println!("{}", serde_json::to_string_pretty(&resolution)?),
                Err(e) => {
                    warn!("{}", e);
                    println!("{}", client.config().explorer_tx_url(&hash));
                    std::process::exit(2);
                }
            }
        }
        Command::Network => match client.check_rpc_network().await? {
            NetworkCheck::Verified => {
                info!("RPC endpoint is on the required network");
            }
            NetworkCheck::Mismatch { actual } => {
                error!(
                    "RPC endpoint is on chain id {}, expected {}",
                    actual,
                    client.config().chain_id
                );
                std::process::exit(1);
            }
            other => info!("Network check: {:?}", other),
        },
    }

    Ok(())
}
