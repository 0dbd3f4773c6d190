//! Sonar node binary
//!
//! Runs one overlay node: listens for messages, greets its neighbours and
//! drives searches from an interactive menu.

mod cli;
mod menu;
mod seed;

use anyhow::Result;
use cli::Cli;
use menu::Menu;
use sonar_network::{NodeConfig, NodeEvent, NodeService};
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufRead, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    tracing::info!("Sonar node starting...");

    let config = build_config(&cli)?;
    let service = NodeService::bind(config).await?;

    // Report search results as they arrive
    if let Some(mut events) = service.node().take_events() {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                report(&event);
            }
        });
    }

    service.start().await?;

    let reached = if cli.no_menu {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!("Failed to wait for shutdown signal: {}", e),
        }
        service.leave().await?
    } else {
        let stdin = BufReader::new(tokio::io::stdin());
        run_menu(&service, stdin, std::io::stdout()).await?
    };
    tracing::info!("Said BYE to {} neighbours", reached);
    println!("{}", service.node().stats().snapshot().to_json()?);

    tracing::info!("Sonar node stopped");

    Ok(())
}

/// Build the node configuration from arguments and seed files
fn build_config(cli: &Cli) -> Result<NodeConfig> {
    let neighbours = match &cli.neighbours {
        Some(path) => seed::load_neighbours(path)?,
        None => Vec::new(),
    };
    let store = match &cli.keys {
        Some(path) => seed::load_keys(path)?,
        None => Default::default(),
    };
    Ok(NodeConfig::default()
        .with_listen_addr(cli.addr.clone())
        .with_neighbours(neighbours)
        .with_store(store)
        .with_default_ttl(cli.ttl)
        .with_connect_timeout(Duration::from_millis(cli.connect_timeout_ms)))
}

/// Drive the menu until it ends, then leave the overlay
async fn run_menu<R, W>(service: &NodeService, input: R, out: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    if let Err(e) = Menu::new(service.node().as_ref(), input, out).run().await {
        tracing::error!("Menu stopped: {}", e);
    }
    Ok(service.leave().await?)
}

fn report(event: &NodeEvent) {
    match event {
        NodeEvent::SearchResolved {
            mode,
            key,
            value,
            hop_count,
            from,
        } => println!(
            "Value found for {} by {}: {} ({} hops, from {})",
            key,
            mode.name(),
            value,
            hop_count,
            from
        ),
        NodeEvent::SearchFailed { key, .. } => println!("Key {} not found", key),
        NodeEvent::NeighbourAdded(_) | NodeEvent::NeighbourRemoved(_) => {}
    }
}
