use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use estuary::app::AppContext;
use estuary::cli::{commands, Cli, Commands};
use estuary::config::Config;
use estuary::query::ItemsRequest;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(workers) = cli.workers {
        config.settings.concurrency = Some(workers.max(1));
    }
    let ctx = AppContext::from_config(&config)?;

    match cli.command {
        Commands::Run { no_sync } => {
            commands::run(&ctx, !no_sync).await?;
        }
        Commands::Update => {
            commands::update(&ctx).await?;
        }
        Commands::Cleanup => {
            commands::cleanup(&ctx)?;
        }
        Commands::Feeds { json } => {
            commands::list_feeds(&ctx, json)?;
        }
        Commands::Groups => {
            commands::list_groups(&ctx);
        }
        Commands::Items {
            feed,
            group,
            since,
            after,
            limit,
            json,
        } => {
            let request = ItemsRequest {
                feed_id: feed,
                group_id: group,
                since,
                after,
                limit,
            };
            commands::list_items(&ctx, request, json)?;
        }
    }

    Ok(())
}
