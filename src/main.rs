use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use roost::app::AppContext;
use roost::bridge;
use roost::cli::{commands, Cli, Commands, DaemonAction, QueryCommand};
use roost::config::Config;
use roost::daemon::{self, Daemon, DaemonConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(&config)?;

    // Restore prior state. An empty registry is a valid degraded start, so
    // a failed pull warns instead of aborting.
    match bridge::pull(ctx.store.as_ref(), &ctx.registry) {
        Ok(count) if count > 0 => tracing::info!("restored {} feeds from the store", count),
        Ok(_) => {}
        Err(e) => tracing::warn!("pull failed, starting with an empty registry: {}", e),
    }

    match cli.command {
        Commands::Add { nick, url } => {
            commands::add_feed(&ctx, &nick, &url).await?;
        }
        Commands::Remove { url } => {
            commands::remove_feed(&ctx, &url)?;
        }
        Commands::List => {
            commands::list_feeds(&ctx)?;
        }
        Commands::Refresh => {
            commands::refresh_feeds(&ctx).await?;
        }
        Commands::Query { query } => match query {
            QueryCommand::User { name } => commands::query_user(&ctx, &name)?,
            QueryCommand::Tag { tag } => commands::query_tag(&ctx, &tag)?,
            QueryCommand::Status {
                term,
                all_casings,
                exclude,
            } => commands::query_status(&ctx, &term, all_casings, &exclude)?,
        },
        Commands::Daemon { action } => match action {
            DaemonAction::Start {
                interval,
                no_initial_refresh,
            } => {
                let mut daemon_config = DaemonConfig::from_config(&config, interval.as_deref())?;
                daemon_config.refresh_on_start = !no_initial_refresh;
                Daemon::new(&ctx, daemon_config).run().await?;
            }
            DaemonAction::Stop => {
                daemon::stop_daemon().map_err(anyhow::Error::msg)?;
                println!("Daemon stopped");
            }
            DaemonAction::Status => {
                println!("{}", daemon::daemon_status());
            }
        },
    }

    // Drain any queued durable writes before exit.
    ctx.shutdown().await;
    Ok(())
}
