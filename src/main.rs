mod db;
mod detector;
mod error;
mod fetcher;
mod notifier;
mod parser;
mod pipeline;
mod scheduler;
mod settings;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::db::{SqliteStore, Subscription, SubscriptionStore};
use crate::fetcher::HttpFetcher;
use crate::notifier::{Notifier, StdoutNotifier, TelegramNotifier};
use crate::pipeline::Pipeline;
use crate::scheduler::Scheduler;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "price_watch", about = "Track product prices and notify owners on change")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a product url for an owner
    Add {
        /// Owner (Telegram chat id)
        #[arg(short, long)]
        owner: i64,
        url: String,
    },
    /// List an owner's tracked products
    List {
        #[arg(short, long)]
        owner: i64,
    },
    /// Fetch a url and show what would be extracted, without saving
    Probe { url: String },
    /// Run one check cycle now
    Check {
        /// Print notifications instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Check prices on a schedule until interrupted
    Run {
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    match cli.command {
        Commands::Add { owner, url } => {
            let pipeline = build_pipeline(&settings, Arc::new(StdoutNotifier))?;
            let reg = pipeline.register(owner, &url).await?;
            if let Some(err) = &reg.fetch_error {
                println!("(page could not be fetched: {})", err);
            }
            println!("{}", reg.acknowledgment());
        }
        Commands::List { owner } => {
            let store = SqliteStore::open(&settings.database_path)?;
            let subs = store.list_for_owner(owner)?;
            if subs.is_empty() {
                println!("No tracked products yet. Use 'add --owner {} <url>'.", owner);
            } else {
                println!("Tracked products:\n\n{}", format_list(&subs));
            }
        }
        Commands::Probe { url } => {
            let pipeline = build_pipeline(&settings, Arc::new(StdoutNotifier))?;
            let result = pipeline.probe(&url).await?;
            println!("Title: {}", result.title.as_deref().unwrap_or("-"));
            match result.price {
                Some(p) => println!("Price: {} ₽", p),
                None => println!("Price: -"),
            }
        }
        Commands::Check { dry_run } => {
            let pipeline = build_pipeline(&settings, notifier(&settings, dry_run)?)?;
            let stats = pipeline.run_cycle(&CancellationToken::new()).await;
            println!(
                "Checked {}: {} changed ({} notified), {} first seen, {} unchanged, {} no price, {} fetch errors.",
                stats.total,
                stats.changed,
                stats.notified,
                stats.first_seen,
                stats.unchanged,
                stats.unextractable,
                stats.fetch_failed,
            );
        }
        Commands::Run { dry_run } => {
            let pipeline = Arc::new(build_pipeline(&settings, notifier(&settings, dry_run)?)?);
            let scheduler = Scheduler::new(
                pipeline,
                settings.check_interval(),
                settings.initial_delay(),
            );

            let shutdown = CancellationToken::new();
            let on_signal = shutdown.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!("Ctrl-C received; finishing current subscription"),
                    Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
                }
                on_signal.cancel();
            });

            scheduler.run(shutdown).await;
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        info!("Done in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn build_pipeline(settings: &Settings, notifier: Arc<dyn Notifier>) -> anyhow::Result<Pipeline> {
    let store = SqliteStore::open(&settings.database_path).context("Failed to open store")?;
    let fetcher = HttpFetcher::new(settings.fetch_timeout())?;
    Ok(Pipeline::new(Arc::new(store), Arc::new(fetcher), notifier))
}

/// Missing bot token is fatal unless notifications go to stdout.
fn notifier(settings: &Settings, dry_run: bool) -> anyhow::Result<Arc<dyn Notifier>> {
    if dry_run {
        return Ok(Arc::new(StdoutNotifier));
    }
    let token = settings.require_bot_token()?;
    Ok(Arc::new(TelegramNotifier::new(
        &settings.telegram_api_base,
        token,
        settings.notify_timeout(),
    )?))
}

fn format_list(subs: &[Subscription]) -> String {
    subs.iter()
        .map(|s| {
            let title = s.title.as_deref().unwrap_or("untitled");
            let price = s
                .last_price
                .map(|p| format!("{} ₽", p))
                .unwrap_or_else(|| "unknown".into());
            format!("{}. {}\n   {}\n   Price: {}", s.id, title, s.url, price)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
