//! ClassifiedsTrader - Main Entry Point
//!
//! Runs the pricing pipeline and, when Steam credentials are configured,
//! the trade offer loop. Stops cleanly on Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use classifieds_trader::common::channels::create_outcome_channel;
use classifieds_trader::config::load_config;
use classifieds_trader::trading::{ExecutionStatus, PollerSettings};
use classifieds_trader::{
    AppConfig, CommandService, FileListingSource, InventoryCache, ListingSource, MessageHandler,
    OfferExecutor, OfferOutcome, OfferPolicyEngine, OfferSummarizer, PolicySettings, PriceStore,
    PricingPipeline, RetryPolicy, SteamTradingClient, TradePoller, TradingPlatform, TrustedPartners,
};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level or filter directive; defaults to settings.log_level
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Override the listings snapshot written by the scraper
    #[arg(long)]
    listings: Option<String>,

    /// Force dry run regardless of configuration
    #[arg(long)]
    dry_run: bool,

    /// Read chat commands from stdin as the first operator
    #[arg(long)]
    console: bool,
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let mut config = load_config(Some(args.config.as_str())).context("loading configuration")?;

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.settings.log_level.clone());
    init_tracing(&level, args.log_json)?;

    info!("Starting ClassifiedsTrader");
    info!("Configuration file: {}", args.config);

    if args.dry_run {
        config.trading.dry_run = true;
    }
    if let Some(path) = &args.listings {
        config.pricing.listings_file = path.clone();
    }
    config.validate().context("invalid configuration")?;

    let token = CancellationToken::new();

    // Pricing
    let store = Arc::new(PriceStore::with_key_item(config.pricing.key_item_name.clone()));
    let source: Arc<dyn ListingSource> = Arc::new(FileListingSource::new(&config.pricing.listings_file));
    let pipeline = Arc::new(PricingPipeline::new(
        source,
        store.clone(),
        config.items.tracked_names(),
    ));
    let pricing_task = tokio::spawn(
        pipeline
            .clone()
            .run(config.pricing.refresh_interval(), token.clone()),
    );
    info!(
        items = config.items.tracked_names().len(),
        listings = %config.pricing.listings_file,
        "Pricing pipeline started"
    );

    // Trading
    let trusted = Arc::new(TrustedPartners::new(
        config.trading.trusted_partners.clone(),
        config.trading.trusted_accept_enabled,
    ));
    let mut commands = CommandService::new(
        store.clone(),
        config.items.clone(),
        config.chat.clone(),
        trusted.clone(),
    );

    let trade_loop = if has_steam_credentials(&config) {
        let (sender, receiver) = create_outcome_channel();
        tokio::spawn(log_outcomes(receiver));

        let poller = Arc::new(build_poller(&config, store.clone(), trusted.clone())?.with_outcomes(sender));
        commands = commands.with_poller(poller.clone());
        info!(
            dry_run = config.trading.dry_run,
            enabled = config.trading.enabled,
            "Trade loop starting"
        );
        Some(poller.spawn(config.trading.poll_interval(), token.clone()))
    } else {
        warn!("Steam API key or bot id missing, trade loop not started");
        None
    };

    let commands = Arc::new(commands);
    if args.console {
        let operator = config.chat.operators.first().cloned().unwrap_or_default();
        tokio::spawn(run_console(commands.clone(), operator, token.clone()));
    }
    info!(welcome = %commands.welcome_message(), "Chat commands ready");

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, cleaning up...");

    token.cancel();
    if let Some(handle) = trade_loop {
        if !handle.stop(config.trading.stop_timeout()).await {
            warn!("Trade loop was aborted");
        }
    }
    if tokio::time::timeout(config.trading.stop_timeout(), pricing_task)
        .await
        .is_err()
    {
        warn!("Pricing loop did not stop in time");
    }

    info!("Shutdown complete");
    Ok(())
}

fn has_steam_credentials(config: &AppConfig) -> bool {
    let present = |v: &Option<String>| v.as_deref().map_or(false, |s| !s.is_empty());
    present(&config.steam.api_key) && present(&config.steam.bot_steam_id)
}

fn build_poller(config: &AppConfig, store: Arc<PriceStore>, trusted: Arc<TrustedPartners>) -> Result<TradePoller> {
    let timeout = std::time::Duration::from_secs(config.settings.request_timeout_seconds);
    let platform: Arc<dyn TradingPlatform> = Arc::new(
        SteamTradingClient::new(&config.steam, &config.trading, timeout).context("creating Steam client")?,
    );

    let inventory = Arc::new(InventoryCache::new(
        platform.clone(),
        config.steam.app_id,
        config.trading.pure_cache_ttl(),
    ));
    let policy = Arc::new(OfferPolicyEngine::new(
        store,
        config.items.clone(),
        PolicySettings::from(&config.trading),
        trusted,
        inventory.clone(),
    ));
    let executor = OfferExecutor::new(platform.clone(), RetryPolicy::from(&config.trading));

    Ok(TradePoller::new(
        platform,
        OfferSummarizer::new(config.steam.app_id),
        policy,
        executor,
        inventory,
        PollerSettings::from(&config.trading),
    ))
}

async fn log_outcomes(mut receiver: mpsc::Receiver<OfferOutcome>) {
    while let Some(outcome) = receiver.recv().await {
        match &outcome.execution {
            ExecutionStatus::Failed(error) => warn!(
                offer_id = %outcome.offer_id,
                partner = %outcome.partner,
                %error,
                "Offer action failed, will retry next poll"
            ),
            status => info!(
                offer_id = %outcome.offer_id,
                partner = %outcome.partner,
                verdict = %outcome.decision.verdict,
                ?status,
                reply = %outcome.partner_message(),
                "Offer outcome"
            ),
        }
    }
}

async fn run_console(commands: Arc<CommandService>, operator: String, token: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(reply) = commands.on_friend_message(&operator, &line) {
                        println!("{}", reply);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Console input failed");
                    break;
                }
            }
        }
    }
}
