//! Strategy Scheduler - Main Entry Point
//!
//! Runs the scheduler against the paper collaborators and logs every order
//! intent it emits.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use strategy_scheduler::common::cache::CachedMetadataSource;
use strategy_scheduler::common::channels::ChannelOrderSink;
use strategy_scheduler::paper::{PaperMarket, StaticInstruments, TickCurrencyConverter};
use strategy_scheduler::{load_config, MarketDataSource, Scheduler, StaticConfigSource};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "SCHED_CONFIG", default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Number of cycles to run (0 = until Ctrl-C)
    #[arg(long, default_value_t = 0)]
    cycles: u64,

    /// Comma-separated list of symbols overriding the configured ones
    #[arg(long)]
    symbols: Option<String>,
}

fn init_logging(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();
    init_logging(&args)?;

    info!("Starting strategy scheduler");
    info!("Configuration file: {}", args.config);

    let mut config = load_config(Some(&args.config)).context("loading configuration")?;
    if let Some(symbols) = &args.symbols {
        config.symbols = symbols
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
    }
    config.validate().context("validating configuration")?;
    info!(
        symbols = ?config.symbols,
        strategies = ?config.active_strategies,
        pool_size = config.scheduler.pool_size,
        "Configuration loaded"
    );

    let market: Arc<dyn MarketDataSource> = Arc::new(PaperMarket::new());
    let instruments = Arc::new(CachedMetadataSource::new(StaticInstruments::new()));
    let converter = Arc::new(TickCurrencyConverter::new(Arc::clone(&market)));
    let (sink, mut intents) = ChannelOrderSink::channel();
    let dedup = config.dedup.clone();
    let config_source = Arc::new(StaticConfigSource::new(config));

    let scheduler = Scheduler::new(market, instruments, Arc::new(sink), config_source)
        .with_converter(converter)
        .with_dedup(dedup);
    let handle = scheduler.handle();

    // Downstream consumer: the paper build only logs what would be routed
    let consumer = tokio::spawn(async move {
        while let Some(intent) = intents.recv().await {
            info!(
                symbol = %intent.symbol,
                direction = %intent.direction,
                lot = %intent.lot_size,
                entry = %intent.entry_price,
                tp = %intent.take_profit,
                sl = %intent.stop_loss,
                rr = ?intent.risk_reward(),
                "Intent received"
            );
        }
    });

    let max_cycles = (args.cycles > 0).then_some(args.cycles);
    let summary = {
        let run = scheduler.run(max_cycles);
        tokio::pin!(run);
        tokio::select! {
            summary = &mut run => summary?,
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal, stopping...");
                handle.emergency_stop();
                run.await?
            }
        }
    };

    let metrics = scheduler.metrics();
    info!(
        cycles = summary.cycles,
        intents = summary.intents,
        timed_out = summary.timed_out,
        failed = summary.failed,
        peak_running = metrics.peak_running,
        "Scheduler finished"
    );
    if let Ok(json) = serde_json::to_string(&metrics) {
        info!(metrics = %json, "Final metrics");
    }
    if summary.aborted {
        warn!("Run ended by emergency stop");
    }

    drop(scheduler);
    consumer.await.ok();
    Ok(())
}
