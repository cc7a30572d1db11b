use clap::{Parser, Subcommand};
use gpt_coin_trader::application::services::decision_oracle::DecisionOracle;
use gpt_coin_trader::application::services::order_executor::OrderExecutor;
use gpt_coin_trader::application::services::performance::LedgerSummary;
use gpt_coin_trader::application::services::trading_cycle::{CycleSettings, TradingCycle};
use gpt_coin_trader::config::{AppConfig, Credentials};
use gpt_coin_trader::infrastructure::exchange_client_factory::ExchangeClientFactory;
use gpt_coin_trader::infrastructure::openai_client::OpenAiClient;
use gpt_coin_trader::persistence::init_database;
use gpt_coin_trader::persistence::repository::TradeLedger;
use gpt_coin_trader::task_runner::{run_scheduler, SchedulerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "gpt-coin-trader", version, about = "LLM-driven spot trading bot for Bithumb and Upbit")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run trading cycles forever (default)
    Run,
    /// Run a single trading cycle and exit
    Once,
    /// Summarize the trade ledger
    Report {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn build_cycle(
    config: &AppConfig,
    ledger: Arc<TradeLedger>,
) -> Result<TradingCycle, Box<dyn std::error::Error>> {
    let credentials = Credentials::from_env(config.exchange)?;

    let exchange = ExchangeClientFactory::create(config, &credentials)?;
    let model = OpenAiClient::new(&credentials.openai_api_key, Some(config.openai_model.clone()))?
        .with_base_url(config.openai_base_url.clone())
        .with_timeout(config.openai_timeout);
    let oracle = DecisionOracle::new(Arc::new(model), config.openai_max_tokens);
    let executor = OrderExecutor::new(exchange.clone(), config.market.clone(), config.order_limits);

    let settings = CycleSettings {
        market: config.market.clone(),
        daily_candle_count: config.daily_candle_count,
        hourly_candle_count: config.hourly_candle_count,
        hourly_interval: config.hourly_interval,
        recent_window: chrono::Duration::days(config.recent_trades_days),
        settle_delay: config.settle_delay,
    };

    let mut cycle = TradingCycle::new(exchange, oracle, executor, ledger, settings);
    for source in ExchangeClientFactory::context_sources(config, &credentials) {
        cycle = cycle.with_context_source(source);
    }
    Ok(cycle)
}

async fn report(ledger: &TradeLedger, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let history = ledger.history().await?;
    match LedgerSummary::from_history(&history, chrono::Utc::now()) {
        Some(summary) if json => println!("{}", serde_json::to_string_pretty(&summary)?),
        Some(summary) => println!("{}", summary),
        None => println!("No trades recorded yet"),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gpt_coin_trader=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    let pool = init_database(&config.database).await?;
    let ledger = Arc::new(TradeLedger::new(pool));

    match cli.command.unwrap_or(Command::Run) {
        Command::Report { json } => report(&ledger, json).await?,
        Command::Once => {
            let cycle = build_cycle(&config, ledger)?;
            let outcome = cycle.run_once().await?;
            info!(
                "Cycle finished: {} {}% ({})",
                outcome.decision.action(),
                outcome.decision.percentage(),
                outcome.outcome
            );
        }
        Command::Run => {
            info!(
                "Trading {} on {} every {:?} (backoff {:?}) with {}",
                config.market,
                config.exchange,
                config.cycle_interval,
                config.backoff_interval,
                config.openai_model
            );

            let cycle = build_cycle(&config, ledger)?;
            let cycle = &cycle;
            run_scheduler(
                "trading_cycle",
                SchedulerConfig {
                    interval: config.cycle_interval,
                    backoff: config.backoff_interval,
                },
                move || async move { cycle.run_once().await.map(|_| ()) },
            )
            .await;
        }
    }

    Ok(())
}
