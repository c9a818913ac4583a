use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use gambit::advisory::{Advisor, ChatClient, LlmAdvisor};
use gambit::config::{AppConfig, LoggingConfig};
use gambit::coordinator::RoundCoordinator;
use gambit::error::Result;
use gambit::gateway::{ApiCredentials, ClobGateway, ExecutionGateway, PaperGateway};
use gambit::provider::{GammaProvider, SnapshotProvider};
use gambit::report::{leaderboard_table, RunReport};
use gambit::store::StateStore;
use gambit::strategy::{self, StrategyKind};
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{Table, Tabled};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Gambit Trading Swarm CLI
#[derive(Parser, Debug)]
#[command(name = "gambit")]
#[command(author, version, about = "Multi-strategy trading swarm for prediction markets")]
struct Cli {
    /// Configuration directory
    #[arg(short, long, default_value = "config")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run trading rounds until interrupted or the round budget is spent
    Run {
        /// Simulate fills locally instead of submitting to the venue
        #[arg(long)]
        paper: bool,
        /// Stop after this many rounds (overrides config)
        #[arg(long)]
        rounds: Option<u64>,
        /// Seconds between round starts (overrides config)
        #[arg(long)]
        interval: Option<u64>,
        /// Opening treasury cash (overrides config)
        #[arg(long)]
        cash: Option<Decimal>,
    },
    /// Fetch and print the current market snapshot, then exit
    Markets {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Verify provider, advisor, and gateway connectivity
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_from(&cli.config)?;

    let command = cli.command.unwrap_or(Commands::Run {
        paper: false,
        rounds: None,
        interval: None,
        cash: None,
    });

    match command {
        Commands::Run {
            paper,
            rounds,
            interval,
            cash,
        } => {
            if paper {
                config.gateway.paper = true;
            }
            if let Some(rounds) = rounds {
                config.round.max_rounds = rounds;
            }
            if let Some(interval) = interval {
                config.round.interval_secs = interval;
            }
            if let Some(cash) = cash {
                config.treasury.initial_cash = cash;
            }
            init_logging(&config.logging);
            if let Err(errors) = config.validate() {
                for problem in &errors {
                    error!(%problem, "invalid configuration");
                }
                return Err(gambit::GambitError::Validation(format!(
                    "{} configuration problem(s)",
                    errors.len()
                )));
            }
            run_swarm(config).await
        }
        Commands::Markets { limit } => {
            init_logging_simple();
            show_markets(&config, limit).await
        }
        Commands::Check => {
            init_logging_simple();
            run_check(&config).await
        }
    }
}

async fn run_swarm(config: AppConfig) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        strategies = ?config.strategies.enabled,
        paper = config.gateway.paper,
        "starting trading swarm"
    );

    let store = Arc::new(StateStore::new(
        config.treasury.initial_cash,
        config.reputation.clone(),
    ));
    let provider: Arc<dyn SnapshotProvider> = Arc::new(GammaProvider::new(&config.provider)?);

    // One chat client serves both the LLM strategy unit and the advisor.
    let wants_llm_strategy = config
        .strategies
        .enabled
        .iter()
        .any(|name| matches!(name.parse::<StrategyKind>(), Ok(StrategyKind::Llm)));
    let chat = if config.advisory.enabled || wants_llm_strategy {
        Some(Arc::new(ChatClient::new(&config.advisory)?))
    } else {
        None
    };

    let strategies = strategy::build_roster(&config.strategies.enabled, chat.as_ref())?;
    let advisor: Option<Arc<dyn Advisor>> = match (&chat, config.advisory.enabled) {
        (Some(chat), true) => Some(Arc::new(LlmAdvisor::new(Arc::clone(chat)))),
        _ => None,
    };

    let gateway: Arc<dyn ExecutionGateway> = if config.gateway.paper {
        Arc::new(PaperGateway::new())
    } else {
        Arc::new(ClobGateway::from_env(&config.gateway)?)
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(());
    });

    let report_dir = config.report.dir.clone();
    let coordinator = RoundCoordinator::new(
        config,
        Arc::clone(&store),
        provider,
        strategies,
        advisor,
        gateway,
    );
    let rounds = coordinator.run(shutdown_rx).await?;

    let leaderboard = store.all_reputation().await;
    println!("{}", leaderboard_table(&leaderboard));

    let report = RunReport::new(rounds, leaderboard);
    match report.write_to(Path::new(&report_dir)) {
        Ok(path) => println!("report: {}", path.display()),
        Err(err) => warn!(error = %err, "failed to write run report"),
    }

    Ok(())
}

#[derive(Debug, Serialize, Tabled)]
struct MarketRow {
    market: String,
    price: String,
    bid: String,
    ask: String,
    volume: String,
    question: String,
}

async fn show_markets(config: &AppConfig, limit: usize) -> Result<()> {
    let provider = GammaProvider::new(&config.provider)?;
    let snapshot = provider.snapshot().await?;
    println!(
        "{} tradable markets (fetched {})",
        snapshot.len(),
        snapshot.fetched_at.format("%H:%M:%SZ")
    );

    let rows: Vec<MarketRow> = snapshot
        .top(limit)
        .iter()
        .map(|m| MarketRow {
            market: m.market_id.clone(),
            price: m.price.round_dp(4).to_string(),
            bid: m
                .best_bid
                .map(|p| p.round_dp(4).to_string())
                .unwrap_or_else(|| "-".to_string()),
            ask: m
                .best_ask
                .map(|p| p.round_dp(4).to_string())
                .unwrap_or_else(|| "-".to_string()),
            volume: m.volume_usd.round_dp(0).to_string(),
            question: m.question.chars().take(60).collect(),
        })
        .collect();
    if rows.is_empty() {
        println!("(no results)");
    } else {
        println!("{}", Table::new(&rows));
    }
    Ok(())
}

async fn run_check(config: &AppConfig) -> Result<()> {
    println!("gambit {} connectivity check", env!("CARGO_PKG_VERSION"));

    let provider = GammaProvider::new(&config.provider)?;
    match provider.snapshot().await {
        Ok(snapshot) => println!("  provider: ok ({} markets)", snapshot.len()),
        Err(err) => println!("  provider: FAILED ({err})"),
    }

    if config.advisory.enabled {
        let chat = ChatClient::new(&config.advisory)?;
        match chat
            .complete("You are a health check.", "Reply with the single word: ok")
            .await
        {
            Ok(_) => println!("  advisor: ok (model {})", chat.model()),
            Err(err) => println!("  advisor: FAILED ({err})"),
        }
    } else {
        println!("  advisor: disabled");
    }

    if config.gateway.paper {
        println!("  gateway: paper (no credentials needed)");
    } else if ApiCredentials::from_env().is_some() {
        println!("  gateway: live (credentials present)");
    } else {
        println!("  gateway: no credentials (would run read-only)");
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::Layer;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},gambit=debug", logging.level)));

    // The json and plain stdout layers have different types; box both so
    // one registry chain can take either.
    let stdout_layer = if logging.json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    };

    // `tracing_appender::rolling::daily` aborts if it cannot create the
    // initial log file, so writability is checked up front.
    let file_layer = logging.dir.as_deref().and_then(|log_dir| {
        if std::fs::create_dir_all(log_dir).is_err() {
            eprintln!("warning: could not create log directory {log_dir}, file logging disabled");
            return None;
        }
        let marker = std::path::Path::new(log_dir).join(".gambit_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&marker)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&marker);
                let file_appender = tracing_appender::rolling::daily(log_dir, "gambit.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                // Keep the guard alive for the life of the process.
                Box::leak(Box::new(guard));
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true)
                        .boxed(),
                )
            }
            Err(err) => {
                eprintln!(
                    "warning: could not write to log directory {log_dir} ({err}), file logging disabled"
                );
                None
            }
        }
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();
}

fn init_logging_simple() {
    // Minimal logging for one-shot CLI commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => error!("failed to install SIGTERM handler: {err}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
