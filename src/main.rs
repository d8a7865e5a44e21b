use anyhow::Result;
use clap::Parser;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod dashboard;
mod db;
mod football;
mod notify;
mod scheduler;

use config::Config;
use dashboard::AppState;
use db::Database;
use football::{Classifier, FootballData, MatchProvider};
use notify::{Dispatcher, LogSender, MessageSender, RecipientRegistry, TelegramSender};
use scheduler::{Cadence, MatchBoard, Scheduler};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Open database
    let db = Database::open(&config.database_path)?;
    info!("Notification journal opened: {}", config.database_path);

    let registry = RecipientRegistry::with_recipients(config.recipients.iter().copied());
    info!("{} initial recipient(s)", registry.len().await);

    let sender: Arc<dyn MessageSender> = match (&config.telegram_bot_token, config.dry_run) {
        (Some(token), false) => Arc::new(TelegramSender::new(&config.telegram_api_url, token)?),
        _ => {
            info!("🟡 DRY RUN mode – messages are logged, not sent");
            Arc::new(LogSender)
        }
    };

    let provider: Arc<dyn MatchProvider> = Arc::new(FootballData::new(
        &config.football_api_url,
        config.football_api_token.clone(),
        &config.competition,
    )?);

    let classifier = Classifier::new(config.teams.iter().cloned());
    if config.teams.is_empty() {
        info!("Watching every team in {}", config.competition);
    } else {
        info!("Watching {} in {}", config.teams.join(", "), config.competition);
    }

    let board = MatchBoard::new();
    let dispatcher = Dispatcher::new(registry.clone(), sender, Some(db.clone()));
    let scheduler = Arc::new(Scheduler::new(
        provider,
        classifier,
        dispatcher,
        Cadence::from(&config),
        board.clone(),
    ));

    // Start the dashboard HTTP server
    let app = dashboard::router(AppState {
        db,
        registry,
        board,
        dry_run: config.dry_run,
    });
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("Dashboard listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Scheduler runs in its own task for the life of the process
    let scheduler_task = tokio::spawn(scheduler.run());

    tokio::select! {
        res = axum::serve(listener, app).into_future() => res?,
        res = scheduler_task => {
            if let Err(e) = res {
                error!("Scheduler task stopped: {}", e);
            }
        }
    }

    Ok(())
}
