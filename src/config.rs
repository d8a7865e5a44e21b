use chrono::NaiveTime;
use clap::Parser;

use crate::notify::RecipientId;

/// Football match watcher: kick-off, goal and full-time notifications
#[derive(Parser, Debug, Clone)]
#[command(name = "matchwatch", version, about)]
pub struct Config {
    /// Log messages instead of sending them
    #[arg(long, env = "DRY_RUN", default_value = "false")]
    pub dry_run: bool,

    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// SQLite database path for the notification journal
    #[arg(long, env = "DATABASE_PATH", default_value = "matchwatch.db")]
    pub database_path: String,

    /// football-data.org API base URL
    #[arg(
        long,
        env = "FOOTBALL_API_URL",
        default_value = "https://api.football-data.org/v4"
    )]
    pub football_api_url: String,

    /// football-data.org API token (sent as X-Auth-Token)
    #[arg(long, env = "FOOTBALL_API_TOKEN")]
    pub football_api_token: Option<String>,

    /// Competition code fetched each day
    #[arg(long, env = "COMPETITION", default_value = "PL")]
    pub competition: String,

    /// Teams of interest, comma separated (empty = every team)
    #[arg(long, env = "TEAMS", value_delimiter = ',')]
    pub teams: Vec<String>,

    /// Daily fetch time in UTC (HH:MM)
    #[arg(long, env = "ANCHOR_TIME", default_value = "01:00", value_parser = parse_anchor_time)]
    pub anchor_time: NaiveTime,

    /// Seconds between polls while a match is in progress
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "10")]
    pub poll_interval_secs: u64,

    /// Seconds before retrying a failed fetch
    #[arg(long, env = "RETRY_DELAY_SECS", default_value = "20")]
    pub retry_delay_secs: u64,

    /// Retries of a failed daily fetch before waiting for the next day
    #[arg(long, env = "ANCHOR_RETRIES", default_value = "15")]
    pub anchor_retries: u32,

    /// Telegram Bot API base URL
    #[arg(
        long,
        env = "TELEGRAM_API_URL",
        default_value = "https://api.telegram.org"
    )]
    pub telegram_api_url: String,

    /// Telegram bot token (required unless --dry-run)
    #[arg(long, env = "TELEGRAM_BOT_TOKEN")]
    pub telegram_bot_token: Option<String>,

    /// Initial recipient chat IDs, comma separated
    #[arg(long, env = "RECIPIENTS", value_delimiter = ',', allow_hyphen_values = true)]
    pub recipients: Vec<RecipientId>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.dry_run && self.telegram_bot_token.is_none() {
            anyhow::bail!(
                "TELEGRAM_BOT_TOKEN is required to send messages. Use --dry-run to log them instead."
            );
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be positive");
        }
        if self.retry_delay_secs == 0 {
            anyhow::bail!("retry_delay_secs must be positive");
        }
        if self.competition.trim().is_empty() {
            anyhow::bail!("competition must not be empty");
        }
        Ok(())
    }
}

fn parse_anchor_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S"))
        .map_err(|e| format!("expected HH:MM, got '{}': {}", s, e))
}
