//! Volt — live rise/fall trading bot for Deriv volatility indices

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use volt_core::NotificationSink;
use volt_trader::{Config, CsvLedger, LiveTrader, NullNotifier, TelegramNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(_)) {
            eprintln!("Warning: failed to load .env: {}", err);
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,volt_trader=debug")),
        )
        .init();

    // Configuration is validated before any connection attempt
    let config = Config::from_env()?;

    info!("Starting Volt trading bot");
    info!(
        "symbol {} | session {}m | risk {}% | hold {}s | cooldown {}s",
        config.symbol,
        config.session_duration.num_minutes(),
        config.risk_percent,
        config.hold_threshold.num_seconds(),
        config.cooldown.num_seconds(),
    );

    let ledger = CsvLedger::open(&config.history_file)?;
    let notifier: Box<dyn NotificationSink> = match &config.telegram {
        Some(telegram) => {
            info!("telegram notifications enabled (chat {})", telegram.chat_id);
            Box::new(TelegramNotifier::new(telegram))
        }
        None => {
            info!("telegram notifications disabled");
            Box::new(NullNotifier)
        }
    };

    LiveTrader::new(config, notifier, Box::new(ledger))
        .run()
        .await
}
