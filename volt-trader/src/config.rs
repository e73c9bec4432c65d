//! Session configuration
//!
//! Loaded from the environment (a local `.env` is picked up when present)
//! and validated eagerly: a bad value fails here, before any connection
//! attempt is made.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use url::Url;

use crate::session::SessionSettings;
use crate::stake::StakePolicy;

/// Configuration errors, always fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

/// Telegram credentials; notifications are disabled when absent
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: i64,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Everything the bot needs for one trading session
#[derive(Debug, Clone)]
pub struct Config {
    /// WebSocket endpoint, without the app_id query parameter
    pub endpoint: Url,
    pub app_id: String,
    pub api_token: String,
    /// Venue symbol to trade (e.g. R_75)
    pub symbol: String,
    pub currency: String,
    /// How long the session runs before ending itself
    pub session_duration: Duration,
    /// Risk per trade, in percent of balance
    pub risk_percent: Decimal,
    pub min_stake: Decimal,
    /// Upper stake bound as a fraction of balance
    pub max_stake_fraction: Decimal,
    /// Holding time after which an open position settles
    pub hold_threshold: Duration,
    /// Minimum spacing between entries
    pub cooldown: Duration,
    /// Venue contract duration, in seconds
    pub contract_duration_secs: u32,
    /// Fraction of stake paid out on a win
    pub payout_rate: Decimal,
    pub initial_balance: Decimal,
    /// CSV trade history path
    pub history_file: PathBuf,
    pub telegram: Option<TelegramConfig>,
}

impl Config {
    /// Load from environment variables, then validate
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            endpoint: parse_var("DERIV_WEBSOCKET", "wss://ws.derivws.com/websockets/v3")?,
            app_id: required("DERIV_APP_ID")?,
            api_token: required("DERIV_API_TOKEN")?,
            symbol: var_or("VOLT_SYMBOL", "R_75"),
            currency: var_or("VOLT_CURRENCY", "USD"),
            session_duration: Duration::minutes(parse_var("VOLT_SESSION_MINUTES", "30")?),
            risk_percent: parse_var("RISK_PERCENT", "1.0")?,
            min_stake: parse_var("VOLT_MIN_STAKE", "10")?,
            max_stake_fraction: parse_var("VOLT_MAX_STAKE_FRACTION", "0.05")?,
            hold_threshold: Duration::seconds(parse_var("VOLT_HOLD_SECONDS", "20")?),
            cooldown: Duration::seconds(parse_var("VOLT_COOLDOWN_SECONDS", "25")?),
            contract_duration_secs: parse_var("VOLT_CONTRACT_SECONDS", "15")?,
            payout_rate: parse_var("VOLT_PAYOUT_RATE", "0.95")?,
            initial_balance: parse_var("INITIAL_BALANCE", "10000")?,
            history_file: PathBuf::from(var_or("VOLT_HISTORY_FILE", "trade_history.csv")),
            telegram: telegram_from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every bound the trading logic relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_token.trim().is_empty() {
            return Err(ConfigError::Missing("DERIV_API_TOKEN"));
        }
        if self.app_id.trim().is_empty() {
            return Err(ConfigError::Missing("DERIV_APP_ID"));
        }
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::invalid("symbol", "must not be empty"));
        }
        if !matches!(self.endpoint.scheme(), "ws" | "wss") {
            return Err(ConfigError::invalid(
                "endpoint",
                format!("expected ws/wss url, got {}", self.endpoint),
            ));
        }
        if self.risk_percent <= Decimal::ZERO || self.risk_percent > dec!(100) {
            return Err(ConfigError::invalid(
                "risk_percent",
                format!("must be in (0, 100], got {}", self.risk_percent),
            ));
        }
        if self.min_stake <= Decimal::ZERO {
            return Err(ConfigError::invalid(
                "min_stake",
                format!("must be positive, got {}", self.min_stake),
            ));
        }
        if self.max_stake_fraction <= Decimal::ZERO || self.max_stake_fraction > Decimal::ONE {
            return Err(ConfigError::invalid(
                "max_stake_fraction",
                format!("must be in (0, 1], got {}", self.max_stake_fraction),
            ));
        }
        if self.payout_rate <= Decimal::ZERO || self.payout_rate > Decimal::ONE {
            return Err(ConfigError::invalid(
                "payout_rate",
                format!("must be in (0, 1], got {}", self.payout_rate),
            ));
        }
        if self.initial_balance <= Decimal::ZERO {
            return Err(ConfigError::invalid(
                "initial_balance",
                format!("must be positive, got {}", self.initial_balance),
            ));
        }
        for (name, duration) in [
            ("session_duration", self.session_duration),
            ("hold_threshold", self.hold_threshold),
            ("cooldown", self.cooldown),
        ] {
            if duration <= Duration::zero() {
                return Err(ConfigError::invalid(
                    name,
                    format!("must be positive, got {}s", duration.num_seconds()),
                ));
            }
        }
        if self.contract_duration_secs == 0 {
            return Err(ConfigError::invalid("contract_duration", "must be positive"));
        }
        Ok(())
    }

    /// The slice of configuration the state machine needs
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            symbol: self.symbol.clone(),
            session_duration: self.session_duration,
            hold_threshold: self.hold_threshold,
            cooldown: self.cooldown,
            payout_rate: self.payout_rate,
            stake: StakePolicy {
                risk_percent: self.risk_percent,
                min_stake: self.min_stake,
                max_stake_fraction: self.max_stake_fraction,
            },
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(name: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var_or(name, default);
    raw.parse()
        .map_err(|err| ConfigError::invalid(name, format!("{} ({})", err, raw)))
}

fn telegram_from_env() -> Result<Option<TelegramConfig>, ConfigError> {
    let Ok(bot_token) = std::env::var("TELEGRAM_BOT_TOKEN") else {
        return Ok(None);
    };
    let chat_id = required("TELEGRAM_CHAT_ID")?;
    let chat_id = chat_id.parse().map_err(|err| {
        ConfigError::invalid("TELEGRAM_CHAT_ID", format!("{} ({})", err, chat_id))
    })?;
    Ok(Some(TelegramConfig { bot_token, chat_id }))
}
