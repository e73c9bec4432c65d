//! Telegram notifications
//!
//! Fire-and-forget: a failed delivery is logged and otherwise ignored, so
//! notification problems can never affect trading correctness.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::warn;

use volt_core::{NotificationSink, Position, SessionSummary, TradeOutcome, TradeRecord};

use crate::config::TelegramConfig;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts HTML messages to the Telegram Bot API
pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: i64,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id,
        }
    }

    async fn send(&self, text: String) {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
        });

        match self
            .http
            .post(&url)
            .json(&body)
            .timeout(SEND_TIMEOUT)
            .send()
            .await
        {
            Ok(response) if !response.status().is_success() => {
                warn!("telegram rejected notification: {}", response.status());
            }
            Ok(_) => {}
            Err(err) => warn!("telegram notification failed: {}", err),
        }
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn trade_opened(&self, position: &Position) {
        self.send(format!(
            "🟢 <b>TRADE OPENED</b>\n\n\
             📍 Market: {}\n\
             📊 Type: {}\n\
             💵 Stake: ${}\n\
             🆔 Contract: {}",
            position.symbol, position.direction, position.stake, position.contract_id
        ))
        .await;
    }

    async fn trade_closed(&self, record: &TradeRecord) {
        let emoji = match record.outcome {
            TradeOutcome::Win => "✅",
            TradeOutcome::Loss => "❌",
        };
        let pnl_percent = if record.stake.is_zero() {
            Decimal::ZERO
        } else {
            (record.pnl / record.stake * Decimal::ONE_HUNDRED).round_dp(1)
        };
        self.send(format!(
            "{} <b>TRADE CLOSED</b>\n\n\
             📍 Market: {}\n\
             📊 Type: {}\n\
             💵 Stake: ${}\n\
             💰 P/L: {}{} ({:+}%)",
            emoji,
            record.symbol,
            record.direction,
            record.stake,
            if record.pnl >= Decimal::ZERO { "+$" } else { "-$" },
            record.pnl.abs(),
            pnl_percent,
        ))
        .await;
    }

    async fn session_summary(&self, summary: &SessionSummary) {
        let win_rate = summary
            .win_rate
            .map(|rate| format!("{:.1}%", rate))
            .unwrap_or_else(|| "n/a".to_string());
        self.send(format!(
            "📊 <b>SESSION SUMMARY</b>\n\n\
             🎯 Trades: {}\n\
             ✅ Winners: {}\n\
             ❌ Losers: {}\n\
             📈 Win Rate: {}\n\
             💰 P/L: {:+}\n\
             💳 Balance: ${}",
            summary.total_trades,
            summary.winning_trades,
            summary.losing_trades,
            win_rate,
            summary.pnl,
            summary.final_balance,
        ))
        .await;
    }
}

/// Sink used when no Telegram credentials are configured
pub struct NullNotifier;

#[async_trait]
impl NotificationSink for NullNotifier {
    async fn trade_opened(&self, _position: &Position) {}
    async fn trade_closed(&self, _record: &TradeRecord) {}
    async fn session_summary(&self, _summary: &SessionSummary) {}
}
