//! Account, position, and trade record structures

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signal::SignalSnapshot;
use crate::types::Direction;

/// Outcome of a settled trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeOutcome {
    Win,
    Loss,
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeOutcome::Win => write!(f, "WIN"),
            TradeOutcome::Loss => write!(f, "LOSS"),
        }
    }
}

/// An open contract held by the session
///
/// Created only when the venue confirms a buy; cleared at settlement. The
/// session never holds more than one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Venue symbol the contract is on
    pub symbol: String,
    /// Direction the contract bets on
    pub direction: Direction,
    /// Spot price at entry
    pub entry_price: f64,
    /// Venue time of the entry tick
    pub entry_time: DateTime<Utc>,
    /// Amount staked
    pub stake: Decimal,
    /// Venue contract identifier
    pub contract_id: String,
    /// Signal state captured at entry, carried into the trade record
    pub entry_signals: SignalSnapshot,
}

/// Running account state, mutated only at settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub balance: Decimal,
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    /// Losses since the last win; feeds into stake sizing
    pub consecutive_losses: u32,
}

impl Account {
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            balance: initial_balance,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            consecutive_losses: 0,
        }
    }

    /// Apply one settlement. All fields change together: balance, trade
    /// counts, and the loss streak are one atomic update.
    pub fn settle(&mut self, pnl: Decimal) -> TradeOutcome {
        self.balance += pnl;
        self.total_trades += 1;
        if pnl > Decimal::ZERO {
            self.winning_trades += 1;
            self.consecutive_losses = 0;
            TradeOutcome::Win
        } else {
            self.losing_trades += 1;
            self.consecutive_losses += 1;
            TradeOutcome::Loss
        }
    }

    /// Win rate in percent, if any trade has settled
    pub fn win_rate(&self) -> Option<f64> {
        if self.total_trades == 0 {
            None
        } else {
            Some(self.winning_trades as f64 / self.total_trades as f64 * 100.0)
        }
    }
}

/// Immutable snapshot appended to the ledger at settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Venue time of the settling tick
    pub closed_at: DateTime<Utc>,
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub stake: Decimal,
    pub outcome: TradeOutcome,
    /// Signed P&L: positive payout on a win, the forfeited stake on a loss
    pub pnl: Decimal,
    /// Signal state at entry
    pub signals: SignalSnapshot,
    /// Account balance after the settlement was applied
    pub balance_after: Decimal,
}

/// Final statistics emitted exactly once per session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub symbol: String,
    pub initial_balance: Decimal,
    pub final_balance: Decimal,
    pub pnl: Decimal,
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub win_rate: Option<f64>,
}
