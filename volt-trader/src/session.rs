//! Per-session trading state machine
//!
//! Pure logic over already-decoded values: the session consumes tick events
//! and emits decisions; all I/O (order placement, ledger, notifications)
//! happens in the driver, which reports order outcomes back via
//! `entry_filled` / `entry_rejected`. All time bookkeeping uses tick event
//! time, so any scenario replays deterministically without a socket.
//!
//! Per-trade cycle: Flat → Entering → Open → Closing → Flat, repeating
//! until the session duration elapses or the feed terminates.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use volt_core::{
    Account, Direction, Position, SessionSummary, SignalProvider, SignalSnapshot, TickEvent,
    TradeRecord,
};

use crate::stake::StakePolicy;

/// Per-trade and session-terminal states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No position; watching for a signal
    Flat,
    /// Order handed to the driver, confirmation pending
    Entering,
    /// Position held, accumulating holding time
    Open,
    /// Settlement in progress
    Closing,
    /// Session over; no further transitions
    Ended,
}

/// Why the session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    DurationElapsed,
    FeedTerminated,
    FatalError,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::DurationElapsed => write!(f, "session duration elapsed"),
            EndReason::FeedTerminated => write!(f, "feed terminated"),
            EndReason::FatalError => write!(f, "fatal error"),
        }
    }
}

/// Order the driver should place
#[derive(Debug, Clone)]
pub struct OrderIntent {
    pub direction: Direction,
    pub stake: Decimal,
    /// Spot price at the entry tick
    pub price: f64,
    /// Venue time of the entry tick
    pub time: DateTime<Utc>,
    /// Signal state backing the entry
    pub snapshot: SignalSnapshot,
}

/// Decision produced for one tick
#[derive(Debug)]
pub enum Action {
    /// Nothing to do
    Hold,
    /// Place this order, then call `entry_filled` or `entry_rejected`
    Enter(OrderIntent),
    /// A position just settled; hand the record to the sinks
    Settled(TradeRecord),
    /// The session is over
    End(EndReason),
}

/// Configuration slice consumed by the state machine
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub symbol: String,
    pub session_duration: Duration,
    /// Holding time after which an open position settles
    pub hold_threshold: Duration,
    /// Minimum spacing between entries
    pub cooldown: Duration,
    /// Fraction of stake paid out on a win
    pub payout_rate: Decimal,
    pub stake: StakePolicy,
}

/// The trading session state machine
pub struct TradingSession<S: SignalProvider> {
    settings: SessionSettings,
    signals: S,
    account: Account,
    initial_balance: Decimal,
    state: SessionState,
    position: Option<Position>,
    /// Time of the first tick; session duration counts from here
    started_at: Option<DateTime<Utc>>,
    /// Time of the last entry; cooldown counts from here
    last_action_at: Option<DateTime<Utc>>,
}

impl<S: SignalProvider> TradingSession<S> {
    pub fn new(settings: SessionSettings, signals: S, initial_balance: Decimal) -> Self {
        Self {
            settings,
            signals,
            account: Account::new(initial_balance),
            initial_balance,
            state: SessionState::Flat,
            position: None,
            started_at: None,
            last_action_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Advance the machine by one feed event
    pub fn on_tick(&mut self, tick: &TickEvent) -> Action {
        if self.state == SessionState::Ended {
            return Action::Hold;
        }

        let started_at = *self.started_at.get_or_insert(tick.time);
        if self.last_action_at.is_none() {
            self.last_action_at = Some(tick.time);
        }

        let snapshot = self.signals.evaluate(tick.price);

        if tick.time - started_at >= self.settings.session_duration {
            self.state = SessionState::Ended;
            return Action::End(EndReason::DurationElapsed);
        }

        match self.state {
            SessionState::Flat => self.consider_entry(tick, snapshot),
            SessionState::Open => self.consider_exit(tick),
            // Transient states between on_tick and the driver's report;
            // kept total so a stray tick cannot wedge the machine.
            SessionState::Entering | SessionState::Closing | SessionState::Ended => Action::Hold,
        }
    }

    /// The driver's order was confirmed: open the position. At most one
    /// position exists per session at any time.
    pub fn entry_filled(&mut self, intent: &OrderIntent, contract_id: String) {
        self.position = Some(Position {
            symbol: self.settings.symbol.clone(),
            direction: intent.direction,
            entry_price: intent.price,
            entry_time: intent.time,
            stake: intent.stake,
            contract_id,
            entry_signals: intent.snapshot.clone(),
        });
        self.state = SessionState::Open;
        self.last_action_at = Some(intent.time);
    }

    /// The driver's order failed: stay flat, account untouched
    pub fn entry_rejected(&mut self) {
        self.state = SessionState::Flat;
    }

    /// Consume the session and produce its one final summary
    pub fn finish(self) -> SessionSummary {
        SessionSummary {
            symbol: self.settings.symbol,
            initial_balance: self.initial_balance,
            final_balance: self.account.balance,
            pnl: self.account.balance - self.initial_balance,
            total_trades: self.account.total_trades,
            winning_trades: self.account.winning_trades,
            losing_trades: self.account.losing_trades,
            win_rate: self.account.win_rate(),
        }
    }

    fn consider_entry(&mut self, tick: &TickEvent, snapshot: SignalSnapshot) -> Action {
        let cooled_down = self
            .last_action_at
            .is_none_or(|last| tick.time - last > self.settings.cooldown);
        if !cooled_down {
            return Action::Hold;
        }
        let Some(direction) = snapshot.direction else {
            return Action::Hold;
        };

        let stake = self.settings.stake.stake(
            self.account.balance,
            self.account.consecutive_losses,
            snapshot.volatility,
            snapshot.strength,
        );
        debug!(
            "signal {} at {} (rsi {:.1}, strength {}), stake {}",
            direction, tick.price, snapshot.rsi, snapshot.strength, stake
        );
        self.state = SessionState::Entering;
        Action::Enter(OrderIntent {
            direction,
            stake,
            price: tick.price,
            time: tick.time,
            snapshot,
        })
    }

    fn consider_exit(&mut self, tick: &TickEvent) -> Action {
        let due = self
            .position
            .as_ref()
            .is_some_and(|p| tick.time - p.entry_time > self.settings.hold_threshold);
        if !due {
            return Action::Hold;
        }
        self.state = SessionState::Closing;
        let Some(position) = self.position.take() else {
            // Unreachable: `due` implies a position exists.
            self.state = SessionState::Flat;
            return Action::Hold;
        };
        let record = self.settle(position, tick);
        self.state = SessionState::Flat;
        Action::Settled(record)
    }

    /// Close a position against the current spot price. Directional P&L
    /// decides the outcome; a win pays a fixed fraction of stake, a loss
    /// forfeits it entirely. Account update and record are one step.
    fn settle(&mut self, position: Position, tick: &TickEvent) -> TradeRecord {
        let delta = position.direction.sign() * (tick.price - position.entry_price);
        let pnl = if delta > 0.0 {
            (position.stake * self.settings.payout_rate).round_dp(2)
        } else {
            -position.stake
        };
        let outcome = self.account.settle(pnl);

        TradeRecord {
            closed_at: tick.time,
            symbol: position.symbol,
            direction: position.direction,
            entry_price: position.entry_price,
            exit_price: tick.price,
            stake: position.stake,
            outcome,
            pnl,
            signals: position.entry_signals,
            balance_after: self.account.balance,
        }
    }
}
