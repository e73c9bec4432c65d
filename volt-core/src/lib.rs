//! Core types for the Volt trading bot
//!
//! This crate defines the shared data structures used across the bot:
//! market events, the trading account, positions, trade records, and the
//! collaborator interfaces (signal provider, notification and ledger sinks).

pub mod account;
pub mod signal;
pub mod sinks;
pub mod types;

pub use account::{Account, Position, SessionSummary, TradeOutcome, TradeRecord};
pub use signal::{BandPosition, SignalProvider, SignalSnapshot};
pub use sinks::{LedgerSink, NotificationSink};
pub use types::{Direction, TickEvent};
