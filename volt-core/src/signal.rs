//! Signal provider interface
//!
//! The trading session treats signal computation as an opaque collaborator:
//! it feeds in the latest price and gets back a directional snapshot. The
//! concrete indicator math lives with the implementations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Direction;

/// Where the current price sits relative to the Bollinger bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandPosition {
    Lower,
    Middle,
    Upper,
}

impl fmt::Display for BandPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandPosition::Lower => write!(f, "LOWER"),
            BandPosition::Middle => write!(f, "MIDDLE"),
            BandPosition::Upper => write!(f, "UPPER"),
        }
    }
}

/// Snapshot of the signal state at one tick
///
/// Captured on entry and carried through to the trade record, so the ledger
/// shows what the indicators looked like when the position was opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    /// Directional signal, if the provider has one
    pub direction: Option<Direction>,
    /// How many indicators agree with the direction (0 when neutral)
    pub strength: u8,
    /// Relative Strength Index, 0..100
    pub rsi: f64,
    /// MACD histogram value
    pub macd_histogram: f64,
    /// Price position relative to the Bollinger bands
    pub bb_position: BandPosition,
    /// Recent return volatility, in percent
    pub volatility: f64,
}

impl SignalSnapshot {
    /// Neutral snapshot used before the provider has enough history
    pub fn neutral(rsi: f64) -> Self {
        Self {
            direction: None,
            strength: 0,
            rsi,
            macd_histogram: 0.0,
            bb_position: BandPosition::Middle,
            volatility: 0.0,
        }
    }
}

/// Pull-based signal source consumed by the trading session
///
/// `evaluate` is called once per tick with the latest price; implementations
/// keep whatever rolling history they need internally.
pub trait SignalProvider: Send {
    fn evaluate(&mut self, price: f64) -> SignalSnapshot;
}
