//! Market event and direction primitives

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Predicted price movement a position bets on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Price rises over the contract window
    Up,
    /// Price falls over the contract window
    Down,
}

impl Direction {
    /// Venue contract type for this direction
    pub fn contract_type(&self) -> &'static str {
        match self {
            Direction::Up => "CALL",
            Direction::Down => "PUT",
        }
    }

    /// Sign applied to a raw price delta when computing directional P&L
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.contract_type())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CALL" | "UP" => Ok(Direction::Up),
            "PUT" | "DOWN" => Ok(Direction::Down),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

/// One market price update, already decoded from the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickEvent {
    /// Venue symbol the update is for
    pub symbol: String,
    /// Spot price
    pub price: f64,
    /// Venue timestamp of the update
    pub time: DateTime<Utc>,
}

impl TickEvent {
    pub fn new(symbol: impl Into<String>, price: f64, time: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_maps_to_contract_type() {
        assert_eq!(Direction::Up.contract_type(), "CALL");
        assert_eq!(Direction::Down.contract_type(), "PUT");
        assert_eq!("CALL".parse::<Direction>().unwrap(), Direction::Up);
        assert_eq!("put".parse::<Direction>().unwrap(), Direction::Down);
        assert!("SIDEWAYS".parse::<Direction>().is_err());
    }

    #[test]
    fn direction_sign_flips_for_down() {
        assert_eq!(Direction::Up.sign(), 1.0);
        assert_eq!(Direction::Down.sign(), -1.0);
    }
}
