//! Dynamic position sizing
//!
//! Stake starts from a fixed percentage of balance, then shrinks in high
//! volatility, grows on strong multi-indicator agreement, and shrinks again
//! during losing streaks. The result is clamped to the configured bounds
//! and rounded to currency precision.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Bounds and risk fraction for stake computation
#[derive(Debug, Clone, PartialEq)]
pub struct StakePolicy {
    /// Percent of balance risked per trade
    pub risk_percent: Decimal,
    pub min_stake: Decimal,
    /// Upper bound as a fraction of balance
    pub max_stake_fraction: Decimal,
}

impl StakePolicy {
    pub fn stake(
        &self,
        balance: Decimal,
        consecutive_losses: u32,
        volatility: f64,
        strength: u8,
    ) -> Decimal {
        let base = balance * self.risk_percent / dec!(100);

        let volatility_factor = if volatility > 0.5 {
            dec!(0.7)
        } else if volatility > 0.3 {
            dec!(0.85)
        } else {
            Decimal::ONE
        };

        let signal_factor = if strength >= 3 { dec!(1.3) } else { Decimal::ONE };

        let loss_factor = if consecutive_losses >= 3 {
            dec!(0.5)
        } else if consecutive_losses >= 2 {
            dec!(0.7)
        } else {
            Decimal::ONE
        };

        let stake = base * volatility_factor * signal_factor * loss_factor;
        let cap = balance * self.max_stake_fraction;

        self.min_stake.max(stake.min(cap)).round_dp(2)
    }
}
