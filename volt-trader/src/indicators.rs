//! Rolling technical indicators used as the default signal provider
//!
//! Keeps a bounded window of recent prices and derives RSI, a MACD
//! histogram, Bollinger band position, and return volatility from it on
//! every tick. The directional rule is strict RSI: below 30 bets up, above
//! 70 bets down. Signal strength counts how many of the other indicators
//! agree with that direction.

use std::collections::VecDeque;

use volt_core::{BandPosition, Direction, SignalProvider, SignalSnapshot};

const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const BOLLINGER_PERIOD: usize = 20;
const BOLLINGER_STD: f64 = 2.0;
const VOLATILITY_PERIOD: usize = 20;

const RSI_LOWER: f64 = 30.0;
const RSI_UPPER: f64 = 70.0;

/// Default rolling window of 50 prices, enough for the slowest indicator
pub const DEFAULT_WINDOW: usize = 50;

/// Rolling-window indicator engine
#[derive(Debug, Clone)]
pub struct TechnicalIndicators {
    prices: VecDeque<f64>,
    window: usize,
}

impl TechnicalIndicators {
    pub fn new(window: usize) -> Self {
        Self {
            prices: VecDeque::with_capacity(window),
            window,
        }
    }

    fn push(&mut self, price: f64) {
        if self.prices.len() == self.window {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    /// RSI over the trailing period; neutral 50 until warmed up
    fn rsi(&self) -> f64 {
        if self.prices.len() < RSI_PERIOD + 1 {
            return 50.0;
        }
        let prices: Vec<f64> = self.prices.iter().copied().collect();
        let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
        let recent = &deltas[deltas.len() - RSI_PERIOD..];

        let avg_gain: f64 =
            recent.iter().filter(|d| **d > 0.0).sum::<f64>() / RSI_PERIOD as f64;
        let avg_loss: f64 =
            -recent.iter().filter(|d| **d < 0.0).sum::<f64>() / RSI_PERIOD as f64;

        if avg_loss == 0.0 {
            return 100.0;
        }
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }

    fn ema(data: &[f64], period: usize) -> f64 {
        if data.len() < period {
            return data.iter().sum::<f64>() / data.len().max(1) as f64;
        }
        let multiplier = 2.0 / (period as f64 + 1.0);
        let mut ema = data[..period].iter().sum::<f64>() / period as f64;
        for price in &data[period..] {
            ema = (price - ema) * multiplier + ema;
        }
        ema
    }

    /// MACD histogram (fast EMA minus slow EMA); zero until warmed up
    fn macd_histogram(&self) -> f64 {
        if self.prices.len() < MACD_SLOW {
            return 0.0;
        }
        let prices: Vec<f64> = self.prices.iter().copied().collect();
        Self::ema(&prices, MACD_FAST) - Self::ema(&prices, MACD_SLOW)
    }

    /// (middle, upper, lower) Bollinger bands; degenerate on short history
    fn bollinger(&self) -> (f64, f64, f64) {
        if self.prices.len() < BOLLINGER_PERIOD {
            let last = self.prices.back().copied().unwrap_or(0.0);
            return (last, last, last);
        }
        let recent: Vec<f64> = self
            .prices
            .iter()
            .copied()
            .skip(self.prices.len() - BOLLINGER_PERIOD)
            .collect();
        let middle = recent.iter().sum::<f64>() / recent.len() as f64;
        let variance =
            recent.iter().map(|p| (p - middle).powi(2)).sum::<f64>() / recent.len() as f64;
        let std = variance.sqrt();
        (middle, middle + BOLLINGER_STD * std, middle - BOLLINGER_STD * std)
    }

    /// Standard deviation of simple returns over the period, in percent
    fn volatility(&self) -> f64 {
        if self.prices.len() < VOLATILITY_PERIOD {
            return 0.0;
        }
        let recent: Vec<f64> = self
            .prices
            .iter()
            .copied()
            .skip(self.prices.len() - VOLATILITY_PERIOD)
            .collect();
        let returns: Vec<f64> = recent.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let variance =
            returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
        variance.sqrt() * 100.0
    }
}

impl Default for TechnicalIndicators {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl SignalProvider for TechnicalIndicators {
    fn evaluate(&mut self, price: f64) -> SignalSnapshot {
        self.push(price);

        let rsi = self.rsi();
        let macd_histogram = self.macd_histogram();
        let (_, upper, lower) = self.bollinger();
        let bb_position = if price <= lower {
            BandPosition::Lower
        } else if price >= upper {
            BandPosition::Upper
        } else {
            BandPosition::Middle
        };
        let volatility = self.volatility();

        let direction = if rsi < RSI_LOWER {
            Some(Direction::Up)
        } else if rsi > RSI_UPPER {
            Some(Direction::Down)
        } else {
            None
        };

        let strength = match direction {
            None => 0,
            Some(direction) => {
                let macd_agrees = match direction {
                    Direction::Up => macd_histogram > 0.0,
                    Direction::Down => macd_histogram < 0.0,
                };
                let bands_agree = match direction {
                    Direction::Up => bb_position == BandPosition::Lower,
                    Direction::Down => bb_position == BandPosition::Upper,
                };
                1 + u8::from(macd_agrees) + u8::from(bands_agree)
            }
        };

        SignalSnapshot {
            direction,
            strength,
            rsi,
            macd_histogram,
            bb_position,
            volatility,
        }
    }
}
