//! Session state machine scenarios, driven entirely without a socket

use std::collections::VecDeque;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal_macros::dec;

use volt_core::{BandPosition, Direction, SignalProvider, SignalSnapshot, TickEvent, TradeOutcome};
use volt_trader::{Action, EndReason, SessionSettings, SessionState, StakePolicy, TradingSession};

/// Replays a fixed sequence of directional signals; neutral once exhausted
struct ScriptedSignals {
    script: VecDeque<Option<Direction>>,
}

impl ScriptedSignals {
    fn new(script: Vec<Option<Direction>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl SignalProvider for ScriptedSignals {
    fn evaluate(&mut self, _price: f64) -> SignalSnapshot {
        let direction = self.script.pop_front().unwrap_or(None);
        let rsi = match direction {
            Some(Direction::Up) => 25.0,
            Some(Direction::Down) => 75.0,
            None => 50.0,
        };
        SignalSnapshot {
            direction,
            strength: u8::from(direction.is_some()),
            rsi,
            macd_histogram: 0.0,
            bb_position: BandPosition::Middle,
            volatility: 0.0,
        }
    }
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
}

fn tick(price: f64, secs: i64) -> TickEvent {
    TickEvent::new("R_75", price, at(secs))
}

fn settings() -> SessionSettings {
    SessionSettings {
        symbol: "R_75".to_string(),
        session_duration: Duration::minutes(30),
        hold_threshold: Duration::seconds(20),
        cooldown: Duration::seconds(25),
        payout_rate: dec!(0.95),
        stake: StakePolicy {
            risk_percent: dec!(1),
            min_stake: dec!(10),
            max_stake_fraction: dec!(0.05),
        },
    }
}

fn session(script: Vec<Option<Direction>>) -> TradingSession<ScriptedSignals> {
    TradingSession::new(settings(), ScriptedSignals::new(script), dec!(10000))
}

#[test]
fn oversold_signal_after_cooldown_enters_up() {
    // Scenario: flat, cooldown elapsed, RSI 25 -> an Up order goes out and
    // a successful fill opens the position at the tick price.
    let mut session = session(vec![None, Some(Direction::Up)]);

    assert!(matches!(session.on_tick(&tick(1000.0, 0)), Action::Hold));
    assert_eq!(session.state(), SessionState::Flat);

    let action = session.on_tick(&tick(995.0, 26));
    let Action::Enter(intent) = action else {
        panic!("expected an entry, got {:?}", action);
    };
    assert_eq!(intent.direction, Direction::Up);
    assert_eq!(intent.stake, dec!(100)); // 1% of 10_000
    assert_eq!(session.state(), SessionState::Entering);

    session.entry_filled(&intent, "123456".to_string());
    assert_eq!(session.state(), SessionState::Open);
    let position = session.position().expect("position after fill");
    assert_eq!(position.entry_price, 995.0);
    assert_eq!(position.stake, dec!(100));
    assert_eq!(position.contract_id, "123456");
}

#[test]
fn signal_within_cooldown_is_ignored() {
    let mut session = session(vec![None, Some(Direction::Up), Some(Direction::Up)]);

    session.on_tick(&tick(1000.0, 0));
    // 10s since the baseline: still cooling down, signal or not
    assert!(matches!(session.on_tick(&tick(990.0, 10)), Action::Hold));
    assert_eq!(session.state(), SessionState::Flat);

    // 26s: free to enter
    assert!(matches!(
        session.on_tick(&tick(990.0, 26)),
        Action::Enter(_)
    ));
}

#[test]
fn up_position_exiting_lower_settles_as_full_loss() {
    // Scenario: open Up position past the holding threshold with the exit
    // below entry -> full stake forfeited, loss streak increments.
    let mut session = session(vec![None, Some(Direction::Up)]);
    session.on_tick(&tick(1000.0, 0));
    let Action::Enter(intent) = session.on_tick(&tick(1000.0, 26)) else {
        panic!("expected entry");
    };
    session.entry_filled(&intent, "1".to_string());

    // Holding 14s: not due yet, and no second position may open
    assert!(matches!(session.on_tick(&tick(998.0, 40)), Action::Hold));
    assert_eq!(session.state(), SessionState::Open);

    // Holding 21s: settle against the lower exit
    let action = session.on_tick(&tick(998.0, 47));
    let Action::Settled(record) = action else {
        panic!("expected settlement, got {:?}", action);
    };
    assert_eq!(record.outcome, TradeOutcome::Loss);
    assert_eq!(record.pnl, dec!(-100));
    assert_eq!(record.entry_price, 1000.0);
    assert_eq!(record.exit_price, 998.0);
    assert_eq!(session.account().balance, dec!(9900));
    assert_eq!(session.account().consecutive_losses, 1);
    assert_eq!(session.state(), SessionState::Flat);
    assert!(session.position().is_none());
}

#[test]
fn down_position_profits_from_falling_price() {
    let mut session = session(vec![None, Some(Direction::Down)]);
    session.on_tick(&tick(1000.0, 0));
    let Action::Enter(intent) = session.on_tick(&tick(1000.0, 26)) else {
        panic!("expected entry");
    };
    assert_eq!(intent.direction, Direction::Down);
    session.entry_filled(&intent, "2".to_string());

    let Action::Settled(record) = session.on_tick(&tick(995.0, 47)) else {
        panic!("expected settlement");
    };
    assert_eq!(record.outcome, TradeOutcome::Win);
    // Win pays the payout fraction of stake: 100 * 0.95
    assert_eq!(record.pnl, dec!(95));
    assert_eq!(session.account().balance, dec!(10095));
    assert_eq!(session.account().consecutive_losses, 0);
}

#[test]
fn rejected_entry_leaves_session_flat_and_account_untouched() {
    // Scenario: the quote phase failed; the session must look as if the
    // attempt never happened.
    let mut session = session(vec![None, Some(Direction::Up), None, Some(Direction::Up)]);
    session.on_tick(&tick(1000.0, 0));
    let Action::Enter(_) = session.on_tick(&tick(1000.0, 26)) else {
        panic!("expected entry");
    };
    session.entry_rejected();

    assert_eq!(session.state(), SessionState::Flat);
    assert!(session.position().is_none());
    assert_eq!(session.account().balance, dec!(10000));
    assert_eq!(session.account().total_trades, 0);

    // The session keeps trading afterwards
    session.on_tick(&tick(1000.0, 40));
    assert!(matches!(
        session.on_tick(&tick(1000.0, 66)),
        Action::Enter(_)
    ));
}

#[test]
fn loss_streak_tracks_losses_since_last_win() {
    // One script slot per tick: entries at the 2nd, 4th, and 6th ticks,
    // with the in-position ticks consuming neutral slots.
    let mut session = session(vec![
        None,
        Some(Direction::Up), // trade 1, will lose
        None,
        Some(Direction::Up), // trade 2, will lose
        None,
        Some(Direction::Up), // trade 3, will win
    ]);
    let mut expected_balance = dec!(10000);

    session.on_tick(&tick(1000.0, 0));

    // Trade 1: entry at 26, loss at 47
    let Action::Enter(intent) = session.on_tick(&tick(1000.0, 26)) else {
        panic!("expected entry 1");
    };
    let stake1 = intent.stake;
    assert_eq!(stake1, dec!(100));
    session.entry_filled(&intent, "1".to_string());
    let Action::Settled(record) = session.on_tick(&tick(999.0, 47)) else {
        panic!("expected settlement 1");
    };
    expected_balance += record.pnl;
    assert_eq!(record.pnl, -stake1);
    assert_eq!(session.account().consecutive_losses, 1);

    // Trade 2: entry at 52 (cooldown counts from the last entry), loss at 73
    let Action::Enter(intent) = session.on_tick(&tick(1000.0, 52)) else {
        panic!("expected entry 2");
    };
    assert_eq!(intent.stake, dec!(99)); // 1% of the reduced balance
    session.entry_filled(&intent, "2".to_string());
    let Action::Settled(record) = session.on_tick(&tick(999.0, 73)) else {
        panic!("expected settlement 2");
    };
    expected_balance += record.pnl;
    assert_eq!(session.account().consecutive_losses, 2);

    // Trade 3: two-loss streak halves risk via the 0.7 factor
    let Action::Enter(intent) = session.on_tick(&tick(1000.0, 78)) else {
        panic!("expected entry 3");
    };
    assert_eq!(intent.stake, dec!(68.61)); // 9801 * 1% * 0.7
    session.entry_filled(&intent, "3".to_string());
    let Action::Settled(record) = session.on_tick(&tick(1001.0, 99)) else {
        panic!("expected settlement 3");
    };
    expected_balance += record.pnl;
    assert_eq!(record.outcome, TradeOutcome::Win);
    assert_eq!(record.pnl, dec!(65.18)); // 68.61 * 0.95
    assert_eq!(session.account().consecutive_losses, 0);

    // Balance is exactly initial plus the signed P&L stream
    assert_eq!(session.account().balance, expected_balance);
    assert_eq!(session.account().balance, dec!(9866.18));

    let summary = session.finish();
    assert_eq!(summary.total_trades, 3);
    assert_eq!(summary.winning_trades, 1);
    assert_eq!(summary.losing_trades, 2);
    assert_eq!(summary.pnl, dec!(-133.82));
}

#[test]
fn at_most_one_position_at_a_time() {
    let mut session = session(vec![
        None,
        Some(Direction::Up),
        Some(Direction::Up),
        Some(Direction::Down),
    ]);
    session.on_tick(&tick(1000.0, 0));
    let Action::Enter(intent) = session.on_tick(&tick(1000.0, 26)) else {
        panic!("expected entry");
    };
    session.entry_filled(&intent, "1".to_string());

    // Signals keep firing while open; nothing may enter
    assert!(matches!(session.on_tick(&tick(990.0, 30)), Action::Hold));
    assert!(matches!(session.on_tick(&tick(990.0, 35)), Action::Hold));
    assert_eq!(session.state(), SessionState::Open);
    assert_eq!(session.account().total_trades, 0);
}

#[test]
fn session_duration_expiry_ends_the_session() {
    let mut session = session(vec![]);
    session.on_tick(&tick(1000.0, 0));

    let action = session.on_tick(&tick(1000.0, 1800));
    assert!(matches!(action, Action::End(EndReason::DurationElapsed)));
    assert_eq!(session.state(), SessionState::Ended);

    // The machine is inert afterwards
    assert!(matches!(session.on_tick(&tick(1000.0, 1801)), Action::Hold));
    assert_eq!(session.state(), SessionState::Ended);

    let summary = session.finish();
    assert_eq!(summary.total_trades, 0);
    assert_eq!(summary.final_balance, dec!(10000));
    assert!(summary.win_rate.is_none());
}

#[test]
fn summary_reflects_account_after_feed_termination() {
    // Scenario: the feed dies mid-session; the driver calls finish() and
    // gets the complete statistics for everything that settled.
    let mut session = session(vec![None, Some(Direction::Up)]);
    session.on_tick(&tick(1000.0, 0));
    let Action::Enter(intent) = session.on_tick(&tick(1000.0, 26)) else {
        panic!("expected entry");
    };
    session.entry_filled(&intent, "1".to_string());
    let Action::Settled(_) = session.on_tick(&tick(1001.0, 47)) else {
        panic!("expected settlement");
    };

    // Feed terminates here; no more ticks arrive.
    let summary = session.finish();
    assert_eq!(summary.total_trades, 1);
    assert_eq!(summary.winning_trades, 1);
    assert_eq!(summary.pnl, dec!(95));
    assert_eq!(summary.win_rate, Some(100.0));
}
