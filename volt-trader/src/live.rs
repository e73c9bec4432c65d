//! Live trading driver
//!
//! Wires the venue client to the session state machine and the sinks:
//! connect → authorize → subscribe → consume ticks, placing and settling
//! orders as the session decides. Order-level failures stay contained to
//! the attempt; transport and auth failures end the session. Every
//! termination path closes the connection and flushes exactly one summary.

use tracing::{error, info, warn};

use volt_core::{LedgerSink, NotificationSink, SessionSummary};
use volt_deriv::{DerivClient, DerivError, OrderGateway, OrderSpec, TickFeed};

use crate::config::Config;
use crate::indicators::TechnicalIndicators;
use crate::session::{Action, EndReason, TradingSession};

/// One live trading run over a single connection
pub struct LiveTrader {
    config: Config,
    notifier: Box<dyn NotificationSink>,
    ledger: Box<dyn LedgerSink>,
}

impl LiveTrader {
    pub fn new(
        config: Config,
        notifier: Box<dyn NotificationSink>,
        ledger: Box<dyn LedgerSink>,
    ) -> Self {
        Self {
            config,
            notifier,
            ledger,
        }
    }

    /// Run the session to completion. Fatal errors are returned after the
    /// connection is closed and the final summary has been emitted.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut client = DerivClient::new(&self.config.endpoint, &self.config.app_id);
        client.connect().await?;
        if let Err(err) = client.authorize(&self.config.api_token).await {
            client.close().await;
            return Err(err.into());
        }
        let gateway = client.order_gateway()?;
        let feed = client.tick_feed()?;

        let mut session = TradingSession::new(
            self.config.session_settings(),
            TechnicalIndicators::default(),
            self.config.initial_balance,
        );

        let outcome = self.trade_loop(&gateway, &feed, &mut session).await;

        client.close().await;

        let summary = session.finish();
        log_summary(&summary);
        self.notifier.session_summary(&summary).await;

        match outcome {
            Ok(reason) => {
                info!("session ended: {}", reason);
                Ok(())
            }
            Err(err) => {
                error!("session ended on fatal error: {}", err);
                Err(err.into())
            }
        }
    }

    async fn trade_loop(
        &mut self,
        gateway: &OrderGateway,
        feed: &TickFeed,
        session: &mut TradingSession<TechnicalIndicators>,
    ) -> Result<EndReason, DerivError> {
        feed.subscribe(&self.config.symbol).await?;

        let mut tick_count = 0u64;
        loop {
            let Some(tick) = feed.next().await else {
                return Ok(EndReason::FeedTerminated);
            };
            tick_count += 1;
            if tick_count % 10 == 0 {
                let account = session.account();
                info!(
                    "[{}] price {:.4} | balance {} | trades {}/{}W",
                    self.config.symbol,
                    tick.price,
                    account.balance,
                    account.total_trades,
                    account.winning_trades,
                );
            }

            match session.on_tick(&tick) {
                Action::Hold => {}
                Action::Enter(intent) => {
                    info!(
                        "entering {} at {:.4}, stake {}",
                        intent.direction, intent.price, intent.stake
                    );
                    let spec = OrderSpec {
                        symbol: self.config.symbol.clone(),
                        direction: intent.direction,
                        stake: intent.stake,
                        currency: self.config.currency.clone(),
                        duration: self.config.contract_duration_secs,
                        duration_unit: "s".to_string(),
                    };
                    match gateway.buy(&spec).await {
                        Ok(contract) => {
                            info!(
                                "contract {} opened, payout {}",
                                contract.contract_id, contract.payout
                            );
                            session.entry_filled(&intent, contract.contract_id.to_string());
                            if let Some(position) = session.position() {
                                self.notifier.trade_opened(position).await;
                            }
                        }
                        Err(err) if err.is_fatal() => {
                            session.entry_rejected();
                            return Err(err);
                        }
                        Err(err) => {
                            // Recoverable: rejected quote/order or reply
                            // budget exhausted. Stay flat and keep trading.
                            warn!("order attempt failed, staying flat: {}", err);
                            session.entry_rejected();
                        }
                    }
                }
                Action::Settled(record) => {
                    info!(
                        "{} {} | entry {:.4} exit {:.4} | pnl {:+} | balance {}",
                        record.outcome,
                        record.symbol,
                        record.entry_price,
                        record.exit_price,
                        record.pnl,
                        record.balance_after,
                    );
                    if let Err(err) = self.ledger.append(&record) {
                        warn!("ledger append failed: {}", err);
                    }
                    self.notifier.trade_closed(&record).await;
                }
                Action::End(reason) => return Ok(reason),
            }
        }
    }
}

fn log_summary(summary: &SessionSummary) {
    info!("================ session summary ================");
    info!("symbol:          {}", summary.symbol);
    info!("initial balance: {}", summary.initial_balance);
    info!("final balance:   {}", summary.final_balance);
    info!("p&l:             {:+}", summary.pnl);
    info!(
        "trades:          {} ({} wins / {} losses)",
        summary.total_trades, summary.winning_trades, summary.losing_trades
    );
    match summary.win_rate {
        Some(rate) => info!("win rate:        {:.1}%", rate),
        None => info!("win rate:        n/a"),
    }
    info!("=================================================");
}
