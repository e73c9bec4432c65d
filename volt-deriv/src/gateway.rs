//! Two-phase order placement: quote, then confirm
//!
//! Phase 1 requests a proposal for the contract; phase 2 buys it by id at
//! the quoted stake. There is deliberately no cross-phase retry — a proposal
//! is single-use and time-bound, so any failure sends the caller back to
//! phase 1 for a fresh quote.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use volt_core::Direction;

use crate::error::DerivError;
use crate::router::{MessageRouter, MAX_REPLY_ATTEMPTS};
use crate::wire::{BuyRequest, ConfirmMsg, Frame, ProposalRequest};

/// Parameters for one rise/fall contract purchase
#[derive(Debug, Clone)]
pub struct OrderSpec {
    pub symbol: String,
    pub direction: Direction,
    /// Stake in account currency
    pub stake: Decimal,
    pub currency: String,
    /// Contract duration in `duration_unit`s
    pub duration: u32,
    /// "s" for seconds, "m" for minutes
    pub duration_unit: String,
}

/// A confirmed contract returned by the venue
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    pub contract_id: u64,
    pub buy_price: f64,
    pub payout: f64,
    pub start_time: DateTime<Utc>,
    pub longcode: String,
}

impl From<ConfirmMsg> for Contract {
    fn from(msg: ConfirmMsg) -> Self {
        Self {
            contract_id: msg.contract_id,
            buy_price: msg.buy_price,
            payout: msg.payout,
            start_time: DateTime::from_timestamp(msg.start_time, 0).unwrap_or_else(Utc::now),
            longcode: msg.longcode,
        }
    }
}

/// Places orders over the multiplexed connection
#[derive(Clone)]
pub struct OrderGateway {
    router: MessageRouter,
}

impl std::fmt::Debug for OrderGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderGateway").finish_non_exhaustive()
    }
}

impl OrderGateway {
    pub(crate) fn new(router: MessageRouter) -> Self {
        Self { router }
    }

    /// Buy one contract. Quote errors map to `QuoteRejected`, confirm errors
    /// to `OrderRejected`; an exhausted attempt budget in either phase maps
    /// to `ResponseTimeout`. All three leave the account untouched.
    pub async fn buy(&self, spec: &OrderSpec) -> Result<Contract, DerivError> {
        let amount = spec.stake.to_f64().unwrap_or(0.0);

        // Phase 1: quote
        let request = ProposalRequest {
            proposal: 1,
            amount,
            basis: "stake",
            contract_type: spec.direction.contract_type(),
            currency: spec.currency.clone(),
            duration: spec.duration,
            duration_unit: spec.duration_unit.clone(),
            symbol: spec.symbol.clone(),
        };
        let reply = self
            .router
            .send_and_await(
                &request,
                |f| matches!(f, Frame::Quote(_) | Frame::Error(_)),
                MAX_REPLY_ATTEMPTS,
            )
            .await?;
        let proposal = match reply {
            Frame::Quote(quote) => quote,
            // A connection sentinel consumed here must stay fatal, not
            // masquerade as a venue rejection.
            Frame::Error(err) if err.is_sentinel() => {
                return Err(DerivError::Transport(err.message))
            }
            Frame::Error(err) => return Err(DerivError::QuoteRejected(err.message)),
            other => {
                return Err(DerivError::transport(format!(
                    "unexpected quote reply: {:?}",
                    other
                )))
            }
        };
        debug!(
            "[Deriv WS] proposal {} ask={} payout={}",
            proposal.id, proposal.ask_price, proposal.payout
        );

        // Phase 2: confirm at the quoted id
        let request = BuyRequest {
            buy: proposal.id,
            price: amount,
        };
        let reply = self
            .router
            .send_and_await(
                &request,
                |f| matches!(f, Frame::Confirm(_) | Frame::Error(_)),
                MAX_REPLY_ATTEMPTS,
            )
            .await?;
        match reply {
            Frame::Confirm(confirm) => Ok(Contract::from(confirm)),
            Frame::Error(err) if err.is_sentinel() => Err(DerivError::Transport(err.message)),
            Frame::Error(err) => Err(DerivError::OrderRejected(err.message)),
            other => Err(DerivError::transport(format!(
                "unexpected buy reply: {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::PendingQueue;
    use crate::transport::testing::MockTransport;
    use crate::wire::{ErrorMsg, QuoteMsg, TickMsg};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn gateway_with_queue() -> (OrderGateway, Arc<PendingQueue>, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let queue = Arc::new(PendingQueue::new());
        let router = MessageRouter::new(
            Arc::clone(&transport) as Arc<dyn crate::transport::Transport>,
            Arc::clone(&queue),
        );
        (OrderGateway::new(router), queue, transport)
    }

    fn spec() -> OrderSpec {
        OrderSpec {
            symbol: "R_75".to_string(),
            direction: Direction::Up,
            stake: dec!(12.50),
            currency: "USD".to_string(),
            duration: 15,
            duration_unit: "s".to_string(),
        }
    }

    fn tick(epoch: i64) -> Frame {
        Frame::Tick(TickMsg {
            symbol: "R_75".to_string(),
            quote: 1000.0,
            epoch,
        })
    }

    fn quote(id: &str) -> Frame {
        Frame::Quote(QuoteMsg {
            id: id.to_string(),
            ask_price: 12.5,
            payout: 24.3,
            spot: Some(1000.0),
        })
    }

    fn confirm(contract_id: u64) -> Frame {
        Frame::Confirm(crate::wire::ConfirmMsg {
            contract_id,
            buy_price: 12.5,
            payout: 24.3,
            start_time: 1_700_000_000,
            longcode: "Win payout if...".to_string(),
        })
    }

    fn venue_error(message: &str) -> Frame {
        Frame::Error(ErrorMsg {
            code: Some("ContractBuyValidationError".to_string()),
            message: message.to_string(),
        })
    }

    #[tokio::test]
    async fn buy_runs_both_phases_and_returns_contract() {
        let (gateway, queue, transport) = gateway_with_queue();
        queue.push(tick(1));
        queue.push(quote("prop-1"));
        queue.push(tick(2));
        queue.push(confirm(42));

        let contract = gateway.buy(&spec()).await.unwrap();
        assert_eq!(contract.contract_id, 42);
        assert_eq!(contract.buy_price, 12.5);

        let sent = transport.sent_payloads();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains(r#""proposal":1"#));
        assert!(sent[0].contains(r#""contract_type":"CALL""#));
        assert!(sent[0].contains(r#""basis":"stake""#));
        assert!(sent[1].contains(r#""buy":"prop-1""#));

        // Interleaved ticks are preserved for the feed.
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn quote_error_fails_with_quote_rejected() {
        let (gateway, queue, transport) = gateway_with_queue();
        queue.push(venue_error("Contract not offered"));

        let err = gateway.buy(&spec()).await.unwrap_err();
        assert!(matches!(err, DerivError::QuoteRejected(ref m) if m == "Contract not offered"));

        // Phase 2 is never attempted: one outbound request only.
        assert_eq!(transport.sent_payloads().len(), 1);
    }

    #[tokio::test]
    async fn confirm_error_fails_with_order_rejected() {
        let (gateway, queue, transport) = gateway_with_queue();
        queue.push(quote("prop-2"));
        queue.push(venue_error("Quote expired"));

        let err = gateway.buy(&spec()).await.unwrap_err();
        assert!(matches!(err, DerivError::OrderRejected(ref m) if m == "Quote expired"));

        // No automatic restart from phase 1 with a stale quote.
        let sent = transport.sent_payloads();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].contains(r#""buy":"prop-2""#));
    }

    #[tokio::test]
    async fn connection_sentinel_mid_rpc_is_fatal() {
        let (gateway, queue, _) = gateway_with_queue();
        queue.push(Frame::Error(ErrorMsg {
            code: Some(crate::wire::TRANSPORT_CODE.to_string()),
            message: "broken pipe".to_string(),
        }));

        let err = gateway.buy(&spec()).await.unwrap_err();
        assert!(matches!(err, DerivError::Transport(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn quote_phase_times_out_on_stream_only_traffic() {
        let (gateway, queue, _) = gateway_with_queue();
        for epoch in 0..MAX_REPLY_ATTEMPTS as i64 + 2 {
            queue.push(tick(epoch));
        }

        let err = gateway.buy(&spec()).await.unwrap_err();
        assert!(matches!(err, DerivError::ResponseTimeout { .. }));
    }

    #[tokio::test]
    async fn put_direction_maps_to_put_contract_type() {
        let (gateway, queue, transport) = gateway_with_queue();
        queue.push(quote("prop-3"));
        queue.push(confirm(7));

        let mut put_spec = spec();
        put_spec.direction = Direction::Down;
        gateway.buy(&put_spec).await.unwrap();

        assert!(transport.sent_payloads()[0].contains(r#""contract_type":"PUT""#));
    }
}
