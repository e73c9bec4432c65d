//! Deriv WebSocket integration for the Volt trading bot
//!
//! One persistent duplex connection carries both synchronous request/reply
//! exchanges (quote, buy) and an unbounded live tick stream, with no native
//! request IDs. A background reader drains every inbound message into a
//! shared FIFO queue; the router correlates replies by frame kind while
//! keeping the stream intact, the gateway runs the two-phase order flow on
//! top of it, and the feed yields ticks to the session.

pub mod connection;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod queue;
pub mod router;
pub mod transport;
pub mod wire;

pub use connection::{ConnectionState, DerivClient};
pub use error::{DerivError, DerivResult};
pub use feed::TickFeed;
pub use gateway::{Contract, OrderGateway, OrderSpec};
pub use router::{MessageRouter, MAX_REPLY_ATTEMPTS};
pub use wire::Frame;
