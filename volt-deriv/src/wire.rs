//! Wire types for the Deriv WebSocket protocol
//!
//! Outbound requests are plain JSON objects; inbound messages carry no
//! request IDs and are classified by which top-level marker key is present
//! (`error`, `tick`, `proposal`, `buy`, `authorize`). Everything is decoded
//! exactly once, here, into the closed [`Frame`] enum — downstream code
//! never re-inspects raw payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use volt_core::TickEvent;

// ============================================================================
// Outbound Requests
// ============================================================================

/// `{"authorize": "<token>"}`
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizeRequest {
    pub authorize: String,
}

/// `{"ticks": "<symbol>", "subscribe": 1}`
#[derive(Debug, Clone, Serialize)]
pub struct TicksRequest {
    pub ticks: String,
    pub subscribe: u8,
}

impl TicksRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            ticks: symbol.into(),
            subscribe: 1,
        }
    }
}

/// Phase-1 quote request for a rise/fall contract
#[derive(Debug, Clone, Serialize)]
pub struct ProposalRequest {
    pub proposal: u8,
    pub amount: f64,
    pub basis: &'static str,
    pub contract_type: &'static str,
    pub currency: String,
    pub duration: u32,
    pub duration_unit: String,
    pub symbol: String,
}

/// Phase-2 confirmation referencing the quoted proposal
#[derive(Debug, Clone, Serialize)]
pub struct BuyRequest {
    pub buy: String,
    pub price: f64,
}

// ============================================================================
// Inbound Payloads
// ============================================================================

/// Payload under the `tick` marker key
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TickMsg {
    pub symbol: String,
    /// Spot price
    pub quote: f64,
    /// Unix seconds
    pub epoch: i64,
}

impl TickMsg {
    /// Convert to the venue-neutral event consumed by the session
    pub fn to_event(&self) -> TickEvent {
        let time = DateTime::from_timestamp(self.epoch, 0).unwrap_or_else(Utc::now);
        TickEvent::new(self.symbol.clone(), self.quote, time)
    }
}

/// Payload under the `proposal` marker key
///
/// Ephemeral: valid only between the quote and the confirm of one order
/// attempt, never reused across attempts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuoteMsg {
    pub id: String,
    pub ask_price: f64,
    pub payout: f64,
    #[serde(default)]
    pub spot: Option<f64>,
}

/// Payload under the `buy` marker key
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConfirmMsg {
    pub contract_id: u64,
    pub buy_price: f64,
    pub payout: f64,
    /// Unix seconds
    pub start_time: i64,
    #[serde(default)]
    pub longcode: String,
}

/// Payload under the `authorize` marker key
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthMsg {
    #[serde(default)]
    pub loginid: Option<String>,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Payload under the `error` marker key
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorMsg {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

impl ErrorMsg {
    fn synthetic(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.to_string()),
            message: message.into(),
        }
    }

    /// True for the reader's own close/transport sentinels, as opposed to
    /// business errors reported by the venue
    pub fn is_sentinel(&self) -> bool {
        matches!(
            self.code.as_deref(),
            Some(CLOSED_CODE) | Some(TRANSPORT_CODE)
        )
    }
}

// ============================================================================
// Frame
// ============================================================================

/// Code on the synthetic error frame pushed when the connection closes;
/// consumers blocked on the queue observe it and stop.
pub const CLOSED_CODE: &str = "connection_closed";

/// Code on the synthetic error frame pushed when the transport fails
pub const TRANSPORT_CODE: &str = "transport_error";

/// Code on error frames substituted for undecodable messages
pub const DECODE_CODE: &str = "decode_error";

/// One decoded protocol message, tagged by kind
///
/// Immutable once decoded. `Unknown` keeps the raw value so stray messages
/// (subscription echoes, forget confirmations) can still be logged.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Auth(AuthMsg),
    Tick(TickMsg),
    Quote(QuoteMsg),
    Confirm(ConfirmMsg),
    Error(ErrorMsg),
    Unknown(Value),
}

impl Frame {
    /// Decode one raw text message. Never fails: malformed input becomes an
    /// `Error` frame so the reader task keeps running.
    pub fn decode(text: &str) -> Frame {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(err) => {
                return Frame::Error(ErrorMsg::synthetic(
                    DECODE_CODE,
                    format!("unparseable message: {}", err),
                ))
            }
        };

        // Error takes precedence: venue errors echo the request's marker key
        // alongside the error object.
        if value.get("error").is_some() {
            return Self::payload(&value, "error").map_or_else(Frame::Error, Frame::Error);
        }
        if value.get("tick").is_some() {
            return Self::payload(&value, "tick").map_or_else(Frame::Error, Frame::Tick);
        }
        if value.get("proposal").is_some() {
            return Self::payload(&value, "proposal").map_or_else(Frame::Error, Frame::Quote);
        }
        if value.get("buy").is_some() {
            return Self::payload(&value, "buy").map_or_else(Frame::Error, Frame::Confirm);
        }
        if value.get("authorize").is_some() {
            return Self::payload(&value, "authorize").map_or_else(Frame::Error, Frame::Auth);
        }
        Frame::Unknown(value)
    }

    fn payload<T: serde::de::DeserializeOwned>(value: &Value, key: &str) -> Result<T, ErrorMsg> {
        serde_json::from_value(value[key].clone()).map_err(|err| {
            ErrorMsg::synthetic(DECODE_CODE, format!("bad `{}` payload: {}", key, err))
        })
    }

    /// Sentinel pushed by the reader when the transport fails mid-stream
    pub(crate) fn transport_error(message: impl Into<String>) -> Frame {
        Frame::Error(ErrorMsg::synthetic(TRANSPORT_CODE, message))
    }

    /// Sentinel pushed when the connection closes, cleanly or not
    pub(crate) fn closed() -> Frame {
        Frame::Error(ErrorMsg::synthetic(CLOSED_CODE, "connection closed"))
    }

    pub fn is_tick(&self) -> bool {
        matches!(self, Frame::Tick(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Frame::Error(_))
    }
}
