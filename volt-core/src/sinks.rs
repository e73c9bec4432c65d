//! External sink interfaces
//!
//! Both sinks are fire-and-forget from the session's point of view: a
//! failing notification or ledger write is logged by the caller and never
//! affects trading state.

use async_trait::async_trait;

use crate::account::{Position, SessionSummary, TradeRecord};

/// Receives lifecycle notifications (Telegram in production)
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn trade_opened(&self, position: &Position);
    async fn trade_closed(&self, record: &TradeRecord);
    async fn session_summary(&self, summary: &SessionSummary);
}

/// Append-only trade history
pub trait LedgerSink: Send {
    fn append(&mut self, record: &TradeRecord) -> anyhow::Result<()>;
}
