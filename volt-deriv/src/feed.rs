//! Live tick subscription feed
//!
//! Pulls decoded frames off the shared queue and yields tick events until a
//! close/error sentinel arrives. The feed is not restartable: once it
//! returns `None`, a fresh connection and subscription are required.

use std::sync::Arc;

use tracing::{debug, info, warn};

use volt_core::TickEvent;

use crate::error::DerivError;
use crate::queue::PendingQueue;
use crate::transport::Transport;
use crate::wire::{Frame, TicksRequest, CLOSED_CODE};

/// Unbounded stream of market updates for one subscription
pub struct TickFeed {
    transport: Arc<dyn Transport>,
    queue: Arc<PendingQueue>,
}

impl std::fmt::Debug for TickFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickFeed").finish_non_exhaustive()
    }
}

impl TickFeed {
    pub(crate) fn new(transport: Arc<dyn Transport>, queue: Arc<PendingQueue>) -> Self {
        Self { transport, queue }
    }

    /// Subscribe to live ticks for `symbol`. Deduplication of repeated
    /// subscriptions is the caller's responsibility.
    pub async fn subscribe(&self, symbol: &str) -> Result<(), DerivError> {
        let request = TicksRequest::new(symbol);
        self.transport.send(serde_json::to_string(&request)?).await?;
        info!("[Deriv WS] subscribed to ticks for {}", symbol);
        Ok(())
    }

    /// Next market update, or `None` once the feed has terminated. May wait
    /// indefinitely between ticks; there is no consumption timeout.
    pub async fn next(&self) -> Option<TickEvent> {
        loop {
            match self.queue.pop().await {
                Frame::Tick(tick) => return Some(tick.to_event()),
                Frame::Error(err) => {
                    if err.code.as_deref() == Some(CLOSED_CODE) {
                        info!("[Deriv WS] feed closed");
                    } else {
                        warn!(
                            "[Deriv WS] feed terminated: {} ({})",
                            err.message,
                            err.code.as_deref().unwrap_or("unknown")
                        );
                    }
                    return None;
                }
                other => {
                    // Stray non-stream frames (subscription echoes, late
                    // replies) are consumed here, not re-queued: nothing
                    // else will ever claim them.
                    debug!("[Deriv WS] feed skipping non-stream frame: {:?}", other);
                }
            }
        }
    }
}
