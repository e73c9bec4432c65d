//! Request/reply correlation over the shared frame queue
//!
//! The venue exposes no request IDs, so a reply is recognized purely by its
//! frame kind. While an RPC is in flight the live tick stream keeps arriving
//! on the same connection; the router pops the queue, takes the first frame
//! the caller's predicate accepts, and holds everything else aside, restoring
//! it to the queue head afterwards. A reply may cut ahead of frames it does
//! not match, but the stream order itself is never disturbed and nothing is
//! lost — whether the call matches, times out, or the send fails.

use std::sync::Arc;

use serde::Serialize;

use crate::error::DerivError;
use crate::queue::PendingQueue;
use crate::transport::Transport;
use crate::wire::Frame;

/// Attempt budget for one request/reply exchange. There is no wall-clock
/// timer: each popped frame spends one attempt, and a quiet queue simply
/// waits for the reader.
pub const MAX_REPLY_ATTEMPTS: usize = 10;

/// Sends a request and awaits the matching reply frame
#[derive(Clone)]
pub struct MessageRouter {
    transport: Arc<dyn Transport>,
    queue: Arc<PendingQueue>,
}

impl MessageRouter {
    pub(crate) fn new(transport: Arc<dyn Transport>, queue: Arc<PendingQueue>) -> Self {
        Self { transport, queue }
    }

    /// Send `request` and pop the queue until a frame satisfies `matches`.
    ///
    /// Fails with `ResponseTimeout` once `max_attempts` frames have been
    /// inspected without a match; skipped frames are restored either way.
    pub async fn send_and_await<R, F>(
        &self,
        request: &R,
        matches: F,
        max_attempts: usize,
    ) -> Result<Frame, DerivError>
    where
        R: Serialize,
        F: Fn(&Frame) -> bool,
    {
        let payload = serde_json::to_string(request)?;
        self.transport.send(payload).await?;

        let mut skipped = Vec::new();
        let mut reply = Err(DerivError::ResponseTimeout {
            attempts: max_attempts,
        });
        for _ in 0..max_attempts {
            let frame = self.queue.pop().await;
            if matches(&frame) {
                reply = Ok(frame);
                break;
            }
            skipped.push(frame);
        }
        self.queue.restore(skipped);
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::MockTransport;
    use crate::wire::{ErrorMsg, QuoteMsg, TickMsg};

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
            ask_price: 10.0,
            payout: 19.5,
            spot: None,
        })
    }

    fn router_with_queue() -> (MessageRouter, Arc<PendingQueue>, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let queue = Arc::new(PendingQueue::new());
        let router = MessageRouter::new(
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&queue),
        );
        (router, queue, transport)
    }

    async fn drain_epochs(queue: &PendingQueue) -> Vec<i64> {
        let mut epochs = Vec::new();
        while !queue.is_empty() {
            if let Frame::Tick(t) = queue.pop().await {
                epochs.push(t.epoch);
            }
        }
        epochs
    }

    #[tokio::test]
    async fn returns_first_matching_frame_and_preserves_order() {
        let (router, queue, transport) = router_with_queue();
        queue.push(tick(1));
        queue.push(tick(2));
        queue.push(quote("q-1"));
        queue.push(tick(3));

        let request = serde_json::json!({"proposal": 1});
        let reply = router
            .send_and_await(&request, |f| matches!(f, Frame::Quote(_)), MAX_REPLY_ATTEMPTS)
            .await
            .unwrap();
        assert!(matches!(reply, Frame::Quote(ref q) if q.id == "q-1"));
        assert_eq!(transport.sent_payloads().len(), 1);

        // Every other frame survives, in arrival order.
        assert_eq!(drain_epochs(&queue).await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn reply_arriving_mid_stream_never_reorders_ticks() {
        let (router, queue, _) = router_with_queue();
        for epoch in 1..=4 {
            queue.push(tick(epoch));
        }
        queue.push(quote("q-2"));
        queue.push(tick(5));

        let request = serde_json::json!({"proposal": 1});
        router
            .send_and_await(&request, |f| matches!(f, Frame::Quote(_)), MAX_REPLY_ATTEMPTS)
            .await
            .unwrap();

        assert_eq!(drain_epochs(&queue).await, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn exhausted_attempts_fail_with_timeout() {
        let (router, queue, _) = router_with_queue();
        // Only stream frames, never a reply.
        for epoch in 1..=6 {
            queue.push(tick(epoch));
        }

        let request = serde_json::json!({"proposal": 1});
        let err = router
            .send_and_await(&request, |f| matches!(f, Frame::Quote(_)), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, DerivError::ResponseTimeout { attempts: 5 }));

        // Nothing was dropped or reordered while probing.
        assert_eq!(drain_epochs(&queue).await, vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn error_frames_match_error_accepting_predicates() {
        let (router, queue, _) = router_with_queue();
        queue.push(tick(1));
        queue.push(Frame::Error(ErrorMsg {
            code: Some("InvalidOfferings".to_string()),
            message: "Symbol unavailable".to_string(),
        }));

        let request = serde_json::json!({"proposal": 1});
        let reply = router
            .send_and_await(
                &request,
                |f| matches!(f, Frame::Quote(_) | Frame::Error(_)),
                MAX_REPLY_ATTEMPTS,
            )
            .await
            .unwrap();
        assert!(reply.is_error());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn send_failure_propagates_before_any_pop() {
        let transport = Arc::new(MockTransport {
            fail_sends: true,
            ..MockTransport::new()
        });
        let queue = Arc::new(PendingQueue::new());
        let router = MessageRouter::new(transport as Arc<dyn Transport>, Arc::clone(&queue));
        queue.push(quote("q-ignored"));

        let request = serde_json::json!({"proposal": 1});
        let err = router
            .send_and_await(&request, |f| matches!(f, Frame::Quote(_)), MAX_REPLY_ATTEMPTS)
            .await
            .unwrap_err();
        assert!(matches!(err, DerivError::Transport(_)));
        assert_eq!(queue.len(), 1);
    }
}
