//! Shared frame queue between the reader task and consumers
//!
//! Single producer (the background reader), interleaved consumers (RPC calls
//! and the tick feed — never concurrently, the session loop is sequential).
//! FIFO discipline: no frame is ever dropped, and frames a consumer skips are
//! restored at the head so the stream order downstream is exactly the
//! network-arrival order minus the frames the consumer took.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::wire::Frame;

/// Ordered FIFO buffer decoupling the reader task from consumers
#[derive(Debug, Default)]
pub struct PendingQueue {
    frames: Mutex<VecDeque<Frame>>,
    notify: Notify,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame at the tail and wake a blocked consumer
    pub fn push(&self, frame: Frame) {
        self.frames
            .lock()
            .expect("pending queue lock poisoned")
            .push_back(frame);
        self.notify.notify_one();
    }

    /// Pop the head frame, waiting for one to arrive if the queue is empty.
    /// May wait indefinitely: feed consumption has no timeout by design.
    pub async fn pop(&self) -> Frame {
        loop {
            if let Some(frame) = self
                .frames
                .lock()
                .expect("pending queue lock poisoned")
                .pop_front()
            {
                return frame;
            }
            self.notify.notified().await;
        }
    }

    /// Put frames a consumer skipped back at the head, in their original
    /// order, ahead of anything the reader enqueued in the meantime. An RPC
    /// reply may cut ahead of frames it does not match, but the stream
    /// itself is never reordered.
    pub fn restore(&self, skipped: Vec<Frame>) {
        if skipped.is_empty() {
            return;
        }
        let mut frames = self.frames.lock().expect("pending queue lock poisoned");
        for frame in skipped.into_iter().rev() {
            frames.push_front(frame);
        }
        drop(frames);
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.frames.lock().expect("pending queue lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
