use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Default outbound queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// Text waiting for a usable connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedMessage {
    /// Chat line or slash command
    pub text: String,
    /// When it was queued
    pub enqueued_at: DateTime<Utc>,
}

/// Bounded FIFO of outbound chat; the oldest item is evicted when full.
#[derive(Debug)]
pub struct OutboundQueue {
    items: VecDeque<QueuedMessage>,
    capacity: usize,
}

impl OutboundQueue {
    /// Create a queue holding at most `capacity` items (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `text`; returns the evicted item when the queue was full
    pub fn push(&mut self, text: impl Into<String>) -> Option<QueuedMessage> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(QueuedMessage {
            text: text.into(),
            enqueued_at: Utc::now(),
        });
        evicted
    }

    /// Put an item back at the head (after a failed send)
    pub fn requeue_front(&mut self, item: QueuedMessage) {
        if self.items.len() >= self.capacity {
            // The head is older than anything behind it, keep it and drop the newest
            self.items.pop_back();
        }
        self.items.push_front(item);
    }

    /// Take the oldest item
    pub fn pop(&mut self) -> Option<QueuedMessage> {
        self.items.pop_front()
    }

    /// Drop everything; returns how many items were discarded
    pub fn clear(&mut self) -> usize {
        let n = self.items.len();
        self.items.clear();
        n
    }

    /// Number of queued items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// No queued items
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of items
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate oldest first
    pub fn iter(&self) -> impl Iterator<Item = &QueuedMessage> {
        self.items.iter()
    }
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
