//! Per-connection outbound queue.
//!
//! Messages wait here while the connection has no send credits or older
//! messages are still pending. Control channel messages are placed ahead
//! of every queued application message but stay in FIFO order among
//! themselves; application messages are strictly FIFO.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use crate::identifiers::ChannelId;
use crate::protocol::Payload;

// ============================================================================
// PendingMessage
// ============================================================================

/// A message waiting for send credits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    /// Target channel.
    pub channel: ChannelId,
    /// Message body.
    pub payload: Payload,
}

impl PendingMessage {
    /// Creates a pending message.
    #[inline]
    #[must_use]
    pub fn new(channel: ChannelId, payload: Payload) -> Self {
        Self { channel, payload }
    }
}

// ============================================================================
// OutboundQueue
// ============================================================================

/// Bounded FIFO of pending messages with control channel priority.
///
/// The bound is supplied on every push so a live window can change it.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    /// Control messages occupy the first `control` slots.
    items: VecDeque<PendingMessage>,
    /// Number of control messages at the front.
    control: usize,
}

impl OutboundQueue {
    /// Creates an empty queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of queued messages.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Queues a message unless `max_len` messages are already waiting.
    ///
    /// # Errors
    ///
    /// Hands the message back when the queue is full.
    pub fn push(&mut self, message: PendingMessage, max_len: usize) -> Result<(), PendingMessage> {
        if self.items.len() >= max_len {
            return Err(message);
        }

        if message.channel.is_control() {
            self.items.insert(self.control, message);
            self.control += 1;
        } else {
            self.items.push_back(message);
        }

        Ok(())
    }

    /// Removes and returns the next message to send.
    pub fn pop(&mut self) -> Option<PendingMessage> {
        let message = self.items.pop_front()?;
        self.control = self.control.saturating_sub(1);
        Some(message)
    }

    /// Drops every queued message, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        self.control = 0;
        dropped
    }
}

// ============================================================================
// Tests
// ============================================================================
