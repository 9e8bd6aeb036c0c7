//! Per-client connection record.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::identifiers::{ConnId, ProcessId, TransportId};

use super::queue::OutboundQueue;

// ============================================================================
// ReadyStage
// ============================================================================

/// Readiness of a connection.
///
/// Ordered: a later stage compares greater than an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadyStage {
    /// Transport is up, client has not sent `READY=` yet.
    #[default]
    NotReady,
    /// `SHOWPANEL` sent, waiting for `PANEL_READY`.
    PanelPending,
    /// Handshake complete, application data flows.
    Ready,
}

impl ReadyStage {
    /// Returns the numeric stage (0, 5 or 10).
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::NotReady => 0,
            Self::PanelPending => 5,
            Self::Ready => 10,
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// State of one client transport session.
///
/// Credit counters are unsigned, so the send credit count can never go
/// negative; a send is only attempted while it is positive.
#[derive(Debug)]
pub(crate) struct Connection {
    /// Window-unique identifier.
    pub conn_id: ConnId,
    /// Transport session handle.
    pub transport_id: TransportId,
    /// Bound external process, if any.
    pub process_id: ProcessId,
    /// Inbound data messages since our last outbound frame.
    pub recv_count: u64,
    /// Frames we may still send.
    pub send_credits: u64,
    /// Frames the peer last said it may still send.
    pub client_credits: u64,
    /// Handshake stage.
    pub ready: ReadyStage,
    /// Messages waiting for credits.
    pub queue: OutboundQueue,
}

impl Connection {
    /// Creates a record for a freshly ready transport session.
    pub fn new(conn_id: ConnId, transport_id: TransportId) -> Self {
        Self {
            conn_id,
            transport_id,
            process_id: ProcessId::NONE,
            recv_count: 0,
            send_credits: 0,
            client_credits: 0,
            ready: ReadyStage::NotReady,
            queue: OutboundQueue::new(),
        }
    }

    /// Applies the counters of one inbound message.
    pub fn account_inbound(&mut self, ack_count: u64, client_credits: u64) {
        self.send_credits = self.send_credits.saturating_add(ack_count);
        self.recv_count = self.recv_count.saturating_add(1);
        self.client_credits = client_credits;
    }

    /// Returns `true` if a message could go out right now without queueing.
    #[inline]
    pub fn can_send_direct(&self) -> bool {
        self.queue.is_empty() && self.send_credits > 0
    }

    /// Returns `true` if the peer should be granted credits proactively.
    #[inline]
    pub fn needs_keepalive(&self) -> bool {
        self.client_credits < 3 && self.recv_count > 1
    }

    /// Returns a snapshot of the record.
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            conn_id: self.conn_id,
            process_id: self.process_id,
            recv_count: self.recv_count,
            send_credits: self.send_credits,
            client_credits: self.client_credits,
            ready: self.ready,
            queue_len: self.queue.len(),
        }
    }
}

// ============================================================================
// ConnectionInfo
// ============================================================================

/// Read-only snapshot of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    /// Connection identifier.
    pub conn_id: ConnId,
    /// Bound external process.
    pub process_id: ProcessId,
    /// Inbound messages not yet acknowledged.
    pub recv_count: u64,
    /// Frames this side may still send.
    pub send_credits: u64,
    /// Frames the peer may still send.
    pub client_credits: u64,
    /// Handshake stage.
    pub ready: ReadyStage,
    /// Queued outbound messages.
    pub queue_len: usize,
}

// ============================================================================
// Tests
// ============================================================================
