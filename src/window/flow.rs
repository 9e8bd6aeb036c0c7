//! Credit-flow engine.
//!
//! Decides, for every connection, whether queued or keep-alive traffic can
//! go out now, and performs the send.
//!
//! # Drain Pass
//!
//! For each connection with send credits:
//!
//! 1. a non-empty queue sends its front message
//! 2. otherwise, if the peer is low on credits (`client_credits < 3`) and
//!    has sent more than one unacknowledged message, a `KEEPALIVE` goes out
//!    on the control channel to return credits to it
//!
//! By default passes repeat until one makes no progress, so a single
//! credit grant can release queued messages on several connections within
//! one event. Every progressing step consumes a credit, so the fixpoint is
//! always reached; [`MAX_DRAIN_PASSES`] only guards against a transport
//! that misbehaves.

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::ChannelId;
use crate::protocol::control::KEEPALIVE;
use crate::protocol::{Frame, Payload};
use crate::transport::Transport;

use super::connection::Connection;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on passes of one drain.
const MAX_DRAIN_PASSES: usize = 1 << 16;

// ============================================================================
// DrainMode
// ============================================================================

/// How many passes a drain runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainMode {
    /// Repeat passes until one makes no progress.
    #[default]
    Fixpoint,
    /// Run exactly one pass.
    SinglePass,
}

// ============================================================================
// Send Primitive
// ============================================================================

/// Checks the preconditions of [`send_via_connection`].
///
/// # Errors
///
/// - [`Error::NotConnected`] if the connection has no transport session or
///   no transport is attached
/// - [`Error::NoCredits`] if the connection has no send credits
pub(crate) fn check_sendable<'t>(
    conn: &Connection,
    transport: Option<&'t dyn Transport>,
) -> Result<&'t dyn Transport> {
    let transport = transport
        .filter(|_| conn.transport_id.is_some())
        .ok_or_else(|| Error::not_connected(conn.conn_id))?;

    if conn.send_credits == 0 {
        return Err(Error::no_credits(conn.conn_id));
    }

    Ok(transport)
}

/// Frames `payload` for `conn` and hands it to the transport.
///
/// The header carries the receive count (our acknowledgement) and the
/// credit count before this send. Afterwards the receive count is reset
/// and one credit is consumed.
///
/// # Errors
///
/// See [`check_sendable`]; nothing is changed on error.
pub(crate) fn send_via_connection(
    conn: &mut Connection,
    transport: Option<&dyn Transport>,
    channel: ChannelId,
    payload: Payload,
) -> Result<()> {
    let transport = check_sendable(conn, transport)?;

    let frame = Frame::encode(conn.recv_count, conn.send_credits, channel, payload);
    conn.recv_count = 0;
    conn.send_credits -= 1;

    trace!(
        conn_id = %conn.conn_id,
        %channel,
        credits = conn.send_credits,
        "Frame sent"
    );

    if let Err(e) = transport.send_frame(conn.transport_id, frame) {
        warn!(conn_id = %conn.conn_id, error = %e, "Transport rejected frame");
    }

    Ok(())
}

// ============================================================================
// Drain
// ============================================================================

/// Runs one pass over all connections, returning the number of frames sent.
fn drain_pass(connections: &mut [Connection], transport: Option<&dyn Transport>) -> usize {
    let mut sent = 0;

    for conn in connections.iter_mut() {
        if check_sendable(conn, transport).is_err() {
            continue;
        }

        if let Some(message) = conn.queue.pop() {
            if send_via_connection(conn, transport, message.channel, message.payload).is_ok() {
                sent += 1;
            }
        } else if conn.needs_keepalive() {
            debug!(conn_id = %conn.conn_id, "Send keep alive to client");
            if send_via_connection(conn, transport, ChannelId::CONTROL, Payload::from(KEEPALIVE))
                .is_ok()
            {
                sent += 1;
            }
        }
    }

    sent
}

/// Sends whatever credits allow, returning the number of frames sent.
pub(crate) fn drain(
    connections: &mut [Connection],
    transport: Option<&dyn Transport>,
    mode: DrainMode,
) -> usize {
    let mut total = 0;

    for _ in 0..MAX_DRAIN_PASSES {
        let sent = drain_pass(connections, transport);
        total += sent;

        if sent == 0 || mode == DrainMode::SinglePass {
            return total;
        }
    }

    warn!(passes = MAX_DRAIN_PASSES, total, "Drain stopped at pass limit");
    total
}

// ============================================================================
// Tests
// ============================================================================
