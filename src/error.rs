//! Error types for web window connection management.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webwindow::{Result, WebWindow};
//!
//! fn greet(window: &WebWindow, conn_id: ConnId) -> Result<()> {
//!     window.send(conn_id, "hello")?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Parsing | [`Error::MalformedHeader`], [`Error::TruncatedMessage`] |
//! | Protocol | [`Error::Protocol`], [`Error::DuplicateReady`], [`Error::PanelHandshakeFailed`] |
//! | Lifecycle | [`Error::UnknownConnection`], [`Error::ConnectionLimitExceeded`], [`Error::Unauthorized`] |
//! | Sending | [`Error::NotConnected`], [`Error::NoCredits`], [`Error::QueueFull`], [`Error::SessionClosed`] |
//! | Configuration | [`Error::Config`], [`Error::InvalidChannel`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |
//!
//! None of these is fatal to a window. Each one is reported to the caller
//! (or the transport, which may drop the offending session) and logged.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{ChannelId, ConnId, TransportId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Parsing Errors
    // ========================================================================
    /// Envelope header is malformed.
    ///
    /// Returned when one of the three numeric header fields is missing,
    /// non-numeric, or not followed by the `:` delimiter.
    #[error("Malformed header: missing {field}")]
    MalformedHeader {
        /// Name of the header field that failed to parse.
        field: &'static str,
    },

    /// Envelope header claims more bytes than the message holds.
    #[error("Truncated message: header needs {header_len} bytes, message has {message_len}")]
    TruncatedMessage {
        /// Computed header length.
        header_len: usize,
        /// Total message length.
        message_len: usize,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation.
    ///
    /// Returned when an event of the wrong kind arrives where data was expected.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// READY received for a transport session that already has a record.
    #[error("Duplicate READY for transport session {transport_id}")]
    DuplicateReady {
        /// The offending transport session.
        transport_id: TransportId,
    },

    /// Panel handshake answered with something other than `PANEL_READY`.
    ///
    /// The connection is closed, the handshake is never retried.
    #[error("Panel handshake failed on connection {conn_id}")]
    PanelHandshakeFailed {
        /// The connection that was closed.
        conn_id: ConnId,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Event references a transport session without a connection record.
    #[error("Unknown connection for transport session {transport_id}")]
    UnknownConnection {
        /// The unmatched transport session.
        transport_id: TransportId,
    },

    /// Connection limit reached at accept time.
    #[error("Connection limit exceeded: {limit}")]
    ConnectionLimitExceeded {
        /// Configured connection limit.
        limit: usize,
    },

    /// Native-only window received a READY with an unknown key.
    #[error("Unauthorized client on connection {conn_id}")]
    Unauthorized {
        /// The connection that was destroyed.
        conn_id: ConnId,
    },

    // ========================================================================
    // Sending Errors
    // ========================================================================
    /// No transport session or transport handler for the connection.
    #[error("Connection {conn_id} not connected")]
    NotConnected {
        /// The connection that could not send.
        conn_id: ConnId,
    },

    /// No send credits left on the connection.
    #[error("No send credits on connection {conn_id}")]
    NoCredits {
        /// The connection that could not send.
        conn_id: ConnId,
    },

    /// Transport session is gone.
    ///
    /// Returned by a transport when a frame targets a closed session.
    #[error("Transport session {transport_id} closed")]
    SessionClosed {
        /// The closed transport session.
        transport_id: TransportId,
    },

    /// Outbound queue is at its configured maximum.
    #[error("Queue full on connection {conn_id} (max {max_len})")]
    QueueFull {
        /// The connection whose queue is full.
        conn_id: ConnId,
        /// Configured maximum queue length.
        max_len: usize,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when window options are invalid or cannot be applied.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Channel id cannot be used for the requested operation.
    #[error("Invalid channel: {channel}")]
    InvalidChannel {
        /// The rejected channel.
        channel: ChannelId,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a malformed header error.
    #[inline]
    pub fn malformed_header(field: &'static str) -> Self {
        Self::MalformedHeader { field }
    }

    /// Creates a truncated message error.
    #[inline]
    pub fn truncated(header_len: usize, message_len: usize) -> Self {
        Self::TruncatedMessage {
            header_len,
            message_len,
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a duplicate READY error.
    #[inline]
    pub fn duplicate_ready(transport_id: TransportId) -> Self {
        Self::DuplicateReady { transport_id }
    }

    /// Creates a panel handshake failure.
    #[inline]
    pub fn panel_handshake_failed(conn_id: ConnId) -> Self {
        Self::PanelHandshakeFailed { conn_id }
    }

    /// Creates an unknown connection error.
    #[inline]
    pub fn unknown_connection(transport_id: TransportId) -> Self {
        Self::UnknownConnection { transport_id }
    }

    /// Creates a connection limit error.
    #[inline]
    pub fn connection_limit(limit: usize) -> Self {
        Self::ConnectionLimitExceeded { limit }
    }

    /// Creates an unauthorized client error.
    #[inline]
    pub fn unauthorized(conn_id: ConnId) -> Self {
        Self::Unauthorized { conn_id }
    }

    /// Creates a not connected error.
    #[inline]
    pub fn not_connected(conn_id: ConnId) -> Self {
        Self::NotConnected { conn_id }
    }

    /// Creates a no credits error.
    #[inline]
    pub fn no_credits(conn_id: ConnId) -> Self {
        Self::NoCredits { conn_id }
    }

    /// Creates a session closed error.
    #[inline]
    pub fn session_closed(transport_id: TransportId) -> Self {
        Self::SessionClosed { transport_id }
    }

    /// Creates a queue full error.
    #[inline]
    pub fn queue_full(conn_id: ConnId, max_len: usize) -> Self {
        Self::QueueFull { conn_id, max_len }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid channel error.
    #[inline]
    pub fn invalid_channel(channel: ChannelId) -> Self {
        Self::InvalidChannel { channel }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the inbound message itself was unparseable.
    #[inline]
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedHeader { .. } | Self::TruncatedMessage { .. }
        )
    }

    /// Returns `true` if this is a protocol-level violation.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. }
                | Self::DuplicateReady { .. }
                | Self::PanelHandshakeFailed { .. }
                | Self::MalformedHeader { .. }
                | Self::TruncatedMessage { .. }
        )
    }

    /// Returns `true` if the send was refused because of backpressure.
    ///
    /// Backpressure errors may succeed once the peer grants more credits.
    #[inline]
    #[must_use]
    pub fn is_backpressure(&self) -> bool {
        matches!(self, Self::NoCredits { .. } | Self::QueueFull { .. })
    }

    /// Returns `true` if the transport should drop the session that
    /// produced this error.
    #[inline]
    #[must_use]
    pub fn should_drop_session(&self) -> bool {
        self.is_protocol_error()
            || matches!(
                self,
                Self::UnknownConnection { .. } | Self::Unauthorized { .. }
            )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::malformed_header("channel id");
        assert_eq!(err.to_string(), "Malformed header: missing channel id");

        let err = Error::queue_full(ConnId::new(3), 10);
        assert_eq!(err.to_string(), "Queue full on connection 3 (max 10)");
    }

    #[test]
    fn test_truncated_display() {
        let err = Error::truncated(12, 8);
        assert_eq!(
            err.to_string(),
            "Truncated message: header needs 12 bytes, message has 8"
        );
    }

    #[test]
    fn test_is_parse_error() {
        assert!(Error::malformed_header("ack count").is_parse_error());
        assert!(Error::truncated(4, 3).is_parse_error());
        assert!(!Error::protocol("x").is_parse_error());
    }

    #[test]
    fn test_is_backpressure() {
        assert!(Error::no_credits(ConnId::new(1)).is_backpressure());
        assert!(Error::queue_full(ConnId::new(1), 2).is_backpressure());
        assert!(!Error::not_connected(ConnId::new(1)).is_backpressure());
    }

    #[test]
    fn test_should_drop_session() {
        assert!(Error::unknown_connection(TransportId::new(5)).should_drop_session());
        assert!(Error::unauthorized(ConnId::new(1)).should_drop_session());
        assert!(Error::panel_handshake_failed(ConnId::new(1)).should_drop_session());
        assert!(!Error::queue_full(ConnId::new(1), 1).should_drop_session());
        assert!(!Error::connection_limit(2).should_drop_session());
    }

    #[test]
    fn test_session_closed_display() {
        let err = Error::session_closed(TransportId::new(9));
        assert_eq!(err.to_string(), "Transport session 9 closed");
        assert!(!err.should_drop_session());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::AddrInUse, "port taken");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
