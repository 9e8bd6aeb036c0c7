//! Transport collaborators of a window.
//!
//! A [`WebWindow`](crate::WebWindow) never touches sockets itself. Outbound
//! frames are handed to a [`Transport`], bound processes are stopped through
//! a [`ProcessManager`]. Inbound events are fed to the window by whoever owns
//! the sessions, normally the [`WindowServer`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  WebWindow      │                              │  Client page    │
//! │                 │         WebSocket            │                 │
//! │  WindowServer   │◄────────────────────────────►│  /win<id>       │
//! │  → WsTransport  │      localhost:PORT          │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `server` | WebSocket server routing sessions to windows |

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;
use crate::identifiers::{ProcessId, TransportId};
use crate::protocol::Frame;

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket server for window clients.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use server::{WindowServer, WsTransport};

// ============================================================================
// Transport
// ============================================================================

/// Outbound side of the transport layer.
///
/// Implementations must not block: a call is a handoff, delivery is
/// best-effort. Methods are invoked while the window state is locked.
pub trait Transport: Send + Sync {
    /// Sends a text frame to one session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot accept the frame.
    fn send_text(&self, transport_id: TransportId, frame: String) -> Result<()>;

    /// Sends a text header followed by a binary body to one session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot accept the frame.
    fn send_binary(&self, transport_id: TransportId, header: String, body: Vec<u8>) -> Result<()>;

    /// Sends an encoded frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot accept the frame.
    fn send_frame(&self, transport_id: TransportId, frame: Frame) -> Result<()> {
        match frame {
            Frame::Text(text) => self.send_text(transport_id, text),
            Frame::Binary { header, body } => self.send_binary(transport_id, header, body),
        }
    }
}

// ============================================================================
// ProcessManager
// ============================================================================

/// Lifecycle manager of external processes bound to connections.
pub trait ProcessManager: Send + Sync {
    /// Stops the process. Only bound processes are passed, never
    /// [`ProcessId::NONE`].
    fn halt_process(&self, process_id: ProcessId);
}
