//! Web window connection manager.
//!
//! This library keeps track of the clients attached to a "web window" and
//! moves messages to and from them with credit-based flow control.
//!
//! # Architecture
//!
//! The library follows a controller-transport split:
//!
//! - **Controller**: [`WebWindow`] owns connection records, credits, queues
//! - **Transport**: [`WindowServer`] owns sockets and feeds events in
//!
//! Key design principles:
//!
//! - Every message carries `ackCount:sendCredits:channel:` in front
//! - A side never sends without a credit; excess traffic is queued per client
//! - Channel 0 carries the handshake, channel 1 application data
//! - Callbacks run outside the state lock and may send from inside
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use webwindow::{ConnId, Result, WebWindow, WindowServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = WindowServer::new().await?;
//!
//!     let window = Arc::new(
//!         WebWindow::builder()
//!             .conn_limit(0)
//!             .data_callback(|conn_id, data| println!("{conn_id}: {data}"))
//!             .build()?,
//!     );
//!     server.register(Arc::clone(&window));
//!     println!("Clients connect to {}", server.ws_url(window.id()));
//!
//!     window.send(ConnId::ALL, "hello")?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`window`] | Window controller: [`WebWindow`], [`WindowOptions`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Envelope codec and control vocabulary |
//! | [`transport`] | Transport traits and WebSocket server |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for connections, channels and sessions.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Wire protocol: envelope parsing, frame encoding, control messages.
pub mod protocol;

/// Transport layer.
///
/// [`Transport`] and [`ProcessManager`] seams plus the WebSocket server.
pub mod transport;

/// Window controller.
///
/// Connection lifecycle, credit accounting and outbound queues.
pub mod window;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ChannelId, ConnId, ProcessId, TransportId, WindowId};

// Protocol types
pub use protocol::{CONN_CLOSED, CONN_READY, Envelope, Frame, Payload};

// Transport types
pub use transport::{ProcessManager, Transport, WindowServer, WsTransport};

// Window types
pub use window::{
    ConnectionInfo, DrainMode, ReadyStage, TransportEvent, WebWindow, WindowBuilder, WindowOptions,
};
