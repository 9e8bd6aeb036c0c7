//! Window connection management.
//!
//! A [`WebWindow`] tracks the clients attached to one logical window and
//! enforces credit-based flow control towards each of them.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`WebWindow`] controller and transport event handling |
//! | `builder` | [`WindowBuilder`] fluent configuration |
//! | `options` | [`WindowOptions`] connection policy |
//! | `connection` | Per-client record and [`ReadyStage`] |
//! | `queue` | Bounded [`OutboundQueue`] with control priority |
//! | `flow` | Credit-flow engine and [`DrainMode`] |
//! | `keys` | Single-use authorization keys |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent window configuration.
pub mod builder;

/// Per-client connection record.
pub mod connection;

/// Window controller.
pub mod core;

/// Credit-flow engine.
pub mod flow;

/// Authorization key table.
mod keys;

/// Connection policy.
pub mod options;

/// Outbound message queue.
pub mod queue;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::WindowBuilder;
pub use connection::{ConnectionInfo, ReadyStage};
pub use core::{ChannelHandler, DataCallback, TransportEvent, WebWindow};
pub use flow::DrainMode;
pub use options::{DEFAULT_CONN_LIMIT, DEFAULT_MAX_QUEUE_LENGTH, WindowOptions};
pub use queue::{OutboundQueue, PendingMessage};
