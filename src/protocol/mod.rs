//! Wire protocol between a window and its clients.
//!
//! # Protocol Overview
//!
//! Each transport message is prefixed with a text envelope:
//!
//! ```text
//! ackCount:sendCredits:channelId:payload
//! ```
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `ackCount` | Messages received since the sender's last frame |
//! | `sendCredits` | Sends the sender may still make |
//! | `channelId` | 0 = control, 1 = default data, 2+ = caller-defined |
//! | `payload` | Remaining bytes, may contain `:` or binary data |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | Envelope parser and frame encoder |
//! | `control` | Control channel literals |

// ============================================================================
// Submodules
// ============================================================================

/// Control channel vocabulary.
pub mod control;

/// Envelope parsing and frame encoding.
pub mod envelope;

// ============================================================================
// Re-exports
// ============================================================================

pub use control::{CONN_CLOSED, CONN_READY, ControlMessage};
pub use envelope::{BINARY_MARKER, Envelope, Frame, Payload};
