//! Type-safe identifiers for window connections.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Assigned by | Sentinel |
//! |------|-------------|----------|
//! | [`ConnId`] | window, on READY, starting at 1 | `0` = all connections |
//! | [`TransportId`] | transport layer | `0` = no transport |
//! | [`ProcessId`] | external process manager | `0` = unbound |
//! | [`ChannelId`] | protocol | `0` = control, `1` = default data |
//! | [`WindowId`] | process-wide counter | none |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// Counters
// ============================================================================

static NEXT_WINDOW_ID: AtomicU32 = AtomicU32::new(1);

static NEXT_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// ConnId
// ============================================================================

/// Connection identifier, unique within one window's lifetime.
///
/// Never reused. The value `0` addresses every connection of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnId(u32);

impl ConnId {
    /// Broadcast target: every current connection.
    pub const ALL: Self = Self(0);

    /// Creates a connection ID from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns `true` if this ID addresses every connection.
    #[inline]
    #[must_use]
    pub const fn is_all(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if this ID selects `other`.
    #[inline]
    #[must_use]
    pub fn matches(self, other: ConnId) -> bool {
        self.is_all() || self == other
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// TransportId
// ============================================================================

/// Opaque handle of a transport-layer session.
///
/// Unique among currently open sessions only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TransportId(u64);

impl TransportId {
    /// Sentinel for "no transport".
    pub const NONE: Self = Self(0);

    /// Creates a transport ID from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-unique transport ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns `true` unless this is the [`TransportId::NONE`] sentinel.
    #[inline]
    #[must_use]
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ProcessId
// ============================================================================

/// Identity of an external process bound through an authorization key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Sentinel for "no process bound".
    pub const NONE: Self = Self(0);

    /// Creates a process ID from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns `true` unless this is the [`ProcessId::NONE`] sentinel.
    #[inline]
    #[must_use]
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ChannelId
// ============================================================================

/// Logical channel multiplexed over one transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(u32);

impl ChannelId {
    /// Reserved control/system channel.
    pub const CONTROL: Self = Self(0);

    /// Default application data channel.
    pub const DATA: Self = Self(1);

    /// Creates a channel ID from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns `true` for the control channel.
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` for caller-defined channels (2 and above).
    #[inline]
    #[must_use]
    pub const fn is_custom(self) -> bool {
        self.0 > 1
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// WindowId
// ============================================================================

/// Process-unique window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(u32);

impl WindowId {
    /// Allocates the next window ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Parses a websocket route of the form `/win<id>` (trailing path allowed).
    #[must_use]
    pub fn from_route(path: &str) -> Option<Self> {
        let rest = path.strip_prefix("/win")?;
        let digits = rest.split('/').next()?;
        digits.parse().ok().filter(|id| *id > 0).map(Self)
    }

    /// Returns the websocket route for this window.
    #[inline]
    #[must_use]
    pub fn route(self) -> String {
        format!("/win{}", self.0)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "win{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
