//! Authorization key table.
//!
//! Keys are registered by whoever launches the client process, before the
//! client connects. A key is consumed by the first `READY=<key>` that
//! presents it.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;

use crate::identifiers::ProcessId;

// ============================================================================
// AuthKeys
// ============================================================================

/// Single-use map from key to external process identity.
#[derive(Debug, Default)]
pub(crate) struct AuthKeys {
    keys: FxHashMap<String, ProcessId>,
}

impl AuthKeys {
    /// Registers a key, replacing any previous binding.
    pub fn insert(&mut self, key: impl Into<String>, process_id: ProcessId) -> Option<ProcessId> {
        self.keys.insert(key.into(), process_id)
    }

    /// Returns `true` if the key is registered.
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// Consumes a key.
    #[inline]
    pub fn take(&mut self, key: &str) -> Option<ProcessId> {
        self.keys.remove(key)
    }

    /// Returns the number of unused keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
