//! Window configuration options.
//!
//! # Example
//!
//! ```ignore
//! use webwindow::WindowOptions;
//!
//! let options = WindowOptions::new()
//!     .with_conn_limit(2)
//!     .with_max_queue_length(32)
//!     .with_panel_name("FitPanel");
//!
//! let same = WindowOptions::from_json(
//!     r#"{ "connLimit": 2, "maxQueueLength": 32, "panelName": "FitPanel" }"#,
//! )?;
//! assert_eq!(options, same);
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default number of simultaneous connections.
pub const DEFAULT_CONN_LIMIT: usize = 1;

/// Default per-connection outbound queue bound.
pub const DEFAULT_MAX_QUEUE_LENGTH: usize = 10;

// ============================================================================
// WindowOptions
// ============================================================================

/// Connection policy of a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WindowOptions {
    /// Maximum simultaneous connections; `0` means unlimited.
    pub conn_limit: usize,

    /// Maximum queued outbound messages per connection.
    pub max_queue_length: usize,

    /// Panel to start on every new client before data flows.
    pub panel_name: Option<String>,

    /// Reject clients that do not present a registered key.
    pub native_only: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl WindowOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            conn_limit: DEFAULT_CONN_LIMIT,
            max_queue_length: DEFAULT_MAX_QUEUE_LENGTH,
            panel_name: None,
            native_only: false,
        }
    }

    /// Parses options from JSON; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document is not valid
    /// - [`Error::Config`] if the values fail [`WindowOptions::validate`]
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl WindowOptions {
    /// Sets the connection limit (`0` for unlimited).
    #[inline]
    #[must_use]
    pub fn with_conn_limit(mut self, limit: usize) -> Self {
        self.conn_limit = limit;
        self
    }

    /// Sets the per-connection queue bound.
    #[inline]
    #[must_use]
    pub fn with_max_queue_length(mut self, len: usize) -> Self {
        self.max_queue_length = len;
        self
    }

    /// Configures a panel handshake.
    #[inline]
    #[must_use]
    pub fn with_panel_name(mut self, name: impl Into<String>) -> Self {
        self.panel_name = Some(name.into());
        self
    }

    /// Only accept clients presenting a registered key.
    #[inline]
    #[must_use]
    pub fn with_native_only(mut self) -> Self {
        self.native_only = true;
        self
    }
}

// ============================================================================
// Queries
// ============================================================================

impl WindowOptions {
    /// Returns `true` if `count` connections leave room for another one.
    #[inline]
    #[must_use]
    pub fn admits(&self, count: usize) -> bool {
        self.conn_limit == 0 || count < self.conn_limit
    }

    /// Returns the configured panel, if any.
    #[inline]
    #[must_use]
    pub fn panel(&self) -> Option<&str> {
        self.panel_name.as_deref()
    }

    /// Checks the options for values a window cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero queue bound or an empty panel name.
    pub fn validate(&self) -> Result<()> {
        if self.max_queue_length == 0 {
            return Err(Error::config("max queue length must be at least 1"));
        }

        if self.panel_name.as_deref().is_some_and(str::is_empty) {
            return Err(Error::config("panel name must not be empty"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = WindowOptions::default();
        assert_eq!(options.conn_limit, 1);
        assert_eq!(options.max_queue_length, 10);
        assert_eq!(options.panel(), None);
        assert!(!options.native_only);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let options = WindowOptions::new()
            .with_conn_limit(0)
            .with_max_queue_length(3)
            .with_panel_name("FitPanel")
            .with_native_only();

        assert_eq!(options.panel(), Some("FitPanel"));
        assert_eq!(options.max_queue_length, 3);
        assert!(options.native_only);
    }

    #[test]
    fn test_admits() {
        let limited = WindowOptions::new().with_conn_limit(2);
        assert!(limited.admits(0));
        assert!(limited.admits(1));
        assert!(!limited.admits(2));

        let unlimited = WindowOptions::new().with_conn_limit(0);
        assert!(unlimited.admits(10_000));
    }

    #[test]
    fn test_validate_rejects() {
        let err = WindowOptions::new().with_max_queue_length(0).validate().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        let err = WindowOptions::new().with_panel_name("").validate().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_from_json_partial() {
        let options = WindowOptions::from_json(r#"{ "connLimit": 4, "nativeOnly": true }"#).unwrap();
        assert_eq!(options.conn_limit, 4);
        assert_eq!(options.max_queue_length, DEFAULT_MAX_QUEUE_LENGTH);
        assert!(options.native_only);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            WindowOptions::from_json("{ nope").unwrap_err(),
            Error::Json(_)
        ));
        assert!(matches!(
            WindowOptions::from_json(r#"{ "maxQueueLength": 0 }"#).unwrap_err(),
            Error::Config { .. }
        ));
    }
}
