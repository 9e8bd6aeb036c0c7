//! Builder pattern for window configuration.
//!
//! Provides a fluent API for configuring and creating [`WebWindow`] instances.
//!
//! # Example
//!
//! ```ignore
//! use webwindow::{WebWindow, WindowOptions};
//!
//! let window = WebWindow::builder()
//!     .conn_limit(0)
//!     .panel_name("FitPanel")
//!     .data_callback(|conn_id, data| println!("{conn_id}: {data}"))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::identifiers::ConnId;
use crate::transport::{ProcessManager, Transport};

use super::core::{DataCallback, WebWindow};
use super::options::WindowOptions;

// ============================================================================
// WindowBuilder
// ============================================================================

/// Builder for configuring a [`WebWindow`] instance.
///
/// Use [`WebWindow::builder()`] to create a new builder.
#[derive(Default)]
pub struct WindowBuilder {
    /// Connection policy.
    options: WindowOptions,
    /// Outbound transport, if already known.
    transport: Option<Arc<dyn Transport>>,
    /// Lifecycle manager of bound processes.
    process_manager: Option<Arc<dyn ProcessManager>>,
    /// Data callback.
    data_callback: Option<DataCallback>,
}

impl fmt::Debug for WindowBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowBuilder")
            .field("options", &self.options)
            .field("transport", &self.transport.is_some())
            .field("process_manager", &self.process_manager.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// WindowBuilder Implementation
// ============================================================================

impl WindowBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: WindowOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the connection limit (`0` for unlimited).
    #[inline]
    #[must_use]
    pub fn conn_limit(mut self, limit: usize) -> Self {
        self.options.conn_limit = limit;
        self
    }

    /// Sets the per-connection queue bound.
    #[inline]
    #[must_use]
    pub fn max_queue_length(mut self, len: usize) -> Self {
        self.options.max_queue_length = len;
        self
    }

    /// Configures the panel handshake.
    #[inline]
    #[must_use]
    pub fn panel_name(mut self, name: impl Into<String>) -> Self {
        self.options.panel_name = Some(name.into());
        self
    }

    /// Only accept clients presenting a registered key.
    #[inline]
    #[must_use]
    pub fn native_only(mut self) -> Self {
        self.options.native_only = true;
        self
    }

    /// Attaches the outbound transport.
    ///
    /// Without one, every send is queued until
    /// [`WebWindow::set_transport`] is called.
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Attaches the process manager used to halt bound processes.
    #[inline]
    #[must_use]
    pub fn process_manager(mut self, manager: Arc<dyn ProcessManager>) -> Self {
        self.process_manager = Some(manager);
        self
    }

    /// Sets the data callback.
    #[must_use]
    pub fn data_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(ConnId, &str) + Send + Sync + 'static,
    {
        self.data_callback = Some(Arc::new(callback));
        self
    }

    /// Builds the window with validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the options fail
    /// [`WindowOptions::validate`].
    pub fn build(self) -> Result<WebWindow> {
        self.options.validate()?;

        Ok(WebWindow::from_parts(
            self.options,
            self.transport,
            self.process_manager,
            self.data_callback,
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================
