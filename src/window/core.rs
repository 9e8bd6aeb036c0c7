//! Window connection controller.
//!
//! [`WebWindow`] owns every connection record of one logical window. The
//! transport feeds it four kinds of events per session:
//!
//! | Event | Effect |
//! |-------|--------|
//! | [`TransportEvent::Connect`] | Accept or refuse the handshake (connection limit) |
//! | [`TransportEvent::Ready`] | Create the connection record |
//! | [`TransportEvent::Data`] | Account credits, dispatch by channel, drain queues |
//! | [`TransportEvent::Close`] | Notify, halt the bound process, drop the record |
//!
//! # Locking
//!
//! Connection state sits behind one mutex. A second mutex serialises event
//! dispatch. User callbacks run after the state lock is released but while
//! dispatch is still held, so they may call [`WebWindow::send`] and friends
//! and still observe events in arrival order.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ChannelId, ConnId, ProcessId, TransportId, WindowId};
use crate::protocol::control::{self, CLOSE, CONN_CLOSED, CONN_READY, PANEL_READY};
use crate::protocol::{ControlMessage, Envelope, Payload};
use crate::transport::{ProcessManager, Transport};

use super::builder::WindowBuilder;
use super::connection::{Connection, ConnectionInfo, ReadyStage};
use super::flow::{self, DrainMode};
use super::keys::AuthKeys;
use super::options::WindowOptions;
use super::queue::PendingMessage;

// ============================================================================
// Types
// ============================================================================

/// Window-level data callback.
///
/// Receives channel 1 payloads as text, plus the [`CONN_READY`] and
/// [`CONN_CLOSED`] lifecycle notifications.
pub type DataCallback = Arc<dyn Fn(ConnId, &str) + Send + Sync>;

/// Handler for one caller-defined channel (2 and above).
pub type ChannelHandler = Arc<dyn Fn(ConnId, &[u8]) + Send + Sync>;

/// Event delivered by the transport for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent<'a> {
    /// Client asks to open a session.
    Connect,
    /// Session is open.
    Ready,
    /// Message received on the session.
    Data(&'a [u8]),
    /// Session is gone.
    Close,
    /// Any other transport request; not valid here.
    Other(&'a str),
}

// ============================================================================
// Effects
// ============================================================================

/// Callback invocation collected under the state lock.
enum Delivery<'a> {
    Data {
        callback: DataCallback,
        conn_id: ConnId,
        data: Cow<'a, str>,
    },
    Channel {
        handler: ChannelHandler,
        conn_id: ConnId,
        payload: &'a [u8],
    },
}

/// Side effects that run once the state lock is released.
#[derive(Default)]
struct Effects<'a> {
    deliveries: Vec<Delivery<'a>>,
    halts: Vec<ProcessId>,
}

impl<'a> Effects<'a> {
    fn notify(&mut self, callback: Option<&DataCallback>, conn_id: ConnId, data: impl Into<Cow<'a, str>>) {
        if let Some(callback) = callback {
            self.deliveries.push(Delivery::Data {
                callback: Arc::clone(callback),
                conn_id,
                data: data.into(),
            });
        }
    }

    fn halt(&mut self, process_id: ProcessId) {
        if process_id.is_some() {
            self.halts.push(process_id);
        }
    }

    fn run(self, process_manager: Option<&dyn ProcessManager>) {
        for delivery in self.deliveries {
            match delivery {
                Delivery::Data {
                    callback,
                    conn_id,
                    data,
                } => callback(conn_id, &*data),
                Delivery::Channel {
                    handler,
                    conn_id,
                    payload,
                } => handler(conn_id, payload),
            }
        }

        if let Some(manager) = process_manager {
            for process_id in self.halts {
                debug!(%process_id, "Halting bound process");
                manager.halt_process(process_id);
            }
        }
    }
}

// ============================================================================
// WindowState
// ============================================================================

/// Mutable state of a window, guarded by one mutex.
pub(crate) struct WindowState {
    pub options: WindowOptions,
    pub connections: Vec<Connection>,
    /// Last allocated connection ID.
    pub conn_counter: u32,
    pub keys: AuthKeys,
    pub transport: Option<Arc<dyn Transport>>,
    pub data_callback: Option<DataCallback>,
    pub channel_handlers: FxHashMap<ChannelId, ChannelHandler>,
}

impl WindowState {
    fn position(&self, transport_id: TransportId) -> Option<usize> {
        self.connections
            .iter()
            .position(|conn| conn.transport_id == transport_id)
    }

    fn find(&self, conn_id: ConnId) -> Option<&Connection> {
        self.connections.iter().find(|conn| conn.conn_id == conn_id)
    }

    fn drain(&mut self, mode: DrainMode) -> usize {
        flow::drain(&mut self.connections, self.transport.as_deref(), mode)
    }

    /// Sends to one connection now if possible, otherwise queues.
    fn deliver(&mut self, index: usize, channel: ChannelId, payload: Payload) -> Result<()> {
        let max_len = self.options.max_queue_length;
        let transport = self.transport.as_deref();
        let conn = &mut self.connections[index];

        if conn.queue.is_empty() && flow::check_sendable(conn, transport).is_ok() {
            return flow::send_via_connection(conn, transport, channel, payload);
        }

        conn.queue
            .push(PendingMessage::new(channel, payload), max_len)
            .map_err(|_| Error::queue_full(conn.conn_id, max_len))
    }

    fn submit(&mut self, conn_id: ConnId, channel: ChannelId, payload: Payload) -> Result<()> {
        let targets: Vec<usize> = self
            .connections
            .iter()
            .enumerate()
            .filter(|(_, conn)| conn_id.matches(conn.conn_id))
            .map(|(index, _)| index)
            .collect();

        if targets.is_empty() {
            debug!(%conn_id, %channel, "No connection to submit to");
        }

        let last = targets.len().saturating_sub(1);
        let mut payload = Some(payload);
        let mut first_error = None;

        for (n, index) in targets.into_iter().enumerate() {
            // Copies for all targets but the last, which takes the original.
            let item = if n == last {
                payload.take()
            } else {
                payload.clone()
            };
            let Some(item) = item else { break };

            if let Err(e) = self.deliver(index, channel, item) {
                error!(error = %e, "Maximum queue length achieved");
                first_error.get_or_insert(e);
            }
        }

        self.drain(DrainMode::Fixpoint);

        first_error.map_or(Ok(()), Err)
    }

    fn handle_data<'a>(
        &mut self,
        transport_id: TransportId,
        message: &'a [u8],
        effects: &mut Effects<'a>,
    ) -> Result<()> {
        let Some(index) = self.position(transport_id) else {
            error!(%transport_id, "Got websocket data without valid connection - ignore");
            return Err(Error::unknown_connection(transport_id));
        };

        if message.is_empty() {
            trace!(%transport_id, "Heartbeat");
            return Ok(());
        }

        let envelope = Envelope::parse(message).inspect_err(|e| {
            error!(%transport_id, error = %e, "Rejecting inbound message");
        })?;

        self.connections[index].account_inbound(envelope.ack_count, envelope.send_credits);

        let outcome = self.dispatch(index, &envelope, effects);

        self.drain(DrainMode::Fixpoint);

        outcome
    }

    fn dispatch<'a>(
        &mut self,
        index: usize,
        envelope: &Envelope<'a>,
        effects: &mut Effects<'a>,
    ) -> Result<()> {
        let conn_id = self.connections[index].conn_id;
        let stage = self.connections[index].ready;

        if envelope.channel.is_control() {
            if let ControlMessage::Ready { key } = ControlMessage::parse(envelope.payload)
                && stage == ReadyStage::NotReady
            {
                return self.accept_ready(index, key, effects);
            }
            trace!(%conn_id, "Ignoring control message");
            return Ok(());
        }

        if self.options.panel().is_some() && stage < ReadyStage::Ready {
            if envelope.payload == PANEL_READY.as_bytes() {
                debug!(%conn_id, panel = ?self.options.panel(), "Get panel ready");
                self.connections[index].ready = ReadyStage::Ready;
                effects.notify(self.data_callback.as_ref(), conn_id, CONN_READY);
                return Ok(());
            }

            warn!(%conn_id, "Panel handshake failed, closing connection");
            let conn = self.connections.remove(index);
            effects.notify(self.data_callback.as_ref(), conn_id, CONN_CLOSED);
            effects.halt(conn.process_id);
            return Err(Error::panel_handshake_failed(conn_id));
        }

        if envelope.channel == ChannelId::DATA {
            effects.notify(self.data_callback.as_ref(), conn_id, envelope.text());
        } else if let Some(handler) = self.channel_handlers.get(&envelope.channel) {
            effects.deliveries.push(Delivery::Channel {
                handler: Arc::clone(handler),
                conn_id,
                payload: envelope.payload,
            });
        } else {
            warn!(%conn_id, channel = %envelope.channel, "No handler for channel, dropping data");
        }

        Ok(())
    }

    /// Completes `READY=<key>`. An undecodable key counts as unregistered.
    fn accept_ready<'a>(
        &mut self,
        index: usize,
        key: Option<&str>,
        effects: &mut Effects<'a>,
    ) -> Result<()> {
        let conn_id = self.connections[index].conn_id;
        let registered = key.filter(|key| self.keys.contains(key));

        if self.options.native_only && registered.is_none() {
            warn!(%conn_id, "Refusing client without registered key");
            self.connections.remove(index);
            return Err(Error::unauthorized(conn_id));
        }

        if let Some(key) = registered
            && let Some(process_id) = self.keys.take(key)
        {
            debug!(key, %process_id, %conn_id, "Found key for process");
            self.connections[index].process_id = process_id;
        }

        match self.options.panel_name.clone() {
            Some(panel) => {
                self.connections[index].ready = ReadyStage::PanelPending;
                let request = Payload::Text(control::show_panel(&panel));
                if let Err(e) = self.deliver(index, ChannelId::CONTROL, request) {
                    warn!(%conn_id, error = %e, "Cannot request panel");
                }
            }
            None => {
                self.connections[index].ready = ReadyStage::Ready;
                effects.notify(self.data_callback.as_ref(), conn_id, CONN_READY);
            }
        }

        Ok(())
    }
}

// ============================================================================
// WebWindow
// ============================================================================

/// Connection manager of one logical window.
///
/// Shared as `Arc<WebWindow>` between the transport and application code.
///
/// # Example
///
/// ```ignore
/// use webwindow::{ConnId, WebWindow, WindowOptions};
///
/// let window = WebWindow::builder()
///     .options(WindowOptions::new().with_conn_limit(2))
///     .data_callback(|conn_id, data| println!("{conn_id}: {data}"))
///     .build()?;
///
/// window.send(ConnId::ALL, "hello everyone")?;
/// ```
pub struct WebWindow {
    /// Window identifier, also its websocket route.
    id: WindowId,
    /// Serialises event dispatch, including callbacks.
    dispatch: Mutex<()>,
    /// Connection records and configuration.
    state: Mutex<WindowState>,
    /// Lifecycle manager of bound processes.
    process_manager: Option<Arc<dyn ProcessManager>>,
}

// ============================================================================
// WebWindow - Display
// ============================================================================

impl fmt::Debug for WebWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("WebWindow")
            .field("id", &self.id)
            .field("options", &state.options)
            .field("connections", &state.connections.len())
            .field("keys", &state.keys.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// WebWindow - Constructor
// ============================================================================

impl WebWindow {
    /// Creates a builder for configuring a window.
    #[inline]
    #[must_use]
    pub fn builder() -> WindowBuilder {
        WindowBuilder::new()
    }

    /// Creates a window with the given options and no collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options are invalid.
    pub fn new(options: WindowOptions) -> Result<Self> {
        Self::builder().options(options).build()
    }

    /// Assembles a window from validated parts.
    pub(crate) fn from_parts(
        options: WindowOptions,
        transport: Option<Arc<dyn Transport>>,
        process_manager: Option<Arc<dyn ProcessManager>>,
        data_callback: Option<DataCallback>,
    ) -> Self {
        let id = WindowId::next();
        debug!(window_id = %id, ?options, "Window created");

        Self {
            id,
            dispatch: Mutex::new(()),
            state: Mutex::new(WindowState {
                options,
                connections: Vec::new(),
                conn_counter: 0,
                keys: AuthKeys::default(),
                transport,
                data_callback,
                channel_handlers: FxHashMap::default(),
            }),
            process_manager,
        }
    }
}

// ============================================================================
// WebWindow - Transport Events
// ============================================================================

impl WebWindow {
    /// Dispatches one transport event.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] for [`TransportEvent::Other`]
    /// - anything the specific handler returns
    pub fn handle_event(&self, transport_id: TransportId, event: TransportEvent<'_>) -> Result<()> {
        match event {
            TransportEvent::Connect => self.on_connect(transport_id),
            TransportEvent::Ready => self.on_ready(transport_id).map(|_| ()),
            TransportEvent::Data(message) => self.on_data(transport_id, message),
            TransportEvent::Close => {
                self.on_close(transport_id);
                Ok(())
            }
            TransportEvent::Other(kind) => {
                error!(%transport_id, kind, "Only data requests expected");
                Err(Error::protocol(format!("unexpected {kind} request")))
            }
        }
    }

    /// Decides whether a new session may open.
    ///
    /// No record is created until [`WebWindow::on_ready`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionLimitExceeded`] when the window is full.
    pub fn on_connect(&self, transport_id: TransportId) -> Result<()> {
        let _dispatch = self.dispatch.lock();
        let state = self.state.lock();

        if !state.options.admits(state.connections.len()) {
            warn!(
                window_id = %self.id,
                %transport_id,
                limit = state.options.conn_limit,
                "Refusing connection, limit reached"
            );
            return Err(Error::connection_limit(state.options.conn_limit));
        }

        trace!(window_id = %self.id, %transport_id, "Accepting connection");
        Ok(())
    }

    /// Creates the record for an opened session.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateReady`] if the session already has a record
    /// - [`Error::Protocol`] for [`TransportId::NONE`]
    pub fn on_ready(&self, transport_id: TransportId) -> Result<ConnId> {
        if !transport_id.is_some() {
            return Err(Error::protocol("READY without transport session"));
        }

        let _dispatch = self.dispatch.lock();
        let mut state = self.state.lock();

        if state.position(transport_id).is_some() {
            error!(%transport_id, "Connection with given websocket id already exists");
            return Err(Error::duplicate_ready(transport_id));
        }

        let Some(next) = state.conn_counter.checked_add(1) else {
            error!(window_id = %self.id, %transport_id, "Connection IDs exhausted");
            return Err(Error::protocol("connection IDs exhausted"));
        };
        state.conn_counter = next;
        let conn_id = ConnId::new(next);
        state.connections.push(Connection::new(conn_id, transport_id));

        info!(window_id = %self.id, %conn_id, %transport_id, "Connection ready");
        Ok(conn_id)
    }

    /// Processes one inbound message.
    ///
    /// An empty message is a heartbeat and changes nothing. Otherwise the
    /// envelope counters are applied, the payload is dispatched by channel
    /// and all queues are drained.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownConnection`] if the session has no record
    /// - [`Error::MalformedHeader`] / [`Error::TruncatedMessage`] for a bad
    ///   envelope; state is left untouched
    /// - [`Error::Unauthorized`] if a native-only window sees an unknown key;
    ///   the record is destroyed
    /// - [`Error::PanelHandshakeFailed`] if the panel did not answer
    ///   `PANEL_READY`; the record is destroyed
    pub fn on_data(&self, transport_id: TransportId, message: &[u8]) -> Result<()> {
        let _dispatch = self.dispatch.lock();
        let mut effects = Effects::default();

        let result = self
            .state
            .lock()
            .handle_data(transport_id, message, &mut effects);

        effects.run(self.process_manager.as_deref());
        result
    }

    /// Drops the record of a closed session.
    ///
    /// Delivers [`CONN_CLOSED`] and halts the bound process. Unknown
    /// sessions are ignored.
    pub fn on_close(&self, transport_id: TransportId) {
        let _dispatch = self.dispatch.lock();
        let mut effects = Effects::default();

        {
            let mut state = self.state.lock();
            if let Some(index) = state.position(transport_id) {
                let mut conn = state.connections.remove(index);
                let dropped = conn.queue.clear();
                info!(
                    window_id = %self.id,
                    conn_id = %conn.conn_id,
                    dropped,
                    "Connection closed"
                );
                effects.notify(state.data_callback.as_ref(), conn.conn_id, CONN_CLOSED);
                effects.halt(conn.process_id);
            }
        }

        effects.run(self.process_manager.as_deref());
    }
}

// ============================================================================
// WebWindow - Sending
// ============================================================================

impl WebWindow {
    /// Sends `payload` on `channel` to one connection, or to all with
    /// [`ConnId::ALL`].
    ///
    /// Each target sends immediately when its queue is empty and it has
    /// credits, otherwise the message is queued. A full queue only fails
    /// its own connection; other targets still receive the message.
    /// Queues are drained afterwards.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::QueueFull`] among the targets.
    pub fn submit(&self, conn_id: ConnId, channel: ChannelId, payload: impl Into<Payload>) -> Result<()> {
        self.state.lock().submit(conn_id, channel, payload.into())
    }

    /// Sends text on the default data channel.
    ///
    /// # Errors
    ///
    /// See [`WebWindow::submit`].
    pub fn send(&self, conn_id: ConnId, text: impl Into<String>) -> Result<()> {
        self.submit(conn_id, ChannelId::DATA, Payload::Text(text.into()))
    }

    /// Sends bytes on the default data channel.
    ///
    /// # Errors
    ///
    /// See [`WebWindow::submit`].
    pub fn send_binary(&self, conn_id: ConnId, data: impl Into<Vec<u8>>) -> Result<()> {
        self.submit(conn_id, ChannelId::DATA, Payload::Binary(data.into()))
    }

    /// Asks one client to close. [`ConnId::ALL`] and unknown IDs are no-ops.
    ///
    /// # Errors
    ///
    /// See [`WebWindow::submit`].
    pub fn close_connection(&self, conn_id: ConnId) -> Result<()> {
        if conn_id.is_all() {
            return Ok(());
        }
        self.submit(conn_id, ChannelId::CONTROL, CLOSE)
    }

    /// Asks every client to close.
    ///
    /// # Errors
    ///
    /// See [`WebWindow::submit`].
    pub fn close_all_connections(&self) -> Result<()> {
        self.submit(ConnId::ALL, ChannelId::CONTROL, CLOSE)
    }

    /// Returns `true` if a send to `conn_id` would go out immediately
    /// (`direct`) or at least be queued (`!direct`).
    ///
    /// [`ConnId::ALL`] requires the condition for every connection and
    /// holds trivially without connections. An unknown ID gives `false`.
    #[must_use]
    pub fn can_send(&self, conn_id: ConnId, direct: bool) -> bool {
        let state = self.state.lock();
        let max_len = state.options.max_queue_length;
        let mut matched = false;

        for conn in state.connections.iter().filter(|c| conn_id.matches(c.conn_id)) {
            matched = true;
            let ok = if direct {
                conn.can_send_direct()
            } else {
                conn.queue.len() < max_len
            };
            if !ok {
                return false;
            }
        }

        matched || conn_id.is_all()
    }

    /// Runs the credit-flow engine, returning the number of frames sent.
    pub fn flush(&self, mode: DrainMode) -> usize {
        self.state.lock().drain(mode)
    }
}

// ============================================================================
// WebWindow - Callbacks
// ============================================================================

impl WebWindow {
    /// Sets the data callback.
    ///
    /// The callback gets channel 1 data and the [`CONN_READY`] /
    /// [`CONN_CLOSED`] notifications. It may call back into the window.
    pub fn set_data_callback<F>(&self, callback: F)
    where
        F: Fn(ConnId, &str) + Send + Sync + 'static,
    {
        self.state.lock().data_callback = Some(Arc::new(callback));
    }

    /// Removes the data callback.
    pub fn clear_data_callback(&self) {
        self.state.lock().data_callback = None;
    }

    /// Registers the handler of a caller-defined channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidChannel`] for the reserved channels 0 and 1.
    pub fn set_channel_handler<F>(&self, channel: ChannelId, handler: F) -> Result<()>
    where
        F: Fn(ConnId, &[u8]) + Send + Sync + 'static,
    {
        if !channel.is_custom() {
            return Err(Error::invalid_channel(channel));
        }
        self.state
            .lock()
            .channel_handlers
            .insert(channel, Arc::new(handler));
        Ok(())
    }

    /// Removes a channel handler, returning `true` if one was set.
    pub fn clear_channel_handler(&self, channel: ChannelId) -> bool {
        self.state.lock().channel_handlers.remove(&channel).is_some()
    }
}

// ============================================================================
// WebWindow - Configuration
// ============================================================================

impl WebWindow {
    /// Returns the window identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Returns a copy of the current options.
    #[must_use]
    pub fn options(&self) -> WindowOptions {
        self.state.lock().options.clone()
    }

    /// Attaches the transport and sends anything that was waiting for it.
    pub fn set_transport(&self, transport: Arc<dyn Transport>) {
        let mut state = self.state.lock();
        state.transport = Some(transport);
        state.drain(DrainMode::Fixpoint);
    }

    /// Detaches the transport; later sends queue up.
    pub fn clear_transport(&self) {
        self.state.lock().transport = None;
    }

    /// Configures the panel handshake.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if connections exist or the name is empty.
    pub fn set_panel_name(&self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        let mut state = self.state.lock();

        if !state.connections.is_empty() {
            error!(window_id = %self.id, "Cannot configure panel when connection exists");
            return Err(Error::config("cannot configure panel when connection exists"));
        }
        if name.is_empty() {
            return Err(Error::config("panel name must not be empty"));
        }

        state.options.panel_name = Some(name);
        Ok(())
    }

    /// Sets the connection limit (`0` for unlimited).
    pub fn set_conn_limit(&self, limit: usize) {
        self.state.lock().options.conn_limit = limit;
    }

    /// Sets the per-connection queue bound.
    ///
    /// Queues already longer than the new bound keep their messages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for zero.
    pub fn set_max_queue_length(&self, len: usize) -> Result<()> {
        if len == 0 {
            return Err(Error::config("max queue length must be at least 1"));
        }
        self.state.lock().options.max_queue_length = len;
        Ok(())
    }

    /// Enables or disables native-only mode.
    pub fn set_native_only(&self, native_only: bool) {
        self.state.lock().options.native_only = native_only;
    }
}

// ============================================================================
// WebWindow - Authorization Keys
// ============================================================================

impl WebWindow {
    /// Registers a single-use key for an external process.
    pub fn add_key(&self, key: impl Into<String>, process_id: ProcessId) {
        let key = key.into();
        debug!(window_id = %self.id, key, %process_id, "Key registered");
        if let Some(previous) = self.state.lock().keys.insert(key, process_id) {
            warn!(%previous, "Key was already registered, replaced");
        }
    }

    /// Returns `true` if the key is registered and unused.
    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.state.lock().keys.contains(key)
    }

    /// Withdraws a key.
    pub fn remove_key(&self, key: &str) -> Option<ProcessId> {
        self.state.lock().keys.take(key)
    }
}

// ============================================================================
// WebWindow - Introspection
// ============================================================================

impl WebWindow {
    /// Returns the number of connections.
    #[must_use]
    pub fn num_connections(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// Returns the ID of the `index`-th connection, in creation order.
    #[must_use]
    pub fn connection_id(&self, index: usize) -> Option<ConnId> {
        self.state.lock().connections.get(index).map(|c| c.conn_id)
    }

    /// Returns the IDs of all connections.
    #[must_use]
    pub fn connection_ids(&self) -> Vec<ConnId> {
        self.state
            .lock()
            .connections
            .iter()
            .map(|c| c.conn_id)
            .collect()
    }

    /// Returns a snapshot of one connection.
    #[must_use]
    pub fn connection_info(&self, conn_id: ConnId) -> Option<ConnectionInfo> {
        self.state.lock().find(conn_id).map(Connection::info)
    }

    /// Returns the send credits of one connection.
    #[must_use]
    pub fn send_credits(&self, conn_id: ConnId) -> Option<u64> {
        self.state.lock().find(conn_id).map(|c| c.send_credits)
    }

    /// Returns the number of queued messages of one connection.
    #[must_use]
    pub fn queue_len(&self, conn_id: ConnId) -> Option<usize> {
        self.state.lock().find(conn_id).map(|c| c.queue.len())
    }
}

// ============================================================================
// WebWindow - Drop
// ============================================================================

impl Drop for WebWindow {
    fn drop(&mut self) {
        let connections = std::mem::take(&mut self.state.get_mut().connections);

        if let Some(manager) = &self.process_manager {
            for conn in connections.iter().filter(|c| c.process_id.is_some()) {
                manager.halt_process(conn.process_id);
            }
        }

        debug!(window_id = %self.id, halted = connections.len(), "Window destroyed");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Weak;

    use proptest::prelude::*;

    use crate::protocol::Frame;
    use crate::window::testing::{Events, RecordingProcesses, RecordingTransport};

    struct Harness {
        window: WebWindow,
        transport: Arc<RecordingTransport>,
        processes: Arc<RecordingProcesses>,
        events: Events,
    }

    impl Harness {
        fn new(options: WindowOptions) -> Self {
            let transport = Arc::new(RecordingTransport::default());
            let processes = Arc::new(RecordingProcesses::default());
            let events = Events::default();
            let sink = Arc::clone(&events);

            let window = WebWindow::builder()
                .options(options)
                .transport(transport.clone())
                .process_manager(processes.clone())
                .data_callback(move |conn_id, data| sink.lock().push((conn_id, data.to_string())))
                .build()
                .unwrap();

            Self {
                window,
                transport,
                processes,
                events,
            }
        }

        fn open(&self, transport_id: u64) -> ConnId {
            let tid = TransportId::new(transport_id);
            self.window.on_connect(tid).unwrap();
            self.window.on_ready(tid).unwrap()
        }

        fn data(&self, transport_id: u64, message: &str) -> Result<()> {
            self.window
                .on_data(TransportId::new(transport_id), message.as_bytes())
        }

        fn events(&self) -> Vec<(ConnId, String)> {
            self.events.lock().clone()
        }

        fn info(&self, conn_id: ConnId) -> ConnectionInfo {
            self.window.connection_info(conn_id).unwrap()
        }
    }

    fn ev(conn_id: ConnId, data: &str) -> (ConnId, String) {
        (conn_id, data.to_string())
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    #[test]
    fn test_connection_limit() {
        let h = Harness::new(WindowOptions::new().with_conn_limit(2));

        h.open(1);
        h.open(2);
        let err = h.window.on_connect(TransportId::new(3)).unwrap_err();

        assert!(matches!(err, Error::ConnectionLimitExceeded { limit: 2 }));
        assert_eq!(h.window.num_connections(), 2);
    }

    #[test]
    fn test_unlimited_connections() {
        let h = Harness::new(WindowOptions::new().with_conn_limit(0));
        for tid in 1..=20 {
            h.open(tid);
        }
        assert_eq!(h.window.num_connections(), 20);
    }

    #[test]
    fn test_duplicate_ready() {
        let h = Harness::new(WindowOptions::default());
        let conn_id = h.open(1);

        let err = h.window.on_ready(TransportId::new(1)).unwrap_err();

        assert!(matches!(err, Error::DuplicateReady { .. }));
        assert_eq!(h.window.connection_ids(), vec![conn_id]);
    }

    #[test]
    fn test_ready_without_transport_session() {
        let h = Harness::new(WindowOptions::default());
        assert!(h.window.on_ready(TransportId::NONE).is_err());
        assert_eq!(h.window.num_connections(), 0);
    }

    #[test]
    fn test_conn_ids_exhausted() {
        let h = Harness::new(WindowOptions::new().with_conn_limit(0));
        h.window.state.lock().conn_counter = u32::MAX - 1;

        assert_eq!(h.open(1), ConnId::new(u32::MAX));
        let err = h.window.on_ready(TransportId::new(2)).unwrap_err();

        assert!(matches!(err, Error::Protocol { .. }));
        assert_eq!(h.window.connection_ids(), vec![ConnId::new(u32::MAX)]);
    }

    #[test]
    fn test_conn_ids_never_reused() {
        let h = Harness::new(WindowOptions::default());
        let first = h.open(1);
        h.window.on_close(TransportId::new(1));
        let second = h.open(1);

        assert_eq!(first, ConnId::new(1));
        assert_eq!(second, ConnId::new(2));
        assert_eq!(h.window.connection_id(0), Some(second));
        assert_eq!(h.window.connection_id(1), None);
    }

    #[test]
    fn test_close_notifies_and_halts() {
        let h = Harness::new(WindowOptions::default());
        h.window.add_key("k", ProcessId::new(77));
        let conn_id = h.open(1);
        h.data(1, "0:5:0:READY=k").unwrap();

        h.window.on_close(TransportId::new(1));
        h.window.on_close(TransportId::new(1));

        assert_eq!(
            h.events(),
            vec![ev(conn_id, CONN_READY), ev(conn_id, CONN_CLOSED)]
        );
        assert_eq!(h.processes.halted(), vec![ProcessId::new(77)]);
        assert_eq!(h.window.num_connections(), 0);
    }

    #[test]
    fn test_close_unbound_does_not_halt() {
        let h = Harness::new(WindowOptions::default());
        h.open(1);
        h.window.on_close(TransportId::new(1));
        assert!(h.processes.halted().is_empty());
    }

    #[test]
    fn test_handle_event_routes() {
        let h = Harness::new(WindowOptions::default());
        let tid = TransportId::new(4);

        h.window.handle_event(tid, TransportEvent::Connect).unwrap();
        h.window.handle_event(tid, TransportEvent::Ready).unwrap();
        h.window
            .handle_event(tid, TransportEvent::Data(b"0:5:0:READY="))
            .unwrap();
        let err = h
            .window
            .handle_event(tid, TransportEvent::Other("WS_PING"))
            .unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));

        h.window.handle_event(tid, TransportEvent::Close).unwrap();
        assert_eq!(h.events().len(), 2);
    }

    // ------------------------------------------------------------------------
    // Inbound data
    // ------------------------------------------------------------------------

    #[test]
    fn test_ready_with_key() {
        let h = Harness::new(WindowOptions::default());
        h.window.add_key("abc", ProcessId::new(9));
        let conn_id = h.open(1);

        h.data(1, "3:5:0:READY=abc").unwrap();

        assert_eq!(h.events(), vec![ev(conn_id, CONN_READY)]);
        let info = h.info(conn_id);
        assert_eq!(info.ready, ReadyStage::Ready);
        assert_eq!(info.send_credits, 3);
        assert_eq!(info.client_credits, 5);
        assert_eq!(info.process_id, ProcessId::new(9));
        assert!(!h.window.has_key("abc"));
    }

    #[test]
    fn test_ready_twice_is_ignored() {
        let h = Harness::new(WindowOptions::default());
        let conn_id = h.open(1);
        h.data(1, "0:5:0:READY=").unwrap();
        h.data(1, "0:5:0:READY=").unwrap();

        assert_eq!(h.events(), vec![ev(conn_id, CONN_READY)]);
    }

    #[test]
    fn test_channel_one_data() {
        let h = Harness::new(WindowOptions::default());
        let conn_id = h.open(1);
        h.data(1, "0:5:0:READY=").unwrap();

        h.data(1, "0:0:1:hello").unwrap();

        assert_eq!(h.events().last(), Some(&ev(conn_id, "hello")));
    }

    #[test]
    fn test_custom_channel_handler() {
        let h = Harness::new(WindowOptions::default());
        let seen: Arc<Mutex<Vec<(ConnId, Vec<u8>)>>> = Arc::default();
        let sink = Arc::clone(&seen);
        h.window
            .set_channel_handler(ChannelId::new(3), move |conn_id, payload| {
                sink.lock().push((conn_id, payload.to_vec()));
            })
            .unwrap();
        let conn_id = h.open(1);

        h.data(1, "0:5:3:a:b").unwrap();
        h.data(1, "0:5:4:unhandled").unwrap();

        assert_eq!(seen.lock().clone(), vec![(conn_id, b"a:b".to_vec())]);
        assert!(h.window.clear_channel_handler(ChannelId::new(3)));
        assert!(!h.window.clear_channel_handler(ChannelId::new(3)));
    }

    #[test]
    fn test_reserved_channel_handler_rejected() {
        let h = Harness::new(WindowOptions::default());
        for channel in [ChannelId::CONTROL, ChannelId::DATA] {
            let err = h.window.set_channel_handler(channel, |_, _| {}).unwrap_err();
            assert!(matches!(err, Error::InvalidChannel { .. }));
        }
    }

    #[test]
    fn test_heartbeat_changes_nothing() {
        let h = Harness::new(WindowOptions::default());
        let conn_id = h.open(1);
        let before = h.info(conn_id);

        h.data(1, "").unwrap();

        assert_eq!(h.info(conn_id), before);
        assert!(h.events().is_empty());
    }

    #[test]
    fn test_data_without_connection() {
        let h = Harness::new(WindowOptions::default());
        let err = h.data(8, "0:0:1:hello").unwrap_err();
        assert!(matches!(err, Error::UnknownConnection { .. }));
    }

    #[test]
    fn test_malformed_leaves_state_untouched() {
        let h = Harness::new(WindowOptions::default());
        let conn_id = h.open(1);
        let before = h.info(conn_id);

        let err = h.data(1, "5:5:x:hello").unwrap_err();

        assert!(matches!(err, Error::MalformedHeader { .. }));
        assert_eq!(h.info(conn_id), before);
    }

    #[test]
    fn test_native_only_rejects_unknown_key() {
        let h = Harness::new(WindowOptions::new().with_native_only());
        h.window.add_key("good", ProcessId::new(1));
        let conn_id = h.open(1);

        let err = h.data(1, "0:5:0:READY=bad").unwrap_err();

        assert!(matches!(err, Error::Unauthorized { conn_id: c } if c == conn_id));
        assert!(err.should_drop_session());
        assert_eq!(h.window.num_connections(), 0);
        assert!(h.events().is_empty());
        assert!(h.window.has_key("good"));
    }

    #[test]
    fn test_native_only_accepts_known_key() {
        let h = Harness::new(WindowOptions::new().with_native_only());
        h.window.add_key("good", ProcessId::new(1));
        let conn_id = h.open(1);

        h.data(1, "0:5:0:READY=good").unwrap();

        assert_eq!(h.events(), vec![ev(conn_id, CONN_READY)]);
        assert_eq!(h.info(conn_id).process_id, ProcessId::new(1));
    }

    #[test]
    fn test_native_only_rejects_non_utf8_key() {
        let h = Harness::new(WindowOptions::new().with_native_only());
        h.window.add_key("good", ProcessId::new(1));
        let conn_id = h.open(1);

        let err = h
            .window
            .on_data(TransportId::new(1), b"0:5:0:READY=\xff\xfe")
            .unwrap_err();

        assert!(matches!(err, Error::Unauthorized { conn_id: c } if c == conn_id));
        assert_eq!(h.window.num_connections(), 0);
        assert!(h.data(1, "0:5:1:hello").is_err());
        assert!(h.events().is_empty());
        assert!(h.window.has_key("good"));
    }

    #[test]
    fn test_non_utf8_key_completes_handshake_unbound() {
        let h = Harness::new(WindowOptions::default());
        let conn_id = h.open(1);

        h.window
            .on_data(TransportId::new(1), b"0:5:0:READY=\xff\xfe")
            .unwrap();

        let info = h.info(conn_id);
        assert_eq!(info.ready, ReadyStage::Ready);
        assert_eq!(info.process_id, ProcessId::NONE);
        assert_eq!(h.events(), vec![ev(conn_id, CONN_READY)]);
    }

    // ------------------------------------------------------------------------
    // Panel handshake
    // ------------------------------------------------------------------------

    #[test]
    fn test_panel_handshake() {
        let h = Harness::new(WindowOptions::new().with_panel_name("FitPanel"));
        let conn_id = h.open(1);

        h.data(1, "1:5:0:READY=").unwrap();

        assert_eq!(h.transport.texts(), vec!["1:1:0:SHOWPANEL:FitPanel"]);
        assert_eq!(h.info(conn_id).ready, ReadyStage::PanelPending);
        assert!(h.events().is_empty());

        h.data(1, "1:5:1:PANEL_READY").unwrap();

        assert_eq!(h.info(conn_id).ready, ReadyStage::Ready);
        assert_eq!(h.events(), vec![ev(conn_id, CONN_READY)]);

        h.data(1, "0:5:1:payload").unwrap();
        assert_eq!(h.events().last(), Some(&ev(conn_id, "payload")));
    }

    #[test]
    fn test_panel_request_waits_for_credits() {
        let h = Harness::new(WindowOptions::new().with_panel_name("FitPanel"));
        let conn_id = h.open(1);

        h.data(1, "0:5:0:READY=").unwrap();
        assert!(h.transport.texts().is_empty());
        assert_eq!(h.info(conn_id).queue_len, 1);

        h.data(1, "1:5:0:").unwrap();
        assert_eq!(h.transport.texts(), vec!["2:1:0:SHOWPANEL:FitPanel"]);
    }

    #[test]
    fn test_panel_handshake_failure_closes() {
        let h = Harness::new(WindowOptions::new().with_panel_name("FitPanel"));
        h.window.add_key("k", ProcessId::new(5));
        let conn_id = h.open(1);
        h.data(1, "1:5:0:READY=k").unwrap();

        let err = h.data(1, "0:5:1:something else").unwrap_err();

        assert!(matches!(err, Error::PanelHandshakeFailed { .. }));
        assert_eq!(h.events(), vec![ev(conn_id, CONN_CLOSED)]);
        assert_eq!(h.window.num_connections(), 0);
        assert_eq!(h.processes.halted(), vec![ProcessId::new(5)]);
    }

    #[test]
    fn test_set_panel_name_with_connections() {
        let h = Harness::new(WindowOptions::default());
        assert!(h.window.set_panel_name("A").is_ok());
        h.open(1);

        let err = h.window.set_panel_name("B").unwrap_err();

        assert!(matches!(err, Error::Config { .. }));
        assert_eq!(h.window.options().panel(), Some("A"));
    }

    // ------------------------------------------------------------------------
    // Credits and queues
    // ------------------------------------------------------------------------

    #[test]
    fn test_no_send_without_credits() {
        let h = Harness::new(WindowOptions::default());
        let conn_id = h.open(1);

        h.window.send(conn_id, "a").unwrap();
        h.window.send(conn_id, "b").unwrap();

        assert!(h.transport.texts().is_empty());
        assert_eq!(h.info(conn_id).queue_len, 2);

        h.data(1, "1:5:1:x").unwrap();
        assert_eq!(h.transport.texts(), vec!["1:1:1:a"]);

        h.data(1, "5:5:1:y").unwrap();
        assert_eq!(h.transport.texts(), vec!["1:1:1:a", "1:5:1:b"]);
        assert_eq!(h.info(conn_id).send_credits, 4);
    }

    #[test]
    fn test_credit_and_queue_accessors() {
        let h = Harness::new(WindowOptions::default());
        let conn_id = h.open(1);
        h.window.send(conn_id, "waiting").unwrap();

        assert_eq!(h.window.send_credits(conn_id), Some(0));
        assert_eq!(h.window.queue_len(conn_id), Some(1));
        assert_eq!(h.window.send_credits(ConnId::new(42)), None);
        assert_eq!(h.window.queue_len(ConnId::new(42)), None);
    }

    #[test]
    fn test_queue_full() {
        let h = Harness::new(WindowOptions::new().with_max_queue_length(2));
        let conn_id = h.open(1);

        h.window.send(conn_id, "1").unwrap();
        h.window.send(conn_id, "2").unwrap();
        let err = h.window.send(conn_id, "3").unwrap_err();

        assert!(matches!(err, Error::QueueFull { max_len: 2, .. }));
        assert_eq!(h.info(conn_id).queue_len, 2);

        h.data(1, "10:10:1:").unwrap();
        assert_eq!(h.transport.texts(), vec!["1:10:1:1", "0:9:1:2"]);
    }

    #[test]
    fn test_broadcast_queue_full_is_per_connection() {
        let h = Harness::new(WindowOptions::new().with_conn_limit(0).with_max_queue_length(1));
        let a = h.open(1);
        let b = h.open(2);
        h.window.send(a, "fill").unwrap();
        h.data(2, "1:5:1:").unwrap();

        let err = h.window.send(ConnId::ALL, "both").unwrap_err();

        assert!(matches!(err, Error::QueueFull { conn_id, .. } if conn_id == a));
        assert_eq!(h.transport.texts_for(TransportId::new(2)), vec!["1:1:1:both"]);
        assert_eq!(h.info(a).queue_len, 1);
        assert_eq!(h.info(b).queue_len, 0);
    }

    #[test]
    fn test_broadcast_moves_payload_to_last_target() {
        let h = Harness::new(WindowOptions::new().with_conn_limit(0));
        for tid in 1..=3 {
            h.open(tid);
            h.data(tid, "5:5:1:").unwrap();
        }

        let body = vec![7u8; 64];
        let original = body.as_ptr();
        h.window.send_binary(ConnId::ALL, body).unwrap();

        let (count, moved_to) = h.transport.with_frames(|frames| {
            let moved: Vec<TransportId> = frames
                .iter()
                .filter(|(_, frame)| {
                    matches!(frame, Frame::Binary { body, .. } if body.as_ptr() == original)
                })
                .map(|(tid, _)| *tid)
                .collect();
            (frames.len(), moved)
        });
        assert_eq!(count, 3);
        assert_eq!(moved_to, vec![TransportId::new(3)]);
    }

    #[test]
    fn test_keepalive_after_two_unacknowledged() {
        let h = Harness::new(WindowOptions::default());
        let conn_id = h.open(1);

        h.data(1, "1:2:1:a").unwrap();
        assert!(h.transport.texts().is_empty());

        h.data(1, "0:2:1:b").unwrap();

        assert_eq!(h.transport.texts(), vec!["2:1:0:KEEPALIVE"]);
        let info = h.info(conn_id);
        assert_eq!(info.recv_count, 0);
        assert_eq!(info.send_credits, 0);
    }

    #[test]
    fn test_control_messages_jump_queue() {
        let h = Harness::new(WindowOptions::default());
        let conn_id = h.open(1);
        h.window.send(conn_id, "data").unwrap();
        h.window.close_connection(conn_id).unwrap();

        h.data(1, "2:9:1:").unwrap();

        assert_eq!(h.transport.texts(), vec!["1:2:0:CLOSE", "0:1:1:data"]);
    }

    #[test]
    fn test_close_connection_idempotent() {
        let h = Harness::new(WindowOptions::default());
        let conn_id = h.open(1);
        h.window.on_close(TransportId::new(1));

        assert!(h.window.close_connection(conn_id).is_ok());
        assert!(h.window.close_connection(conn_id).is_ok());
        assert!(h.window.close_connection(ConnId::ALL).is_ok());
        assert!(h.transport.texts().is_empty());
    }

    #[test]
    fn test_close_all_connections() {
        let h = Harness::new(WindowOptions::new().with_conn_limit(0));
        for tid in 1..=2 {
            h.open(tid);
            h.data(tid, "1:5:1:").unwrap();
        }

        h.window.close_all_connections().unwrap();

        assert_eq!(h.transport.texts(), vec!["1:1:0:CLOSE", "1:1:0:CLOSE"]);
    }

    #[test]
    fn test_can_send() {
        let h = Harness::new(WindowOptions::new().with_conn_limit(0).with_max_queue_length(1));
        assert!(h.window.can_send(ConnId::ALL, true));

        let a = h.open(1);
        let b = h.open(2);
        h.data(2, "1:5:1:").unwrap();

        assert!(!h.window.can_send(a, true));
        assert!(h.window.can_send(a, false));
        assert!(h.window.can_send(b, true));
        assert!(!h.window.can_send(ConnId::ALL, true));
        assert!(h.window.can_send(ConnId::ALL, false));
        assert!(!h.window.can_send(ConnId::new(99), false));

        h.window.send(a, "queued").unwrap();
        assert!(!h.window.can_send(a, false));
        assert!(!h.window.can_send(ConnId::ALL, false));
    }

    #[test]
    fn test_transport_attach_drains_all_connections() {
        let window = WebWindow::new(WindowOptions::new().with_conn_limit(0)).unwrap();
        for tid in 1..=2 {
            let tid = TransportId::new(tid);
            window.on_ready(tid).unwrap();
            window.on_data(tid, b"3:5:0:").unwrap();
        }
        window.send(ConnId::ALL, "x").unwrap();
        window.send(ConnId::ALL, "y").unwrap();
        assert_eq!(window.connection_info(ConnId::new(1)).unwrap().queue_len, 2);

        let transport = Arc::new(RecordingTransport::default());
        window.set_transport(transport.clone());

        assert_eq!(transport.texts().len(), 4);
        assert_eq!(window.connection_info(ConnId::new(2)).unwrap().queue_len, 0);
    }

    #[test]
    fn test_flush_single_pass() {
        let window = WebWindow::new(WindowOptions::default()).unwrap();
        let tid = TransportId::new(1);
        window.on_ready(tid).unwrap();
        window.on_data(tid, b"3:5:0:").unwrap();
        window.send(ConnId::ALL, "x").unwrap();
        window.send(ConnId::ALL, "y").unwrap();

        let transport = Arc::new(RecordingTransport::default());
        window.state.lock().transport = Some(transport.clone());

        assert_eq!(window.flush(DrainMode::SinglePass), 1);
        assert_eq!(window.flush(DrainMode::Fixpoint), 1);
        assert_eq!(transport.texts(), vec!["1:3:1:x", "0:2:1:y"]);
    }

    // ------------------------------------------------------------------------
    // Callbacks and teardown
    // ------------------------------------------------------------------------

    #[test]
    fn test_callback_may_send() {
        let transport = Arc::new(RecordingTransport::default());
        let window = Arc::new(
            WebWindow::builder()
                .transport(transport.clone())
                .build()
                .unwrap(),
        );
        let weak: Weak<WebWindow> = Arc::downgrade(&window);
        window.set_data_callback(move |conn_id, data| {
            if let Some(window) = weak.upgrade()
                && data != CONN_READY
            {
                window.send(conn_id, format!("echo:{data}")).unwrap();
            }
        });

        let tid = TransportId::new(1);
        window.on_ready(tid).unwrap();
        window.on_data(tid, b"2:9:0:READY=").unwrap();
        window.on_data(tid, b"0:9:1:ping").unwrap();

        assert_eq!(transport.texts(), vec!["2:2:1:echo:ping"]);
    }

    #[test]
    fn test_drop_halts_bound_processes() {
        let processes = Arc::new(RecordingProcesses::default());
        let window = WebWindow::builder()
            .options(WindowOptions::new().with_conn_limit(0))
            .process_manager(processes.clone())
            .build()
            .unwrap();
        window.add_key("a", ProcessId::new(11));
        window.add_key("b", ProcessId::new(12));
        for (tid, key) in [(1, "a"), (2, "b"), (3, "none")] {
            let tid = TransportId::new(tid);
            window.on_ready(tid).unwrap();
            window
                .on_data(tid, format!("0:5:0:READY={key}").as_bytes())
                .unwrap();
        }

        drop(window);

        assert_eq!(
            processes.halted(),
            vec![ProcessId::new(11), ProcessId::new(12)]
        );
    }

    #[test]
    fn test_remove_key() {
        let window = WebWindow::new(WindowOptions::default()).unwrap();
        window.add_key("k", ProcessId::new(3));
        assert_eq!(window.remove_key("k"), Some(ProcessId::new(3)));
        assert!(!window.has_key("k"));
    }

    #[test]
    fn test_window_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WebWindow>();
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    #[derive(Debug, Clone)]
    enum Op {
        Submit { target: u32, control: bool },
        Ack { conn: u64, count: u64, client: u64 },
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..=3, any::<bool>()).prop_map(|(target, control)| Op::Submit { target, control }),
            (1u64..=3, 0u64..4, 0u64..6).prop_map(|(conn, count, client)| Op::Ack {
                conn,
                count,
                client
            }),
        ]
    }

    proptest! {
        #[test]
        fn prop_credits_and_queue_bounds(ops in proptest::collection::vec(op(), 1..80), max_len in 1usize..5) {
            let h = Harness::new(
                WindowOptions::new().with_conn_limit(0).with_max_queue_length(max_len),
            );
            for tid in 1..=3 {
                h.open(tid);
            }
            let mut granted = [0u64; 3];

            for op in ops {
                match op {
                    Op::Submit { target, control } => {
                        let channel = if control { ChannelId::CONTROL } else { ChannelId::DATA };
                        let result = h.window.submit(ConnId::new(target), channel, "m");
                        if let Err(e) = result {
                            let full = matches!(e, Error::QueueFull { .. });
                            prop_assert!(full, "unexpected error {:?}", e);
                        }
                    }
                    Op::Ack { conn, count, client } => {
                        granted[(conn - 1) as usize] += count;
                        h.data(conn, &format!("{count}:{client}:1:")).unwrap();
                    }
                }

                for conn_id in h.window.connection_ids() {
                    prop_assert!(h.info(conn_id).queue_len <= max_len);
                }
            }

            for (tid, granted) in (1u64..=3).zip(granted) {
                let frames = h.transport.texts_for(TransportId::new(tid));
                prop_assert!(frames.len() as u64 <= granted);
                for frame in frames {
                    let env = Envelope::parse(frame.as_bytes()).unwrap();
                    prop_assert!(env.send_credits >= 1);
                }
            }
        }
    }
}
