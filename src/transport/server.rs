//! WebSocket server for window clients.
//!
//! One listener serves every registered window. Clients pick their window
//! through the request path (`/win<id>`), and every accepted socket becomes
//! one transport session.
//!
//! # Session Flow
//!
//! 1. Client opens `ws://127.0.0.1:{port}/win<id>`
//! 2. The handshake is refused with 404 for an unknown window, or 503 when
//!    [`WebWindow::on_connect`] refuses it
//! 3. After the upgrade the session is registered and
//!    [`WebWindow::on_ready`] creates the connection record
//! 4. Every text or binary message goes to [`WebWindow::on_data`]
//! 5. When the socket ends, [`WebWindow::on_close`] drops the record
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │             WindowServer                 │
//! │             (single port)                │
//! │  ┌────────────────────────────────────┐  │
//! │  │ /win1 → WebWindow 1                │  │
//! │  │ /win2 → WebWindow 2                │  │
//! │  └────────────────────────────────────┘  │
//! │  WsTransport: TransportId → writer task  │
//! └──────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{TransportId, WindowId};
use crate::window::WebWindow;

use super::Transport;

// ============================================================================
// Constants
// ============================================================================

/// Default bind address for the WebSocket server (localhost).
const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Accept poll interval, bounds how long shutdown takes to be noticed.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// Types
// ============================================================================

/// Outbound half of one session.
type SessionSender = mpsc::UnboundedSender<Message>;

// ============================================================================
// WsTransport
// ============================================================================

/// [`Transport`] over the sessions of a [`WindowServer`].
///
/// Cheap to clone; all clones share the same session table. Frames are
/// handed to a per-session writer task and never block the caller.
#[derive(Clone, Default)]
pub struct WsTransport {
    sessions: Arc<Mutex<FxHashMap<TransportId, SessionSender>>>,
}

impl fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsTransport")
            .field("sessions", &self.sessions.lock().len())
            .finish()
    }
}

impl WsTransport {
    /// Returns the number of open sessions.
    #[inline]
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    fn insert(&self, transport_id: TransportId, sender: SessionSender) {
        self.sessions.lock().insert(transport_id, sender);
    }

    fn remove(&self, transport_id: TransportId) {
        self.sessions.lock().remove(&transport_id);
    }

    fn deliver(&self, transport_id: TransportId, message: Message) -> Result<()> {
        let sessions = self.sessions.lock();
        let sender = sessions
            .get(&transport_id)
            .ok_or_else(|| Error::session_closed(transport_id))?;

        sender
            .send(message)
            .map_err(|_| Error::session_closed(transport_id))
    }

    /// Asks every writer task to close its socket.
    fn close_all(&self) {
        for (transport_id, sender) in self.sessions.lock().drain() {
            let _ = sender.send(Message::Close(None));
            debug!(%transport_id, "Session closed during shutdown");
        }
    }
}

impl Transport for WsTransport {
    fn send_text(&self, transport_id: TransportId, frame: String) -> Result<()> {
        self.deliver(transport_id, Message::Text(frame.into()))
    }

    fn send_binary(&self, transport_id: TransportId, header: String, body: Vec<u8>) -> Result<()> {
        let mut data = header.into_bytes();
        data.extend_from_slice(&body);
        self.deliver(transport_id, Message::Binary(data.into()))
    }
}

// ============================================================================
// WindowServer
// ============================================================================

/// Routes WebSocket sessions to registered windows.
///
/// # Example
///
/// ```ignore
/// let server = WindowServer::new().await?;
/// let window = Arc::new(WebWindow::builder().build()?);
/// server.register(Arc::clone(&window));
///
/// println!("Connect to {}", server.ws_url(window.id()));
/// ```
pub struct WindowServer {
    /// WebSocket server port.
    port: u16,

    /// Registered windows by ID.
    windows: RwLock<FxHashMap<WindowId, Arc<WebWindow>>>,

    /// Outbound session table shared with the windows.
    transport: WsTransport,

    /// Shutdown flag.
    shutdown: AtomicBool,
}

impl fmt::Debug for WindowServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowServer")
            .field("port", &self.port)
            .field("windows", &self.windows.read().len())
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// WindowServer - Constructor
// ============================================================================

impl WindowServer {
    /// Creates a server on `localhost:0` (random port) and starts accepting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn new() -> Result<Arc<Self>> {
        Self::bind(DEFAULT_BIND_IP, 0).await
    }

    /// Creates a server bound to a specific IP and port.
    ///
    /// # Arguments
    ///
    /// * `ip` - IP address to bind to
    /// * `port` - Port to bind to (0 for random)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Arc<Self>> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let actual_port = listener.local_addr()?.port();

        let server = Arc::new(Self {
            port: actual_port,
            windows: RwLock::new(FxHashMap::default()),
            transport: WsTransport::default(),
            shutdown: AtomicBool::new(false),
        });

        let server_clone = Arc::clone(&server);
        tokio::spawn(async move {
            server_clone.accept_loop(listener).await;
        });

        info!(port = actual_port, "WindowServer started");

        Ok(server)
    }
}

// ============================================================================
// WindowServer - Public API
// ============================================================================

impl WindowServer {
    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the WebSocket URL of a window.
    ///
    /// Format: `ws://127.0.0.1:{port}/win{id}`
    #[must_use]
    pub fn ws_url(&self, window_id: WindowId) -> String {
        format!("ws://127.0.0.1:{}{}", self.port, window_id.route())
    }

    /// Returns the number of open sessions across all windows.
    #[inline]
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.transport.session_count()
    }

    /// Makes a window reachable and attaches this server as its transport.
    pub fn register(&self, window: Arc<WebWindow>) {
        window.set_transport(Arc::new(self.transport.clone()));
        debug!(window_id = %window.id(), "Window registered");
        self.windows.write().insert(window.id(), window);
    }

    /// Stops routing new sessions to a window and detaches its transport.
    ///
    /// Sessions already open keep feeding the window until they end.
    pub fn unregister(&self, window_id: WindowId) -> Option<Arc<WebWindow>> {
        let window = self.windows.write().remove(&window_id)?;
        window.clear_transport();
        debug!(%window_id, "Window unregistered");
        Some(window)
    }

    /// Stops accepting and closes every open session.
    pub fn shutdown(&self) {
        info!("WindowServer shutting down");
        self.shutdown.store(true, Ordering::SeqCst);
        self.transport.close_all();
    }

    fn window(&self, window_id: WindowId) -> Option<Arc<WebWindow>> {
        self.windows.read().get(&window_id).cloned()
    }
}

// ============================================================================
// WindowServer - Accept Loop
// ============================================================================

impl WindowServer {
    /// Background task that accepts new connections.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        debug!("Accept loop started");

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                debug!("Accept loop shutting down");
                break;
            }

            // Accept with timeout to allow checking shutdown flag
            match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream, addr).await {
                            warn!(error = %e, ?addr, "Connection handling failed");
                        }
                    });
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Accept failed");
                }
                Err(_) => continue,
            }
        }

        debug!("Accept loop terminated");
    }

    /// Runs one session from handshake to close.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        let transport_id = TransportId::next();
        let mut selected = None;

        let callback = |request: &Request, response: Response| {
            let path = request.uri().path();
            let Some(window) = WindowId::from_route(path).and_then(|id| self.window(id)) else {
                debug!(?addr, path, "No window for route");
                return Err(reject(StatusCode::NOT_FOUND, "unknown window"));
            };

            if let Err(e) = window.on_connect(transport_id) {
                return Err(reject(StatusCode::SERVICE_UNAVAILABLE, &e.to_string()));
            }

            selected = Some(window);
            Ok(response)
        };

        let ws_stream = tokio_tungstenite::accept_hdr_async(stream, callback).await?;

        let Some(window) = selected else {
            return Err(Error::protocol("handshake completed without a window"));
        };

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        let writer = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = ws_write.send(message).await {
                    debug!(error = %e, "WebSocket write failed");
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = ws_write.close().await;
        });

        self.transport.insert(transport_id, tx);

        if let Err(e) = window.on_ready(transport_id) {
            self.transport.remove(transport_id);
            return Err(e);
        }

        info!(window_id = %window.id(), %transport_id, ?addr, "Session opened");

        while let Some(message) = ws_read.next().await {
            let result = match message {
                Ok(Message::Text(text)) => window.on_data(transport_id, text.as_bytes()),
                Ok(Message::Binary(data)) => window.on_data(transport_id, &data),
                Ok(Message::Close(_)) => {
                    debug!(%transport_id, "WebSocket closed by remote");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    error!(%transport_id, error = %e, "WebSocket error");
                    break;
                }
            };

            match result {
                Ok(()) => trace!(%transport_id, "Message processed"),
                Err(e) if e.should_drop_session() => {
                    warn!(%transport_id, error = %e, "Dropping session");
                    break;
                }
                Err(e) => debug!(%transport_id, error = %e, "Message rejected"),
            }
        }

        window.on_close(transport_id);
        self.transport.remove(transport_id);
        let _ = writer.await;

        info!(window_id = %window.id(), %transport_id, "Session closed");
        Ok(())
    }
}

/// Builds a handshake rejection.
fn reject(status: StatusCode, reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = status;
    response
}

// ============================================================================
// Tests
// ============================================================================
