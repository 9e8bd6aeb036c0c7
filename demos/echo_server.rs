//! Echo server for web window clients.
//!
//! Demonstrates:
//! - Serving a window over WebSocket
//! - Reacting to `CONN_READY` / `CONN_CLOSED`
//! - Sending from inside the data callback
//!
//! Usage:
//!   cargo run --example echo_server
//!   cargo run --example echo_server -- --debug
//!
//! Then connect any websocket client to the printed URL and send
//! `1:10:0:READY=` followed by `0:10:1:<text>` messages.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use webwindow::{CONN_CLOSED, CONN_READY, ConnId, WebWindow, WindowServer};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let debug = std::env::args().any(|arg| arg == "--debug");
    init_logging(debug);

    let server = WindowServer::new()
        .await
        .context("binding websocket server")?;

    let window = Arc::new(
        WebWindow::builder()
            .conn_limit(0)
            .build()
            .context("building window")?,
    );

    let weak: Weak<WebWindow> = Arc::downgrade(&window);
    window.set_data_callback(move |conn_id: ConnId, data: &str| {
        let Some(window) = weak.upgrade() else { return };
        match data {
            CONN_READY => println!("[{conn_id}] connected"),
            CONN_CLOSED => println!("[{conn_id}] disconnected"),
            text => {
                println!("[{conn_id}] {text}");
                if let Err(e) = window.send(conn_id, format!("echo: {text}")) {
                    eprintln!("[{conn_id}] echo failed: {e}");
                }
            }
        }
    });

    server.register(Arc::clone(&window));
    println!("Listening on {}", server.ws_url(window.id()));
    println!("Press Ctrl+C to exit");

    tokio::signal::ctrl_c().await.context("waiting for Ctrl+C")?;

    window.close_all_connections()?;
    server.shutdown();
    Ok(())
}

fn init_logging(debug: bool) {
    let filter = if debug { "webwindow=debug" } else { "webwindow=info" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
