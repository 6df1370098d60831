//! WebSocket server implementation
//!
//! Provides a WebSocket server that listens on a configurable port and runs
//! one task per browser connection.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::handler::{ClientSink, ConnectionHandler};
use super::protocol::ServerMessage;
use crate::session::{UpdateEvent, UpdateSink};

/// Configuration for the WebSocket server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind: String,
    /// Port to listen on
    pub port: u16,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(bind: String, port: u16) -> Self {
        Self { bind, port }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

type WsSender = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Outbound half of one connection
///
/// After the first failed write the client is treated as gone and every
/// later message is dropped.
struct WsSink {
    sender: WsSender,
    peer_addr: SocketAddr,
    open: bool,
}

impl WsSink {
    fn new(sender: WsSender, peer_addr: SocketAddr) -> Self {
        Self {
            sender,
            peer_addr,
            open: true,
        }
    }

    /// Write a batch and flush it
    async fn push(&mut self, messages: Vec<ServerMessage>) {
        if !self.open {
            debug!(
                "Dropping {} messages for closed connection {}",
                messages.len(),
                self.peer_addr
            );
            return;
        }
        for message in messages {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize message for {}: {}", self.peer_addr, e);
                    continue;
                }
            };
            if let Err(e) = self.sender.feed(Message::Text(json)).await {
                warn!("Client {} went away, dropping updates: {}", self.peer_addr, e);
                self.open = false;
                return;
            }
        }
        if let Err(e) = self.sender.flush().await {
            warn!("Client {} went away, dropping updates: {}", self.peer_addr, e);
            self.open = false;
        }
    }

    async fn send_raw(&mut self, message: Message) {
        if self.open {
            if let Err(e) = self.sender.send(message).await {
                debug!("Failed to send frame to {}: {}", self.peer_addr, e);
                self.open = false;
            }
        }
    }
}

impl UpdateSink for WsSink {
    async fn deliver(&mut self, events: Vec<UpdateEvent>) {
        self.push(events.into_iter().map(ServerMessage::from).collect())
            .await;
    }
}

impl ClientSink for WsSink {
    async fn send(&mut self, message: ServerMessage) {
        self.push(vec![message]).await;
    }
}

/// WebSocket server for browser connections
pub struct WebSocketServer {
    config: ServerConfig,
    handler: Arc<ConnectionHandler>,
    shutdown_tx: broadcast::Sender<()>,
}

impl WebSocketServer {
    /// Create a new WebSocket server
    pub fn new(config: ServerConfig, handler: Arc<ConnectionHandler>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            handler,
            shutdown_tx,
        }
    }

    /// Trigger server shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Bind and run the WebSocket server until shutdown
    pub async fn run(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        self.serve(listener).await
    }

    /// Accept connections on `listener` and handle them concurrently
    ///
    /// The server will shut down gracefully when a shutdown signal is received.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        info!("WebSocket server listening on ws://{}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                // Accept new connections
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let handler = Arc::clone(&self.handler);
                            let shutdown_rx = self.shutdown_tx.subscribe();

                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, peer_addr, handler, shutdown_rx).await {
                                    error!("Connection error from {}: {}", peer_addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                // Handle shutdown signal
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let session_count = self.handler.session_count().await;
        if session_count > 0 {
            info!("Discarding {} sessions", session_count);
        }

        Ok(())
    }
}

/// Handle a single WebSocket connection
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<ConnectionHandler>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    info!("New connection from {}", peer_addr);

    // Upgrade to WebSocket
    let ws_stream = accept_async(stream).await?;
    let (ws_sender, mut ws_receiver) = ws_stream.split();
    let mut sink = WsSink::new(ws_sender, peer_addr);

    sink.send(ServerMessage::welcome()).await;
    debug!("Sent welcome message to {}", peer_addr);

    // Message handling loop. A running move is awaited inside the arm, so
    // neither shutdown nor a disconnect interrupts it.
    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Received message from {}: {}", peer_addr, text);
                        handler.handle_text(&text, &mut sink).await;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        warn!("Received binary message from {} ({} bytes), ignoring", peer_addr, data.len());
                    }
                    Some(Ok(Message::Ping(data))) => {
                        sink.send_raw(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} requested close", peer_addr);
                        break;
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", peer_addr, e);
                        break;
                    }
                    None => {
                        info!("Connection closed by {}", peer_addr);
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, closing connection to {}", peer_addr);
                sink.send_raw(Message::Close(None)).await;
                break;
            }
        }
    }

    info!("Connection from {} closed", peer_addr);
    Ok(())
}
