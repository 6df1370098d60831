//! WebSocket server module
//!
//! Accepts browser connections, decodes client messages, and routes them to
//! the session layer.

mod handler;
mod protocol;
mod websocket;

pub use handler::ConnectionHandler;
pub use websocket::{ServerConfig, WebSocketServer};
