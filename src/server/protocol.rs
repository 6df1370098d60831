//! Protocol message definitions
//!
//! Defines the JSON messages exchanged between browser clients and the game
//! server. Client messages may carry a protocol version for compatibility.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::{Cell, GameState, BOARD_CELLS};
use crate::session::{SessionError, SessionId, Standing, StandingView, UpdateEvent};

/// Current protocol version
/// Increment when making breaking changes to message format
pub const PROTOCOL_VERSION: u32 = 1;

/// Minimum supported protocol version
pub const MIN_PROTOCOL_VERSION: u32 = 1;

// ============================================================================
// Error Types
// ============================================================================

/// Protocol-related errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Protocol version {0} not supported (min: {MIN_PROTOCOL_VERSION}, current: {PROTOCOL_VERSION})")]
    UnsupportedVersion(u32),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

// ============================================================================
// Message Envelope
// ============================================================================

/// Protocol envelope wrapping all client messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientEnvelope {
    /// Protocol version used by the client
    #[serde(default = "default_version")]
    pub version: u32,
    /// The actual message payload
    #[serde(flatten)]
    pub message: ClientMessage,
}

fn default_version() -> u32 {
    PROTOCOL_VERSION
}

impl ClientEnvelope {
    /// Parse and validate a client envelope from JSON
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        let envelope: Self = serde_json::from_str(json)?;
        envelope.validate()?;
        Ok(envelope)
    }

    /// Validate the envelope and its contents
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.version < MIN_PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(self.version));
        }
        self.message.validate()
    }
}

// ============================================================================
// Client Messages
// ============================================================================

/// Messages sent from the browser to the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Connection keepalive ping
    Ping { seq: u64 },

    /// Open (or reopen) a game; a missing id starts a new session
    Join {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },

    /// Play a stone, or pass with a negative position
    Move { session_id: SessionId, position: i32 },

    /// Throw the game away and start over under the same id
    Reset { session_id: SessionId },
}

impl ClientMessage {
    /// Validate message contents
    pub fn validate(&self) -> ProtocolResult<()> {
        match self {
            ClientMessage::Move { position, .. } if *position >= BOARD_CELLS as i32 => {
                Err(ProtocolError::ValidationError(format!(
                    "position must be between 0 and {}, or negative to pass",
                    BOARD_CELLS - 1
                )))
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Server Messages
// ============================================================================

/// Messages sent from the server to the browser
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Welcome message sent on connection
    Welcome { version: u32 },

    /// Response to Ping
    Pong { seq: u64 },

    /// Full board for a joined or reset session
    Session {
        session_id: SessionId,
        cells: Vec<Cell>,
        black_score: u8,
        white_score: u8,
        status: StandingView,
        hints: Vec<usize>,
    },

    /// One cell changed
    Cell { index: usize, value: Cell },

    /// Scores changed
    Score { black_score: u8, white_score: u8 },

    /// Turn or result changed
    Status(StandingView),

    /// Cells the player may click now
    Hints { positions: Vec<usize> },

    /// Error response
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<ErrorCode>,
    },
}

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Invalid message format
    InvalidMessage,
    /// Unsupported protocol version
    UnsupportedVersion,
    /// Session id not known; the client should join again
    UnknownSession,
    /// Move refused, nothing changed
    IllegalIntent,
    /// Another move for this session is still running
    Busy,
    /// Session broke and needs a reset
    SessionFailed,
}

impl ServerMessage {
    /// Create a Welcome message
    pub fn welcome() -> Self {
        ServerMessage::Welcome {
            version: PROTOCOL_VERSION,
        }
    }

    /// Create a Pong message
    pub fn pong(seq: u64) -> Self {
        ServerMessage::Pong { seq }
    }

    /// Full snapshot of `state`; `hints` are the cells the player may click
    pub fn session(session_id: SessionId, state: &GameState, hints: Vec<usize>) -> Self {
        ServerMessage::Session {
            session_id,
            cells: state.cells().to_vec(),
            black_score: state.black_score(),
            white_score: state.white_score(),
            status: Standing::of(state).into(),
            hints,
        }
    }

    /// Create an Error message with code
    pub fn error_with_code(message: impl Into<String>, code: ErrorCode) -> Self {
        ServerMessage::Error {
            message: message.into(),
            code: Some(code),
        }
    }
}

// ============================================================================
// Conversion Traits
// ============================================================================

impl From<UpdateEvent> for ServerMessage {
    fn from(event: UpdateEvent) -> Self {
        match event {
            UpdateEvent::Cell { index, value } => ServerMessage::Cell { index, value },
            UpdateEvent::Score { black, white } => ServerMessage::Score {
                black_score: black,
                white_score: white,
            },
            UpdateEvent::Status(view) => ServerMessage::Status(view),
            UpdateEvent::Hints { positions } => ServerMessage::Hints { positions },
        }
    }
}

impl From<ProtocolError> for ServerMessage {
    fn from(err: ProtocolError) -> Self {
        let code = match &err {
            ProtocolError::SerializationError(_) => ErrorCode::InvalidMessage,
            ProtocolError::UnsupportedVersion(_) => ErrorCode::UnsupportedVersion,
            ProtocolError::ValidationError(_) => ErrorCode::InvalidMessage,
        };
        ServerMessage::error_with_code(err.to_string(), code)
    }
}

impl From<&SessionError> for ServerMessage {
    fn from(err: &SessionError) -> Self {
        let code = match err {
            SessionError::UnknownSession(_) => ErrorCode::UnknownSession,
            SessionError::IllegalIntent(_) => ErrorCode::IllegalIntent,
            SessionError::Busy(_) => ErrorCode::Busy,
            SessionError::SessionFailed { .. } | SessionError::ContractViolation(_) => {
                ErrorCode::SessionFailed
            }
        };
        ServerMessage::error_with_code(err.to_string(), code)
    }
}

// ============================================================================
// Tests
// ============================================================================
