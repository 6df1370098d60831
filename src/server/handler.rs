//! Client message handler
//!
//! Resolves each inbound message to a session and runs it through the
//! orchestrator. Every session error is answered on the connection; none of
//! them close it.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::protocol::{ClientEnvelope, ClientMessage, ServerMessage};
use crate::session::{
    Intent, SessionError, SessionId, SessionResult, SessionStore, TurnOrchestrator, UpdateSink,
};

/// Outbound half of a client connection
pub trait ClientSink: UpdateSink {
    /// Send a single reply
    fn send(&mut self, message: ServerMessage) -> impl Future<Output = ()> + Send;
}

/// Routes client messages for all connections
pub struct ConnectionHandler {
    store: Arc<SessionStore>,
    orchestrator: Arc<TurnOrchestrator>,
}

impl ConnectionHandler {
    pub fn new(store: Arc<SessionStore>, orchestrator: Arc<TurnOrchestrator>) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.store.session_count().await
    }

    /// Handle one text frame from a client
    pub async fn handle_text<S: ClientSink>(&self, text: &str, sink: &mut S) {
        let envelope = match ClientEnvelope::from_json(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Rejected client message: {}", e);
                sink.send(e.into()).await;
                return;
            }
        };

        match envelope.message {
            ClientMessage::Ping { seq } => {
                debug!("Received ping with seq {}", seq);
                sink.send(ServerMessage::pong(seq)).await;
            }
            ClientMessage::Join { session_id } => {
                let id = session_id.unwrap_or_default();
                debug!("Join request for session {}", id);
                self.join(id, sink).await;
            }
            ClientMessage::Move {
                session_id,
                position,
            } => {
                debug!("Move request: session={}, position={}", session_id, position);
                // Range was checked during validation
                if let Some(intent) = Intent::from_position(position) {
                    if let Err(e) = self.play(session_id, intent, sink).await {
                        self.report(&e, sink).await;
                    }
                }
            }
            ClientMessage::Reset { session_id } => {
                info!("Reset request for session {}", session_id);
                self.store.delete(session_id).await;
                self.join(session_id, sink).await;
            }
        }
    }

    async fn join<S: ClientSink>(&self, id: SessionId, sink: &mut S) {
        match self.store.get_or_create(id).await {
            Ok(state) => {
                let hints = self.orchestrator.broadcaster().hints(&state);
                sink.send(ServerMessage::session(id, &state, hints)).await;
            }
            Err(e) => self.report(&e, sink).await,
        }
    }

    /// Run one intent to completion while holding the session lease
    async fn play<S: ClientSink>(
        &self,
        id: SessionId,
        intent: Intent,
        sink: &mut S,
    ) -> SessionResult<()> {
        let mut lease = self.store.acquire(id).await?;
        let state = lease.state()?.clone();

        match self.orchestrator.play(&state, intent, sink).await {
            Ok(next) => {
                debug!(
                    "Session {} committed at {}-{}",
                    lease.id(),
                    next.black_score(),
                    next.white_score()
                );
                lease.commit(next);
                Ok(())
            }
            Err(SessionError::ContractViolation(reason)) => {
                error!("Session {} failed: {}", id, reason);
                lease.fail(reason.clone());
                Err(SessionError::ContractViolation(reason))
            }
            Err(e) => Err(e),
        }
    }

    async fn report<S: ClientSink>(&self, err: &SessionError, sink: &mut S) {
        match err {
            SessionError::IllegalIntent(reason) => debug!("Rejected intent: {}", reason),
            SessionError::ContractViolation(_) => {}
            other => info!("{}", other),
        }
        sink.send(ServerMessage::from(err)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Bot, Cell, Engine, FirstLegalBot, GameState, OthelloEngine, Side};
    use crate::server::protocol::ErrorCode;
    use crate::session::UpdateEvent;

    #[derive(Default)]
    struct RecordingSink {
        messages: Vec<ServerMessage>,
        batches: usize,
    }

    impl UpdateSink for RecordingSink {
        async fn deliver(&mut self, events: Vec<UpdateEvent>) {
            self.batches += 1;
            self.messages
                .extend(events.into_iter().map(ServerMessage::from));
        }
    }

    impl ClientSink for RecordingSink {
        async fn send(&mut self, message: ServerMessage) {
            self.messages.push(message);
        }
    }

    /// A client that went away: everything is dropped
    struct ClosedSink;

    impl UpdateSink for ClosedSink {
        async fn deliver(&mut self, _events: Vec<UpdateEvent>) {}
    }

    impl ClientSink for ClosedSink {
        async fn send(&mut self, _message: ServerMessage) {}
    }

    struct SilentBot;

    impl Bot for SilentBot {
        fn select_move(&self, _state: &GameState) -> Option<usize> {
            None
        }
    }

    fn handler_with(bot: Arc<dyn Bot>) -> ConnectionHandler {
        let engine: Arc<dyn Engine> = Arc::new(OthelloEngine);
        let store = Arc::new(SessionStore::new(Arc::clone(&engine)));
        let orchestrator = Arc::new(TurnOrchestrator::new(engine, bot));
        ConnectionHandler::new(store, orchestrator)
    }

    fn handler() -> ConnectionHandler {
        handler_with(Arc::new(FirstLegalBot))
    }

    fn error_code(message: &ServerMessage) -> Option<ErrorCode> {
        match message {
            ServerMessage::Error { code, .. } => *code,
            _ => None,
        }
    }

    async fn join_new(handler: &ConnectionHandler) -> SessionId {
        let mut sink = RecordingSink::default();
        handler.handle_text(r#"{"type": "join"}"#, &mut sink).await;
        match &sink.messages[..] {
            [ServerMessage::Session { session_id, .. }] => *session_id,
            other => panic!("Expected Session message, got {:?}", other),
        }
    }

    fn move_json(id: SessionId, position: i32) -> String {
        format!(r#"{{"type": "move", "session_id": "{}", "position": {}}}"#, id, position)
    }

    #[tokio::test]
    async fn test_handle_ping_message() {
        let handler = handler();
        let mut sink = RecordingSink::default();
        handler
            .handle_text(r#"{"type": "ping", "seq": 42}"#, &mut sink)
            .await;
        assert_eq!(sink.messages, vec![ServerMessage::pong(42)]);
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let handler = handler();
        let mut sink = RecordingSink::default();
        handler.handle_text("not json", &mut sink).await;
        assert_eq!(error_code(&sink.messages[0]), Some(ErrorCode::InvalidMessage));
    }

    #[tokio::test]
    async fn test_join_creates_session() {
        let handler = handler();
        let mut sink = RecordingSink::default();
        handler.handle_text(r#"{"type": "join"}"#, &mut sink).await;

        match &sink.messages[..] {
            [ServerMessage::Session {
                cells,
                black_score,
                hints,
                ..
            }] => {
                assert_eq!(cells[28], Cell::Black);
                assert_eq!(*black_score, 2);
                assert_eq!(hints, &vec![19, 26, 37, 44]);
            }
            other => panic!("Expected Session message, got {:?}", other),
        }
        assert_eq!(handler.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_move_plays_human_and_bot() {
        let handler = handler();
        let id = join_new(&handler).await;

        let mut sink = RecordingSink::default();
        handler.handle_text(&move_json(id, 44), &mut sink).await;

        assert_eq!(sink.batches, 2);
        assert_eq!(
            sink.messages[0],
            ServerMessage::Cell {
                index: 36,
                value: Cell::Black
            }
        );
        assert!(sink.messages.contains(&ServerMessage::Score {
            black_score: 4,
            white_score: 1
        }));
        // Control is back with the human, who gets fresh hints last
        assert!(matches!(
            sink.messages.last(),
            Some(ServerMessage::Hints { positions }) if !positions.is_empty()
        ));

        // Rejoining re-derives the same board from the store
        let mut sink = RecordingSink::default();
        handler
            .handle_text(&format!(r#"{{"type": "join", "session_id": "{}"}}"#, id), &mut sink)
            .await;
        match &sink.messages[..] {
            [ServerMessage::Session {
                black_score,
                white_score,
                ..
            }] => assert_eq!(black_score + white_score, 6),
            other => panic!("Expected Session message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_move_commits_after_client_is_gone() {
        let handler = handler();
        let id = join_new(&handler).await;

        handler.handle_text(&move_json(id, 44), &mut ClosedSink).await;

        // Human took 36, then the bot answered at 29 capturing 28
        let state = handler.store.get(id).await.unwrap();
        assert_eq!((state.black_score(), state.white_score()), (3, 3));
        assert_eq!(state.cell(29), Cell::White);
        assert_eq!(state.current_player(), Side::Black);
        assert!(state.can_move());
    }

    #[tokio::test]
    async fn test_move_unknown_session() {
        let handler = handler();
        let mut sink = RecordingSink::default();
        handler
            .handle_text(&move_json(SessionId::new(), 44), &mut sink)
            .await;
        assert_eq!(error_code(&sink.messages[0]), Some(ErrorCode::UnknownSession));
        assert_eq!(handler.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_illegal_move_is_noop() {
        let handler = handler();
        let id = join_new(&handler).await;

        let mut sink = RecordingSink::default();
        handler.handle_text(&move_json(id, 0), &mut sink).await;
        assert_eq!(sink.batches, 0);
        assert_eq!(sink.messages.len(), 1);
        assert_eq!(error_code(&sink.messages[0]), Some(ErrorCode::IllegalIntent));

        // Same for a pass while moves exist; the game is untouched
        let mut sink = RecordingSink::default();
        handler.handle_text(&move_json(id, -1), &mut sink).await;
        assert_eq!(error_code(&sink.messages[0]), Some(ErrorCode::IllegalIntent));
        assert_eq!(
            handler.store.get(id).await.unwrap(),
            OthelloEngine.initial()
        );
    }

    #[tokio::test]
    async fn test_reset_restores_initial_board() {
        let handler = handler();
        let id = join_new(&handler).await;
        handler
            .handle_text(&move_json(id, 44), &mut RecordingSink::default())
            .await;

        let mut sink = RecordingSink::default();
        handler
            .handle_text(&format!(r#"{{"type": "reset", "session_id": "{}"}}"#, id), &mut sink)
            .await;
        match &sink.messages[..] {
            [ServerMessage::Session {
                session_id,
                black_score,
                white_score,
                ..
            }] => {
                assert_eq!(*session_id, id);
                assert_eq!((*black_score, *white_score), (2, 2));
            }
            other => panic!("Expected Session message, got {:?}", other),
        }
        assert_eq!(handler.store.get(id).await.unwrap(), OthelloEngine.initial());
    }

    #[tokio::test]
    async fn test_contract_violation_fails_session_until_reset() {
        let handler = handler_with(Arc::new(SilentBot));
        let id = join_new(&handler).await;

        let mut sink = RecordingSink::default();
        handler.handle_text(&move_json(id, 44), &mut sink).await;
        assert_eq!(
            error_code(sink.messages.last().unwrap()),
            Some(ErrorCode::SessionFailed)
        );

        let mut sink = RecordingSink::default();
        handler.handle_text(&move_json(id, 19), &mut sink).await;
        assert_eq!(error_code(&sink.messages[0]), Some(ErrorCode::SessionFailed));

        let mut sink = RecordingSink::default();
        handler
            .handle_text(&format!(r#"{{"type": "reset", "session_id": "{}"}}"#, id), &mut sink)
            .await;
        assert!(matches!(sink.messages[0], ServerMessage::Session { .. }));
    }
}
