//! Op code handlers

mod error;
mod heartbeat;
mod identify;

pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use identify::IdentifyHandler;

use std::sync::Arc;

use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage, OpCode};
use crate::server::GatewayState;

/// Routes client frames to their handler
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle one client frame
    ///
    /// `Ok(Some(code))` asks the caller to close the socket with `code`.
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: GatewayMessage,
    ) -> HandlerResult<Option<CloseCode>> {
        match message.op {
            OpCode::Identify => {
                let payload = message
                    .as_identify()
                    .ok_or_else(|| HandlerError::InvalidPayload("Invalid Identify payload".to_string()))?;
                IdentifyHandler::handle(state, connection, &payload).await?;
                Ok(None)
            }
            OpCode::Heartbeat => {
                let seq = message
                    .as_heartbeat_seq()
                    .ok_or_else(|| HandlerError::InvalidPayload("Invalid Heartbeat payload".to_string()))?;
                HeartbeatHandler::handle(connection, seq).await?;
                Ok(None)
            }
            op => {
                tracing::warn!(
                    session_id = %connection.session_id(),
                    op = %op,
                    "Received server-only op code from client"
                );
                Ok(Some(CloseCode::UnknownOpcode))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use dreamx_common::JwtService;
    use dreamx_core::{Snowflake, User, UserRepository};
    use dreamx_db::{create_memory_pool, run_migrations, SqliteUserRepository};
    use dreamx_realtime::LocalEventBus;
    use tokio::sync::mpsc;

    use super::*;
    use crate::connection::{ConnectionManager, ConnectionRegistry, Outbound};
    use crate::protocol::READY_EVENT;

    const SECRET: &str = "gateway-test-secret";

    async fn state_with_user(banned: bool) -> (GatewayState, User) {
        let pool = create_memory_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let users = Arc::new(SqliteUserRepository::new(pool));

        let mut user = User::new(Snowflake::new(77), "ana".into(), "ana@example.com".into(), "Ana".into());
        if banned {
            user.ban("spam".into());
        }
        users.create(&user, None).await.unwrap();

        let state = GatewayState::new(
            Arc::new(JwtService::new(SECRET, 900, 3600)),
            users,
            Arc::new(LocalEventBus::default()),
            ConnectionManager::new_shared(),
            41_250,
        );
        (state, user)
    }

    fn open(state: &GatewayState) -> (Arc<Connection>, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(8);
        let connection = state.registry().add_connection(Connection::generate_session_id(), tx);
        (connection, rx)
    }

    fn identify(token: &str) -> GatewayMessage {
        GatewayMessage::from_json(&format!(r#"{{"op":2,"d":{{"token":"{token}"}}}}"#)).unwrap()
    }

    fn token_for(user: &User) -> String {
        JwtService::new(SECRET, 900, 3600)
            .generate_token_pair(user.id)
            .unwrap()
            .access_token
    }

    #[tokio::test]
    async fn test_identify_sends_ready_and_joins_room() {
        let (state, user) = state_with_user(false).await;
        let (connection, mut rx) = open(&state);

        let token = format!("Bearer {}", token_for(&user));
        let close = MessageDispatcher::dispatch(&state, &connection, identify(&token)).await.unwrap();
        assert!(close.is_none());

        let Some(Outbound::Message(ready)) = rx.recv().await else { panic!("expected READY") };
        assert_eq!(ready.t.as_deref(), Some(READY_EVENT));
        assert_eq!(ready.s, Some(1));
        let d = ready.d.unwrap();
        assert_eq!(d["user"]["username"], "ana");
        assert_eq!(d["session_id"], connection.session_id());

        assert_eq!(state.registry().connections_in(&dreamx_realtime::Room::user(user.id)).len(), 1);
    }

    #[tokio::test]
    async fn test_identify_twice_is_rejected() {
        let (state, user) = state_with_user(false).await;
        let (connection, _rx) = open(&state);
        let token = token_for(&user);

        MessageDispatcher::dispatch(&state, &connection, identify(&token)).await.unwrap();
        let err = MessageDispatcher::dispatch(&state, &connection, identify(&token)).await.unwrap_err();
        assert_eq!(err.to_close_code(), CloseCode::AlreadyAuthenticated);
    }

    #[tokio::test]
    async fn test_identify_rejects_bad_token_and_banned_user() {
        let (state, _) = state_with_user(false).await;
        let (connection, _rx) = open(&state);
        let err = MessageDispatcher::dispatch(&state, &connection, identify("garbage")).await.unwrap_err();
        assert_eq!(err.to_close_code(), CloseCode::AuthenticationFailed);
        assert!(!connection.is_authenticated());

        let (state, banned) = state_with_user(true).await;
        let (connection, _rx) = open(&state);
        let err = MessageDispatcher::dispatch(&state, &connection, identify(&token_for(&banned)))
            .await
            .unwrap_err();
        assert_eq!(err.to_close_code(), CloseCode::AuthenticationFailed);
    }

    #[tokio::test]
    async fn test_heartbeat_is_acked() {
        let (state, _) = state_with_user(false).await;
        let (connection, mut rx) = open(&state);

        let heartbeat = GatewayMessage::from_json(r#"{"op":1,"d":null}"#).unwrap();
        assert!(MessageDispatcher::dispatch(&state, &connection, heartbeat).await.unwrap().is_none());

        let Some(Outbound::Message(ack)) = rx.recv().await else { panic!("expected ACK") };
        assert_eq!(ack.op, OpCode::HeartbeatAck);
    }

    #[tokio::test]
    async fn test_server_ops_close_connection() {
        let (state, _) = state_with_user(false).await;
        let (connection, _rx) = open(&state);

        let hello = GatewayMessage::from_json(r#"{"op":10}"#).unwrap();
        let close = MessageDispatcher::dispatch(&state, &connection, hello).await.unwrap();
        assert_eq!(close, Some(CloseCode::UnknownOpcode));

        let bad = GatewayMessage::from_json(r#"{"op":2}"#).unwrap();
        let err = MessageDispatcher::dispatch(&state, &connection, bad).await.unwrap_err();
        assert_eq!(err.to_close_code(), CloseCode::DecodeError);
    }
}
