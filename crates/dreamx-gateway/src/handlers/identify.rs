//! Identify handler (op 2)

use std::sync::Arc;

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{GatewayMessage, IdentifyPayload, ReadyPayload, ReadyUser, READY_EVENT};
use crate::server::GatewayState;

pub struct IdentifyHandler;

impl IdentifyHandler {
    /// Validate the token, join the user's room and send READY
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: &IdentifyPayload,
    ) -> HandlerResult<()> {
        if connection.is_authenticated() {
            return Err(HandlerError::AlreadyAuthenticated);
        }

        let claims = state
            .jwt_service()
            .validate_access_token(payload.bare_token())
            .map_err(|e| {
                tracing::debug!(error = %e, "Token validation failed");
                HandlerError::AuthenticationFailed(e.to_string())
            })?;
        let user_id = claims
            .user_id()
            .map_err(|e| HandlerError::AuthenticationFailed(e.to_string()))?;

        let user = state
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| HandlerError::AuthenticationFailed("User not found".to_string()))?;
        if user.is_banned() {
            return Err(HandlerError::AuthenticationFailed("Account banned".to_string()));
        }

        let session_id = connection.session_id().to_string();
        if !state.registry().authenticate(&session_id, user_id) {
            return Err(HandlerError::AlreadyAuthenticated);
        }

        let ready = ReadyPayload {
            user: ReadyUser::from(&user),
            session_id: session_id.clone(),
        };
        let data = serde_json::to_value(&ready).map_err(|e| HandlerError::InvalidPayload(e.to_string()))?;
        connection
            .send(GatewayMessage::dispatch(READY_EVENT, connection.next_sequence(), data))
            .await
            .map_err(|_| HandlerError::ConnectionClosed)?;

        tracing::info!(
            session_id = %session_id,
            user_id = %user_id,
            username = %user.username,
            "Client identified"
        );
        Ok(())
    }
}
