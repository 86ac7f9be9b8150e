//! Message service
//!
//! Sending, listing, editing and deleting messages. Every change is pushed
//! to the rooms of all conversation members.

use chrono::Utc;
use dreamx_core::events::{MessageCreatedEvent, MessageDeletedEvent, MessageUpdatedEvent};
use dreamx_core::{
    excerpt, CursorQuery, DomainError, DomainEvent, Message, Notification, NotificationKind,
    Snowflake, MESSAGE_MAX_LEN,
};
use serde_json::json;
use tracing::{info, instrument};

use crate::dto::{CursorParams, EditMessageRequest, MessageResponse, SendMessageRequest, UploadResponse};

use super::context::ServiceContext;
use super::conversation::{message_response, require_member};
use super::error::{ServiceError, ServiceResult};
use super::moderation::record_audit;
use super::notification::NotificationService;
use super::post::{checked_content, checked_upload_path};
use super::upload::{IncomingFile, UploadKind, UploadService};

const PREVIEW_CHARS: usize = 60;

/// Message service
pub struct MessageService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessageService<'a> {
    /// Create a new MessageService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    async fn member_ids(&self, conversation_id: Snowflake) -> ServiceResult<Vec<Snowflake>> {
        let members = self.ctx.conversation_repo().members(conversation_id).await?;
        Ok(members.into_iter().map(|m| m.user_id).collect())
    }

    async fn find_message(&self, message_id: Snowflake) -> ServiceResult<Message> {
        Ok(self
            .ctx
            .message_repo()
            .find_by_id(message_id)
            .await?
            .ok_or(DomainError::MessageNotFound(message_id))?)
    }

    /// Send a message to a conversation
    #[instrument(skip(self, request))]
    pub async fn send_message(
        &self,
        user_id: Snowflake,
        conversation_id: Snowflake,
        request: SendMessageRequest,
    ) -> ServiceResult<MessageResponse> {
        let sender = self.ctx.acting_user(user_id).await?;

        let content = request.content.trim().to_string();
        let attachment = checked_upload_path(request.attachment)?;
        if content.is_empty() && attachment.is_none() {
            return Err(ServiceError::validation("Message needs text or an attachment"));
        }
        if content.chars().count() > MESSAGE_MAX_LEN {
            return Err(DomainError::ContentTooLong { max: MESSAGE_MAX_LEN }.into());
        }

        let conversation = require_member(self.ctx, conversation_id, user_id).await?;
        if let Some(peer) = conversation.direct_peer(user_id) {
            if self.ctx.block_repo().is_blocked_either(user_id, peer).await? {
                return Err(DomainError::Blocked.into());
            }
        }

        let message = Message::new(self.ctx.generate_id(), conversation_id, user_id, content, attachment);
        self.ctx.message_repo().create(&message).await?;
        self.ctx.conversation_repo().touch(conversation_id, message.created_at).await?;

        info!(message_id = %message.id, conversation_id = %conversation_id, "Message sent");

        let member_ids = self.member_ids(conversation_id).await?;
        let event = DomainEvent::MessageCreated(MessageCreatedEvent::from(&message));
        self.ctx.publish_to_users(&member_ids, &event).await;

        let preview = if message.content.is_empty() {
            "sent an attachment".to_string()
        } else {
            excerpt(&message.content, PREVIEW_CHARS)
        };
        let notifications = NotificationService::new(self.ctx);
        for recipient in member_ids.into_iter().filter(|id| *id != user_id) {
            notifications
                .notify(
                    Notification::new(
                        self.ctx.generate_id(),
                        recipient,
                        Some(user_id),
                        NotificationKind::Message,
                        format!("{}: {preview}", sender.display_name),
                    )
                    .with_link(format!("/messages/{conversation_id}"))
                    .with_data(json!({ "conversation_id": conversation_id, "message_id": message.id })),
                )
                .await;
        }

        message_response(self.ctx, message).await
    }

    /// Newest-first page of a conversation's messages
    #[instrument(skip(self))]
    pub async fn list_messages(
        &self,
        user_id: Snowflake,
        conversation_id: Snowflake,
        params: CursorParams,
    ) -> ServiceResult<Vec<MessageResponse>> {
        require_member(self.ctx, conversation_id, user_id).await?;

        let query = CursorQuery::new(params.before, None, params.limit);
        let messages = self.ctx.message_repo().list(conversation_id, query).await?;

        let mut responses = Vec::with_capacity(messages.len());
        for message in messages {
            responses.push(message_response(self.ctx, message).await?);
        }
        Ok(responses)
    }

    #[instrument(skip(self, request))]
    pub async fn edit_message(
        &self,
        user_id: Snowflake,
        message_id: Snowflake,
        request: EditMessageRequest,
    ) -> ServiceResult<MessageResponse> {
        self.ctx.acting_user(user_id).await?;
        let mut message = self.find_message(message_id).await?;
        require_member(self.ctx, message.conversation_id, user_id).await?;

        if message.sender_id != user_id {
            return Err(DomainError::Forbidden("only the sender can edit a message".into()).into());
        }

        let content = checked_content(&request.content, MESSAGE_MAX_LEN)?;
        message.edit(content);
        self.ctx.message_repo().update(&message).await?;

        info!(message_id = %message_id, "Message edited");

        let member_ids = self.member_ids(message.conversation_id).await?;
        let event = DomainEvent::MessageUpdated(MessageUpdatedEvent::from(&message));
        self.ctx.publish_to_users(&member_ids, &event).await;

        message_response(self.ctx, message).await
    }

    /// Delete a message; the sender or staff
    #[instrument(skip(self))]
    pub async fn delete_message(&self, user_id: Snowflake, message_id: Snowflake) -> ServiceResult<()> {
        let actor = self.ctx.acting_user(user_id).await?;
        let message = self.find_message(message_id).await?;

        let is_sender = message.sender_id == user_id;
        if !is_sender && !actor.is_staff() {
            return Err(DomainError::Forbidden("only the sender can delete a message".into()).into());
        }

        self.ctx.message_repo().delete(message_id).await?;

        if !is_sender {
            record_audit(
                self.ctx,
                user_id,
                "message.delete",
                "message",
                Some(message_id),
                json!({ "sender_id": message.sender_id, "conversation_id": message.conversation_id, "at": Utc::now() }),
            )
            .await?;
        }
        if let Some(attachment) = &message.attachment {
            UploadService::new(self.ctx).remove(attachment).await;
        }

        info!(message_id = %message_id, by_staff = !is_sender, "Message deleted");

        let member_ids = self.member_ids(message.conversation_id).await?;
        let event = DomainEvent::MessageDeleted(MessageDeletedEvent::new(message.id, message.conversation_id));
        self.ctx.publish_to_users(&member_ids, &event).await;

        Ok(())
    }

    /// Store a chat attachment for a later `send_message`
    pub async fn upload_attachment(&self, user_id: Snowflake, file: IncomingFile) -> ServiceResult<UploadResponse> {
        self.ctx.acting_user(user_id).await?;
        UploadService::new(self.ctx).store(user_id, UploadKind::Attachment, file).await
    }
}
