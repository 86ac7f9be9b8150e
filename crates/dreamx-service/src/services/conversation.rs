//! Conversation service
//!
//! Direct and group conversations. A direct conversation is unique per pair
//! of users and is found or created in one transaction, so both sides land
//! on the same row whoever opens it first.

use std::collections::BTreeSet;

use chrono::Utc;
use dreamx_core::events::ConversationUpdatedEvent;
use dreamx_core::{
    Conversation, DomainError, DomainEvent, Message, MessagePolicy, ReactionTarget, Snowflake,
    GROUP_MAX_MEMBERS, GROUP_NAME_MAX_LEN,
};
use tracing::{info, instrument};

use crate::dto::{
    AddMembersRequest, ConversationListQuery, ConversationResponse, CreateGroupRequest,
    MemberResponse, MessageResponse, OpenDirectRequest, PublicUserResponse, RenameGroupRequest,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::post::checked_content;

const LIST_DEFAULT_LIMIT: i64 = 20;
const LIST_MAX_LIMIT: i64 = 100;

/// Load a conversation the user belongs to
///
/// Non-members get `NotConversationMember` rather than a 404 so clients can
/// tell a removed member apart from a typo.
pub(crate) async fn require_member(
    ctx: &ServiceContext,
    conversation_id: Snowflake,
    user_id: Snowflake,
) -> ServiceResult<Conversation> {
    let conversation = ctx
        .conversation_repo()
        .find_by_id(conversation_id)
        .await?
        .ok_or(DomainError::ConversationNotFound(conversation_id))?;

    if ctx.conversation_repo().find_member(conversation_id, user_id).await?.is_none() {
        return Err(DomainError::NotConversationMember.into());
    }
    Ok(conversation)
}

pub(crate) async fn message_response(ctx: &ServiceContext, message: Message) -> ServiceResult<MessageResponse> {
    let reactions = ctx.reaction_repo().summary(ReactionTarget::Message, message.id).await?;
    Ok(MessageResponse {
        id: message.id,
        conversation_id: message.conversation_id,
        sender_id: message.sender_id,
        content: message.content,
        attachment: message.attachment,
        reactions,
        created_at: message.created_at,
        edited_at: message.edited_at,
    })
}

/// Conversation service
pub struct ConversationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ConversationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    async fn member_ids(&self, conversation_id: Snowflake) -> ServiceResult<Vec<Snowflake>> {
        let members = self.ctx.conversation_repo().members(conversation_id).await?;
        Ok(members.into_iter().map(|m| m.user_id).collect())
    }

    /// Publish `CONVERSATION_UPDATE` to the current members plus `extra`
    async fn announce(&self, conversation: &Conversation, extra: &[Snowflake]) -> ServiceResult<()> {
        let member_ids = self.member_ids(conversation.id).await?;
        let event = DomainEvent::ConversationUpdated(ConversationUpdatedEvent::new(
            conversation.id,
            conversation.name.clone(),
            member_ids.clone(),
        ));

        let mut recipients = member_ids;
        recipients.extend_from_slice(extra);
        self.ctx.publish_to_users(&recipients, &event).await;
        Ok(())
    }

    async fn response(&self, conversation: Conversation, viewer_id: Snowflake) -> ServiceResult<ConversationResponse> {
        let repo = self.ctx.conversation_repo();

        let mut members = Vec::new();
        for member in repo.members(conversation.id).await? {
            if let Some(user) = self.ctx.user_repo().find_by_id(member.user_id).await? {
                members.push(MemberResponse {
                    user: PublicUserResponse::from(&user),
                    role: member.role,
                    joined_at: member.joined_at,
                    last_read_at: member.last_read_at,
                });
            }
        }

        let last_message = match self.ctx.message_repo().latest(conversation.id).await? {
            Some(message) => Some(message_response(self.ctx, message).await?),
            None => None,
        };
        let unread_count = repo.unread_count(conversation.id, viewer_id).await?;

        Ok(ConversationResponse {
            id: conversation.id,
            kind: conversation.kind,
            name: conversation.name,
            owner_id: conversation.owner_id,
            members,
            last_message,
            unread_count,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        })
    }

    /// Load a group the user owns
    async fn owned_group(&self, conversation_id: Snowflake, user_id: Snowflake) -> ServiceResult<Conversation> {
        let conversation = require_member(self.ctx, conversation_id, user_id).await?;
        if conversation.is_direct() {
            return Err(ServiceError::validation("Direct conversations have no owner"));
        }
        if !conversation.is_owner(user_id) {
            return Err(DomainError::Forbidden("only the group owner can do this".into()).into());
        }
        Ok(conversation)
    }

    /// Users that can be put in a group with `owner_id`
    async fn check_invitees(&self, owner_id: Snowflake, user_ids: &[Snowflake]) -> ServiceResult<()> {
        for &id in user_ids {
            let user = self.ctx.load_user(id).await?;
            if user.is_banned() {
                return Err(DomainError::UserNotFound(id).into());
            }
            if self.ctx.block_repo().is_blocked_either(owner_id, id).await? {
                return Err(DomainError::Blocked.into());
            }
        }
        Ok(())
    }

    // =========================================================================
    // Direct conversations
    // =========================================================================

    /// Find or start the direct conversation with another user
    #[instrument(skip(self))]
    pub async fn open_direct(&self, user_id: Snowflake, request: OpenDirectRequest) -> ServiceResult<ConversationResponse> {
        let other_id = request.user_id;
        if other_id == user_id {
            return Err(DomainError::CannotTargetSelf.into());
        }

        self.ctx.acting_user(user_id).await?;
        let other = self.ctx.load_user(other_id).await?;
        if other.is_banned() {
            return Err(DomainError::UserNotFound(other_id).into());
        }
        if self.ctx.block_repo().is_blocked_either(user_id, other_id).await? {
            return Err(DomainError::Blocked.into());
        }
        if other.allow_messages == MessagePolicy::Nobody {
            return Err(DomainError::MessagesDisabled.into());
        }

        let candidate = Conversation::new_direct(self.ctx.generate_id(), user_id, other_id);
        let (conversation, created) = self
            .ctx
            .conversation_repo()
            .get_or_create_direct(&candidate, user_id, other_id)
            .await?;

        if created {
            info!(conversation_id = %conversation.id, user_id = %user_id, other_id = %other_id, "Direct conversation created");
            self.announce(&conversation, &[]).await?;
        }

        self.response(conversation, user_id).await
    }

    // =========================================================================
    // Groups
    // =========================================================================

    #[instrument(skip(self, request))]
    pub async fn create_group(&self, user_id: Snowflake, request: CreateGroupRequest) -> ServiceResult<ConversationResponse> {
        self.ctx.acting_user(user_id).await?;
        let name = checked_content(&request.name, GROUP_NAME_MAX_LEN)?;

        let invitees: Vec<Snowflake> = request
            .member_ids
            .into_iter()
            .filter(|id| *id != user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if invitees.is_empty() {
            return Err(ServiceError::validation("A group needs at least one other member"));
        }
        if invitees.len() > GROUP_MAX_MEMBERS {
            return Err(ServiceError::validation(format!("A group has at most {GROUP_MAX_MEMBERS} members")));
        }
        self.check_invitees(user_id, &invitees).await?;

        let conversation = Conversation::new_group(self.ctx.generate_id(), user_id, name);
        let mut members = Vec::with_capacity(invitees.len() + 1);
        members.push(user_id);
        members.extend(invitees);
        self.ctx.conversation_repo().create_group(&conversation, &members).await?;

        info!(conversation_id = %conversation.id, members = members.len(), "Group created");
        self.announce(&conversation, &[]).await?;
        self.response(conversation, user_id).await
    }

    #[instrument(skip(self, request))]
    pub async fn add_members(
        &self,
        user_id: Snowflake,
        conversation_id: Snowflake,
        request: AddMembersRequest,
    ) -> ServiceResult<ConversationResponse> {
        self.ctx.acting_user(user_id).await?;
        let conversation = self.owned_group(conversation_id, user_id).await?;

        let current = self.member_ids(conversation_id).await?;
        let new_ids: Vec<Snowflake> = request
            .user_ids
            .into_iter()
            .filter(|id| !current.contains(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        // the owner does not count toward the cap
        if current.len() - 1 + new_ids.len() > GROUP_MAX_MEMBERS {
            return Err(ServiceError::validation(format!("A group has at most {GROUP_MAX_MEMBERS} members")));
        }
        self.check_invitees(user_id, &new_ids).await?;

        let added = self.ctx.conversation_repo().add_members(conversation_id, &new_ids).await?;
        if added > 0 {
            self.ctx.conversation_repo().touch(conversation_id, Utc::now()).await?;
            info!(conversation_id = %conversation_id, added, "Group members added");
            self.announce(&conversation, &[]).await?;
        }

        self.response(conversation, user_id).await
    }

    /// Remove a member; the owner removes anyone, members remove themselves
    #[instrument(skip(self))]
    pub async fn remove_member(
        &self,
        user_id: Snowflake,
        conversation_id: Snowflake,
        target_id: Snowflake,
    ) -> ServiceResult<()> {
        let conversation = require_member(self.ctx, conversation_id, user_id).await?;
        if conversation.is_direct() {
            return Err(ServiceError::validation("Cannot leave a direct conversation"));
        }
        if target_id == user_id {
            if conversation.is_owner(user_id) {
                return Err(ServiceError::validation("The owner cannot leave the group"));
            }
        } else if !conversation.is_owner(user_id) {
            return Err(DomainError::Forbidden("only the group owner can remove members".into()).into());
        }

        if self.ctx.conversation_repo().find_member(conversation_id, target_id).await?.is_none() {
            return Err(ServiceError::not_found("Member", target_id.to_string()));
        }

        self.ctx.conversation_repo().remove_member(conversation_id, target_id).await?;
        self.ctx.conversation_repo().touch(conversation_id, Utc::now()).await?;

        info!(conversation_id = %conversation_id, target_id = %target_id, "Group member removed");
        self.announce(&conversation, &[target_id]).await
    }

    #[instrument(skip(self, request))]
    pub async fn rename_group(
        &self,
        user_id: Snowflake,
        conversation_id: Snowflake,
        request: RenameGroupRequest,
    ) -> ServiceResult<ConversationResponse> {
        self.ctx.acting_user(user_id).await?;
        let mut conversation = self.owned_group(conversation_id, user_id).await?;
        let name = checked_content(&request.name, GROUP_NAME_MAX_LEN)?;

        let now = Utc::now();
        self.ctx.conversation_repo().rename(conversation_id, &name, now).await?;
        conversation.name = Some(name);
        conversation.updated_at = now;

        info!(conversation_id = %conversation_id, "Group renamed");
        self.announce(&conversation, &[]).await?;
        self.response(conversation, user_id).await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn list_conversations(
        &self,
        user_id: Snowflake,
        query: ConversationListQuery,
    ) -> ServiceResult<Vec<ConversationResponse>> {
        let limit = query.limit.unwrap_or(LIST_DEFAULT_LIMIT).clamp(1, LIST_MAX_LIMIT);
        let conversations = self.ctx.conversation_repo().list_for_user(user_id, limit).await?;

        let mut responses = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            responses.push(self.response(conversation, user_id).await?);
        }
        Ok(responses)
    }

    pub async fn get_conversation(&self, user_id: Snowflake, conversation_id: Snowflake) -> ServiceResult<ConversationResponse> {
        let conversation = require_member(self.ctx, conversation_id, user_id).await?;
        self.response(conversation, user_id).await
    }

    pub async fn mark_read(&self, user_id: Snowflake, conversation_id: Snowflake) -> ServiceResult<()> {
        require_member(self.ctx, conversation_id, user_id).await?;
        self.ctx
            .conversation_repo()
            .mark_read(conversation_id, user_id, Utc::now())
            .await?;
        Ok(())
    }
}
