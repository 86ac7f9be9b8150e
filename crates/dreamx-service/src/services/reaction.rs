//! Reaction toggles for posts, messages and comments
//!
//! The repository runs set / flip / clear and the recount in one
//! transaction; this layer checks access and fans out the side effects.

use dreamx_core::{
    DomainError, DomainEvent, Notification, NotificationKind, ReactionKind, ReactionSummary,
    ReactionTarget, ReactionToggle, Snowflake, User,
};
use dreamx_core::events::MessageReactionUpdatedEvent;
use serde_json::json;
use tracing::{info, instrument};

use crate::dto::ToggleReactionRequest;

use super::context::ServiceContext;
use super::conversation::require_member;
use super::error::ServiceResult;
use super::notification::NotificationService;
use super::post::{post_link, PostService};

fn parse_kind(request: &ToggleReactionRequest) -> ServiceResult<ReactionKind> {
    match request.kind.as_deref() {
        Some(raw) => Ok(ReactionKind::parse(raw)?),
        None => Ok(ReactionKind::like()),
    }
}

/// Reaction service
pub struct ReactionService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReactionService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Tell the owner about a new or changed reaction; clears stay silent
    async fn notify_owner(
        &self,
        actor: &User,
        owner_id: Snowflake,
        toggle: &ReactionToggle,
        body: String,
        link: String,
        data: serde_json::Value,
    ) {
        if !toggle.outcome.is_active() || owner_id == actor.id {
            return;
        }
        NotificationService::new(self.ctx)
            .notify(
                Notification::new(self.ctx.generate_id(), owner_id, Some(actor.id), NotificationKind::Reaction, body)
                    .with_link(link)
                    .with_data(data),
            )
            .await;
    }

    #[instrument(skip(self, request))]
    pub async fn toggle_post(
        &self,
        user_id: Snowflake,
        post_id: Snowflake,
        request: ToggleReactionRequest,
    ) -> ServiceResult<ReactionToggle> {
        let actor = self.ctx.acting_user(user_id).await?;
        let kind = parse_kind(&request)?;
        let (post, _) = PostService::new(self.ctx).visible_post(&actor, post_id).await?;

        let toggle = self
            .ctx
            .reaction_repo()
            .toggle(ReactionTarget::Post, post.id, user_id, &kind)
            .await?;

        info!(post_id = %post_id, outcome = toggle.outcome.as_str(), "Post reaction toggled");

        self.notify_owner(
            &actor,
            post.author_id,
            &toggle,
            format!("{} reacted {} to your post", actor.display_name, kind),
            post_link(post.id),
            json!({ "post_id": post.id, "kind": kind.as_str() }),
        )
        .await;

        Ok(toggle)
    }

    /// Toggle a message reaction and push the new counts to every member
    #[instrument(skip(self, request))]
    pub async fn toggle_message(
        &self,
        user_id: Snowflake,
        message_id: Snowflake,
        request: ToggleReactionRequest,
    ) -> ServiceResult<ReactionToggle> {
        let actor = self.ctx.acting_user(user_id).await?;
        let kind = parse_kind(&request)?;
        let message = self
            .ctx
            .message_repo()
            .find_by_id(message_id)
            .await?
            .ok_or(DomainError::MessageNotFound(message_id))?;
        require_member(self.ctx, message.conversation_id, user_id).await?;

        let toggle = self
            .ctx
            .reaction_repo()
            .toggle(ReactionTarget::Message, message.id, user_id, &kind)
            .await?;

        let member_ids: Vec<Snowflake> = self
            .ctx
            .conversation_repo()
            .members(message.conversation_id)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        let event = DomainEvent::MessageReactionUpdated(MessageReactionUpdatedEvent::new(
            message.id,
            message.conversation_id,
            user_id,
            &toggle,
        ));
        self.ctx.publish_to_users(&member_ids, &event).await;

        info!(message_id = %message_id, outcome = toggle.outcome.as_str(), "Message reaction toggled");

        self.notify_owner(
            &actor,
            message.sender_id,
            &toggle,
            format!("{} reacted {} to your message", actor.display_name, kind),
            format!("/messages/{}", message.conversation_id),
            json!({ "conversation_id": message.conversation_id, "message_id": message.id, "kind": kind.as_str() }),
        )
        .await;

        Ok(toggle)
    }

    #[instrument(skip(self, request))]
    pub async fn toggle_comment_like(
        &self,
        user_id: Snowflake,
        comment_id: Snowflake,
        request: ToggleReactionRequest,
    ) -> ServiceResult<ReactionToggle> {
        let actor = self.ctx.acting_user(user_id).await?;
        let kind = parse_kind(&request)?;
        let comment = self
            .ctx
            .comment_repo()
            .find_by_id(comment_id)
            .await?
            .ok_or(DomainError::CommentNotFound(comment_id))?;
        PostService::new(self.ctx).visible_post(&actor, comment.post_id).await?;

        let toggle = self
            .ctx
            .reaction_repo()
            .toggle(ReactionTarget::Comment, comment.id, user_id, &kind)
            .await?;

        info!(comment_id = %comment_id, outcome = toggle.outcome.as_str(), "Comment like toggled");

        self.notify_owner(
            &actor,
            comment.author_id,
            &toggle,
            format!("{} liked your comment", actor.display_name),
            post_link(comment.post_id),
            json!({ "post_id": comment.post_id, "comment_id": comment.id }),
        )
        .await;

        Ok(toggle)
    }

    // =========================================================================
    // Summaries
    // =========================================================================

    pub async fn post_reactions(&self, viewer_id: Snowflake, post_id: Snowflake) -> ServiceResult<ReactionSummary> {
        let viewer = self.ctx.load_user(viewer_id).await?;
        PostService::new(self.ctx).visible_post(&viewer, post_id).await?;
        Ok(self.ctx.reaction_repo().summary(ReactionTarget::Post, post_id).await?)
    }

    pub async fn message_reactions(&self, viewer_id: Snowflake, message_id: Snowflake) -> ServiceResult<ReactionSummary> {
        let message = self
            .ctx
            .message_repo()
            .find_by_id(message_id)
            .await?
            .ok_or(DomainError::MessageNotFound(message_id))?;
        require_member(self.ctx, message.conversation_id, viewer_id).await?;
        Ok(self.ctx.reaction_repo().summary(ReactionTarget::Message, message_id).await?)
    }

    pub async fn comment_likes(&self, viewer_id: Snowflake, comment_id: Snowflake) -> ServiceResult<ReactionSummary> {
        let viewer = self.ctx.load_user(viewer_id).await?;
        let comment = self
            .ctx
            .comment_repo()
            .find_by_id(comment_id)
            .await?
            .ok_or(DomainError::CommentNotFound(comment_id))?;
        PostService::new(self.ctx).visible_post(&viewer, comment.post_id).await?;
        Ok(self.ctx.reaction_repo().summary(ReactionTarget::Comment, comment_id).await?)
    }
}
