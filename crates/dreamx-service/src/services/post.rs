//! Feed service
//!
//! Posts and their comments. Reads apply the same visibility rules as the
//! feed query: blocked either way, banned authors and private profiles are
//! hidden from everyone but the author and staff.

use std::collections::HashMap;

use chrono::Utc;
use dreamx_core::{
    Comment, CursorQuery, DomainError, Notification, NotificationKind, Post, ReactionTarget,
    Snowflake, User, COMMENT_MAX_LEN, POST_MAX_LEN,
};
use serde_json::json;
use tracing::{info, instrument};

use crate::dto::{
    CommentResponse, CreateCommentRequest, CreatePostRequest, CursorParams, FeedQuery,
    PostResponse, PublicUserResponse, UpdatePostRequest,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::moderation::record_audit;
use super::notification::NotificationService;
use super::upload::UPLOADS_PATH;

const EXCERPT_CHARS: usize = 80;

/// Trim text and enforce the non-empty and length rules
pub(crate) fn checked_content(raw: &str, max: usize) -> ServiceResult<String> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(ServiceError::validation("Content cannot be empty"));
    }
    if content.chars().count() > max {
        return Err(DomainError::ContentTooLong { max }.into());
    }
    Ok(content.to_string())
}

/// Attachments and images must point into the uploads directory
pub(crate) fn checked_upload_path(path: Option<String>) -> ServiceResult<Option<String>> {
    match path.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()) {
        Some(p) if !p.starts_with(&format!("{UPLOADS_PATH}/")) || p.contains("..") => {
            Err(ServiceError::validation("File must be uploaded first"))
        }
        other => Ok(other),
    }
}

pub(crate) fn post_link(post_id: Snowflake) -> String {
    format!("/posts/{post_id}")
}

/// Feed service
pub struct PostService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PostService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Load a post the viewer is allowed to see, with its author
    pub(crate) async fn visible_post(&self, viewer: &User, post_id: Snowflake) -> ServiceResult<(Post, User)> {
        let post = self
            .ctx
            .post_repo()
            .find_by_id(post_id)
            .await?
            .ok_or(DomainError::PostNotFound(post_id))?;

        if post.author_id == viewer.id {
            return Ok((post, viewer.clone()));
        }

        let author = self.ctx.load_user(post.author_id).await?;
        if !viewer.is_staff() {
            let hidden = author.is_banned()
                || !author.profile_visible_to(Some(viewer))
                || self.ctx.block_repo().is_blocked_either(viewer.id, author.id).await?;
            if hidden {
                return Err(DomainError::PostNotFound(post_id).into());
            }
        }
        Ok((post, author))
    }

    async fn post_response(&self, post: Post, author: &User, viewer_id: Snowflake) -> ServiceResult<PostResponse> {
        let reactions = self.ctx.reaction_repo().summary(ReactionTarget::Post, post.id).await?;
        let my_reaction = self
            .ctx
            .reaction_repo()
            .user_reaction(ReactionTarget::Post, post.id, viewer_id)
            .await?;
        let comment_count = self.ctx.comment_repo().count_by_post(post.id).await?;

        Ok(PostResponse {
            id: post.id,
            author: PublicUserResponse::from(author),
            content: post.content,
            image: post.image,
            reactions,
            my_reaction,
            comment_count,
            created_at: post.created_at,
            updated_at: post.updated_at,
        })
    }

    // =========================================================================
    // Posts
    // =========================================================================

    #[instrument(skip(self, request))]
    pub async fn create_post(&self, user_id: Snowflake, request: CreatePostRequest) -> ServiceResult<PostResponse> {
        let author = self.ctx.acting_user(user_id).await?;
        let content = checked_content(&request.content, POST_MAX_LEN)?;
        let image = checked_upload_path(request.image)?;

        let post = Post::new(self.ctx.generate_id(), user_id, content, image);
        self.ctx.post_repo().create(&post).await?;

        info!(post_id = %post.id, user_id = %user_id, "Post created");
        self.post_response(post, &author, user_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_post(&self, viewer_id: Snowflake, post_id: Snowflake) -> ServiceResult<PostResponse> {
        let viewer = self.ctx.load_user(viewer_id).await?;
        let (post, author) = self.visible_post(&viewer, post_id).await?;
        self.post_response(post, &author, viewer_id).await
    }

    /// Newest-first feed, optionally limited to one author
    #[instrument(skip(self))]
    pub async fn list_feed(&self, viewer_id: Snowflake, query: FeedQuery) -> ServiceResult<Vec<PostResponse>> {
        let cursor = CursorQuery::new(query.before, None, query.limit);
        let posts = self.ctx.post_repo().feed(viewer_id, query.author, cursor).await?;

        let mut authors: HashMap<Snowflake, User> = HashMap::new();
        let mut responses = Vec::with_capacity(posts.len());
        for post in posts {
            if !authors.contains_key(&post.author_id) {
                let author = self.ctx.load_user(post.author_id).await?;
                authors.insert(author.id, author);
            }
            if let Some(author) = authors.get(&post.author_id) {
                responses.push(self.post_response(post, author, viewer_id).await?);
            }
        }
        Ok(responses)
    }

    #[instrument(skip(self, request))]
    pub async fn update_post(
        &self,
        user_id: Snowflake,
        post_id: Snowflake,
        request: UpdatePostRequest,
    ) -> ServiceResult<PostResponse> {
        let author = self.ctx.acting_user(user_id).await?;
        let mut post = self
            .ctx
            .post_repo()
            .find_by_id(post_id)
            .await?
            .ok_or(DomainError::PostNotFound(post_id))?;

        if !post.is_owned_by(user_id) {
            return Err(DomainError::Forbidden("only the author can edit a post".into()).into());
        }

        post.edit(checked_content(&request.content, POST_MAX_LEN)?);
        self.ctx.post_repo().update(&post).await?;

        info!(post_id = %post_id, "Post updated");
        self.post_response(post, &author, user_id).await
    }

    /// Delete a post; the author or staff. Staff removals are audited.
    #[instrument(skip(self))]
    pub async fn delete_post(&self, user_id: Snowflake, post_id: Snowflake) -> ServiceResult<()> {
        let actor = self.ctx.acting_user(user_id).await?;
        let post = self
            .ctx
            .post_repo()
            .find_by_id(post_id)
            .await?
            .ok_or(DomainError::PostNotFound(post_id))?;

        let owner = post.is_owned_by(user_id);
        if !owner && !actor.is_staff() {
            return Err(DomainError::Forbidden("only the author or staff can delete a post".into()).into());
        }

        self.ctx.post_repo().delete(post_id).await?;

        if !owner {
            record_audit(
                self.ctx,
                user_id,
                "post.delete",
                "post",
                Some(post_id),
                json!({ "author_id": post.author_id, "excerpt": post.excerpt(EXCERPT_CHARS) }),
            )
            .await?;
        }

        info!(post_id = %post_id, user_id = %user_id, "Post deleted");
        Ok(())
    }

    // =========================================================================
    // Comments
    // =========================================================================

    async fn comment_response(&self, comment: Comment) -> ServiceResult<CommentResponse> {
        let likes = self.ctx.reaction_repo().summary(ReactionTarget::Comment, comment.id).await?;
        Ok(CommentResponse {
            id: comment.id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            parent_id: comment.parent_id,
            content: comment.content,
            likes,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        })
    }

    #[instrument(skip(self, request))]
    pub async fn add_comment(
        &self,
        user_id: Snowflake,
        post_id: Snowflake,
        request: CreateCommentRequest,
    ) -> ServiceResult<CommentResponse> {
        let commenter = self.ctx.acting_user(user_id).await?;
        let (post, _) = self.visible_post(&commenter, post_id).await?;
        let content = checked_content(&request.content, COMMENT_MAX_LEN)?;

        let parent = match request.parent_id {
            Some(parent_id) => {
                let parent = self
                    .ctx
                    .comment_repo()
                    .find_by_id(parent_id)
                    .await?
                    .ok_or(DomainError::CommentNotFound(parent_id))?;
                if parent.post_id != post_id {
                    return Err(ServiceError::validation("Parent comment belongs to another post"));
                }
                Some(parent)
            }
            None => None,
        };

        if self.ctx.block_repo().has_blocked(post.author_id, user_id).await? {
            return Err(DomainError::Blocked.into());
        }

        let comment = Comment::new(self.ctx.generate_id(), post_id, user_id, request.parent_id, content);
        self.ctx.comment_repo().create(&comment).await?;
        info!(comment_id = %comment.id, post_id = %post_id, "Comment added");

        let notifications = NotificationService::new(self.ctx);
        let snippet = dreamx_core::excerpt(&comment.content, EXCERPT_CHARS);
        let data = json!({ "post_id": post_id, "comment_id": comment.id });

        let parent_author = parent.as_ref().map(|p| p.author_id);
        if let Some(parent_author) = parent_author {
            notifications
                .notify(
                    Notification::new(
                        self.ctx.generate_id(),
                        parent_author,
                        Some(user_id),
                        NotificationKind::Reply,
                        format!("{} replied to your comment: {snippet}", commenter.display_name),
                    )
                    .with_link(post_link(post_id))
                    .with_data(data.clone()),
                )
                .await;
        }
        if parent_author != Some(post.author_id) {
            notifications
                .notify(
                    Notification::new(
                        self.ctx.generate_id(),
                        post.author_id,
                        Some(user_id),
                        NotificationKind::Comment,
                        format!("{} commented on your post: {snippet}", commenter.display_name),
                    )
                    .with_link(post_link(post_id))
                    .with_data(data),
                )
                .await;
        }

        self.comment_response(comment).await
    }

    /// Oldest-first comments with like counts
    #[instrument(skip(self))]
    pub async fn list_comments(
        &self,
        viewer_id: Snowflake,
        post_id: Snowflake,
        params: CursorParams,
    ) -> ServiceResult<Vec<CommentResponse>> {
        let viewer = self.ctx.load_user(viewer_id).await?;
        self.visible_post(&viewer, post_id).await?;

        let comments = self.ctx.comment_repo().list_by_post(post_id, params.into()).await?;
        let mut responses = Vec::with_capacity(comments.len());
        for comment in comments {
            responses.push(self.comment_response(comment).await?);
        }
        Ok(responses)
    }

    /// Delete a comment; its author, the post owner, or staff
    #[instrument(skip(self))]
    pub async fn delete_comment(&self, user_id: Snowflake, comment_id: Snowflake) -> ServiceResult<()> {
        let actor = self.ctx.acting_user(user_id).await?;
        let comment = self
            .ctx
            .comment_repo()
            .find_by_id(comment_id)
            .await?
            .ok_or(DomainError::CommentNotFound(comment_id))?;

        let post_owner = match self.ctx.post_repo().find_by_id(comment.post_id).await? {
            Some(post) => post.is_owned_by(user_id),
            None => false,
        };
        let author = comment.author_id == user_id;

        if !author && !post_owner && !actor.is_staff() {
            return Err(DomainError::Forbidden("cannot delete this comment".into()).into());
        }

        self.ctx.comment_repo().delete(comment_id).await?;

        if !author && !post_owner {
            record_audit(
                self.ctx,
                user_id,
                "comment.delete",
                "comment",
                Some(comment_id),
                json!({ "author_id": comment.author_id, "post_id": comment.post_id }),
            )
            .await?;
        }

        info!(comment_id = %comment_id, user_id = %user_id, "Comment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{context, create_staff, create_user};
    use dreamx_core::{PageQuery, ProfileVisibility, UserRole};

    fn post(content: &str) -> CreatePostRequest {
        CreatePostRequest { content: content.into(), image: None }
    }

    fn comment(content: &str, parent_id: Option<Snowflake>) -> CreateCommentRequest {
        CreateCommentRequest { content: content.into(), parent_id }
    }

    #[tokio::test]
    async fn test_create_and_get_post() {
        let ctx = context().await;
        let ana = create_user(&ctx, "ana").await;
        let bo = create_user(&ctx, "bo").await;
        let posts = PostService::new(&ctx);

        let created = posts.create_post(ana.id, post("  hello world  ")).await.unwrap();
        assert_eq!(created.content, "hello world");
        assert_eq!(created.author.username, "ana");
        assert!(created.reactions.is_empty());

        posts.add_comment(bo.id, created.id, comment("nice", None)).await.unwrap();
        let fetched = posts.get_post(bo.id, created.id).await.unwrap();
        assert_eq!(fetched.comment_count, 1);
        assert!(fetched.my_reaction.is_none());
    }

    #[tokio::test]
    async fn test_post_content_rules() {
        let ctx = context().await;
        let ana = create_user(&ctx, "ana").await;
        let posts = PostService::new(&ctx);

        let err = posts.create_post(ana.id, post("   ")).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let err = posts.create_post(ana.id, post(&"x".repeat(POST_MAX_LEN + 1))).await.unwrap_err();
        assert_eq!(err.error_code(), "CONTENT_TOO_LONG");

        let err = posts
            .create_post(ana.id, CreatePostRequest { content: "pic".into(), image: Some("https://evil.example/x.png".into()) })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_feed_hides_blocked_banned_and_private() {
        let ctx = context().await;
        let viewer = create_user(&ctx, "viewer").await;
        let friend = create_user(&ctx, "friend").await;
        let blocked = create_user(&ctx, "blocked").await;
        let mut banned = create_user(&ctx, "banned").await;
        let mut private = create_user(&ctx, "private").await;
        let posts = PostService::new(&ctx);

        for user in [&viewer, &friend, &blocked, &banned, &private] {
            posts.create_post(user.id, post(&format!("by {}", user.username))).await.unwrap();
        }

        ctx.block_repo().block(blocked.id, viewer.id, Utc::now()).await.unwrap();
        banned.ban("spam".into());
        ctx.user_repo().update(&banned).await.unwrap();
        private.profile_visibility = ProfileVisibility::Private;
        ctx.user_repo().update(&private).await.unwrap();

        let feed = posts.list_feed(viewer.id, FeedQuery::default()).await.unwrap();
        let authors: Vec<_> = feed.iter().map(|p| p.author.username.as_str()).collect();
        assert_eq!(authors, vec!["friend", "viewer"]);

        let own = posts.list_feed(private.id, FeedQuery { author: Some(private.id), ..Default::default() }).await.unwrap();
        assert_eq!(own.len(), 1);
    }

    #[tokio::test]
    async fn test_only_owner_edits_and_staff_delete_is_audited() {
        let ctx = context().await;
        let ana = create_user(&ctx, "ana").await;
        let bo = create_user(&ctx, "bo").await;
        let mo = create_staff(&ctx, "mo", UserRole::Moderator).await;
        let posts = PostService::new(&ctx);

        let created = posts.create_post(ana.id, post("first")).await.unwrap();
        let err = posts
            .update_post(bo.id, created.id, UpdatePostRequest { content: "mine".into() })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);

        let updated = posts
            .update_post(ana.id, created.id, UpdatePostRequest { content: "edited".into() })
            .await
            .unwrap();
        assert_eq!(updated.content, "edited");

        assert_eq!(posts.delete_post(bo.id, created.id).await.unwrap_err().status_code(), 403);
        posts.delete_post(mo.id, created.id).await.unwrap();
        assert!(posts.get_post(ana.id, created.id).await.is_err());

        let (entries, total) = ctx.audit_repo().list(PageQuery::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(entries[0].action, "post.delete");
        assert_eq!(entries[0].actor_id, mo.id);
    }

    #[tokio::test]
    async fn test_comment_notifications_and_reply_rules() {
        let ctx = context().await;
        let ana = create_user(&ctx, "ana").await;
        let bo = create_user(&ctx, "bo").await;
        let cy = create_user(&ctx, "cy").await;
        let posts = PostService::new(&ctx);

        let first = posts.create_post(ana.id, post("first")).await.unwrap();
        let other = posts.create_post(ana.id, post("other")).await.unwrap();

        let top = posts.add_comment(bo.id, first.id, comment("top", None)).await.unwrap();
        let reply = posts.add_comment(cy.id, first.id, comment("reply", Some(top.id))).await.unwrap();
        assert_eq!(reply.parent_id, Some(top.id));

        let err = posts.add_comment(cy.id, other.id, comment("x", Some(top.id))).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        // the author commenting on their own post notifies no one
        posts.add_comment(ana.id, first.id, comment("thanks", None)).await.unwrap();

        let ana_inbox = ctx.notification_repo().list(ana.id, CursorQuery::default(), false).await.unwrap();
        assert_eq!(ana_inbox.len(), 2);
        assert!(ana_inbox.iter().all(|n| n.kind == NotificationKind::Comment));

        let bo_inbox = ctx.notification_repo().list(bo.id, CursorQuery::default(), false).await.unwrap();
        assert_eq!(bo_inbox.len(), 1);
        assert_eq!(bo_inbox[0].kind, NotificationKind::Reply);
        assert_eq!(bo_inbox[0].link.as_deref(), Some(post_link(first.id).as_str()));

        let listed = posts.list_comments(bo.id, first.id, CursorParams::default()).await.unwrap();
        let contents: Vec<_> = listed.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["top", "reply", "thanks"]);
    }

    #[tokio::test]
    async fn test_blocked_commenter_is_rejected() {
        let ctx = context().await;
        let ana = create_user(&ctx, "ana").await;
        let bo = create_user(&ctx, "bo").await;
        let posts = PostService::new(&ctx);

        let created = posts.create_post(ana.id, post("hi")).await.unwrap();
        ctx.block_repo().block(ana.id, bo.id, Utc::now()).await.unwrap();

        let err = posts.add_comment(bo.id, created.id, comment("hey", None)).await.unwrap_err();
        assert!(err.status_code() == 403 || err.status_code() == 404);
    }

    #[tokio::test]
    async fn test_comment_deletion_rights() {
        let ctx = context().await;
        let ana = create_user(&ctx, "ana").await;
        let bo = create_user(&ctx, "bo").await;
        let cy = create_user(&ctx, "cy").await;
        let posts = PostService::new(&ctx);

        let created = posts.create_post(ana.id, post("hi")).await.unwrap();
        let by_bo = posts.add_comment(bo.id, created.id, comment("one", None)).await.unwrap();
        let by_bo_again = posts.add_comment(bo.id, created.id, comment("two", None)).await.unwrap();

        assert_eq!(posts.delete_comment(cy.id, by_bo.id).await.unwrap_err().status_code(), 403);
        posts.delete_comment(bo.id, by_bo.id).await.unwrap();
        posts.delete_comment(ana.id, by_bo_again.id).await.unwrap();

        let remaining = posts.list_comments(ana.id, created.id, CursorParams::default()).await.unwrap();
        assert!(remaining.is_empty());
    }
}
