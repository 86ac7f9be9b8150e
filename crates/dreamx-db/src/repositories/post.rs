//! SQLite implementations of PostRepository and CommentRepository

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::instrument;

use dreamx_core::entities::{Comment, Post};
use dreamx_core::error::DomainError;
use dreamx_core::traits::{CommentRepository, CursorQuery, PostRepository, RepoResult};
use dreamx_core::value_objects::Snowflake;

use crate::models::{CommentModel, PostModel};

use super::error::map_db_error;

/// SQLite implementation of PostRepository
#[derive(Clone)]
pub struct SqlitePostRepository {
    pool: SqlitePool,
}

impl SqlitePostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Post>> {
        let result = sqlx::query_as::<_, PostModel>(
            "SELECT id, author_id, content, image, created_at, updated_at FROM posts WHERE id = ?1",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Post::from))
    }

    #[instrument(skip(self, post), fields(post_id = %post.id))]
    async fn create(&self, post: &Post) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO posts (id, author_id, content, image, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(post.id.into_inner())
        .bind(post.author_id.into_inner())
        .bind(&post.content)
        .bind(&post.image)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, post), fields(post_id = %post.id))]
    async fn update(&self, post: &Post) -> RepoResult<()> {
        let result = sqlx::query("UPDATE posts SET content = ?2, image = ?3, updated_at = ?4 WHERE id = ?1")
            .bind(post.id.into_inner())
            .bind(&post.content)
            .bind(&post.image)
            .bind(post.updated_at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::PostNotFound(post.id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        // comments, reactions and comment likes go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM posts WHERE id = ?1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::PostNotFound(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn feed(&self, viewer: Snowflake, author: Option<Snowflake>, query: CursorQuery) -> RepoResult<Vec<Post>> {
        let results = sqlx::query_as::<_, PostModel>(
            r"
            SELECT p.id, p.author_id, p.content, p.image, p.created_at, p.updated_at
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE u.status != 'banned'
              AND (u.profile_visibility = 'public' OR p.author_id = ?1)
              AND NOT EXISTS (
                  SELECT 1 FROM blocks b
                  WHERE (b.blocker_id = ?1 AND b.blocked_id = p.author_id)
                     OR (b.blocker_id = p.author_id AND b.blocked_id = ?1)
              )
              AND (?2 IS NULL OR p.author_id = ?2)
              AND (?3 IS NULL OR p.id < ?3)
              AND (?4 IS NULL OR p.id > ?4)
            ORDER BY p.id DESC
            LIMIT ?5
            ",
        )
        .bind(viewer.into_inner())
        .bind(author.map(Snowflake::into_inner))
        .bind(query.before.map(Snowflake::into_inner))
        .bind(query.after.map(Snowflake::into_inner))
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Post::from).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> RepoResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }
}

/// SQLite implementation of CommentRepository
#[derive(Clone)]
pub struct SqliteCommentRepository {
    pool: SqlitePool,
}

impl SqliteCommentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for SqliteCommentRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Comment>> {
        let result = sqlx::query_as::<_, CommentModel>(
            r"
            SELECT id, post_id, author_id, parent_id, content, created_at, updated_at
            FROM comments WHERE id = ?1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Comment::from))
    }

    #[instrument(skip(self, comment), fields(comment_id = %comment.id, post_id = %comment.post_id))]
    async fn create(&self, comment: &Comment) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO comments (id, post_id, author_id, parent_id, content, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(comment.id.into_inner())
        .bind(comment.post_id.into_inner())
        .bind(comment.author_id.into_inner())
        .bind(comment.parent_id.map(Snowflake::into_inner))
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?1 OR parent_id = ?1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::CommentNotFound(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_by_post(&self, post_id: Snowflake, query: CursorQuery) -> RepoResult<Vec<Comment>> {
        let results = sqlx::query_as::<_, CommentModel>(
            r"
            SELECT id, post_id, author_id, parent_id, content, created_at, updated_at
            FROM comments
            WHERE post_id = ?1
              AND (?2 IS NULL OR id > ?2)
              AND (?3 IS NULL OR id < ?3)
            ORDER BY id ASC
            LIMIT ?4
            ",
        )
        .bind(post_id.into_inner())
        .bind(query.after.map(Snowflake::into_inner))
        .bind(query.before.map(Snowflake::into_inner))
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Comment::from).collect())
    }

    #[instrument(skip(self))]
    async fn count_by_post(&self, post_id: Snowflake) -> RepoResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = ?1")
            .bind(post_id.into_inner())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }
}
