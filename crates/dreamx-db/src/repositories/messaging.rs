//! SQLite implementations of ConversationRepository and MessageRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use dreamx_core::entities::{Conversation, ConversationMember, MemberRole, Message};
use dreamx_core::error::DomainError;
use dreamx_core::traits::{ConversationRepository, CursorQuery, MessageRepository, RepoResult};
use dreamx_core::value_objects::Snowflake;

use crate::models::{ConversationMemberModel, ConversationModel, MessageModel};

use super::error::map_db_error;

const CONVERSATION_COLUMNS: &str = "id, kind, name, owner_id, direct_key, created_at, updated_at";

// ============================================================================
// Conversations
// ============================================================================

#[derive(Clone)]
pub struct SqliteConversationRepository {
    pool: SqlitePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for SqliteConversationRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Conversation>> {
        let result = sqlx::query_as::<_, ConversationModel>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Conversation::from))
    }

    #[instrument(skip(self, candidate))]
    async fn get_or_create_direct(
        &self,
        candidate: &Conversation,
        a: Snowflake,
        b: Snowflake,
    ) -> RepoResult<(Conversation, bool)> {
        let direct_key = candidate
            .direct_key
            .as_deref()
            .ok_or_else(|| DomainError::ValidationError("direct conversation without key".to_string()))?;

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let inserted = sqlx::query(
            r"
            INSERT INTO conversations (id, kind, name, owner_id, direct_key, created_at, updated_at)
            VALUES (?1, ?2, NULL, NULL, ?3, ?4, ?5)
            ON CONFLICT(direct_key) DO NOTHING
            ",
        )
        .bind(candidate.id.into_inner())
        .bind(candidate.kind.as_str())
        .bind(direct_key)
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?
        .rows_affected();
        let created = inserted == 1;

        let stored = sqlx::query_as::<_, ConversationModel>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE direct_key = ?1"
        ))
        .bind(direct_key)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if created {
            for user_id in [a, b] {
                sqlx::query(
                    r"
                    INSERT OR IGNORE INTO conversation_members (conversation_id, user_id, role, joined_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ",
                )
                .bind(stored.id)
                .bind(user_id.into_inner())
                .bind(MemberRole::Member.as_str())
                .bind(candidate.created_at)
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
            }
        }

        tx.commit().await.map_err(map_db_error)?;
        debug!(conversation_id = stored.id, created, "Direct conversation resolved");

        Ok((Conversation::from(stored), created))
    }

    #[instrument(skip(self, conversation, members), fields(conversation_id = %conversation.id))]
    async fn create_group(&self, conversation: &Conversation, members: &[Snowflake]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query(
            r"
            INSERT INTO conversations (id, kind, name, owner_id, direct_key, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6)
            ",
        )
        .bind(conversation.id.into_inner())
        .bind(conversation.kind.as_str())
        .bind(&conversation.name)
        .bind(conversation.owner_id.map(Snowflake::into_inner))
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        for &user_id in members {
            let role = if conversation.is_owner(user_id) {
                MemberRole::Owner
            } else {
                MemberRole::Member
            };
            sqlx::query(
                r"
                INSERT OR IGNORE INTO conversation_members (conversation_id, user_id, role, joined_at)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(conversation.id.into_inner())
            .bind(user_id.into_inner())
            .bind(role.as_str())
            .bind(conversation.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: Snowflake, limit: i64) -> RepoResult<Vec<Conversation>> {
        let results = sqlx::query_as::<_, ConversationModel>(
            r"
            SELECT c.id, c.kind, c.name, c.owner_id, c.direct_key, c.created_at, c.updated_at
            FROM conversations c
            JOIN conversation_members m ON m.conversation_id = c.id
            WHERE m.user_id = ?1
            ORDER BY c.updated_at DESC, c.id DESC
            LIMIT ?2
            ",
        )
        .bind(user_id.into_inner())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Conversation::from).collect())
    }

    #[instrument(skip(self))]
    async fn members(&self, conversation_id: Snowflake) -> RepoResult<Vec<ConversationMember>> {
        let results = sqlx::query_as::<_, ConversationMemberModel>(
            r"
            SELECT conversation_id, user_id, role, joined_at, last_read_at
            FROM conversation_members
            WHERE conversation_id = ?1
            ORDER BY joined_at ASC, user_id ASC
            ",
        )
        .bind(conversation_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(ConversationMember::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_member(&self, conversation_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<ConversationMember>> {
        let result = sqlx::query_as::<_, ConversationMemberModel>(
            r"
            SELECT conversation_id, user_id, role, joined_at, last_read_at
            FROM conversation_members
            WHERE conversation_id = ?1 AND user_id = ?2
            ",
        )
        .bind(conversation_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(ConversationMember::from))
    }

    #[instrument(skip(self, user_ids))]
    async fn add_members(&self, conversation_id: Snowflake, user_ids: &[Snowflake]) -> RepoResult<u64> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let mut added = 0;

        for user_id in user_ids {
            added += sqlx::query(
                r"
                INSERT OR IGNORE INTO conversation_members (conversation_id, user_id, role, joined_at)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(conversation_id.into_inner())
            .bind(user_id.into_inner())
            .bind(MemberRole::Member.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?
            .rows_affected();
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(added)
    }

    #[instrument(skip(self))]
    async fn remove_member(&self, conversation_id: Snowflake, user_id: Snowflake) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM conversation_members WHERE conversation_id = ?1 AND user_id = ?2")
            .bind(conversation_id.into_inner())
            .bind(user_id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotConversationMember);
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn rename(&self, conversation_id: Snowflake, name: &str, at: DateTime<Utc>) -> RepoResult<()> {
        let result = sqlx::query("UPDATE conversations SET name = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(conversation_id.into_inner())
            .bind(name)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ConversationNotFound(conversation_id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn touch(&self, conversation_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query("UPDATE conversations SET updated_at = ?2 WHERE id = ?1")
            .bind(conversation_id.into_inner())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn mark_read(&self, conversation_id: Snowflake, user_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE conversation_members SET last_read_at = ?3 WHERE conversation_id = ?1 AND user_id = ?2",
        )
        .bind(conversation_id.into_inner())
        .bind(user_id.into_inner())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotConversationMember);
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn unread_count(&self, conversation_id: Snowflake, user_id: Snowflake) -> RepoResult<i64> {
        sqlx::query_scalar(
            r"
            SELECT COUNT(msg.id)
            FROM conversation_members cm
            JOIN messages msg ON msg.conversation_id = cm.conversation_id
            WHERE cm.conversation_id = ?1
              AND cm.user_id = ?2
              AND msg.sender_id != ?2
              AND (cm.last_read_at IS NULL OR msg.created_at > cm.last_read_at)
            ",
        )
        .bind(conversation_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Clone)]
pub struct SqliteMessageRepository {
    pool: SqlitePool,
}

impl SqliteMessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for SqliteMessageRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>> {
        let result = sqlx::query_as::<_, MessageModel>(
            r"
            SELECT id, conversation_id, sender_id, content, attachment, created_at, edited_at
            FROM messages WHERE id = ?1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Message::from))
    }

    #[instrument(skip(self))]
    async fn list(&self, conversation_id: Snowflake, query: CursorQuery) -> RepoResult<Vec<Message>> {
        let results = sqlx::query_as::<_, MessageModel>(
            r"
            SELECT id, conversation_id, sender_id, content, attachment, created_at, edited_at
            FROM messages
            WHERE conversation_id = ?1
              AND (?2 IS NULL OR id < ?2)
              AND (?3 IS NULL OR id > ?3)
            ORDER BY id DESC
            LIMIT ?4
            ",
        )
        .bind(conversation_id.into_inner())
        .bind(query.before.map(Snowflake::into_inner))
        .bind(query.after.map(Snowflake::into_inner))
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Message::from).collect())
    }

    #[instrument(skip(self))]
    async fn latest(&self, conversation_id: Snowflake) -> RepoResult<Option<Message>> {
        let result = sqlx::query_as::<_, MessageModel>(
            r"
            SELECT id, conversation_id, sender_id, content, attachment, created_at, edited_at
            FROM messages
            WHERE conversation_id = ?1
            ORDER BY id DESC
            LIMIT 1
            ",
        )
        .bind(conversation_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Message::from))
    }

    #[instrument(skip(self, message), fields(message_id = %message.id, conversation_id = %message.conversation_id))]
    async fn create(&self, message: &Message) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO messages (id, conversation_id, sender_id, content, attachment, created_at, edited_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(message.id.into_inner())
        .bind(message.conversation_id.into_inner())
        .bind(message.sender_id.into_inner())
        .bind(&message.content)
        .bind(&message.attachment)
        .bind(message.created_at)
        .bind(message.edited_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, message), fields(message_id = %message.id))]
    async fn update(&self, message: &Message) -> RepoResult<()> {
        let result = sqlx::query("UPDATE messages SET content = ?2, edited_at = ?3 WHERE id = ?1")
            .bind(message.id.into_inner())
            .bind(&message.content)
            .bind(message.edited_at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::MessageNotFound(message.id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::MessageNotFound(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> RepoResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }
}
