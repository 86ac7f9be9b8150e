//! Feed content - posts and their comments

use chrono::{DateTime, Utc};

use crate::value_objects::Snowflake;

pub const POST_MAX_LEN: usize = 5000;
pub const COMMENT_MAX_LEN: usize = 2000;

/// Feed post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: Snowflake,
    pub author_id: Snowflake,
    pub content: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(id: Snowflake, author_id: Snowflake, content: String, image: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            author_id,
            content,
            image,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn is_owned_by(&self, user_id: Snowflake) -> bool {
        self.author_id == user_id
    }

    pub fn edit(&mut self, content: String) {
        self.content = content;
        self.updated_at = Utc::now();
    }

    /// Short excerpt used in notification bodies
    pub fn excerpt(&self, max_chars: usize) -> String {
        excerpt(&self.content, max_chars)
    }
}

/// Comment on a post, optionally replying to another comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: Snowflake,
    pub post_id: Snowflake,
    pub author_id: Snowflake,
    pub parent_id: Option<Snowflake>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        id: Snowflake,
        post_id: Snowflake,
        author_id: Snowflake,
        parent_id: Option<Snowflake>,
        content: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            post_id,
            author_id,
            parent_id,
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Truncate on a char boundary, appending an ellipsis when shortened
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.push('…');
    out
}
