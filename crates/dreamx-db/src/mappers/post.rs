//! Post and comment mappers

use dreamx_core::entities::{Comment, Post};
use dreamx_core::value_objects::{ReactionSummary, Snowflake};

use crate::models::{CommentModel, PostModel, ReactionCountModel};

impl From<PostModel> for Post {
    fn from(model: PostModel) -> Self {
        Post {
            id: Snowflake::new(model.id),
            author_id: Snowflake::new(model.author_id),
            content: model.content,
            image: model.image,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<CommentModel> for Comment {
    fn from(model: CommentModel) -> Self {
        Comment {
            id: Snowflake::new(model.id),
            post_id: Snowflake::new(model.post_id),
            author_id: Snowflake::new(model.author_id),
            parent_id: model.parent_id.map(Snowflake::new),
            content: model.content,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl FromIterator<ReactionCountModel> for ReactionSummary {
    fn from_iter<I: IntoIterator<Item = ReactionCountModel>>(rows: I) -> Self {
        ReactionSummary::from_counts(rows.into_iter().map(|r| (r.kind, r.count)))
    }
}
