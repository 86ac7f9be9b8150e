//! Conversation, member and message mappers

use dreamx_core::entities::{Conversation, ConversationKind, ConversationMember, MemberRole, Message};
use dreamx_core::value_objects::Snowflake;

use crate::models::{ConversationMemberModel, ConversationModel, MessageModel};

impl From<ConversationModel> for Conversation {
    fn from(model: ConversationModel) -> Self {
        Conversation {
            id: Snowflake::new(model.id),
            kind: ConversationKind::parse(&model.kind).unwrap_or(ConversationKind::Group),
            name: model.name,
            owner_id: model.owner_id.map(Snowflake::new),
            direct_key: model.direct_key,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<ConversationMemberModel> for ConversationMember {
    fn from(model: ConversationMemberModel) -> Self {
        ConversationMember {
            conversation_id: Snowflake::new(model.conversation_id),
            user_id: Snowflake::new(model.user_id),
            role: MemberRole::parse(&model.role).unwrap_or(MemberRole::Member),
            joined_at: model.joined_at,
            last_read_at: model.last_read_at,
        }
    }
}

impl From<MessageModel> for Message {
    fn from(model: MessageModel) -> Self {
        Message {
            id: Snowflake::new(model.id),
            conversation_id: Snowflake::new(model.conversation_id),
            sender_id: Snowflake::new(model.sender_id),
            content: model.content,
            attachment: model.attachment,
            created_at: model.created_at,
            edited_at: model.edited_at,
        }
    }
}
