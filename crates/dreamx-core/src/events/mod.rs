//! Domain events

mod domain_event;

pub use domain_event::{
    ConversationUpdatedEvent, DomainEvent, MessageCreatedEvent, MessageDeletedEvent,
    MessageReactionUpdatedEvent, MessageUpdatedEvent, NotificationCreatedEvent,
};
