//! Entity to model mappers
//!
//! `From<Model> for Entity` converts database rows to domain objects. Text
//! columns holding enums fall back to the enum default when a row carries a
//! value this build does not know.

mod billing;
mod credential;
mod marketplace;
mod messaging;
mod moderation;
mod notification;
mod post;
mod user;

pub(crate) fn json_text(value: &serde_json::Value) -> String {
    if value.is_null() {
        "{}".to_string()
    } else {
        value.to_string()
    }
}

pub(crate) fn parse_json(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap_or(serde_json::Value::Null)
}
