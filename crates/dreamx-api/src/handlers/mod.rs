//! HTTP request handlers
//!
//! Handlers are thin: extract, call one service method, wrap the result.

pub mod admin;
pub mod auth;
pub mod billing;
pub mod conversations;
pub mod health;
pub mod marketplace;
pub mod messages;
pub mod moderation;
pub mod notifications;
pub mod oauth;
pub mod posts;
pub mod reactions;
pub mod users;
pub mod webauthn;
