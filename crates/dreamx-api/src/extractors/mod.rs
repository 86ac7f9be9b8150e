//! Axum extractors for request handling
//!
//! Custom extractors for authentication, validation, paths, query strings
//! and file uploads. Each one rejects with `ApiError`.

mod auth;
mod path;
mod query;
mod upload;
mod validated;

pub use auth::{AuthUser, OptionalAuthUser};
pub use path::SnowflakePath;
pub use query::QueryParams;
pub use upload::{FileUpload, FILE_FIELD};
pub use validated::{JsonBody, OptionalJson, OptionalValidatedJson, ValidatedJson};
