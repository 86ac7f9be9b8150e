//! # dreamx-service
//!
//! Application layer containing business logic, services, and DTOs.

pub mod dto;
pub mod email;
pub mod services;

pub use services::{
    IncomingFile, ServiceContext, ServiceContextBuilder, ServiceError, ServiceResult, UPLOADS_PATH,
    WEBHOOK_PATH,
};
