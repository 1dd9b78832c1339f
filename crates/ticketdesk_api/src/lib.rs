//! Typed client for the hosted ticket table and the user directory.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod rate_limiter;

pub use client::{ApiClient, ListRequest, TicketPage};
pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use models::{
    extract_continuation_token, fields, DirectoryUser, PageCursor, TicketPayload, TicketRecord,
    UserProfile,
};
