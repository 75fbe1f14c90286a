//! Google Sheets back-end

pub mod auth;
pub mod client;
pub mod retry;

pub use auth::{TOKEN_ENV_VAR, resolve_token};
pub use client::GoogleSheetsStore;
pub use retry::RetryConfig;
