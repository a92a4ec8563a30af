//! # Leave Client Library
//!
//! Resolves the caller's credential from an ordered chain of sources,
//! issues authorized requests against the leave backend and computes
//! client-side reports.
//!
//! Modules:
//! - `config` - service configuration, loading and validation
//! - `cache` - credential value and the memoizing session
//! - `sources` - host bridge, static, stored and page address sources
//! - `parser` - display-only JWT claim decoding
//! - `api` - fetch wrapper with timeout and safe payload parsing
//! - `leaves` - leave API operations, validation and reports
//! - `store` - key-value persistence

pub mod api;
pub mod cache;
pub mod config;
pub mod leaves;
pub mod observability;
pub mod parser;
pub mod sources;
pub mod store;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::api::{parse_json_safe, ApiClient, ApiError, ApiPayload, FetchError, RequestOptions};
pub use crate::cache::credential::Credential;
pub use crate::cache::session::{CredentialError, Session};
pub use crate::config::settings::ServiceConfig;
pub use crate::leaves::LeaveService;
pub use crate::parser::claims::email_from_jwt;
