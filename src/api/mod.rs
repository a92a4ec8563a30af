//! Authorized fetch wrapper: base address, per-request timeout, typed
//! transport failures and failure-tolerant JSON parsing.

pub mod client;
pub mod error;
pub mod payload;

pub use client::{ApiClient, RequestOptions};
pub use error::{ApiError, FetchError};
pub use payload::{parse_json_safe, ApiPayload, PayloadStatus};
