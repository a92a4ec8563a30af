//! Leave request operations on top of the session and the fetch wrapper.

pub mod allowances;
pub mod report;
pub mod service;
pub mod types;
pub mod validate;

pub use service::LeaveService;
pub use types::{CurrentUser, Leave, LeaveStatus, LeaveType};
