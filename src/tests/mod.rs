mod common;
mod leave_api;
