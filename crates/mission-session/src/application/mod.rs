//! Application services for mission sessions.

pub mod command_handlers;
pub mod query_handlers;
pub mod session_store;
