//! Mission orchestration facade.
//!
//! The single entry point the dispatch layer talks to. Every community gets
//! its own pair of async locks: one serializes session mutations
//! (read, modify, persist), the other serializes channel-group creation and
//! cleanup. Communities never wait on each other.

pub mod commands;
pub mod coordinator;
