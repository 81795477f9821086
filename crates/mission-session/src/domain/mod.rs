//! Domain model for mission sessions.

pub mod aggregates;
pub mod narrative;
