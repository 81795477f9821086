//! Mission channel groups.
//!
//! Creates numbered text/voice channel pairs under a configured category,
//! fans broadcasts out to them and to the control channel, and tears them
//! down again when the event is over.

pub mod broadcast;
pub mod config;
pub mod registry;
