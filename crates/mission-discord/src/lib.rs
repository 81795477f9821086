//! Discord implementation of the messaging platform.

pub mod client;
pub mod model;

pub use client::DiscordPlatform;
