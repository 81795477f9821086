//! Mission Core: shared domain abstractions.
//!
//! This crate defines the identifiers, traits and error types that every
//! other crate in the workspace depends on. It contains no infrastructure
//! code: persistence and the messaging platform are reached only through the
//! [`repository::ResourceRepository`] and [`platform::MessagingPlatform`]
//! seams.

pub mod clock;
pub mod command;
pub mod error;
pub mod ids;
pub mod platform;
pub mod repository;
pub mod rng;
