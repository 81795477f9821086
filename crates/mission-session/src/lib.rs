//! Mission session bounded context.
//!
//! Responsible for the shared session record of a community (damage pool,
//! clue counter, countermeasure pool, narrative) and for the community's
//! session history.

pub mod application;
pub mod domain;
