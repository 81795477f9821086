//! Shared test doubles for the mission orchestration engine.

mod clock;
mod platform;
mod repository;
mod rng;

pub use clock::{FixedClock, SteppingClock};
pub use platform::{RecordingPlatform, SentMessage};
pub use repository::{FailingResourceRepository, InMemoryResourceRepository};
pub use rng::{MockRng, SequenceRng};
