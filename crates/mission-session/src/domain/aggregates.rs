//! Aggregate root for a mission session.

use chrono::{DateTime, Utc};
use mission_core::clock::Clock;
use mission_core::error::DomainError;
use mission_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};

use super::narrative::Narrative;

/// Health the creature gains per player.
pub const HEALTH_PER_PLAYER: i64 = 15;

/// Clues required on the first act per player.
pub const CLUES_PER_PLAYER: i64 = 15;

/// The shared state of one mission session.
///
/// Counter mutations never clamp. Callers validate amounts (and affordability
/// of countermeasure spends) before mutating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: u32,
    date_created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_ended: Option<DateTime<Utc>>,
    number_of_players: u32,
    damage_dealt: i64,
    clues_placed: i64,
    counter_measures: i64,
    #[serde(default)]
    narrative: Option<Narrative>,
}

impl Session {
    /// Creates a running session with no narrative chosen.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` if `players` is zero.
    pub fn new(id: u32, players: u32, clock: &dyn Clock) -> Result<Self, DomainError> {
        if players == 0 {
            return Err(DomainError::InvalidArgument(
                "a session needs at least one player".into(),
            ));
        }
        Ok(Self {
            id,
            date_created: clock.now(),
            date_ended: None,
            number_of_players: players,
            damage_dealt: 0,
            clues_placed: 0,
            counter_measures: i64::from(players.div_ceil(2)),
            narrative: None,
        })
    }

    /// Creates a running session and picks its narrative at random.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` if `players` is zero.
    pub fn start(
        id: u32,
        players: u32,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Self, DomainError> {
        let mut session = Self::new(id, players, clock)?;
        session.narrative = Some(Narrative::random(rng));
        Ok(session)
    }

    /// Chooses the narrative by code.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` if `value` is not a known
    /// narrative or a narrative has already been chosen. The session is left
    /// unchanged in both cases.
    pub fn choose_narrative(&mut self, value: &str) -> Result<Narrative, DomainError> {
        let narrative: Narrative = value.parse()?;
        if let Some(current) = self.narrative {
            return Err(DomainError::InvalidArgument(format!(
                "session {} already runs the {current} narrative",
                self.id
            )));
        }
        self.narrative = Some(narrative);
        Ok(narrative)
    }

    /// Stamps the end time.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` if the session already ended.
    pub fn end(&mut self, clock: &dyn Clock) -> Result<(), DomainError> {
        if self.date_ended.is_some() {
            return Err(DomainError::InvalidArgument(format!(
                "session {} has already ended",
                self.id
            )));
        }
        self.date_ended = Some(clock.now());
        Ok(())
    }

    /// Adds damage to the creature.
    pub fn deal_damage(&mut self, amount: u32) {
        self.damage_dealt += i64::from(amount);
    }

    /// Places clues on the first act.
    pub fn place_clues(&mut self, amount: u32) {
        self.clues_placed += i64::from(amount);
    }

    /// Adds countermeasures to the shared pool.
    pub fn gain_counter_measures(&mut self, amount: u32) {
        self.counter_measures += i64::from(amount);
    }

    /// Removes countermeasures from the shared pool.
    pub fn spend_counter_measures(&mut self, amount: u32) {
        self.counter_measures -= i64::from(amount);
    }

    /// Returns `true` if the pool holds at least `amount` countermeasures.
    #[must_use]
    pub fn can_spend_counter_measures(&self, amount: u32) -> bool {
        i64::from(amount) <= self.counter_measures
    }

    /// Session identifier, unique within the community.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// When the session started.
    #[must_use]
    pub fn date_created(&self) -> DateTime<Utc> {
        self.date_created
    }

    /// When the session ended, if it has.
    #[must_use]
    pub fn date_ended(&self) -> Option<DateTime<Utc>> {
        self.date_ended
    }

    /// `true` until the session is ended.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.date_ended.is_none()
    }

    #[must_use]
    pub fn number_of_players(&self) -> u32 {
        self.number_of_players
    }

    #[must_use]
    pub fn total_health(&self) -> i64 {
        i64::from(self.number_of_players) * HEALTH_PER_PLAYER
    }

    /// Total health minus damage dealt. Negative once the creature is
    /// overkilled.
    #[must_use]
    pub fn remaining_health(&self) -> i64 {
        self.total_health() - self.damage_dealt
    }

    #[must_use]
    pub fn clue_threshold(&self) -> i64 {
        i64::from(self.number_of_players) * CLUES_PER_PLAYER
    }

    #[must_use]
    pub fn damage_dealt(&self) -> i64 {
        self.damage_dealt
    }

    #[must_use]
    pub fn clues_placed(&self) -> i64 {
        self.clues_placed
    }

    #[must_use]
    pub fn counter_measures(&self) -> i64 {
        self.counter_measures
    }

    #[must_use]
    pub fn narrative(&self) -> Option<Narrative> {
        self.narrative
    }
}
