//! Command handlers for mission sessions.
//!
//! Each handler works on a copy of the current session and persists it
//! before returning, so the caller only publishes state that reached the
//! store.

use std::sync::Mutex;

use mission_core::clock::Clock;
use mission_core::error::DomainError;
use mission_core::rng::DeterministicRng;
use tracing::info;

use crate::application::session_store::SessionStore;
use crate::domain::aggregates::Session;

/// A counter change applied to a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMutation {
    /// Add damage to the creature.
    DealDamage(u32),
    /// Place clues on the first act.
    PlaceClues(u32),
    /// Add countermeasures to the pool.
    GainCounterMeasures(u32),
    /// Remove countermeasures from the pool.
    SpendCounterMeasures(u32),
}

impl SessionMutation {
    fn apply(self, session: &mut Session) {
        match self {
            Self::DealDamage(amount) => session.deal_damage(amount),
            Self::PlaceClues(amount) => session.place_clues(amount),
            Self::GainCounterMeasures(amount) => session.gain_counter_measures(amount),
            Self::SpendCounterMeasures(amount) => session.spend_counter_measures(amount),
        }
    }

    /// Name used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::DealDamage(_) => "deal_damage",
            Self::PlaceClues(_) => "place_clues",
            Self::GainCounterMeasures(_) => "gain_counter_measures",
            Self::SpendCounterMeasures(_) => "spend_counter_measures",
        }
    }
}

/// Starts a new session: assigns the next id, picks a narrative, appends
/// the record to the store.
///
/// The `Mutex` is locked only around the synchronous domain call so the
/// guard is never held across an await point.
///
/// # Errors
///
/// Returns `DomainError::InvalidArgument` for a zero player count, or a
/// persistence error from the store.
pub async fn handle_start_session(
    players: u32,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    store: &SessionStore,
) -> Result<Session, DomainError> {
    let id = store.next_id().await?;
    let session = {
        let mut rng_guard = rng
            .lock()
            .map_err(|e| DomainError::Persistence(format!("RNG mutex poisoned: {e}")))?;
        Session::start(id, players, clock, &mut *rng_guard)?
    };
    store.append(&session).await?;

    info!(
        community = %store.community(),
        session_id = session.id(),
        players,
        narrative = ?session.narrative(),
        "session started"
    );
    Ok(session)
}

/// Loads the most recent running session, if any.
///
/// # Errors
///
/// Returns a persistence error from the store.
pub async fn handle_continue_latest(store: &SessionStore) -> Result<Option<Session>, DomainError> {
    let latest = store.latest_running().await?;
    match &latest {
        Some(session) => info!(
            community = %store.community(),
            session_id = session.id(),
            "session resumed"
        ),
        None => info!(community = %store.community(), "no running session to resume"),
    }
    Ok(latest)
}

/// Ends `current` and persists it.
///
/// # Errors
///
/// Returns `DomainError::InvalidArgument` if the session already ended, or
/// a persistence error from the store.
pub async fn handle_end_session(
    current: &Session,
    clock: &dyn Clock,
    store: &SessionStore,
) -> Result<Session, DomainError> {
    let mut ended = current.clone();
    ended.end(clock)?;
    store.save(&ended).await?;

    info!(community = %store.community(), session_id = ended.id(), "session ended");
    Ok(ended)
}

/// Sets the narrative of a session that has none yet and persists it.
///
/// # Errors
///
/// Returns `DomainError::InvalidArgument` for an unknown narrative or if
/// one is already set, or a persistence error from the store.
pub async fn handle_choose_narrative(
    current: &Session,
    value: &str,
    store: &SessionStore,
) -> Result<Session, DomainError> {
    let mut next = current.clone();
    let narrative = next.choose_narrative(value)?;
    store.save(&next).await?;

    info!(community = %store.community(), session_id = next.id(), %narrative, "narrative chosen");
    Ok(next)
}

/// Applies `mutation` to a copy of `current` and persists it.
///
/// # Errors
///
/// Returns a persistence error from the store; `current` is untouched in
/// that case.
pub async fn handle_mutation(
    current: &Session,
    mutation: SessionMutation,
    store: &SessionStore,
) -> Result<Session, DomainError> {
    let mut next = current.clone();
    mutation.apply(&mut next);
    store.save(&next).await?;

    info!(
        community = %store.community(),
        session_id = next.id(),
        mutation = mutation.name(),
        damage_dealt = next.damage_dealt(),
        clues_placed = next.clues_placed(),
        counter_measures = next.counter_measures(),
        "session updated"
    );
    Ok(next)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use mission_core::error::DomainError;
    use mission_core::ids::CommunityId;
    use mission_core::rng::DeterministicRng;
    use mission_test_support::{
        FixedClock, InMemoryResourceRepository, MockRng, SequenceRng, SteppingClock,
    };

    use super::*;
    use crate::domain::narrative::Narrative;

    const COMMUNITY: CommunityId = CommunityId(5);

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn mock_rng() -> Mutex<MockRng> {
        Mutex::new(MockRng)
    }

    #[tokio::test]
    async fn test_handle_start_session_persists_new_record() {
        // Arrange
        let repo = Arc::new(InMemoryResourceRepository::new());
        let store = SessionStore::new(COMMUNITY, repo.clone());
        let rng: Mutex<SequenceRng> = Mutex::new(SequenceRng::new(vec![3]));
        let rng_ref: &Mutex<dyn DeterministicRng + Send> = &rng;

        // Act
        let session = handle_start_session(4, &fixed_clock(), rng_ref, &store)
            .await
            .unwrap();

        // Assert
        assert_eq!(session.id(), 1);
        assert_eq!(session.narrative(), Some(Narrative::DarkHunger));
        assert_eq!(store.list().await.unwrap(), vec![session]);
        assert_eq!(repo.write_count(), 1);
    }

    #[tokio::test]
    async fn test_handle_start_session_rejects_zero_players_without_writing() {
        let repo = Arc::new(InMemoryResourceRepository::new());
        let store = SessionStore::new(COMMUNITY, repo.clone());
        let rng = mock_rng();

        let result = handle_start_session(0, &fixed_clock(), &rng, &store).await;

        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));
        assert_eq!(repo.write_count(), 0);
    }

    #[tokio::test]
    async fn test_continue_after_end_and_restart_returns_newest() {
        // Arrange
        let store = SessionStore::new(COMMUNITY, Arc::new(InMemoryResourceRepository::new()));
        let clock = SteppingClock::new(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            Duration::minutes(1),
        );
        let rng = mock_rng();
        let a = handle_start_session(2, &clock, &rng, &store).await.unwrap();
        handle_end_session(&a, &clock, &store).await.unwrap();
        let b = handle_start_session(3, &clock, &rng, &store).await.unwrap();

        // Act
        let resumed = handle_continue_latest(&store).await.unwrap();

        // Assert
        assert_eq!(resumed, Some(b.clone()));

        handle_end_session(&b, &clock, &store).await.unwrap();
        assert_eq!(handle_continue_latest(&store).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_handle_mutation_persists_updated_counters() {
        // Arrange
        let store = SessionStore::new(COMMUNITY, Arc::new(InMemoryResourceRepository::new()));
        let rng = mock_rng();
        let session = handle_start_session(2, &fixed_clock(), &rng, &store)
            .await
            .unwrap();

        // Act
        let session = handle_mutation(&session, SessionMutation::DealDamage(7), &store)
            .await
            .unwrap();
        let session = handle_mutation(&session, SessionMutation::PlaceClues(2), &store)
            .await
            .unwrap();
        let session = handle_mutation(&session, SessionMutation::SpendCounterMeasures(1), &store)
            .await
            .unwrap();
        let session = handle_mutation(&session, SessionMutation::GainCounterMeasures(4), &store)
            .await
            .unwrap();

        // Assert
        let stored = store.latest_running().await.unwrap().unwrap();
        assert_eq!(stored, session);
        assert_eq!(stored.damage_dealt(), 7);
        assert_eq!(stored.clues_placed(), 2);
        assert_eq!(stored.counter_measures(), 4);
    }

    #[tokio::test]
    async fn test_handle_mutation_leaves_input_untouched_on_write_failure() {
        // Arrange
        let repo = Arc::new(InMemoryResourceRepository::new());
        let store = SessionStore::new(COMMUNITY, repo.clone());
        let rng = mock_rng();
        let session = handle_start_session(2, &fixed_clock(), &rng, &store)
            .await
            .unwrap();
        repo.fail_writes(true);

        // Act
        let result = handle_mutation(&session, SessionMutation::DealDamage(3), &store).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Persistence(_))));
        assert_eq!(session.damage_dealt(), 0);
        assert_eq!(store.list().await.unwrap()[0].damage_dealt(), 0);
    }

    #[tokio::test]
    async fn test_handle_choose_narrative_on_session_without_one() {
        // Arrange
        let store = SessionStore::new(COMMUNITY, Arc::new(InMemoryResourceRepository::new()));
        let session = Session::new(1, 2, &fixed_clock()).unwrap();
        store.append(&session).await.unwrap();

        // Act
        let chosen = handle_choose_narrative(&session, "cyclopean-spires", &store)
            .await
            .unwrap();
        let again = handle_choose_narrative(&chosen, "dark-hunger", &store).await;

        // Assert
        assert_eq!(chosen.narrative(), Some(Narrative::CyclopeanSpires));
        assert_eq!(store.list().await.unwrap(), vec![chosen]);
        assert!(matches!(again, Err(DomainError::InvalidArgument(_))));
    }
}
