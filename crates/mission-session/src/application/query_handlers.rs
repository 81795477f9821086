//! Query handlers for mission sessions.
//!
//! Read-only view DTOs returned to the dispatch layer.

use chrono::{DateTime, Utc};
use mission_core::error::DomainError;
use serde::Serialize;

use crate::application::session_store::SessionStore;
use crate::domain::aggregates::Session;
use crate::domain::narrative::Narrative;

/// Read-only view of a session, including derived quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub id: u32,
    pub date_created: DateTime<Utc>,
    pub date_ended: Option<DateTime<Utc>>,
    pub running: bool,
    pub number_of_players: u32,
    pub total_health: i64,
    pub remaining_health: i64,
    pub damage_dealt: i64,
    pub clue_threshold: i64,
    pub clues_placed: i64,
    pub counter_measures: i64,
    pub narrative: Option<Narrative>,
    /// Display title of the narrative.
    pub narrative_title: Option<&'static str>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id(),
            date_created: session.date_created(),
            date_ended: session.date_ended(),
            running: session.is_running(),
            number_of_players: session.number_of_players(),
            total_health: session.total_health(),
            remaining_health: session.remaining_health(),
            damage_dealt: session.damage_dealt(),
            clue_threshold: session.clue_threshold(),
            clues_placed: session.clues_placed(),
            counter_measures: session.counter_measures(),
            narrative: session.narrative(),
            narrative_title: session.narrative().map(Narrative::title),
        }
    }
}

/// Returns every stored session of the store's community, oldest first.
///
/// # Errors
///
/// Returns a persistence error from the store.
pub async fn get_session_history(store: &SessionStore) -> Result<Vec<SessionView>, DomainError> {
    let mut sessions = store.list().await?;
    sessions.sort_by_key(|s| (s.date_created(), s.id()));
    Ok(sessions.iter().map(SessionView::from).collect())
}
