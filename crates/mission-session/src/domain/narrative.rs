//! The closed set of mission narratives.

use std::fmt;
use std::str::FromStr;

use mission_core::error::DomainError;
use mission_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};

/// One of the four scenario narratives a session can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Narrative {
    /// Fungi from beyond arrive to harvest the creature.
    MiGoIncursion,
    /// The creature absorbs everything it touches.
    Amalgamation,
    /// Alien spires rise around the city.
    CyclopeanSpires,
    /// The creature's appetite grows without end.
    DarkHunger,
}

impl Narrative {
    /// Every narrative, in table order.
    pub const ALL: [Self; 4] = [
        Self::MiGoIncursion,
        Self::Amalgamation,
        Self::CyclopeanSpires,
        Self::DarkHunger,
    ];

    /// Picks a narrative uniformly at random.
    pub fn random(rng: &mut dyn DeterministicRng) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let last = (Self::ALL.len() - 1) as u32;
        let index = rng.next_u32_range(0, last) as usize;
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    /// The stable code used in persisted records and command arguments.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::MiGoIncursion => "mi-go-incursion",
            Self::Amalgamation => "amalgamation",
            Self::CyclopeanSpires => "cyclopean-spires",
            Self::DarkHunger => "dark-hunger",
        }
    }

    /// Human-readable title.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::MiGoIncursion => "Mi-Go Incursion",
            Self::Amalgamation => "Amalgamation",
            Self::CyclopeanSpires => "Cyclopean Spires",
            Self::DarkHunger => "Dark Hunger",
        }
    }
}

impl fmt::Display for Narrative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Narrative {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|n| n.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::InvalidArgument(format!("unknown narrative '{wanted}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission_test_support::SequenceRng;

    #[test]
    fn test_from_str_accepts_every_code() {
        for narrative in Narrative::ALL {
            assert_eq!(narrative.code().parse::<Narrative>().unwrap(), narrative);
        }
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!(
            "Dark-Hunger".parse::<Narrative>().unwrap(),
            Narrative::DarkHunger
        );
    }

    #[test]
    fn test_from_str_rejects_unknown_code() {
        match "the-blob-wins".parse::<Narrative>() {
            Err(DomainError::InvalidArgument(msg)) => assert!(msg.contains("the-blob-wins")),
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn test_random_maps_rng_output_onto_table() {
        let mut rng = SequenceRng::new(vec![0, 1, 2, 3]);

        let picked: Vec<Narrative> = (0..4).map(|_| Narrative::random(&mut rng)).collect();

        assert_eq!(picked, Narrative::ALL.to_vec());
    }

    #[test]
    fn test_serialized_form_matches_code() {
        for narrative in Narrative::ALL {
            let json = serde_json::to_value(narrative).unwrap();
            assert_eq!(json, narrative.code());
        }
    }
}
