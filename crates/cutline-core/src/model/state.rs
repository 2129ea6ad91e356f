use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::player::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentRound {
    pub overall_round: u32,
    pub day: u32,
    pub round_in_day: u32,
    pub status: RoundStatus,
}

/// Tournament state document: the round pointer plus the active and
/// eliminated player lists. A player lives in exactly one of the lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourState {
    pub current_round: CurrentRound,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub eliminated_players: Vec<Player>,
    /// Round after which the most recent point reset ran; round-scoped
    /// scoring only counts entries past this watermark.
    #[serde(default)]
    pub reset_after_round: u32,
}

impl TourState {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| StateError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let state: TourState =
            serde_json::from_reader(reader).map_err(|source| StateError::Parse {
                source,
                path: path_buf,
            })?;
        state.validate()?;
        Ok(state)
    }

    pub fn validate(&self) -> Result<(), StateError> {
        if self.current_round.overall_round == 0 {
            return Err(StateError::Invalid {
                message: "current_round.overall_round must be at least 1".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for player in self.players.iter().chain(&self.eliminated_players) {
            if !seen.insert(player.id) {
                return Err(StateError::Invalid {
                    message: format!(
                        "player id {} appears in more than one list entry",
                        player.id
                    ),
                });
            }
        }
        for player in &self.players {
            if player.is_eliminated {
                return Err(StateError::Invalid {
                    message: format!("active player '{}' is flagged eliminated", player.name),
                });
            }
        }
        for player in &self.eliminated_players {
            if !player.is_eliminated {
                return Err(StateError::Invalid {
                    message: format!(
                        "eliminated player '{}' is not flagged eliminated",
                        player.name
                    ),
                });
            }
        }

        Ok(())
    }

    /// Owned deep copy for one simulation trial. Trials mutate only their
    /// snapshot, which keeps them fully independent of the baseline and of
    /// each other.
    pub fn snapshot(&self) -> TourState {
        self.clone()
    }

    pub fn all_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().chain(&self.eliminated_players)
    }

    pub fn player_count(&self) -> usize {
        self.players.len() + self.eliminated_players.len()
    }
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse state {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("invalid tournament state: {message}")]
    Invalid { message: String },
}

#[cfg(test)]
mod tests {
    use super::{CurrentRound, RoundStatus, TourState};
    use crate::model::player::{EliminatedAt, Player, Tiebreakers};

    fn bare_player(id: u32, name: &str) -> Player {
        Player {
            id,
            name: name.to_string(),
            points: 0,
            total_points: 0,
            avg_placement: 0.0,
            completed_rounds: 0,
            round_history: Vec::new(),
            tiebreakers: Tiebreakers::default(),
            is_eliminated: false,
            eliminated_at: None,
        }
    }

    fn basic_state() -> TourState {
        TourState {
            current_round: CurrentRound {
                overall_round: 1,
                day: 1,
                round_in_day: 1,
                status: RoundStatus::NotStarted,
            },
            players: vec![bare_player(1, "alpha"), bare_player(2, "beta")],
            eliminated_players: Vec::new(),
            reset_after_round: 0,
        }
    }

    #[test]
    fn basic_state_validates() {
        basic_state().validate().expect("valid state");
    }

    #[test]
    fn rejects_player_in_both_lists() {
        let mut state = basic_state();
        let mut duplicate = bare_player(1, "alpha");
        duplicate.is_eliminated = true;
        duplicate.eliminated_at = Some(EliminatedAt {
            overall_round: 1,
            reason: "cut".to_string(),
        });
        state.eliminated_players.push(duplicate);

        let err = state.validate().expect_err("duplicate id should fail");
        assert!(err.to_string().contains("more than one list"));
    }

    #[test]
    fn rejects_inconsistent_elimination_flag() {
        let mut state = basic_state();
        state.eliminated_players.push(bare_player(3, "gamma"));
        let err = state.validate().expect_err("flag mismatch should fail");
        assert!(err.to_string().contains("not flagged eliminated"));
    }

    #[test]
    fn snapshot_is_a_deep_independent_copy() {
        let state = basic_state();
        let mut copy = state.snapshot();
        copy.players[0].points = 40;
        copy.current_round.status = RoundStatus::Completed;

        assert_eq!(state.players[0].points, 0);
        assert_eq!(state.current_round.status, RoundStatus::NotStarted);
    }

    #[test]
    fn state_document_round_trips_through_json() {
        let state = basic_state();
        let json = serde_json::to_string(&state).expect("serialize state");
        let restored: TourState = serde_json::from_str(&json).expect("deserialize state");
        assert_eq!(restored, state);
    }
}
