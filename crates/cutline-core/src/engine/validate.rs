use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::model::state::TourState;

/// Placements are stored as `u8`, so a lobby can never hold more seats
/// than that.
pub const MAX_LOBBY_ENTRIES: usize = u8::MAX as usize;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("round {round} lobby {lobby}: {members} players exceeds the lobby limit of 255")]
    OversizeLobby {
        round: u32,
        lobby: String,
        members: usize,
    },
    #[error("round {round} lobby {lobby}: placement {placement} recorded twice")]
    DuplicatePlacement {
        round: u32,
        lobby: String,
        placement: u8,
    },
    #[error("round {round} lobby {lobby}: placement {placement} outside 1..={active_count}")]
    PlacementOutOfRange {
        round: u32,
        lobby: String,
        placement: u8,
        active_count: usize,
    },
    #[error(
        "round {round} lobby {lobby}: {placed} of {active_count} active players placed in a finished round"
    )]
    IncompleteRound {
        round: u32,
        lobby: String,
        placed: usize,
        active_count: usize,
    },
}

#[derive(Default)]
struct LobbyTally {
    total: usize,
    no_shows: usize,
    placements: Vec<u8>,
}

/// Validate recorded round history before any simulation runs.
///
/// Every lobby's completed placements must be distinct and within
/// 1..=active_count (lobby size minus no-shows). Rounds before the
/// current one are finished play, so there they must form the full
/// permutation; the current round may be partially placed. Lobbies with
/// more than [`MAX_LOBBY_ENTRIES`] members are rejected outright.
pub fn validate_round_history(state: &TourState) -> Result<(), HistoryError> {
    let current_round = state.current_round.overall_round;

    let mut lobbies: BTreeMap<(u32, String), LobbyTally> = BTreeMap::new();
    for player in state.all_players() {
        for entry in &player.round_history {
            if entry.is_cut_marker() {
                continue;
            }
            let tally = lobbies
                .entry((entry.overall_round, entry.lobby.clone()))
                .or_default();
            tally.total += 1;
            if entry.no_show {
                tally.no_shows += 1;
            } else if let Some(placement) = entry.placement {
                tally.placements.push(placement);
            }
        }
    }

    for ((round, lobby), tally) in lobbies {
        if tally.total > MAX_LOBBY_ENTRIES {
            return Err(HistoryError::OversizeLobby {
                round,
                lobby,
                members: tally.total,
            });
        }
        let active_count = tally.total - tally.no_shows;
        let mut seen = HashSet::new();
        for placement in &tally.placements {
            let placement = *placement;
            if placement == 0 || usize::from(placement) > active_count {
                return Err(HistoryError::PlacementOutOfRange {
                    round,
                    lobby,
                    placement,
                    active_count,
                });
            }
            if !seen.insert(placement) {
                return Err(HistoryError::DuplicatePlacement {
                    round,
                    lobby,
                    placement,
                });
            }
        }
        if round < current_round && tally.placements.len() != active_count {
            return Err(HistoryError::IncompleteRound {
                round,
                lobby,
                placed: tally.placements.len(),
                active_count,
            });
        }
    }

    Ok(())
}
