use std::collections::{BTreeMap, HashSet};

use rand::Rng;
use rand::seq::SliceRandom;

use crate::engine::scoring::points_for_placement;
use crate::model::state::{RoundStatus, TourState};

/// Resolve every unplaced lobby slot of the current round.
///
/// Per lobby: no-shows are forced to zero points with no placement,
/// entries that already carry a placement are left untouched (an
/// in-progress round keeps its recorded results), and the remaining open
/// placements 1..=active_count are dealt out as a uniform-random
/// bijection over the unplaced players. Afterwards every active player's
/// derived stats are rebuilt from their history and the round is marked
/// completed. The round pointer itself is not advanced here.
pub fn simulate_round(state: &mut TourState, rng: &mut impl Rng) {
    let round = state.current_round.overall_round;
    let reset_watermark = state.reset_after_round;

    // Lobby label -> indices into state.players. BTreeMap keeps lobby
    // resolution order deterministic for a given RNG stream.
    let mut lobbies: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, player) in state.players.iter().enumerate() {
        if let Some(entry) = player.entry_for_round(round)
            && !entry.is_cut_marker()
        {
            lobbies.entry(entry.lobby.clone()).or_default().push(idx);
        }
    }

    for (lobby, members) in &lobbies {
        let mut taken: HashSet<u8> = HashSet::new();
        let mut unplaced: Vec<usize> = Vec::new();
        let mut no_shows = 0usize;

        for &idx in members {
            let entry = state.players[idx]
                .entry_for_round_mut(round)
                .expect("lobby member has an entry for the current round");
            if entry.no_show {
                entry.placement = None;
                entry.points = Some(0);
                no_shows += 1;
            } else if let Some(placement) = entry.placement {
                taken.insert(placement);
            } else {
                unplaced.push(idx);
            }
        }

        let active_count = members.len() - no_shows;
        let mut open: Vec<u8> = (1..=active_count as u8)
            .filter(|placement| !taken.contains(placement))
            .collect();
        assert_eq!(
            open.len(),
            unplaced.len(),
            "open placements in round {round} lobby {lobby} out of sync with unplaced players"
        );

        open.shuffle(rng);
        for (placement, idx) in open.into_iter().zip(unplaced) {
            let entry = state.players[idx]
                .entry_for_round_mut(round)
                .expect("lobby member has an entry for the current round");
            entry.placement = Some(placement);
            entry.points = Some(points_for_placement(placement));
        }
    }

    for player in &mut state.players {
        player.recompute_stats(reset_watermark);
    }
    state.current_round.status = RoundStatus::Completed;
}
