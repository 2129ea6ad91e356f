use std::collections::{HashMap, HashSet};

use rand::Rng;
use rand::seq::SliceRandom;

use crate::engine::scoring::MAX_ROUND_POINTS;
use crate::engine::standings::rank;
use crate::model::format::{ShuffleKind, TourFormat};
use crate::model::player::{CUT_LOBBY, EliminatedAt, RoundEntry};
use crate::model::state::{RoundStatus, TourState};

/// Survivors and threshold of one executed cut.
#[derive(Debug, Clone)]
pub struct CutRecord {
    pub after_round: u32,
    pub cut_to: usize,
    /// Points at the survival boundary: the shared point total for a
    /// tiebreaker cut, or the half-integer midpoint for a clean cut.
    pub threshold: f64,
    pub survivors: HashSet<u32>,
}

impl CutRecord {
    /// A clean cut sits strictly between two distinct point totals, so
    /// its threshold always carries a .5 fraction.
    pub fn is_clean(&self) -> bool {
        self.threshold.fract() != 0.0
    }
}

/// Run the post-round pipeline for the just-completed round, in the
/// fixed order victory check, cut, end flag, advance, reseed, point
/// reset. Returns the cut record when a cut executed this round.
///
/// The ordering is load-bearing: the cut and the reseed must see the
/// standings as they were before any point reset, and a victory ends the
/// tournament before the cut can run.
pub fn process_post_round(
    state: &mut TourState,
    format: &TourFormat,
    rng: &mut impl Rng,
) -> Option<CutRecord> {
    let round = state.current_round.overall_round;
    let spec = format.round_spec(round);

    if spec.is_some_and(|s| s.check_victory) && victory_decided(state, format, round) {
        finish_tournament(state, format);
        return None;
    }

    let mut record = None;
    if let Some(cut_to) = format.cut_to_after(round) {
        record = apply_cut(state, cut_to, round);
    }

    if spec.is_some_and(|s| s.end_tournament) {
        finish_tournament(state, format);
        return record;
    }

    state.current_round.overall_round += 1;
    state.current_round.round_in_day += 1;
    state.current_round.status = if state.current_round.overall_round <= format.total_rounds {
        RoundStatus::NotStarted
    } else {
        RoundStatus::Completed
    };

    if state.current_round.overall_round <= format.total_rounds {
        let kind = spec.map_or(ShuffleKind::Random, |s| s.shuffle_kind());
        reseed_lobbies(state, format.lobby_size, kind, rng);
    }

    if spec.is_some_and(|s| s.point_reset) {
        apply_point_reset(state, round);
    }

    record
}

/// The outcome is decided when one player is left or the leader's lead
/// exceeds everything the runner-up could still earn.
fn victory_decided(state: &TourState, format: &TourFormat, round: u32) -> bool {
    if state.players.len() <= 1 {
        return true;
    }
    let ranked = rank(&state.players);
    let remaining_rounds = format.total_rounds.saturating_sub(round);
    ranked[0].points > ranked[1].points + MAX_ROUND_POINTS * remaining_rounds
}

fn finish_tournament(state: &mut TourState, format: &TourFormat) {
    state.current_round.overall_round = format.total_rounds + 1;
    state.current_round.status = RoundStatus::Completed;
}

fn apply_cut(state: &mut TourState, cut_to: usize, round: u32) -> Option<CutRecord> {
    if state.players.len() <= cut_to {
        return None;
    }

    let ranked = rank(&state.players);
    let survivors: HashSet<u32> = ranked[..cut_to].iter().map(|p| p.id).collect();
    let last_in = ranked[cut_to - 1].points;
    let first_out = ranked[cut_to].points;
    let threshold = if last_in == first_out {
        // Tie at the boundary: whoever survives did so on secondary
        // tiebreakers, so the threshold is the shared point total.
        f64::from(last_in)
    } else {
        f64::from(last_in + first_out) / 2.0
    };
    drop(ranked);

    let players = std::mem::take(&mut state.players);
    for mut player in players {
        if survivors.contains(&player.id) {
            state.players.push(player);
        } else {
            player.is_eliminated = true;
            player.eliminated_at = Some(EliminatedAt {
                overall_round: round + 1,
                reason: "cut".to_string(),
            });
            player.round_history.push(RoundEntry {
                overall_round: round + 1,
                day: None,
                round_in_day: None,
                lobby: CUT_LOBBY.to_string(),
                placement: None,
                points: None,
                no_show: false,
            });
            state.eliminated_players.push(player);
        }
    }

    Some(CutRecord {
        after_round: round,
        cut_to,
        threshold,
        survivors,
    })
}

/// Assign next-round lobbies to the survivors.
///
/// Skipped when any active player already holds an entry for the new
/// round: a mid-tournament state file carries the real seating, which
/// must never be overwritten.
fn reseed_lobbies(state: &mut TourState, lobby_size: usize, kind: ShuffleKind, rng: &mut impl Rng) {
    let new_round = state.current_round.overall_round;
    if state
        .players
        .iter()
        .any(|p| p.entry_for_round(new_round).is_some())
    {
        return;
    }

    let order: Vec<u32> = match kind {
        ShuffleKind::Random => {
            let mut ids: Vec<u32> = state.players.iter().map(|p| p.id).collect();
            ids.shuffle(rng);
            ids
        }
        ShuffleKind::Snake => rank(&state.players).iter().map(|p| p.id).collect(),
    };

    let mut lobby_of: HashMap<u32, String> = HashMap::with_capacity(order.len());
    match kind {
        ShuffleKind::Random => {
            for (lobby_idx, chunk) in order.chunks(lobby_size).enumerate() {
                let label = lobby_label(lobby_idx);
                for id in chunk {
                    lobby_of.insert(*id, label.clone());
                }
            }
        }
        ShuffleKind::Snake => {
            for (position, lobby_idx) in snake_lobby_indices(order.len(), lobby_size)
                .into_iter()
                .enumerate()
            {
                lobby_of.insert(order[position], lobby_label(lobby_idx));
            }
        }
    }

    let day = state.current_round.day;
    let round_in_day = state.current_round.round_in_day;
    for player in &mut state.players {
        let lobby = lobby_of
            .get(&player.id)
            .expect("every survivor was assigned a lobby")
            .clone();
        player.round_history.push(RoundEntry {
            overall_round: new_round,
            day: Some(day),
            round_in_day: Some(round_in_day),
            lobby,
            placement: None,
            points: None,
            no_show: false,
        });
    }
}

/// Snake distribution: rank position -> lobby index, filling the
/// ceil(n / lobby_size) lobbies in alternating forward and reverse
/// passes so skill balances out across lobbies.
fn snake_lobby_indices(count: usize, lobby_size: usize) -> Vec<usize> {
    let lobby_count = count.div_ceil(lobby_size);
    let mut assignment = Vec::with_capacity(count);
    let mut forward = true;
    while assignment.len() < count {
        if forward {
            for lobby in 0..lobby_count {
                if assignment.len() < count {
                    assignment.push(lobby);
                }
            }
        } else {
            for lobby in (0..lobby_count).rev() {
                if assignment.len() < count {
                    assignment.push(lobby);
                }
            }
        }
        forward = !forward;
    }
    assignment
}

/// Sequential base-26 lobby labels: A..Z, then AA, AB, and so on.
pub fn lobby_label(mut index: usize) -> String {
    let mut label = String::new();
    loop {
        let letter = char::from(b'A' + (index % 26) as u8);
        label.insert(0, letter);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    label
}

fn apply_point_reset(state: &mut TourState, round: u32) {
    for player in state
        .players
        .iter_mut()
        .chain(&mut state.eliminated_players)
    {
        player.points = 0;
        player.tiebreakers.reset_ordinals();
    }
    state.reset_after_round = round;
}
