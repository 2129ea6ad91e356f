use std::collections::HashMap;

use cutline_core::engine::postround::CutRecord;
use cutline_core::engine::standings::{compare_standings, rank};
use cutline_core::model::format::TourFormat;
use cutline_core::model::player::Player;
use cutline_core::model::state::TourState;

use crate::settings::{Comparison, ProbabilityTarget, TargetKind};

/// Everything one simulated tournament produced: the terminal state plus
/// every cut executed along the way, keyed by the post-cut field size.
pub struct TrialOutcome {
    pub state: TourState,
    pub cuts: HashMap<usize, CutRecord>,
}

/// Order every player, eliminated included, into one final standing.
///
/// Active players come first in ranked order. Eliminated players follow,
/// later eliminations ahead of earlier ones, ties broken by the same
/// standings key.
pub fn final_standings(state: &TourState) -> Vec<&Player> {
    let mut standings = rank(&state.players);

    let mut eliminated: Vec<&Player> = state.eliminated_players.iter().collect();
    eliminated.sort_by(|a, b| {
        elimination_round(b)
            .cmp(&elimination_round(a))
            .then_with(|| compare_standings(a, b))
    });

    standings.extend(eliminated);
    standings
}

fn elimination_round(player: &Player) -> u32 {
    player
        .eliminated_at
        .as_ref()
        .map(|at| at.overall_round)
        .unwrap_or(0)
}

/// Decide, for every player, whether this outcome satisfies the target.
pub fn evaluate_target(
    target: &ProbabilityTarget,
    outcome: &TrialOutcome,
) -> HashMap<u32, bool> {
    let standings = final_standings(&outcome.state);

    match target.kind {
        TargetKind::TournamentWinner => standings
            .iter()
            .enumerate()
            .map(|(index, player)| (player.id, index == 0))
            .collect(),
        TargetKind::OverallStanding => {
            let threshold = target.threshold.unwrap_or(1);
            standings
                .iter()
                .enumerate()
                .map(|(index, player)| {
                    (player.id, rank_matches(index + 1, target.comparison, threshold))
                })
                .collect()
        }
        TargetKind::MadeCut => {
            let remaining = target.players_remaining.unwrap_or(0);
            if let Some(record) = outcome.cuts.get(&remaining) {
                standings
                    .iter()
                    .map(|player| (player.id, record.survivors.contains(&player.id)))
                    .collect()
            } else {
                // The cut never fired in this trial (the tournament ended
                // first), so fall back to the final standing boundary.
                standings
                    .iter()
                    .enumerate()
                    .map(|(index, player)| (player.id, index < remaining))
                    .collect()
            }
        }
    }
}

fn rank_matches(rank: usize, comparison: Comparison, threshold: usize) -> bool {
    match comparison {
        Comparison::At => rank == threshold,
        Comparison::Above => rank < threshold,
        Comparison::Below => rank > threshold,
        Comparison::AtOrAbove => rank <= threshold,
        Comparison::AtOrBelow => rank >= threshold,
    }
}

/// Resolve a made_cut target that already happened before the baseline
/// state. Returns `None` when the cut is still in the future (or is not
/// configured at all), meaning it must be simulated instead.
pub fn resolved_past_cut(
    baseline: &TourState,
    format: &TourFormat,
    players_remaining: usize,
) -> Option<HashMap<u32, bool>> {
    let rule = format
        .configured_cuts()
        .into_iter()
        .find(|rule| rule.players_remaining == players_remaining)?;
    if rule.after_round >= baseline.current_round.overall_round {
        return None;
    }

    // A cut after round R stamps eliminations with round R+1, so surviving
    // it means still active or eliminated strictly later than that.
    let mut results = HashMap::new();
    for player in &baseline.players {
        results.insert(player.id, true);
    }
    for player in &baseline.eliminated_players {
        results.insert(player.id, elimination_round(player) > rule.after_round + 1);
    }
    Some(results)
}
