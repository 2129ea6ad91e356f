use std::cmp::Ordering;

use crate::model::player::Player;

/// Ranking comparison, best player first.
///
/// Key sequence: round-scoped points, lifetime points, firsts-plus-top4s,
/// then each ordinal count from firsts down to eighths, and finally
/// average placement ascending. Exact ties on every key compare equal;
/// the stable sort in [`rank`] then keeps the input order, which is the
/// documented residual ambiguity.
pub fn compare_standings(a: &Player, b: &Player) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.total_points.cmp(&a.total_points))
        .then_with(|| {
            b.tiebreakers
                .firsts_plus_top4s
                .cmp(&a.tiebreakers.firsts_plus_top4s)
        })
        .then_with(|| b.tiebreakers.firsts.cmp(&a.tiebreakers.firsts))
        .then_with(|| b.tiebreakers.seconds.cmp(&a.tiebreakers.seconds))
        .then_with(|| b.tiebreakers.thirds.cmp(&a.tiebreakers.thirds))
        .then_with(|| b.tiebreakers.fourths.cmp(&a.tiebreakers.fourths))
        .then_with(|| b.tiebreakers.fifths.cmp(&a.tiebreakers.fifths))
        .then_with(|| b.tiebreakers.sixths.cmp(&a.tiebreakers.sixths))
        .then_with(|| b.tiebreakers.sevenths.cmp(&a.tiebreakers.sevenths))
        .then_with(|| b.tiebreakers.eighths.cmp(&a.tiebreakers.eighths))
        .then_with(|| a.avg_placement.total_cmp(&b.avg_placement))
}

/// Total order over the given players, best first.
pub fn rank(players: &[Player]) -> Vec<&Player> {
    let mut ranked: Vec<&Player> = players.iter().collect();
    ranked.sort_by(|a, b| compare_standings(a, b));
    ranked
}
