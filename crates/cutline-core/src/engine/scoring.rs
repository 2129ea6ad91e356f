/// Most points a player can earn in a single round (first place).
pub const MAX_ROUND_POINTS: u32 = 8;

/// Points for a placement from the fixed 8-slot table: 1st earns 8 down
/// to 8th earning 1.
///
/// The table is fixed regardless of lobby size: a short-handed lobby
/// simply never awards its lowest slots, so first place in a 7-player
/// lobby is still worth 8. Placements outside the table earn nothing.
pub fn points_for_placement(placement: u8) -> u32 {
    match placement {
        1..=8 => u32::from(9 - placement),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::points_for_placement;

    #[test]
    fn table_awards_eight_down_to_one() {
        let awarded: Vec<u32> = (1..=8).map(points_for_placement).collect();
        assert_eq!(awarded, vec![8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn full_lobby_hands_out_thirty_six_points() {
        let total: u32 = (1..=8).map(points_for_placement).sum();
        assert_eq!(total, 36);
    }

    #[test]
    fn placements_outside_the_table_earn_nothing() {
        assert_eq!(points_for_placement(0), 0);
        assert_eq!(points_for_placement(9), 0);
    }
}
