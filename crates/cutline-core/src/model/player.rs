use serde::{Deserialize, Serialize};

/// Round-history entry recorded by a player lobby label. The synthetic
/// `CUT_LOBBY` label marks the terminal entry written when a player is
/// eliminated by a cut.
pub const CUT_LOBBY: &str = "cut";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundEntry {
    pub overall_round: u32,
    #[serde(default)]
    pub day: Option<u32>,
    #[serde(default)]
    pub round_in_day: Option<u32>,
    pub lobby: String,
    #[serde(default)]
    pub placement: Option<u8>,
    #[serde(default)]
    pub points: Option<u32>,
    #[serde(default)]
    pub no_show: bool,
}

impl RoundEntry {
    /// An entry counts toward round-scoped and lifetime scoring once it
    /// carries both a placement and the points awarded for it.
    pub fn is_scored(&self) -> bool {
        self.placement.is_some() && self.points.is_some()
    }

    pub fn is_cut_marker(&self) -> bool {
        self.lobby == CUT_LOBBY
    }
}

/// Ordinal placement counts used as ranking tiebreakers.
///
/// `firsts_plus_top4s` counts firsts twice (once as a first, once as part
/// of a top-4) and `total_points` mirrors the player's lifetime points so
/// the whole snapshot can be emitted at the JSON boundary as one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tiebreakers {
    #[serde(default)]
    pub firsts: u32,
    #[serde(default)]
    pub seconds: u32,
    #[serde(default)]
    pub thirds: u32,
    #[serde(default)]
    pub fourths: u32,
    #[serde(default)]
    pub fifths: u32,
    #[serde(default)]
    pub sixths: u32,
    #[serde(default)]
    pub sevenths: u32,
    #[serde(default)]
    pub eighths: u32,
    #[serde(default)]
    pub top4s: u32,
    #[serde(default)]
    pub firsts_plus_top4s: u32,
    #[serde(default)]
    pub total_points: u32,
}

impl Tiebreakers {
    pub fn record_placement(&mut self, placement: u8) {
        match placement {
            1 => self.firsts += 1,
            2 => self.seconds += 1,
            3 => self.thirds += 1,
            4 => self.fourths += 1,
            5 => self.fifths += 1,
            6 => self.sixths += 1,
            7 => self.sevenths += 1,
            8 => self.eighths += 1,
            _ => {}
        }
        if placement <= 4 {
            self.top4s += 1;
        }
        self.firsts_plus_top4s = self.firsts + self.top4s;
    }

    /// Zero every ordinal count while leaving the lifetime mirror intact.
    pub fn reset_ordinals(&mut self) {
        let total_points = self.total_points;
        *self = Tiebreakers {
            total_points,
            ..Tiebreakers::default()
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EliminatedAt {
    pub overall_round: u32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub total_points: u32,
    #[serde(default)]
    pub avg_placement: f64,
    #[serde(default)]
    pub completed_rounds: u32,
    #[serde(default)]
    pub round_history: Vec<RoundEntry>,
    #[serde(default)]
    pub tiebreakers: Tiebreakers,
    #[serde(default)]
    pub is_eliminated: bool,
    #[serde(default)]
    pub eliminated_at: Option<EliminatedAt>,
}

impl Player {
    pub fn entry_for_round(&self, round: u32) -> Option<&RoundEntry> {
        self.round_history
            .iter()
            .find(|entry| entry.overall_round == round)
    }

    pub fn entry_for_round_mut(&mut self, round: u32) -> Option<&mut RoundEntry> {
        self.round_history
            .iter_mut()
            .find(|entry| entry.overall_round == round)
    }

    /// Rebuild every derived figure from the round history.
    ///
    /// Round-scoped points and ordinal tiebreakers only count entries after
    /// `reset_after_round`, so a point reset stays in force no matter how
    /// often stats are recomputed afterwards. Lifetime figures
    /// (total_points, completed_rounds, avg_placement) always cover the
    /// full history.
    pub fn recompute_stats(&mut self, reset_after_round: u32) {
        let mut points = 0u32;
        let mut total_points = 0u32;
        let mut placement_sum = 0u32;
        let mut completed = 0u32;
        let mut tiebreakers = Tiebreakers::default();

        for entry in &self.round_history {
            let (Some(placement), Some(entry_points)) = (entry.placement, entry.points) else {
                continue;
            };
            total_points += entry_points;
            placement_sum += u32::from(placement);
            completed += 1;
            if entry.overall_round > reset_after_round {
                points += entry_points;
                tiebreakers.record_placement(placement);
            }
        }

        tiebreakers.total_points = total_points;
        self.points = points;
        self.total_points = total_points;
        self.completed_rounds = completed;
        self.avg_placement = if completed == 0 {
            0.0
        } else {
            let raw = f64::from(placement_sum) / f64::from(completed);
            (raw * 100.0).round() / 100.0
        };
        self.tiebreakers = tiebreakers;
    }
}
