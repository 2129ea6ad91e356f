mod report;

pub use report::{PlayerReport, SimulationMetadata, SimulationReport, TargetStat};

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use cutline_core::engine::postround::process_post_round;
use cutline_core::engine::round::simulate_round;
use cutline_core::engine::validate::{HistoryError, validate_round_history};
use cutline_core::model::format::TourFormat;
use cutline_core::model::state::TourState;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::analytics::CutThresholdCollector;
use crate::evaluator::{TrialOutcome, evaluate_target, resolved_past_cut};
use crate::settings::{SimSettings, SimulationMode, TargetKind};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Primary entry point for running Monte Carlo tournament replays.
pub struct SimulationRunner {
    format: TourFormat,
    baseline: TourState,
    settings: SimSettings,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub total_simulations: u64,
    pub elapsed: Duration,
    pub seed: u64,
    pub report_path: PathBuf,
}

/// Per-target tally. Cuts that already happened before the baseline are
/// resolved once from recorded history instead of being re-simulated.
enum TargetEvaluation {
    Simulated(HashMap<u32, u64>),
    Resolved(HashMap<u32, bool>),
}

impl SimulationRunner {
    /// Build a runner from validated inputs.
    pub fn new(
        format: TourFormat,
        baseline: TourState,
        settings: SimSettings,
    ) -> Result<Self, RunnerError> {
        validate_round_history(&baseline)?;
        Ok(Self {
            format,
            baseline,
            settings,
        })
    }

    /// Execute the trial loop and write the JSON report.
    pub fn run(&self, report_path: &Path) -> Result<RunSummary, RunnerError> {
        let seed = self.settings.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut evaluations: Vec<TargetEvaluation> = self
            .settings
            .probability_targets
            .iter()
            .map(|target| {
                if target.kind == TargetKind::MadeCut
                    && let Some(remaining) = target.players_remaining
                    && let Some(resolved) =
                        resolved_past_cut(&self.baseline, &self.format, remaining)
                {
                    TargetEvaluation::Resolved(resolved)
                } else {
                    TargetEvaluation::Simulated(HashMap::new())
                }
            })
            .collect();

        let mut cut_stats = CutThresholdCollector::new();
        let start = Instant::now();
        let mut last_progress = Instant::now();
        let mut total = 0u64;

        tracing::info!(
            seed,
            players = self.baseline.player_count(),
            targets = self.settings.probability_targets.len(),
            "starting simulation"
        );

        while self.should_continue(total, start.elapsed()) {
            let outcome = self.run_trial(&mut rng);

            for record in outcome.cuts.values() {
                cut_stats.record(record);
            }

            for (target, evaluation) in self
                .settings
                .probability_targets
                .iter()
                .zip(evaluations.iter_mut())
            {
                if let TargetEvaluation::Simulated(hits) = evaluation {
                    for (id, hit) in evaluate_target(target, &outcome) {
                        if hit {
                            *hits.entry(id).or_insert(0) += 1;
                        }
                    }
                }
            }

            total += 1;
            if last_progress.elapsed() >= PROGRESS_INTERVAL {
                tracing::info!(
                    trials = total,
                    elapsed_s = start.elapsed().as_secs_f64(),
                    "simulation progress"
                );
                last_progress = Instant::now();
            }
        }

        let elapsed = start.elapsed();
        let report = self.build_report(&evaluations, &cut_stats, total, elapsed);
        report.write_json(report_path)?;

        tracing::info!(
            trials = total,
            elapsed_s = elapsed.as_secs_f64(),
            report = %report_path.display(),
            "simulation complete"
        );

        Ok(RunSummary {
            total_simulations: total,
            elapsed,
            seed,
            report_path: report_path.to_path_buf(),
        })
    }

    /// Replay one tournament from the baseline to its terminal state.
    fn run_trial(&self, rng: &mut StdRng) -> TrialOutcome {
        let mut state = self.baseline.snapshot();
        let mut cuts = HashMap::new();

        while state.current_round.overall_round <= self.format.total_rounds {
            simulate_round(&mut state, rng);
            if self.checkmate_reached(&state) {
                break;
            }
            if let Some(record) = process_post_round(&mut state, &self.format, rng) {
                cuts.insert(record.cut_to, record);
            }
        }

        TrialOutcome { state, cuts }
    }

    fn checkmate_reached(&self, state: &TourState) -> bool {
        self.format
            .checkmate_points
            .is_some_and(|limit| state.players.iter().any(|player| player.points >= limit))
    }

    fn should_continue(&self, done: u64, elapsed: Duration) -> bool {
        let iterations_left = self
            .settings
            .max_iterations
            .is_none_or(|max| done < max);
        let time_left = self
            .settings
            .max_time_seconds
            .is_none_or(|max| elapsed.as_secs_f64() < max);

        match self.settings.mode {
            SimulationMode::IterationsOnly => iterations_left,
            SimulationMode::TimeOnly => time_left,
            SimulationMode::WhicheverFirst => iterations_left && time_left,
        }
    }

    fn build_report(
        &self,
        evaluations: &[TargetEvaluation],
        cut_stats: &CutThresholdCollector,
        total: u64,
        elapsed: Duration,
    ) -> SimulationReport {
        let mut player_probabilities = BTreeMap::new();
        for player in self.baseline.all_players() {
            let mut targets = BTreeMap::new();
            for (target, evaluation) in self
                .settings
                .probability_targets
                .iter()
                .zip(evaluations.iter())
            {
                let count = match evaluation {
                    TargetEvaluation::Simulated(hits) => {
                        hits.get(&player.id).copied().unwrap_or(0)
                    }
                    TargetEvaluation::Resolved(made) => {
                        if made.get(&player.id).copied().unwrap_or(false) {
                            total
                        } else {
                            0
                        }
                    }
                };
                let probability = if total == 0 {
                    0.0
                } else {
                    count as f64 / total as f64
                };
                targets.insert(
                    target.probability_name.clone(),
                    TargetStat {
                        probability,
                        count,
                        total,
                    },
                );
            }

            player_probabilities.insert(
                player.name.clone(),
                PlayerReport {
                    current_points: player.points,
                    tiebreakers: player.tiebreakers,
                    targets,
                },
            );
        }

        SimulationReport {
            player_probabilities,
            cut_threshold_statistics: cut_stats.summaries(),
            simulation_metadata: SimulationMetadata {
                tournament_name: self.format.tournament_name.clone(),
                current_round: self.baseline.current_round.clone(),
                total_simulations: total,
                simulation_time_seconds: elapsed.as_secs_f64(),
                probability_targets: self.settings.probability_targets.clone(),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize report: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("invalid round history: {0}")]
    History(#[from] HistoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Comparison, LoggingConfig, ProbabilityTarget};
    use cutline_core::model::format::{CutRule, RoundSpec};
    use cutline_core::model::player::{Player, RoundEntry, Tiebreakers};
    use cutline_core::model::state::{CurrentRound, RoundStatus};

    fn fresh_player(id: u32) -> Player {
        Player {
            id,
            name: format!("player_{id:02}"),
            points: 0,
            total_points: 0,
            avg_placement: 0.0,
            completed_rounds: 0,
            round_history: vec![RoundEntry {
                overall_round: 1,
                day: Some(1),
                round_in_day: Some(1),
                lobby: lobby_for(id),
                placement: None,
                points: None,
                no_show: false,
            }],
            tiebreakers: Tiebreakers::default(),
            is_eliminated: false,
            eliminated_at: None,
        }
    }

    fn lobby_for(id: u32) -> String {
        ["A", "B", "C"][((id - 1) / 8) as usize].to_string()
    }

    fn baseline(player_count: u32) -> TourState {
        TourState {
            current_round: CurrentRound {
                overall_round: 1,
                day: 1,
                round_in_day: 1,
                status: RoundStatus::InProgress,
            },
            players: (1..=player_count).map(fresh_player).collect(),
            eliminated_players: Vec::new(),
            reset_after_round: 0,
        }
    }

    fn format(total_rounds: u32, cut_rules: Vec<CutRule>) -> TourFormat {
        TourFormat {
            tournament_name: "regional finals".to_string(),
            total_rounds,
            lobby_size: 8,
            checkmate_points: None,
            tiebreaker_order: None,
            round_structure: cut_rules
                .iter()
                .map(|rule| RoundSpec {
                    overall_round: rule.after_round,
                    day: None,
                    round_in_day: None,
                    cut_to: None,
                    snake_shuffle: false,
                    random_shuffle: true,
                    check_victory: false,
                    end_tournament: false,
                    point_reset: false,
                })
                .collect(),
            cut_rules,
        }
    }

    fn settings(iterations: u64, targets: Vec<ProbabilityTarget>) -> SimSettings {
        SimSettings {
            mode: SimulationMode::IterationsOnly,
            max_iterations: Some(iterations),
            max_time_seconds: None,
            seed: Some(7),
            probability_targets: targets,
            logging: LoggingConfig::default(),
        }
    }

    fn winner_target() -> ProbabilityTarget {
        ProbabilityTarget {
            probability_name: "tournament_winner".to_string(),
            kind: TargetKind::TournamentWinner,
            comparison: Comparison::At,
            threshold: None,
            players_remaining: None,
        }
    }

    fn cut_target(remaining: usize) -> ProbabilityTarget {
        ProbabilityTarget {
            probability_name: format!("made_top_{remaining}_cut"),
            kind: TargetKind::MadeCut,
            comparison: Comparison::At,
            threshold: None,
            players_remaining: Some(remaining),
        }
    }

    fn report_json(summary: &RunSummary) -> serde_json::Value {
        let text = std::fs::read_to_string(&summary.report_path).expect("read report");
        serde_json::from_str(&text).expect("parse report")
    }

    #[test]
    fn winner_probabilities_sum_to_one() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = SimulationRunner::new(
            format(3, Vec::new()),
            baseline(8),
            settings(200, vec![winner_target()]),
        )
        .expect("runner");

        let summary = runner.run(&dir.path().join("report.json")).expect("run");
        assert_eq!(summary.total_simulations, 200);

        let report = report_json(&summary);
        let players = report["player_probabilities"].as_object().expect("players");
        assert_eq!(players.len(), 8);

        let mut sum = 0.0;
        for player in players.values() {
            let stat = &player["targets"]["tournament_winner"];
            let probability = stat["probability"].as_f64().expect("probability");
            assert!((0.0..=1.0).contains(&probability));
            assert_eq!(stat["total"].as_u64(), Some(200));
            sum += probability;
        }
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let dir = tempfile::tempdir().expect("tempdir");
        let make_runner = || {
            SimulationRunner::new(
                format(3, vec![CutRule { after_round: 2, players_remaining: 8 }]),
                baseline(16),
                settings(50, vec![winner_target(), cut_target(8)]),
            )
            .expect("runner")
        };

        let first = make_runner().run(&dir.path().join("a.json")).expect("run");
        let second = make_runner().run(&dir.path().join("b.json")).expect("run");

        let mut a = report_json(&first);
        let mut b = report_json(&second);
        // Wall-clock timing differs between runs; everything else must not.
        a["simulation_metadata"]["simulation_time_seconds"] = 0.0.into();
        b["simulation_metadata"]["simulation_time_seconds"] = 0.0.into();
        assert_eq!(a, b);
    }

    #[test]
    fn cut_statistics_cover_every_trial() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = SimulationRunner::new(
            format(3, vec![CutRule { after_round: 2, players_remaining: 8 }]),
            baseline(16),
            settings(40, vec![cut_target(8)]),
        )
        .expect("runner");

        let summary = runner.run(&dir.path().join("report.json")).expect("run");
        let report = report_json(&summary);

        let stats = &report["cut_threshold_statistics"]["round_2_cut_to_8"];
        assert_eq!(stats["count"].as_u64(), Some(40));
        let clean = stats["cut_types"]["clean"].as_f64().expect("clean");
        let tiebreaker = stats["cut_types"]["tiebreaker"].as_f64().expect("tiebreaker");
        assert!((clean + tiebreaker - 1.0).abs() < 1e-9);

        // Exactly 8 of 16 players survive each trial's cut.
        let players = report["player_probabilities"].as_object().expect("players");
        let survivor_mass: f64 = players
            .values()
            .map(|p| p["targets"]["made_top_8_cut"]["probability"].as_f64().unwrap())
            .sum();
        assert!((survivor_mass - 8.0).abs() < 1e-9);
    }

    #[test]
    fn successive_cuts_never_readmit_eliminated_players() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rules = vec![
            CutRule { after_round: 1, players_remaining: 16 },
            CutRule { after_round: 2, players_remaining: 8 },
        ];
        let runner = SimulationRunner::new(
            format(3, rules),
            baseline(24),
            settings(30, vec![cut_target(16), cut_target(8)]),
        )
        .expect("runner");

        // Every trial records both cuts, and the later cut picks its
        // survivors from the earlier cut's survivors.
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            let outcome = runner.run_trial(&mut rng);
            let wide = &outcome.cuts[&16];
            let narrow = &outcome.cuts[&8];
            assert_eq!(wide.after_round, 1);
            assert_eq!(narrow.after_round, 2);
            assert_eq!(wide.survivors.len(), 16);
            assert_eq!(narrow.survivors.len(), 8);
            assert!(narrow.survivors.is_subset(&wide.survivors));
        }

        let summary = runner.run(&dir.path().join("report.json")).expect("run");
        let report = report_json(&summary);
        let players = report["player_probabilities"].as_object().expect("players");
        assert_eq!(players.len(), 24);

        let mut wide_mass = 0.0;
        let mut narrow_mass = 0.0;
        for (name, player) in players {
            let wide_count = player["targets"]["made_top_16_cut"]["count"].as_u64().unwrap();
            let narrow_count = player["targets"]["made_top_8_cut"]["count"].as_u64().unwrap();
            assert!(narrow_count <= wide_count, "player {name} survived the narrow cut more often than the wide one");
            wide_mass += player["targets"]["made_top_16_cut"]["probability"].as_f64().unwrap();
            narrow_mass += player["targets"]["made_top_8_cut"]["probability"].as_f64().unwrap();
        }
        assert!((wide_mass - 16.0).abs() < 1e-9);
        assert!((narrow_mass - 8.0).abs() < 1e-9);

        let stats = &report["cut_threshold_statistics"];
        assert_eq!(stats["round_1_cut_to_16"]["count"].as_u64(), Some(30));
        assert_eq!(stats["round_2_cut_to_8"]["count"].as_u64(), Some(30));
    }

    #[test]
    fn past_cuts_resolve_from_recorded_history_without_simulating() {
        use cutline_core::model::player::EliminatedAt;

        let mut state = baseline(8);
        state.current_round.overall_round = 3;
        for player in &mut state.players {
            player.round_history[0].placement = Some(player.id as u8);
            player.round_history[0].points = Some(9 - player.id);
        }
        let mut dropped = state.players.split_off(4);
        for player in &mut dropped {
            player.is_eliminated = true;
            player.eliminated_at = Some(EliminatedAt {
                overall_round: 3,
                reason: "cut".to_string(),
            });
        }
        state.eliminated_players = dropped;
        for player in state.players.iter_mut().chain(state.eliminated_players.iter_mut()) {
            player.round_history[0].overall_round = 2;
            player.round_history.push(RoundEntry {
                overall_round: 3,
                day: Some(1),
                round_in_day: Some(3),
                lobby: "A".to_string(),
                placement: None,
                points: None,
                no_show: false,
            });
        }
        state.eliminated_players.iter_mut().for_each(|p| {
            p.round_history.pop();
        });

        let runner = SimulationRunner::new(
            format(4, vec![CutRule { after_round: 2, players_remaining: 4 }]),
            state,
            settings(10, vec![cut_target(4)]),
        )
        .expect("runner");

        let dir = tempfile::tempdir().expect("dir");
        let summary = runner.run(&dir.path().join("r.json")).expect("run");
        let report = report_json(&summary);
        let players = report["player_probabilities"].as_object().expect("players");

        for (name, player) in players {
            let stat = &player["targets"]["made_top_4_cut"];
            let expected = if name.as_str() < "player_05" { 1.0 } else { 0.0 };
            assert_eq!(stat["probability"].as_f64(), Some(expected), "player {name}");
        }
    }
}
