use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use cutline_core::model::player::Tiebreakers;
use cutline_core::model::state::CurrentRound;
use serde::Serialize;

use crate::analytics::CutThresholdSummary;
use crate::settings::ProbabilityTarget;

use super::RunnerError;

/// The report document written to disk after a run.
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub player_probabilities: BTreeMap<String, PlayerReport>,
    pub cut_threshold_statistics: BTreeMap<String, CutThresholdSummary>,
    pub simulation_metadata: SimulationMetadata,
}

#[derive(Debug, Serialize)]
pub struct PlayerReport {
    pub current_points: u32,
    pub tiebreakers: Tiebreakers,
    pub targets: BTreeMap<String, TargetStat>,
}

#[derive(Debug, Serialize)]
pub struct TargetStat {
    pub probability: f64,
    pub count: u64,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct SimulationMetadata {
    pub tournament_name: String,
    pub current_round: CurrentRound,
    pub total_simulations: u64,
    pub simulation_time_seconds: f64,
    pub probability_targets: Vec<ProbabilityTarget>,
}

impl SimulationReport {
    /// Pretty-print the report as JSON at the given path, creating parent
    /// directories as needed.
    pub fn write_json(&self, path: &Path) -> Result<(), RunnerError> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
