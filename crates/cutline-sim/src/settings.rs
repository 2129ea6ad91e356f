use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_MAX_ITERATIONS: u64 = 1_000;

/// Root simulation settings loaded from JSON.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SimSettings {
    #[serde(default)]
    pub mode: SimulationMode,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: Option<u64>,
    #[serde(default)]
    pub max_time_seconds: Option<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
    pub probability_targets: Vec<ProbabilityTarget>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Stopping rule for the trial loop.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimulationMode {
    IterationsOnly,
    TimeOnly,
    WhicheverFirst,
}

impl Default for SimulationMode {
    fn default() -> Self {
        SimulationMode::IterationsOnly
    }
}

/// A question asked of every simulated tournament outcome.
///
/// Targets round-trip through serde so the report metadata can echo the
/// definitions back to downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbabilityTarget {
    pub probability_name: String,
    #[serde(rename = "type")]
    pub kind: TargetKind,
    #[serde(default)]
    pub comparison: Comparison,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players_remaining: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    TournamentWinner,
    OverallStanding,
    MadeCut,
}

/// How a player's final rank is compared against a standing threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    At,
    Above,
    Below,
    AtOrAbove,
    AtOrBelow,
}

impl Default for Comparison {
    fn default() -> Self {
        Comparison::At
    }
}

impl SimSettings {
    /// Load settings from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| SettingsError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut settings: SimSettings =
            serde_json::from_reader(reader).map_err(|source| SettingsError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        settings.validate().map_err(|source| SettingsError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(settings)
    }

    /// Validate the settings without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        self.logging.normalize();

        if let Some(iterations) = self.max_iterations
            && iterations == 0
        {
            return Err(ValidationError::InvalidField {
                field: "max_iterations".to_string(),
                message: "iteration budget must be greater than zero".to_string(),
            });
        }

        if let Some(seconds) = self.max_time_seconds
            && seconds <= 0.0
        {
            return Err(ValidationError::InvalidField {
                field: "max_time_seconds".to_string(),
                message: "time budget must be greater than zero".to_string(),
            });
        }

        match self.mode {
            SimulationMode::IterationsOnly if self.max_iterations.is_none() => {
                return Err(ValidationError::InvalidField {
                    field: "max_iterations".to_string(),
                    message: "iterations_only mode requires max_iterations".to_string(),
                });
            }
            SimulationMode::TimeOnly if self.max_time_seconds.is_none() => {
                return Err(ValidationError::InvalidField {
                    field: "max_time_seconds".to_string(),
                    message: "time_only mode requires max_time_seconds".to_string(),
                });
            }
            SimulationMode::WhicheverFirst
                if self.max_iterations.is_none() && self.max_time_seconds.is_none() =>
            {
                return Err(ValidationError::InvalidField {
                    field: "mode".to_string(),
                    message: "whichever_first mode requires an iteration or time budget"
                        .to_string(),
                });
            }
            _ => {}
        }

        validate_targets(&self.probability_targets)?;
        Ok(())
    }
}

fn validate_targets(targets: &[ProbabilityTarget]) -> Result<(), ValidationError> {
    if targets.is_empty() {
        return Err(ValidationError::InvalidField {
            field: "probability_targets".to_string(),
            message: "at least one probability target must be specified".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for target in targets {
        if target.probability_name.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "probability_targets.probability_name".to_string(),
                message: "target name must not be empty".to_string(),
            });
        }

        if !seen.insert(target.probability_name.clone()) {
            return Err(ValidationError::InvalidField {
                field: "probability_targets".to_string(),
                message: format!(
                    "target '{}' defined more than once",
                    target.probability_name
                ),
            });
        }

        match target.kind {
            TargetKind::TournamentWinner => {}
            TargetKind::OverallStanding => {
                let Some(threshold) = target.threshold else {
                    return Err(ValidationError::InvalidField {
                        field: format!("probability_targets[{}]", target.probability_name),
                        message: "overall_standing targets require a threshold".to_string(),
                    });
                };
                if threshold == 0 {
                    return Err(ValidationError::InvalidField {
                        field: format!("probability_targets[{}]", target.probability_name),
                        message: "standing threshold must be at least 1".to_string(),
                    });
                }
            }
            TargetKind::MadeCut => {
                let Some(remaining) = target.players_remaining else {
                    return Err(ValidationError::InvalidField {
                        field: format!("probability_targets[{}]", target.probability_name),
                        message: "made_cut targets require players_remaining".to_string(),
                    });
                };
                if remaining == 0 {
                    return Err(ValidationError::InvalidField {
                        field: format!("probability_targets[{}]", target.probability_name),
                        message: "players_remaining must be at least 1".to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}

fn default_max_iterations() -> Option<u64> {
    Some(DEFAULT_MAX_ITERATIONS)
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

/// Errors surfaced when loading settings files.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse settings {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("invalid settings in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
