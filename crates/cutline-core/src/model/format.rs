use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_LOBBY_SIZE: usize = 8;

/// The single ranking key sequence the standings ranker implements.
/// Formats may restate it, but no other order is supported.
pub const SUPPORTED_TIEBREAKER_ORDER: [&str; 12] = [
    "points",
    "total_points",
    "firsts_plus_top4s",
    "firsts",
    "seconds",
    "thirds",
    "fourths",
    "fifths",
    "sixths",
    "sevenths",
    "eighths",
    "avg_placement",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShuffleKind {
    Random,
    Snake,
}

/// Per-round action flags from the format document, applied after the
/// named round completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSpec {
    pub overall_round: u32,
    #[serde(default)]
    pub day: Option<u32>,
    #[serde(default)]
    pub round_in_day: Option<u32>,
    #[serde(default)]
    pub cut_to: Option<usize>,
    #[serde(default)]
    pub snake_shuffle: bool,
    #[serde(default)]
    pub random_shuffle: bool,
    #[serde(default)]
    pub check_victory: bool,
    #[serde(default)]
    pub end_tournament: bool,
    #[serde(default)]
    pub point_reset: bool,
}

impl RoundSpec {
    /// Reseeding defaults to a random shuffle when no flag is set.
    pub fn shuffle_kind(&self) -> ShuffleKind {
        if self.snake_shuffle {
            ShuffleKind::Snake
        } else {
            ShuffleKind::Random
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutRule {
    pub after_round: u32,
    pub players_remaining: usize,
}

/// Tournament format document: round count, per-round actions, cut rules
/// and scoring policy knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourFormat {
    #[serde(default)]
    pub tournament_name: String,
    pub total_rounds: u32,
    #[serde(default = "default_lobby_size")]
    pub lobby_size: usize,
    #[serde(default)]
    pub checkmate_points: Option<u32>,
    #[serde(default)]
    pub tiebreaker_order: Option<Vec<String>>,
    #[serde(default)]
    pub round_structure: Vec<RoundSpec>,
    #[serde(default)]
    pub cut_rules: Vec<CutRule>,
}

fn default_lobby_size() -> usize {
    DEFAULT_LOBBY_SIZE
}

impl TourFormat {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| FormatError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let format: TourFormat =
            serde_json::from_reader(reader).map_err(|source| FormatError::Parse {
                source,
                path: path_buf,
            })?;
        format.validate()?;
        Ok(format)
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        if self.total_rounds == 0 {
            return Err(FormatError::invalid(
                "total_rounds",
                "must be greater than zero",
            ));
        }
        if self.lobby_size == 0 {
            return Err(FormatError::invalid(
                "lobby_size",
                "must be greater than zero",
            ));
        }
        if self.lobby_size > usize::from(u8::MAX) {
            return Err(FormatError::invalid("lobby_size", "must not exceed 255"));
        }

        let mut seen = HashSet::new();
        for spec in &self.round_structure {
            if spec.overall_round == 0 || spec.overall_round > self.total_rounds {
                return Err(FormatError::invalid(
                    "round_structure",
                    format!(
                        "round {} is outside 1..={}",
                        spec.overall_round, self.total_rounds
                    ),
                ));
            }
            if !seen.insert(spec.overall_round) {
                return Err(FormatError::invalid(
                    "round_structure",
                    format!("round {} appears more than once", spec.overall_round),
                ));
            }
            if spec.cut_to == Some(0) {
                return Err(FormatError::invalid(
                    "round_structure",
                    format!("round {} cut_to must retain at least one player", spec.overall_round),
                ));
            }
        }

        for rule in &self.cut_rules {
            if rule.after_round == 0 || rule.after_round > self.total_rounds {
                return Err(FormatError::invalid(
                    "cut_rules",
                    format!(
                        "after_round {} is outside 1..={}",
                        rule.after_round, self.total_rounds
                    ),
                ));
            }
            if rule.players_remaining == 0 {
                return Err(FormatError::invalid(
                    "cut_rules",
                    "players_remaining must be greater than zero",
                ));
            }
        }

        if let Some(order) = self.tiebreaker_order.as_ref()
            && order != &SUPPORTED_TIEBREAKER_ORDER
        {
            return Err(FormatError::invalid(
                "tiebreaker_order",
                format!(
                    "unsupported order; the only supported sequence is {:?}",
                    SUPPORTED_TIEBREAKER_ORDER
                ),
            ));
        }

        Ok(())
    }

    pub fn round_spec(&self, round: u32) -> Option<&RoundSpec> {
        self.round_structure
            .iter()
            .find(|spec| spec.overall_round == round)
    }

    /// Cut size applied after `round`, from the round structure first and
    /// the flat rule list second.
    pub fn cut_to_after(&self, round: u32) -> Option<usize> {
        if let Some(cut_to) = self.round_spec(round).and_then(|spec| spec.cut_to) {
            return Some(cut_to);
        }
        self.cut_rules
            .iter()
            .find(|rule| rule.after_round == round)
            .map(|rule| rule.players_remaining)
    }

    /// All configured cuts as (after_round, players_remaining) pairs,
    /// ordered by round.
    pub fn configured_cuts(&self) -> Vec<CutRule> {
        let mut cuts: Vec<CutRule> = self
            .round_structure
            .iter()
            .filter_map(|spec| {
                spec.cut_to.map(|players_remaining| CutRule {
                    after_round: spec.overall_round,
                    players_remaining,
                })
            })
            .collect();
        for rule in &self.cut_rules {
            if !cuts.iter().any(|cut| cut.after_round == rule.after_round) {
                cuts.push(*rule);
            }
        }
        cuts.sort_by_key(|cut| cut.after_round);
        cuts
    }
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to read format {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse format {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("{field}: {message}")]
    Invalid { field: String, message: String },
}

impl FormatError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        FormatError::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
