//! Fighter career timelines from fight records
//!
//! Splits two-sided fight records into per-fighter perspectives, rebuilds each
//! fighter's chronological career and derives causal rolling form, per-fight style,
//! style-weighted performance scores and peak-form windows.

pub mod data;
pub mod features;
pub mod pipeline;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable fighter identifier as recorded in the source data
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FighterId(pub String);

impl fmt::Display for FighterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity used to group a fighter's fights.
///
/// Identifiers are preferred; a name is only used when the row carries no identifier,
/// since names are not guaranteed unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FighterKey {
    Id(FighterId),
    Name(String),
}

impl FighterKey {
    /// Parse the textual form produced by `Display`
    pub fn parse(s: &str) -> Self {
        match s.strip_prefix("name:") {
            Some(name) => FighterKey::Name(name.to_string()),
            None => FighterKey::Id(FighterId(s.to_string())),
        }
    }
}

impl fmt::Display for FighterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FighterKey::Id(id) => write!(f, "{}", id),
            FighterKey::Name(name) => write!(f, "name:{}", name),
        }
    }
}

/// Corner of the cage a fighter was assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Red,
    Blue,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Red, Side::Blue];

    pub fn opponent(&self) -> Side {
        match self {
            Side::Red => Side::Blue,
            Side::Blue => Side::Red,
        }
    }

    /// Column prefix used by the source data
    pub fn prefix(&self) -> &'static str {
        match self {
            Side::Red => "r_",
            Side::Blue => "b_",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Red => write!(f, "red"),
            Side::Blue => write!(f, "blue"),
        }
    }
}

/// Result of a fight from one fighter's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    /// No winner recorded (draw, no contest)
    Undetermined,
}

impl Outcome {
    /// 1.0 for a win, 0.0 for a loss, None when undetermined
    pub fn flag(&self) -> Option<f64> {
        match self {
            Outcome::Win => Some(1.0),
            Outcome::Loss => Some(0.0),
            Outcome::Undetermined => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
            Outcome::Undetermined => write!(f, "undetermined"),
        }
    }
}

/// One corner's attributes for a fight
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CornerStats {
    pub id: Option<FighterId>,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub kd: Option<f64>,
    pub sig_str_landed: Option<f64>,
    pub sig_str_atmpted: Option<f64>,
    pub sig_str_acc: Option<f64>,
    pub total_str_landed: Option<f64>,
    pub total_str_atmpted: Option<f64>,
    pub td_landed: Option<f64>,
    pub td_atmpted: Option<f64>,
    pub td_acc: Option<f64>,
    pub sub_att: Option<f64>,
    /// Control time in seconds
    pub ctrl: Option<f64>,
}

impl CornerStats {
    pub fn key(&self) -> FighterKey {
        match &self.id {
            Some(id) => FighterKey::Id(id.clone()),
            None => FighterKey::Name(self.name.clone()),
        }
    }
}

/// A single fight record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Position in the ingested file, used as the stable tie-break for same-day fights
    pub index: usize,
    pub event_name: Option<String>,
    pub date: Option<NaiveDate>,
    pub division: Option<String>,
    pub winner: Option<String>,
    pub winner_id: Option<FighterId>,
    pub finish_round: Option<f64>,
    /// Seconds elapsed in the finishing round
    pub match_time_sec: Option<f64>,
    pub total_rounds: Option<f64>,
    pub red: CornerStats,
    pub blue: CornerStats,
}

impl MatchRecord {
    pub fn corner(&self, side: Side) -> &CornerStats {
        match side {
            Side::Red => &self.red,
            Side::Blue => &self.blue,
        }
    }

    /// Total fight time in seconds
    pub fn elapsed_seconds(&self, round_seconds: f64) -> Option<f64> {
        let round = self.finish_round?;
        let in_round = self.match_time_sec?;
        Some((round - 1.0) * round_seconds + in_round)
    }

    /// Returns the winning corner, or None when it cannot be determined
    pub fn winning_side(&self) -> Option<Side> {
        if let Some(winner_id) = &self.winner_id {
            for side in Side::BOTH {
                if self.corner(side).id.as_ref() == Some(winner_id) {
                    return Some(side);
                }
            }
            if self.red.id.is_some() && self.blue.id.is_some() {
                return None;
            }
        }

        // Degraded fallback: no usable identifiers on this row
        let winner = self.winner.as_deref()?;
        let red = self.red.name == winner;
        let blue = self.blue.name == winner;
        match (red, blue) {
            (true, false) => Some(Side::Red),
            (false, true) => Some(Side::Blue),
            _ => None,
        }
    }

    pub fn outcome_for(&self, side: Side) -> Outcome {
        match self.winning_side() {
            Some(winner) if winner == side => Outcome::Win,
            Some(_) => Outcome::Loss,
            None => Outcome::Undetermined,
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum FightError {
    #[error("Required column missing from input: {column}")]
    MissingColumn { column: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown fighter: {0}")]
    UnknownFighter(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to persist output: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, FightError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub timeline: TimelineConfig,
    pub rolling: RollingConfig,
    pub style: StyleConfig,
    pub scoring: ScoringConfig,
    pub peak: PeakConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub input_path: String,
    pub output_path: String,
    pub peaks_path: String,
    pub stages_path: String,
    pub drop_duplicates: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Scheduled length of one round in seconds
    pub round_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingConfig {
    pub window_sizes: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Takedown attempts per minute at or above which a fight counts as grappling-heavy
    pub td_attempts_per_min: f64,
    /// Significant strikes landed per minute at or above which a fight counts as striking-heavy
    pub sig_landed_per_min: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weights for [strike diff, strike acc, td acc, control, win]
    pub striker_weights: [f64; 5],
    pub grappler_weights: [f64; 5],
    pub balanced_weights: [f64; 5],
    /// Rescaled value given to every score when the cohort has a single distinct score
    pub degenerate_scale: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Minimum career length for peak detection
    pub min_fights: usize,
    /// Rolling win-rate window used to locate the peak
    pub window: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker threads for per-fighter stages (None = rayon default)
    pub threads: Option<usize>,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            input_path: "csv/UFC_clean.csv".to_string(),
            output_path: "csv/fighter_level_data.csv".to_string(),
            peaks_path: "csv/fighter_peaks.csv".to_string(),
            stages_path: "csv/career_stages.csv".to_string(),
            drop_duplicates: true,
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        TimelineConfig {
            round_seconds: 300.0,
        }
    }
}

impl Default for RollingConfig {
    fn default() -> Self {
        RollingConfig {
            window_sizes: vec![3, 5],
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        StyleConfig {
            td_attempts_per_min: 0.4,
            sig_landed_per_min: 3.5,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            striker_weights: [0.35, 0.35, 0.05, 0.05, 0.20],
            grappler_weights: [0.05, 0.05, 0.35, 0.35, 0.20],
            balanced_weights: [0.20, 0.20, 0.20, 0.20, 0.20],
            degenerate_scale: 50.0,
        }
    }
}

impl Default for PeakConfig {
    fn default() -> Self {
        PeakConfig {
            min_fights: 5,
            window: 5,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FightError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| FightError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FightError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.rolling.window_sizes.is_empty() {
            return Err(FightError::Config("rolling.window_sizes is empty".to_string()));
        }
        if self.rolling.window_sizes.contains(&0) {
            return Err(FightError::Config(
                "rolling.window_sizes must be positive".to_string(),
            ));
        }
        if !self.rolling.window_sizes.contains(&self.peak.window) {
            return Err(FightError::Config(format!(
                "peak.window {} is not one of rolling.window_sizes {:?}",
                self.peak.window, self.rolling.window_sizes
            )));
        }
        if self.timeline.round_seconds <= 0.0 {
            return Err(FightError::Config(
                "timeline.round_seconds must be positive".to_string(),
            ));
        }
        for (name, weights) in [
            ("striker_weights", &self.scoring.striker_weights),
            ("grappler_weights", &self.scoring.grappler_weights),
            ("balanced_weights", &self.scoring.balanced_weights),
        ] {
            let sum: f64 = weights.iter().sum();
            if (sum - 1.0).abs() > 1e-6 {
                return Err(FightError::Config(format!(
                    "scoring.{} must sum to 1.0, got {}",
                    name, sum
                )));
            }
        }
        Ok(())
    }
}
