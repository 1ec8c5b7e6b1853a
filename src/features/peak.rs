//! Peak form and career stages
//!
//! Locates the point in each established career where trailing win rate was
//! highest, and summarizes outcome and age by career stage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::rolling::{RollingFeatures, RollingMetric};
use super::timeline::Timeline;
use crate::{FighterKey, PeakConfig};

/// Best rolling win rate for one fighter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakWindowRecord {
    pub fighter_key: FighterKey,
    pub name: String,
    pub peak_fight_number: usize,
    pub peak_rolling_win_rate: f64,
    pub total_fights: usize,
}

/// Bucket of a career by fight number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CareerStage {
    Early,
    Mid,
    Prime,
    Late,
}

impl CareerStage {
    pub const ALL: [CareerStage; 4] = [
        CareerStage::Early,
        CareerStage::Mid,
        CareerStage::Prime,
        CareerStage::Late,
    ];

    pub fn from_fight_number(fight_number: usize) -> Self {
        match fight_number {
            0..=5 => CareerStage::Early,
            6..=10 => CareerStage::Mid,
            11..=15 => CareerStage::Prime,
            _ => CareerStage::Late,
        }
    }
}

impl fmt::Display for CareerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CareerStage::Early => write!(f, "Early (1-5)"),
            CareerStage::Mid => write!(f, "Mid (6-10)"),
            CareerStage::Prime => write!(f, "Prime (11-15)"),
            CareerStage::Late => write!(f, "Late (16+)"),
        }
    }
}

/// Outcome and age aggregated over one career stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: CareerStage,
    pub fights: usize,
    /// Mean of defined win flags
    pub win_rate: Option<f64>,
    pub mean_age: Option<f64>,
}

/// Position and value of the highest defined value; earliest wins ties
pub fn find_peak(values: &[Option<f64>]) -> Option<(usize, f64)> {
    values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((i, v)),
        })
}

#[derive(Default)]
struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Peak detection over established careers
#[derive(Debug, Clone)]
pub struct PeakDetector {
    config: PeakConfig,
}

impl Default for PeakDetector {
    fn default() -> Self {
        Self::new(PeakConfig::default())
    }
}

impl PeakDetector {
    pub fn new(config: PeakConfig) -> Self {
        PeakDetector { config }
    }

    pub fn qualifies(&self, timeline: &Timeline) -> bool {
        timeline.len() >= self.config.min_fights
    }

    /// None for short careers or when no rolling win rate is defined
    pub fn detect(&self, timeline: &Timeline, rolling: &RollingFeatures) -> Option<PeakWindowRecord> {
        if !self.qualifies(timeline) {
            log::debug!(
                "{} has {} fights, below the {} needed for peak detection",
                timeline.fighter,
                timeline.len(),
                self.config.min_fights
            );
            return None;
        }

        let win_rate = rolling.get(RollingMetric::WinFlag, self.config.window)?;
        let Some((index, rate)) = find_peak(win_rate) else {
            log::debug!("{} has no defined rolling win rate", timeline.fighter);
            return None;
        };

        Some(PeakWindowRecord {
            fighter_key: timeline.fighter.clone(),
            name: timeline.name().to_string(),
            peak_fight_number: timeline.entries[index].fight_number,
            peak_rolling_win_rate: rate,
            total_fights: timeline.len(),
        })
    }

    /// Per-stage summary over the fights of qualifying careers; empty stages omitted
    pub fn stage_summary<'a, I>(&self, timelines: I) -> Vec<StageSummary>
    where
        I: IntoIterator<Item = &'a Timeline>,
    {
        let mut stages: BTreeMap<CareerStage, (usize, MeanAccumulator, MeanAccumulator)> =
            BTreeMap::new();

        for timeline in timelines.into_iter().filter(|t| self.qualifies(t)) {
            for entry in &timeline.entries {
                let (fights, wins, ages) = stages
                    .entry(CareerStage::from_fight_number(entry.fight_number))
                    .or_default();
                *fights += 1;
                wins.push(entry.record.win_flag());
                ages.push(entry.age_at_fight);
            }
        }

        stages
            .into_iter()
            .map(|(stage, (fights, wins, ages))| StageSummary {
                stage,
                fights,
                win_rate: wins.mean(),
                mean_age: ages.mean(),
            })
            .collect()
    }
}
