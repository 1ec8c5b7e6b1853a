//! Style-weighted performance scores
//!
//! Scores every fight in the cohort against every other fight:
//!
//! 1. Per-fight metrics: strike differential per minute, significant strike
//!    accuracy, takedown accuracy and fraction of the fight spent in control.
//! 2. Cohort mean and sample standard deviation per metric (full pass).
//! 3. Z-scores combined with the outcome using the weight profile of the
//!    fight's style.
//! 4. Cohort min-max rescale of the composite onto 0-100 (full pass).
//! 5. Band labels from the cohort mean and standard deviation of the rescaled
//!    scores (full pass).
//!
//! Each full pass finishes before the following per-fight map starts. Missing
//! inputs make the affected score missing rather than zero.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::perspective::PerspectiveRecord;
use super::style::Style;
use crate::ScoringConfig;

const STD_EPSILON: f64 = 1e-12;

/// Ordered performance label, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PerformanceBand {
    Exceptional,
    Elite,
    Good,
    Okay,
    BelowAverage,
    Poor,
}

impl PerformanceBand {
    pub const ALL: [PerformanceBand; 6] = [
        PerformanceBand::Exceptional,
        PerformanceBand::Elite,
        PerformanceBand::Good,
        PerformanceBand::Okay,
        PerformanceBand::BelowAverage,
        PerformanceBand::Poor,
    ];

    /// Band for `value` given the cohort mean and standard deviation
    pub fn classify(value: f64, mean: f64, std_dev: f64) -> Self {
        if value >= mean + 1.5 * std_dev {
            PerformanceBand::Exceptional
        } else if value >= mean + 1.0 * std_dev {
            PerformanceBand::Elite
        } else if value >= mean + 0.5 * std_dev {
            PerformanceBand::Good
        } else if value > mean - 0.5 * std_dev {
            PerformanceBand::Okay
        } else if value > mean - 1.0 * std_dev {
            PerformanceBand::BelowAverage
        } else {
            PerformanceBand::Poor
        }
    }
}

impl fmt::Display for PerformanceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceBand::Exceptional => write!(f, "Exceptional dominance"),
            PerformanceBand::Elite => write!(f, "Elite dominance"),
            PerformanceBand::Good => write!(f, "Good dominance"),
            PerformanceBand::Okay => write!(f, "Okay dominance"),
            PerformanceBand::BelowAverage => write!(f, "Below Average dominance"),
            PerformanceBand::Poor => write!(f, "Poor dominance"),
        }
    }
}

/// Raw per-fight inputs to the composite score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceInputs {
    /// (landed - absorbed) significant strikes per minute
    pub strike_diff_per_min: Option<f64>,
    pub sig_str_acc: Option<f64>,
    /// Takedowns landed / attempted in this fight
    pub td_acc: Option<f64>,
    /// Control time / fight time
    pub control_fraction: Option<f64>,
    pub win_flag: Option<f64>,
    pub style: Style,
}

impl PerformanceInputs {
    pub const NUM_METRICS: usize = 4;
    pub const METRIC_NAMES: [&'static str; Self::NUM_METRICS] = [
        "strike_diff_per_min",
        "sig_str_acc",
        "td_acc",
        "control_fraction",
    ];

    pub fn from_record(record: &PerspectiveRecord, style: Style) -> Self {
        let stats = &record.stats;
        let minutes = record.elapsed_minutes();
        let seconds = record.elapsed_seconds.filter(|s| *s > 0.0);

        let strike_diff_per_min = match (stats.sig_str_landed, record.sig_str_absorbed, minutes) {
            (Some(landed), Some(absorbed), Some(minutes)) => Some((landed - absorbed) / minutes),
            _ => None,
        };
        // No attempts means no takedown success
        let td_acc = match (stats.td_landed, stats.td_atmpted) {
            (Some(_), Some(attempts)) if attempts == 0.0 => Some(0.0),
            (Some(landed), Some(attempts)) => Some(landed / attempts),
            _ => None,
        };
        let control_fraction = stats.ctrl.zip(seconds).map(|(ctrl, secs)| ctrl / secs);

        PerformanceInputs {
            strike_diff_per_min,
            sig_str_acc: stats.sig_str_acc,
            td_acc,
            control_fraction,
            win_flag: record.win_flag(),
            style,
        }
    }

    pub fn metrics(&self) -> [Option<f64>; Self::NUM_METRICS] {
        [
            self.strike_diff_per_min,
            self.sig_str_acc,
            self.td_acc,
            self.control_fraction,
        ]
    }
}

/// Mean and sample standard deviation over the defined values of a cohort
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CohortStats {
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
}

impl CohortStats {
    /// None when fewer than two defined values exist
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let values: Vec<f64> = values.into_iter().flatten().collect();
        if values.len() < 2 {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(CohortStats {
            mean,
            std_dev: variance.sqrt(),
            count: values.len(),
        })
    }

    pub fn is_degenerate(&self) -> bool {
        self.std_dev < STD_EPSILON
    }

    /// None when the cohort has no spread
    pub fn z_score(&self, value: f64) -> Option<f64> {
        if self.is_degenerate() {
            None
        } else {
            Some((value - self.mean) / self.std_dev)
        }
    }
}

/// Min-max rescale of defined values onto 0-100.
///
/// When every defined value is equal they all map to `degenerate`.
pub fn min_max_rescale(values: &[Option<f64>], degenerate: f64) -> Vec<Option<f64>> {
    let bounds = values.iter().flatten().fold(None, |acc: Option<(f64, f64)>, v| {
        Some(match acc {
            Some((lo, hi)) => (lo.min(*v), hi.max(*v)),
            None => (*v, *v),
        })
    });
    let Some((lo, hi)) = bounds else {
        return vec![None; values.len()];
    };

    let range = hi - lo;
    values
        .iter()
        .map(|v| {
            v.map(|v| {
                if range.abs() < STD_EPSILON {
                    degenerate
                } else {
                    100.0 * (v - lo) / range
                }
            })
        })
        .collect()
}

/// Scores for one fight
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerformanceScore {
    pub composite: Option<f64>,
    /// Composite rescaled onto 0-100 over the cohort
    pub scaled: Option<f64>,
    pub band: Option<PerformanceBand>,
}

/// Cohort-level performance scorer
#[derive(Debug, Clone)]
pub struct PerformanceScorer {
    config: ScoringConfig,
}

impl Default for PerformanceScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl PerformanceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        PerformanceScorer { config }
    }

    /// Weights for [strike diff, strike acc, td acc, control, win]
    pub fn weights(&self, style: Style) -> &[f64; 5] {
        match style {
            Style::Striker => &self.config.striker_weights,
            Style::Grappler => &self.config.grappler_weights,
            Style::Balanced => &self.config.balanced_weights,
        }
    }

    /// Weighted sum of z-scores and outcome; None if any term is missing
    pub fn composite(
        &self,
        inputs: &PerformanceInputs,
        stats: &[Option<CohortStats>; PerformanceInputs::NUM_METRICS],
    ) -> Option<f64> {
        let weights = self.weights(inputs.style);
        let mut score = inputs.win_flag? * weights[4];
        for ((value, stat), weight) in inputs.metrics().iter().zip(stats).zip(weights) {
            score += stat.as_ref()?.z_score((*value)?)? * weight;
        }
        Some(score)
    }

    /// Score every fight against the whole cohort
    pub fn score_all(&self, inputs: &[PerformanceInputs]) -> Vec<PerformanceScore> {
        let stats: [Option<CohortStats>; PerformanceInputs::NUM_METRICS] = std::array::from_fn(|i| {
            CohortStats::from_values(inputs.iter().map(|p| p.metrics()[i]))
        });
        for (name, stat) in PerformanceInputs::METRIC_NAMES.iter().zip(&stats) {
            match stat {
                Some(s) if !s.is_degenerate() => {
                    log::debug!("{}: mean {:.4}, std {:.4} over {}", name, s.mean, s.std_dev, s.count)
                }
                _ => log::warn!("{} has no spread across the cohort; its z-scores are empty", name),
            }
        }

        let composites: Vec<Option<f64>> = inputs
            .par_iter()
            .map(|p| self.composite(p, &stats))
            .collect();

        let scaled = min_max_rescale(&composites, self.config.degenerate_scale);

        let band_stats = CohortStats::from_values(scaled.iter().copied())
            .filter(|s| !s.is_degenerate());
        if band_stats.is_none() {
            log::warn!("Rescaled performance scores have no spread; bands left empty");
        }

        composites
            .par_iter()
            .zip(scaled.par_iter())
            .map(|(composite, scaled)| PerformanceScore {
                composite: *composite,
                scaled: *scaled,
                band: band_stats
                    .zip(*scaled)
                    .map(|(s, v)| PerformanceBand::classify(v, s.mean, s.std_dev)),
            })
            .collect()
    }
}
