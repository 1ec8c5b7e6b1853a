//! Causal rolling form
//!
//! Trailing means over a fighter's previous fights. A fight never contributes
//! to its own rolling value.

use std::collections::VecDeque;

use super::timeline::{Timeline, TimelineEntry};

/// Per-fight quantity that can be rolled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RollingMetric {
    WinFlag,
    SigStrLanded,
    SigStrAbsorbed,
}

impl RollingMetric {
    pub const ALL: [RollingMetric; 3] = [
        RollingMetric::WinFlag,
        RollingMetric::SigStrLanded,
        RollingMetric::SigStrAbsorbed,
    ];

    pub fn value(&self, entry: &TimelineEntry) -> Option<f64> {
        match self {
            RollingMetric::WinFlag => entry.record.win_flag(),
            RollingMetric::SigStrLanded => entry.record.stats.sig_str_landed,
            RollingMetric::SigStrAbsorbed => entry.record.sig_str_absorbed,
        }
    }

    /// Output column name for a window size
    pub fn column_name(&self, window: usize) -> String {
        let base = match self {
            RollingMetric::WinFlag => "rolling_win_rate",
            RollingMetric::SigStrLanded => "rolling_sig_str_landed",
            RollingMetric::SigStrAbsorbed => "rolling_sig_str_absorbed",
        };
        format!("{}_{}", base, window)
    }
}

/// Mean of up to `window` values strictly before each position.
///
/// Missing values occupy a slot in the window but are skipped in the mean. The
/// result is None when no defined value precedes the position.
pub fn causal_rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut trailing: VecDeque<Option<f64>> = VecDeque::with_capacity(window + 1);
    values
        .iter()
        .map(|value| {
            let (sum, count) = trailing
                .iter()
                .flatten()
                .fold((0.0_f64, 0usize), |(s, c), v| (s + v, c + 1));
            let mean = (count > 0).then(|| sum / count as f64);

            trailing.push_back(*value);
            if trailing.len() > window {
                trailing.pop_front();
            }
            mean
        })
        .collect()
}

/// One rolling feature column for a single fighter
#[derive(Debug, Clone, PartialEq)]
pub struct RollingColumn {
    pub metric: RollingMetric,
    pub window: usize,
    /// One value per timeline entry
    pub values: Vec<Option<f64>>,
}

/// All rolling columns for a single fighter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollingFeatures {
    pub columns: Vec<RollingColumn>,
}

impl RollingFeatures {
    pub fn get(&self, metric: RollingMetric, window: usize) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.metric == metric && c.window == window)
            .map(|c| c.values.as_slice())
    }

    /// Values for one timeline entry, in column order
    pub fn row(&self, index: usize) -> Vec<Option<f64>> {
        self.columns.iter().map(|c| c.values[index]).collect()
    }
}

/// Computes rolling columns for each metric and window size
#[derive(Debug, Clone)]
pub struct RollingAggregator {
    windows: Vec<usize>,
}

impl RollingAggregator {
    pub fn new(windows: Vec<usize>) -> Self {
        RollingAggregator { windows }
    }

    /// Column names in the order `compute` produces them
    pub fn column_names(&self) -> Vec<String> {
        RollingMetric::ALL
            .iter()
            .flat_map(|m| self.windows.iter().map(move |w| m.column_name(*w)))
            .collect()
    }

    pub fn compute(&self, timeline: &Timeline) -> RollingFeatures {
        let columns = RollingMetric::ALL
            .iter()
            .flat_map(|metric| {
                let raw: Vec<Option<f64>> =
                    timeline.entries.iter().map(|e| metric.value(e)).collect();
                self.windows
                    .iter()
                    .map(|window| RollingColumn {
                        metric: *metric,
                        window: *window,
                        values: causal_rolling_mean(&raw, *window),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        RollingFeatures { columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::perspective::PerspectiveRecord;
    use crate::{CornerStats, FighterKey, Outcome, Side};
    use chrono::NaiveDate;

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.map_or(false, |a| (a - b).abs() < 1e-9)
    }

    fn make_timeline(outcomes: &[Outcome], landed: &[Option<f64>]) -> Timeline {
        let records = outcomes
            .iter()
            .zip(landed)
            .enumerate()
            .map(|(i, (outcome, landed))| PerspectiveRecord {
                match_index: i,
                side: Side::Blue,
                fighter: FighterKey::Name("F".to_string()),
                name: "F".to_string(),
                opponent: FighterKey::Name(format!("O{}", i)),
                opponent_name: format!("O{}", i),
                event_name: None,
                date: NaiveDate::from_ymd_opt(2020, 1, 1 + i as u32),
                division: None,
                outcome: *outcome,
                elapsed_seconds: Some(300.0),
                total_rounds: Some(3.0),
                stats: CornerStats {
                    sig_str_landed: *landed,
                    ..CornerStats::default()
                },
                sig_str_absorbed: landed.map(|l| l * 2.0),
            })
            .collect();
        Timeline::from_records(FighterKey::Name("F".to_string()), records)
    }

    #[test]
    fn test_first_position_is_empty() {
        let out = causal_rolling_mean(&[Some(4.0), Some(8.0)], 3);
        assert_eq!(out[0], None);
    }

    #[test]
    fn test_second_position_is_prior_value() {
        for window in [1, 3, 5] {
            let out = causal_rolling_mean(&[Some(4.0), Some(8.0), Some(1.0)], window);
            assert_eq!(out[1], Some(4.0));
        }
    }

    #[test]
    fn test_win_rate_scenario() {
        let out = causal_rolling_mean(&[Some(1.0), Some(0.0), Some(1.0), Some(0.0)], 3);
        assert_eq!(out[0], None);
        assert!(approx(out[1], 1.0));
        assert!(approx(out[2], 0.5));
        assert!(approx(out[3], 2.0 / 3.0));
    }

    #[test]
    fn test_window_drops_old_values() {
        let values: Vec<_> = [10.0, 0.0, 0.0, 0.0].iter().map(|v| Some(*v)).collect();
        let out = causal_rolling_mean(&values, 2);
        assert!(approx(out[2], 5.0));
        assert!(approx(out[3], 0.0));
    }

    #[test]
    fn test_current_value_never_leaks() {
        let base = [Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        let mut changed = base;
        changed[2] = Some(100.0);

        let a = causal_rolling_mean(&base, 3);
        let b = causal_rolling_mean(&changed, 3);
        assert_eq!(a[..=2], b[..=2]);
        assert_ne!(a[3], b[3]);
    }

    #[test]
    fn test_missing_values_skipped() {
        let out = causal_rolling_mean(&[None, Some(3.0), None, None, None], 3);
        assert_eq!(out[1], None);
        assert!(approx(out[2], 3.0));
        assert!(approx(out[4], 3.0));

        // Value 3.0 has slid out of the window
        let out = causal_rolling_mean(&[Some(3.0), None, None, None, None], 3);
        assert_eq!(out[4], None);
    }

    #[test]
    fn test_aggregator_columns_are_independent() {
        let timeline = make_timeline(
            &[Outcome::Win, Outcome::Loss, Outcome::Win, Outcome::Undetermined],
            &[Some(10.0), Some(20.0), None, Some(40.0)],
        );
        let aggregator = RollingAggregator::new(vec![3, 5]);
        let features = aggregator.compute(&timeline);

        assert_eq!(features.columns.len(), 6);
        assert_eq!(aggregator.column_names().len(), 6);
        assert_eq!(aggregator.column_names()[0], "rolling_win_rate_3");

        let wins = features.get(RollingMetric::WinFlag, 3).unwrap();
        assert_eq!(wins[0], None);
        assert!(approx(wins[1], 1.0));
        assert!(approx(wins[2], 0.5));
        assert!(approx(wins[3], 2.0 / 3.0));

        let landed = features.get(RollingMetric::SigStrLanded, 5).unwrap();
        assert!(approx(landed[3], 15.0));
        let absorbed = features.get(RollingMetric::SigStrAbsorbed, 3).unwrap();
        assert!(approx(absorbed[3], 30.0));

        assert!(features.get(RollingMetric::WinFlag, 4).is_none());
        assert_eq!(features.row(0), vec![None; 6]);
    }
}
