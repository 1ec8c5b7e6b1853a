//! End-to-end career pipeline
//!
//! Runs unpivoting, timeline building, rolling form, style, scoring and peak
//! detection over a batch of fights. Per-fighter work runs in parallel; the
//! cohort-wide scoring pass starts only after every fighter is processed.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::features::perspective::unpivot_all;
use crate::features::timeline::build_timelines;
use crate::features::{
    PeakDetector, PeakWindowRecord, PerformanceInputs, PerformanceScore, PerformanceScorer,
    RollingAggregator, RollingFeatures, StageSummary, Style, StyleClassifier, Timeline,
    TimelineEntry,
};
use crate::{Config, FightError, FighterKey, MatchRecord, Result};

/// One fighter's view of one fight with every derived feature
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub entry: TimelineEntry,
    /// Rolling values in `PipelineOutput::rolling_columns` order
    pub rolling: Vec<Option<f64>>,
    pub style: Style,
    pub score: PerformanceScore,
}

impl EventRow {
    pub fn fighter(&self) -> &FighterKey {
        &self.entry.record.fighter
    }

    pub fn win_flag(&self) -> Option<f64> {
        self.entry.record.win_flag()
    }
}

/// Cohort-level counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub total_fights: usize,
    pub total_rows: usize,
    pub unique_fighters: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Everything a run produces
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub rolling_columns: Vec<String>,
    /// Grouped by fighter, each career in fight order
    pub rows: Vec<EventRow>,
    pub peaks: Vec<PeakWindowRecord>,
    pub stages: Vec<StageSummary>,
    pub summary: CohortSummary,
}

impl PipelineOutput {
    /// Rows for the fighter matching `query` by key, id or name
    ///
    /// Names are compared case-insensitively; when a name is shared by several
    /// fighters the one with the most fights is returned.
    pub fn career(&self, query: &str) -> Result<Vec<&EventRow>> {
        let wanted = FighterKey::parse(query);
        let by_key: Vec<&EventRow> = self.rows.iter().filter(|r| *r.fighter() == wanted).collect();
        if !by_key.is_empty() {
            return Ok(by_key);
        }

        let needle = query.trim().to_lowercase();
        let keys: BTreeSet<&FighterKey> = self
            .rows
            .iter()
            .filter(|r| r.entry.record.name.to_lowercase() == needle)
            .map(|r| r.fighter())
            .collect();
        if keys.len() > 1 {
            log::warn!(
                "{} fighters are named '{}'; showing the longest career",
                keys.len(),
                query
            );
        }

        // Reversed so the first key in order wins a tie
        keys.into_iter()
            .rev()
            .map(|key| {
                self.rows
                    .iter()
                    .filter(|r| r.fighter() == key)
                    .collect::<Vec<_>>()
            })
            .max_by_key(|rows| rows.len())
            .ok_or_else(|| FightError::UnknownFighter(query.to_string()))
    }
}

/// Per-fighter results produced before cohort scoring
struct Career {
    timeline: Timeline,
    rolling: RollingFeatures,
    styles: Vec<Style>,
    inputs: Vec<PerformanceInputs>,
}

pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Pipeline { config }
    }

    pub fn run(&self, matches: &[MatchRecord]) -> Result<PipelineOutput> {
        self.config.validate()?;

        match self.config.runtime.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| FightError::Config(format!("Failed to build thread pool: {}", e)))?;
                Ok(pool.install(|| self.execute(matches)))
            }
            None => Ok(self.execute(matches)),
        }
    }

    fn execute(&self, matches: &[MatchRecord]) -> PipelineOutput {
        let perspectives = unpivot_all(matches, self.config.timeline.round_seconds);
        let total_rows = perspectives.len();
        let timelines = build_timelines(perspectives);

        let aggregator = RollingAggregator::new(self.config.rolling.window_sizes.clone());
        let classifier = StyleClassifier::new(self.config.style.clone());

        let careers: Vec<Career> = timelines
            .into_par_iter()
            .map(|timeline| {
                let rolling = aggregator.compute(&timeline);
                let styles: Vec<Style> = timeline
                    .entries
                    .iter()
                    .map(|e| classifier.classify(&e.record))
                    .collect();
                let inputs = timeline
                    .entries
                    .iter()
                    .zip(&styles)
                    .map(|(e, style)| PerformanceInputs::from_record(&e.record, *style))
                    .collect();
                Career {
                    timeline,
                    rolling,
                    styles,
                    inputs,
                }
            })
            .collect();
        log::info!("Computed rolling form and style for {} fighters", careers.len());

        // Cohort scoring needs every fighter's inputs
        let cohort: Vec<PerformanceInputs> =
            careers.iter().flat_map(|c| c.inputs.iter().copied()).collect();
        let scores = PerformanceScorer::new(self.config.scoring.clone()).score_all(&cohort);
        log::info!("Scored {} fights", scores.len());

        let detector = PeakDetector::new(self.config.peak.clone());
        let peaks: Vec<PeakWindowRecord> = careers
            .par_iter()
            .filter_map(|c| detector.detect(&c.timeline, &c.rolling))
            .collect();
        let stages = detector.stage_summary(careers.iter().map(|c| &c.timeline));
        log::info!("Found peaks for {} fighters", peaks.len());

        let summary = CohortSummary {
            total_fights: matches.len(),
            total_rows,
            unique_fighters: careers.len(),
            first_date: matches.iter().filter_map(|m| m.date).min(),
            last_date: matches.iter().filter_map(|m| m.date).max(),
        };

        let mut scores = scores.into_iter();
        let mut rows = Vec::with_capacity(total_rows);
        for career in careers {
            for (i, (entry, style)) in career
                .timeline
                .entries
                .into_iter()
                .zip(career.styles)
                .enumerate()
            {
                rows.push(EventRow {
                    entry,
                    rolling: career.rolling.row(i),
                    style,
                    score: scores.next().unwrap_or_default(),
                });
            }
        }

        PipelineOutput {
            rolling_columns: aggregator.column_names(),
            rows,
            peaks,
            stages,
            summary,
        }
    }
}
