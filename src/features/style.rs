//! Per-fight style classification
//!
//! Labels each fight as grappling-heavy, striking-heavy or balanced from
//! per-minute takedown attempts and significant strikes landed.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::perspective::PerspectiveRecord;
use crate::StyleConfig;

/// How a fighter fought in one fight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Style {
    Striker,
    Grappler,
    Balanced,
}

impl Style {
    pub const ALL: [Style; 3] = [Style::Striker, Style::Grappler, Style::Balanced];
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Style::Striker => write!(f, "Striker"),
            Style::Grappler => write!(f, "Grappler"),
            Style::Balanced => write!(f, "Balanced"),
        }
    }
}

/// Per-minute rates a style is judged on
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StyleRates {
    pub td_attempts_per_min: Option<f64>,
    pub sig_landed_per_min: Option<f64>,
}

impl StyleRates {
    /// Rates are None when fight time is zero or unknown
    pub fn from_record(record: &PerspectiveRecord) -> Self {
        let minutes = record.elapsed_minutes();
        let per_min = |v: Option<f64>| Some(v? / minutes?);
        StyleRates {
            td_attempts_per_min: per_min(record.stats.td_atmpted),
            sig_landed_per_min: per_min(record.stats.sig_str_landed),
        }
    }
}

/// Threshold-based style classifier
#[derive(Debug, Clone)]
pub struct StyleClassifier {
    config: StyleConfig,
}

impl Default for StyleClassifier {
    fn default() -> Self {
        Self::new(StyleConfig::default())
    }
}

impl StyleClassifier {
    pub fn new(config: StyleConfig) -> Self {
        StyleClassifier { config }
    }

    pub fn classify_rates(&self, rates: StyleRates) -> Style {
        let (td, strikes) = match (rates.td_attempts_per_min, rates.sig_landed_per_min) {
            (Some(td), Some(strikes)) => (td, strikes),
            _ => return Style::Balanced,
        };

        let grappling = td >= self.config.td_attempts_per_min;
        let striking = strikes >= self.config.sig_landed_per_min;
        match (grappling, striking) {
            (true, false) => Style::Grappler,
            (false, true) => Style::Striker,
            _ => Style::Balanced,
        }
    }

    pub fn classify(&self, record: &PerspectiveRecord) -> Style {
        self.classify_rates(StyleRates::from_record(record))
    }
}
