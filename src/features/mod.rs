//! Career feature extraction
//!
//! Turns two-sided fight records into per-fighter career features.

pub mod peak;
pub mod performance;
pub mod perspective;
pub mod rolling;
pub mod style;
pub mod timeline;

pub use peak::{CareerStage, PeakDetector, PeakWindowRecord, StageSummary};
pub use performance::{PerformanceBand, PerformanceInputs, PerformanceScore, PerformanceScorer};
pub use perspective::PerspectiveRecord;
pub use rolling::{RollingAggregator, RollingFeatures, RollingMetric};
pub use style::{Style, StyleClassifier};
pub use timeline::{AgeIssue, Timeline, TimelineEntry};
