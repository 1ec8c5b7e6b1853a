//! Per-fighter career timelines
//!
//! Groups fighter-perspective records by fighter, orders each career
//! chronologically and attaches fight number, layoff length and age at fight.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::perspective::PerspectiveRecord;
use crate::FighterKey;

const DAYS_PER_YEAR: f64 = 365.25;

/// Why an age could not be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeIssue {
    MissingBirthDate,
    MissingEventDate,
    /// Birth date recorded after the fight date
    BirthAfterEvent,
}

impl fmt::Display for AgeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgeIssue::MissingBirthDate => write!(f, "missing_birth_date"),
            AgeIssue::MissingEventDate => write!(f, "missing_event_date"),
            AgeIssue::BirthAfterEvent => write!(f, "birth_after_event"),
        }
    }
}

/// A fight placed in the fighter's career
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub record: PerspectiveRecord,
    /// 1-based position in the career
    pub fight_number: usize,
    pub days_since_last_fight: Option<i64>,
    pub age_at_fight: Option<f64>,
    pub age_issue: Option<AgeIssue>,
}

/// One fighter's fights in chronological order
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub fighter: FighterKey,
    pub entries: Vec<TimelineEntry>,
}

impl Timeline {
    /// Order a single fighter's records and derive career fields
    ///
    /// Fights are ordered by date with undated fights last; same-day fights keep
    /// their order in the source file.
    pub fn from_records(fighter: FighterKey, mut records: Vec<PerspectiveRecord>) -> Self {
        records.sort_by_key(|r| (r.date.is_none(), r.date, r.match_index, r.side));

        let mut previous_date: Option<Option<NaiveDate>> = None;
        let entries = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                let days_since_last_fight = match previous_date {
                    Some(Some(prev)) => record.date.map(|d| (d - prev).num_days()),
                    _ => None,
                };
                previous_date = Some(record.date);

                let (age_at_fight, age_issue) = age_at(record.stats.dob, record.date);

                TimelineEntry {
                    record,
                    fight_number: i + 1,
                    days_since_last_fight,
                    age_at_fight,
                    age_issue,
                }
            })
            .collect();

        Timeline { fighter, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recently used name for the fighter
    pub fn name(&self) -> &str {
        self.entries
            .last()
            .map(|e| e.record.name.as_str())
            .unwrap_or_default()
    }
}

/// Age in fractional years at `date`
pub fn age_at(
    dob: Option<NaiveDate>,
    date: Option<NaiveDate>,
) -> (Option<f64>, Option<AgeIssue>) {
    match (dob, date) {
        (None, _) => (None, Some(AgeIssue::MissingBirthDate)),
        (_, None) => (None, Some(AgeIssue::MissingEventDate)),
        (Some(dob), Some(date)) if dob > date => (None, Some(AgeIssue::BirthAfterEvent)),
        (Some(dob), Some(date)) => (Some((date - dob).num_days() as f64 / DAYS_PER_YEAR), None),
    }
}

/// Build a timeline for every fighter, in fighter-key order
pub fn build_timelines(records: Vec<PerspectiveRecord>) -> Vec<Timeline> {
    let mut partitions: BTreeMap<FighterKey, Vec<PerspectiveRecord>> = BTreeMap::new();
    for record in records {
        partitions.entry(record.fighter.clone()).or_default().push(record);
    }

    let timelines: Vec<Timeline> = partitions
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(fighter, records)| Timeline::from_records(fighter, records))
        .collect();

    let birth_after_event = timelines
        .iter()
        .flat_map(|t| &t.entries)
        .filter(|e| e.age_issue == Some(AgeIssue::BirthAfterEvent))
        .count();
    if birth_after_event > 0 {
        log::warn!(
            "{} fights have a birth date after the fight date; age left empty",
            birth_after_event
        );
    }
    log::info!("Built {} fighter timelines", timelines.len());

    timelines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CornerStats, FighterId, Outcome, Side};

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn make_record(
        fighter: &str,
        match_index: usize,
        fight_date: Option<NaiveDate>,
        dob: Option<NaiveDate>,
    ) -> PerspectiveRecord {
        let key = FighterKey::Id(FighterId(fighter.to_string()));
        PerspectiveRecord {
            match_index,
            side: Side::Red,
            fighter: key.clone(),
            name: fighter.to_uppercase(),
            opponent: FighterKey::Name("opp".to_string()),
            opponent_name: "opp".to_string(),
            event_name: None,
            date: fight_date,
            division: None,
            outcome: Outcome::Win,
            elapsed_seconds: Some(900.0),
            total_rounds: Some(3.0),
            stats: CornerStats {
                id: Some(FighterId(fighter.to_string())),
                name: fighter.to_uppercase(),
                dob,
                ..CornerStats::default()
            },
            sig_str_absorbed: None,
        }
    }

    #[test]
    fn test_fight_numbers_follow_date() {
        let records = vec![
            make_record("a", 0, date(2022, 5, 1), None),
            make_record("a", 1, date(2020, 1, 1), None),
            make_record("a", 2, date(2021, 3, 1), None),
        ];
        let timeline = Timeline::from_records(records[0].fighter.clone(), records);

        let numbers: Vec<_> = timeline.entries.iter().map(|e| e.fight_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        let indices: Vec<_> = timeline.entries.iter().map(|e| e.record.match_index).collect();
        assert_eq!(indices, vec![1, 2, 0]);
        assert!(timeline
            .entries
            .windows(2)
            .all(|w| w[0].record.date <= w[1].record.date));
    }

    #[test]
    fn test_same_day_tie_break_is_ingestion_order() {
        let records = vec![
            make_record("a", 9, date(2020, 1, 1), None),
            make_record("a", 3, date(2020, 1, 1), None),
            make_record("a", 5, date(2020, 1, 1), None),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        let t1 = Timeline::from_records(records[0].fighter.clone(), records);
        let t2 = Timeline::from_records(reversed[0].fighter.clone(), reversed);

        let order = |t: &Timeline| t.entries.iter().map(|e| e.record.match_index).collect::<Vec<_>>();
        assert_eq!(order(&t1), vec![3, 5, 9]);
        assert_eq!(order(&t1), order(&t2));
    }

    #[test]
    fn test_undated_fights_go_last() {
        let records = vec![
            make_record("a", 0, None, None),
            make_record("a", 1, date(2020, 1, 1), None),
            make_record("a", 2, date(2020, 2, 1), None),
        ];
        let timeline = Timeline::from_records(records[0].fighter.clone(), records);

        assert_eq!(timeline.entries[2].record.match_index, 0);
        assert_eq!(timeline.entries[2].days_since_last_fight, None);
        assert_eq!(timeline.entries[2].fight_number, 3);
    }

    #[test]
    fn test_days_since_last_fight() {
        let records = vec![
            make_record("a", 0, date(2020, 1, 1), None),
            make_record("a", 1, date(2020, 3, 1), None),
        ];
        let timeline = Timeline::from_records(records[0].fighter.clone(), records);

        assert_eq!(timeline.entries[0].days_since_last_fight, None);
        assert_eq!(timeline.entries[1].days_since_last_fight, Some(60));
    }

    #[test]
    fn test_age_at_fight() {
        let (age, issue) = age_at(date(1990, 1, 1), date(2020, 1, 1));
        let age = age.unwrap();
        assert!((age - 10957.0 / 365.25).abs() < 1e-9);
        assert!((age - 30.0).abs() < 0.01);
        assert_eq!(issue, None);
    }

    #[test]
    fn test_age_issues() {
        assert_eq!(age_at(None, date(2020, 1, 1)), (None, Some(AgeIssue::MissingBirthDate)));
        assert_eq!(age_at(date(1990, 1, 1), None), (None, Some(AgeIssue::MissingEventDate)));
        assert_eq!(
            age_at(date(2021, 1, 1), date(2020, 1, 1)),
            (None, Some(AgeIssue::BirthAfterEvent))
        );
    }

    #[test]
    fn test_build_timelines_partitions_by_fighter() {
        let records = vec![
            make_record("b", 0, date(2020, 1, 1), None),
            make_record("a", 1, date(2020, 2, 1), None),
            make_record("b", 2, date(2020, 3, 1), None),
            make_record("a", 3, date(2020, 4, 1), None),
            make_record("a", 4, date(2020, 5, 1), None),
        ];
        let timelines = build_timelines(records);

        assert_eq!(timelines.len(), 2);
        assert_eq!(timelines[0].fighter, FighterKey::Id(FighterId("a".to_string())));
        assert_eq!(timelines[0].len(), 3);
        assert_eq!(timelines[1].len(), 2);
        assert_eq!(timelines[0].name(), "A");
        for t in &timelines {
            let numbers: Vec<_> = t.entries.iter().map(|e| e.fight_number).collect();
            assert_eq!(numbers, (1..=t.len()).collect::<Vec<_>>());
            assert!(t.entries.iter().all(|e| e.record.fighter == t.fighter));
        }
    }
}
