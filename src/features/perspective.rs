//! Fighter-perspective records
//!
//! Re-expresses each two-sided fight as two records, one from each corner's
//! point of view, with the opponent's output relabelled as strikes absorbed.

use chrono::NaiveDate;

use crate::{CornerStats, FighterKey, MatchRecord, Outcome, Side};

/// One fighter's view of one fight
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveRecord {
    /// Index of the source fight in the ingested file
    pub match_index: usize,
    pub side: Side,
    pub fighter: FighterKey,
    pub name: String,
    pub opponent: FighterKey,
    pub opponent_name: String,
    pub event_name: Option<String>,
    pub date: Option<NaiveDate>,
    pub division: Option<String>,
    pub outcome: Outcome,
    /// Total fight time in seconds
    pub elapsed_seconds: Option<f64>,
    /// Scheduled rounds, shared by both corners
    pub total_rounds: Option<f64>,
    /// This fighter's own numbers for the fight
    pub stats: CornerStats,
    /// Significant strikes landed by the opponent
    pub sig_str_absorbed: Option<f64>,
}

impl PerspectiveRecord {
    pub fn win_flag(&self) -> Option<f64> {
        self.outcome.flag()
    }

    /// Fight time in minutes, None when unknown or zero
    pub fn elapsed_minutes(&self) -> Option<f64> {
        self.elapsed_seconds
            .filter(|s| *s > 0.0)
            .map(|s| s / 60.0)
    }
}

/// Split one fight into its red-corner and blue-corner perspectives
pub fn unpivot(record: &MatchRecord, round_seconds: f64) -> [PerspectiveRecord; 2] {
    Side::BOTH.map(|side| perspective(record, side, round_seconds))
}

/// Split every fight; output holds exactly two records per input, red first
pub fn unpivot_all(records: &[MatchRecord], round_seconds: f64) -> Vec<PerspectiveRecord> {
    let perspectives: Vec<_> = records
        .iter()
        .flat_map(|r| unpivot(r, round_seconds))
        .collect();
    log::debug!(
        "Unpivoted {} fights into {} fighter records",
        records.len(),
        perspectives.len()
    );
    perspectives
}

fn perspective(record: &MatchRecord, side: Side, round_seconds: f64) -> PerspectiveRecord {
    let own = record.corner(side);
    let opponent = record.corner(side.opponent());

    PerspectiveRecord {
        match_index: record.index,
        side,
        fighter: own.key(),
        name: own.name.clone(),
        opponent: opponent.key(),
        opponent_name: opponent.name.clone(),
        event_name: record.event_name.clone(),
        date: record.date,
        division: record.division.clone(),
        outcome: record.outcome_for(side),
        elapsed_seconds: record.elapsed_seconds(round_seconds),
        total_rounds: record.total_rounds,
        stats: own.clone(),
        sig_str_absorbed: opponent.sig_str_landed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FighterId;

    fn make_corner(id: &str, name: &str, landed: Option<f64>) -> CornerStats {
        CornerStats {
            id: Some(FighterId(id.to_string())),
            name: name.to_string(),
            sig_str_landed: landed,
            td_atmpted: Some(2.0),
            ..CornerStats::default()
        }
    }

    fn make_match(index: usize, red_landed: Option<f64>, blue_landed: Option<f64>) -> MatchRecord {
        MatchRecord {
            index,
            event_name: Some("UFC 300".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 4, 13),
            division: Some("Lightweight".to_string()),
            winner: Some("Red".to_string()),
            winner_id: Some(FighterId("r".to_string())),
            finish_round: Some(2.0),
            match_time_sec: Some(60.0),
            total_rounds: Some(3.0),
            red: make_corner("r", "Red", red_landed),
            blue: make_corner("b", "Blue", blue_landed),
        }
    }

    #[test]
    fn test_two_records_per_fight() {
        let fights: Vec<_> = (0..7).map(|i| make_match(i, Some(10.0), Some(20.0))).collect();
        let records = unpivot_all(&fights, 300.0);
        assert_eq!(records.len(), 14);
    }

    #[test]
    fn test_absorbed_mirrors_landed() {
        let [red, blue] = unpivot(&make_match(0, Some(31.0), Some(17.0)), 300.0);

        assert_eq!(red.side, Side::Red);
        assert_eq!(blue.side, Side::Blue);
        assert_eq!(red.sig_str_absorbed, blue.stats.sig_str_landed);
        assert_eq!(blue.sig_str_absorbed, red.stats.sig_str_landed);
        assert_eq!(red.sig_str_absorbed, Some(17.0));
    }

    #[test]
    fn test_missing_landed_stays_missing() {
        let [red, _] = unpivot(&make_match(0, Some(31.0), None), 300.0);
        assert_eq!(red.sig_str_absorbed, None);
    }

    #[test]
    fn test_shared_fields_copied() {
        let fight = make_match(4, Some(1.0), Some(2.0));
        let [red, blue] = unpivot(&fight, 300.0);

        for r in [&red, &blue] {
            assert_eq!(r.match_index, 4);
            assert_eq!(r.date, fight.date);
            assert_eq!(r.division.as_deref(), Some("Lightweight"));
            assert_eq!(r.event_name.as_deref(), Some("UFC 300"));
            assert_eq!(r.elapsed_seconds, Some(360.0));
            assert_eq!(r.total_rounds, Some(3.0));
        }
        assert_eq!(red.opponent, blue.fighter);
        assert_eq!(blue.opponent, red.fighter);
        assert_eq!(red.opponent_name, "Blue");
    }

    #[test]
    fn test_outcomes() {
        let [red, blue] = unpivot(&make_match(0, None, None), 300.0);
        assert_eq!(red.win_flag(), Some(1.0));
        assert_eq!(blue.win_flag(), Some(0.0));

        let mut draw = make_match(0, None, None);
        draw.winner = None;
        draw.winner_id = None;
        let [red, blue] = unpivot(&draw, 300.0);
        assert_eq!(red.win_flag(), None);
        assert_eq!(blue.win_flag(), None);
    }

    #[test]
    fn test_zero_elapsed_minutes() {
        let mut fight = make_match(0, None, None);
        fight.finish_round = Some(1.0);
        fight.match_time_sec = Some(0.0);
        let [red, _] = unpivot(&fight, 300.0);
        assert_eq!(red.elapsed_seconds, Some(0.0));
        assert_eq!(red.elapsed_minutes(), None);
    }
}
