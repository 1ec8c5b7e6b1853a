//! Output tables
//!
//! Writes the fighter-level event table, the peak table and the career-stage
//! table. Every table is first written to a temporary file next to its
//! destination; destinations are only replaced once all tables are complete.
//! Replaced files are set aside until the last table lands and are put back
//! if any replacement fails.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};

use crate::pipeline::{EventRow, PipelineOutput};
use crate::{DataConfig, Result};

const EVENT_COLUMNS: [&str; 28] = [
    "fighter_key",
    "name",
    "opponent_key",
    "opponent",
    "side",
    "event_name",
    "date",
    "division",
    "outcome",
    "win_flag",
    "fight_number",
    "days_since_last_fight",
    "age_at_fight",
    "age_issue",
    "elapsed_seconds",
    "total_rounds",
    "kd",
    "sig_str_landed",
    "sig_str_atmpted",
    "sig_str_acc",
    "sig_str_absorbed",
    "total_str_landed",
    "total_str_atmpted",
    "td_landed",
    "td_atmpted",
    "td_acc",
    "sub_att",
    "ctrl",
];

const SCORE_COLUMNS: [&str; 4] = [
    "style",
    "style_performance_score",
    "performance_0_100",
    "performance_category",
];

/// Destinations for the output tables
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub events: PathBuf,
    pub peaks: PathBuf,
    pub stages: PathBuf,
}

impl OutputPaths {
    pub fn from_config(config: &DataConfig) -> Self {
        OutputPaths {
            events: PathBuf::from(&config.output_path),
            peaks: PathBuf::from(&config.peaks_path),
            stages: PathBuf::from(&config.stages_path),
        }
    }
}

#[derive(Serialize)]
struct PeakRow<'a> {
    fighter_key: String,
    name: &'a str,
    peak_fight_number: usize,
    peak_rolling_win_rate: f64,
    total_fights: usize,
}

#[derive(Serialize)]
struct StageRow {
    stage: String,
    fights: usize,
    win_rate: Option<f64>,
    mean_age: Option<f64>,
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Header of the event table for the given rolling columns
pub fn event_header(rolling_columns: &[String]) -> Vec<String> {
    EVENT_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(rolling_columns.iter().cloned())
        .chain(SCORE_COLUMNS.iter().map(|c| c.to_string()))
        .collect()
}

/// Flatten one event row in `event_header` order
pub fn event_record(row: &EventRow) -> Vec<String> {
    let entry = &row.entry;
    let record = &entry.record;
    let stats = &record.stats;

    let mut fields = vec![
        record.fighter.to_string(),
        record.name.clone(),
        record.opponent.to_string(),
        record.opponent_name.clone(),
        record.side.to_string(),
        record.event_name.clone().unwrap_or_default(),
        opt(record.date),
        record.division.clone().unwrap_or_default(),
        record.outcome.to_string(),
        opt(record.win_flag()),
        entry.fight_number.to_string(),
        opt(entry.days_since_last_fight),
        opt(entry.age_at_fight),
        opt(entry.age_issue),
        opt(record.elapsed_seconds),
        opt(record.total_rounds),
        opt(stats.kd),
        opt(stats.sig_str_landed),
        opt(stats.sig_str_atmpted),
        opt(stats.sig_str_acc),
        opt(record.sig_str_absorbed),
        opt(stats.total_str_landed),
        opt(stats.total_str_atmpted),
        opt(stats.td_landed),
        opt(stats.td_atmpted),
        opt(stats.td_acc),
        opt(stats.sub_att),
        opt(stats.ctrl),
    ];
    fields.extend(row.rolling.iter().map(|v| opt(*v)));
    fields.push(row.style.to_string());
    fields.push(opt(row.score.composite));
    fields.push(opt(row.score.scaled));
    fields.push(opt(row.score.band));
    fields
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Temporary file in the destination's directory
fn staging_file(path: &Path) -> Result<NamedTempFile> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir)?;
    Ok(NamedTempFile::new_in(dir)?)
}

/// Move `file` onto `path`, returning the previous contents of `path` if any
fn replace(file: NamedTempFile, path: &Path) -> Result<Option<TempPath>> {
    let backup = if path.exists() {
        let backup = NamedTempFile::new_in(parent_dir(path))?.into_temp_path();
        std::fs::rename(path, &backup)?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = file.persist(path) {
        if backup.is_some() {
            restore(path, backup);
        }
        return Err(e.into());
    }
    Ok(backup)
}

fn restore(path: &Path, backup: Option<TempPath>) {
    let restored = match backup {
        Some(backup) => backup.persist(path).map_err(|e| e.error),
        None => std::fs::remove_file(path),
    };
    if let Err(e) = restored {
        log::error!("Could not roll back {}: {}", path.display(), e);
    }
}

/// Replace every destination or, on failure, none of them
fn commit(staged: Vec<(NamedTempFile, &Path)>) -> Result<()> {
    if let Some((_, path)) = staged.iter().find(|(_, path)| path.is_dir()) {
        return Err(std::io::Error::other(format!(
            "output path is a directory: {}",
            path.display()
        ))
        .into());
    }

    let mut replaced: Vec<(&Path, Option<TempPath>)> = Vec::with_capacity(staged.len());
    for (file, path) in staged {
        match replace(file, path) {
            Ok(backup) => replaced.push((path, backup)),
            Err(e) => {
                for (path, backup) in replaced.into_iter().rev() {
                    restore(path, backup);
                }
                return Err(e);
            }
        }
    }

    // Dropping the backups deletes the previous contents
    for (path, _) in &replaced {
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}

fn stage_events(output: &PipelineOutput, path: &Path) -> Result<NamedTempFile> {
    let file = staging_file(path)?;
    let mut writer = csv::Writer::from_writer(file.as_file());
    writer.write_record(event_header(&output.rolling_columns))?;
    for row in &output.rows {
        writer.write_record(event_record(row))?;
    }
    writer.flush()?;
    drop(writer);
    Ok(file)
}

fn stage_table<T: Serialize>(rows: &[T], header: &[&str], path: &Path) -> Result<NamedTempFile> {
    let file = staging_file(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file.as_file());
    // Written explicitly so an empty table still carries its header
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    drop(writer);
    Ok(file)
}

/// Write all output tables, replacing none of them unless all were written
pub fn write_outputs(output: &PipelineOutput, paths: &OutputPaths) -> Result<()> {
    let peaks: Vec<PeakRow> = output
        .peaks
        .iter()
        .map(|p| PeakRow {
            fighter_key: p.fighter_key.to_string(),
            name: &p.name,
            peak_fight_number: p.peak_fight_number,
            peak_rolling_win_rate: p.peak_rolling_win_rate,
            total_fights: p.total_fights,
        })
        .collect();
    let stages: Vec<StageRow> = output
        .stages
        .iter()
        .map(|s| StageRow {
            stage: s.stage.to_string(),
            fights: s.fights,
            win_rate: s.win_rate,
            mean_age: s.mean_age,
        })
        .collect();

    let staged = vec![
        (stage_events(output, &paths.events)?, paths.events.as_path()),
        (
            stage_table(
                &peaks,
                &[
                    "fighter_key",
                    "name",
                    "peak_fight_number",
                    "peak_rolling_win_rate",
                    "total_fights",
                ],
                &paths.peaks,
            )?,
            paths.peaks.as_path(),
        ),
        (
            stage_table(&stages, &["stage", "fights", "win_rate", "mean_age"], &paths.stages)?,
            paths.stages.as_path(),
        ),
    ];

    commit(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use crate::{Config, CornerStats, FighterId, MatchRecord};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn make_output() -> PipelineOutput {
        let corner = |id: &str, landed: f64| CornerStats {
            id: Some(FighterId(id.to_string())),
            name: id.to_uppercase(),
            sig_str_landed: Some(landed),
            td_landed: Some(1.0),
            td_atmpted: Some(landed / 10.0),
            ctrl: Some(landed),
            kd: Some(1.0),
            total_str_landed: Some(landed + 5.0),
            sub_att: Some(2.0),
            ..CornerStats::default()
        };
        let matches: Vec<MatchRecord> = (0..6)
            .map(|i| MatchRecord {
                index: i,
                event_name: None,
                date: NaiveDate::from_ymd_opt(2020, 1 + i as u32, 1),
                division: None,
                winner: None,
                winner_id: Some(FighterId("a".to_string())),
                finish_round: Some(1.0),
                match_time_sec: Some(200.0 + i as f64),
                total_rounds: Some(3.0),
                red: corner("a", 30.0 + i as f64),
                blue: corner(&format!("b{}", i), 10.0 + 2.0 * i as f64),
            })
            .collect();
        Pipeline::new(Config::default()).run(&matches).unwrap()
    }

    fn make_paths(dir: &Path) -> OutputPaths {
        OutputPaths {
            events: dir.join("out/events.csv"),
            peaks: dir.join("out/peaks.csv"),
            stages: dir.join("out/stages.csv"),
        }
    }

    #[test]
    fn test_event_header_layout() {
        let header = event_header(&["rolling_win_rate_3".to_string()]);
        assert_eq!(header.len(), 28 + 1 + 4);
        assert_eq!(header[0], "fighter_key");
        assert_eq!(header[28], "rolling_win_rate_3");
        assert_eq!(header.last().map(String::as_str), Some("performance_category"));
    }

    #[test]
    fn test_event_record_matches_header() {
        let output = make_output();
        let header = event_header(&output.rolling_columns);
        for row in &output.rows {
            assert_eq!(event_record(row).len(), header.len());
        }

        let first = event_record(&output.rows[0]);
        assert_eq!(first[0], "a");
        assert_eq!(first[8], "win");
        assert_eq!(first[9], "1");
        // No prior fight
        assert_eq!(first[11], "");
        assert_eq!(first[13], "missing_birth_date");

        let field = |column: &str| {
            let i = header.iter().position(|c| c == column).unwrap();
            first[i].clone()
        };
        assert_eq!(field("total_rounds"), "3");
        assert_eq!(field("kd"), "1");
        assert_eq!(field("total_str_landed"), "35");
        assert_eq!(field("total_str_atmpted"), "");
        assert_eq!(field("sub_att"), "2");
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempdir().unwrap();
        let paths = make_paths(dir.path());
        let output = make_output();

        write_outputs(&output, &paths).unwrap();

        let mut events = csv::Reader::from_path(&paths.events).unwrap();
        assert_eq!(events.headers().unwrap().len(), 28 + 6 + 4);
        assert_eq!(events.records().count(), 12);

        let mut peaks = csv::Reader::from_path(&paths.peaks).unwrap();
        let rows: Vec<_> = peaks.records().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "a");
        assert_eq!(&rows[0][1], "A");

        let stages = std::fs::read_to_string(&paths.stages).unwrap();
        assert!(stages.starts_with("stage,fights,win_rate,mean_age"));
        assert!(stages.contains("Early (1-5),5,"));
        assert!(stages.contains("Mid (6-10),1,"));
    }

    #[test]
    fn test_empty_tables_keep_headers() {
        let dir = tempdir().unwrap();
        let paths = make_paths(dir.path());

        write_outputs(&PipelineOutput::default(), &paths).unwrap();

        let peaks = std::fs::read_to_string(&paths.peaks).unwrap();
        assert_eq!(peaks.trim(), "fighter_key,name,peak_fight_number,peak_rolling_win_rate,total_fights");
    }

    #[test]
    fn test_failed_write_leaves_no_outputs() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "not a directory").unwrap();

        let paths = OutputPaths {
            events: dir.path().join("events.csv"),
            peaks: dir.path().join("peaks.csv"),
            // Parent is a regular file, so staging this table fails
            stages: blocker.join("stages.csv"),
        };

        assert!(write_outputs(&make_output(), &paths).is_err());
        assert!(!paths.events.exists());
        assert!(!paths.peaks.exists());
    }

    #[test]
    fn test_directory_destination_leaves_no_outputs() {
        let dir = tempdir().unwrap();
        let paths = make_paths(dir.path());
        std::fs::create_dir_all(&paths.peaks).unwrap();
        std::fs::write(paths.peaks.join("keep.txt"), "x").unwrap();

        assert!(write_outputs(&make_output(), &paths).is_err());
        assert!(!paths.events.exists());
        assert!(!paths.stages.exists());
        assert!(paths.peaks.join("keep.txt").exists());
    }

    #[test]
    fn test_failed_run_keeps_previous_outputs() {
        let dir = tempdir().unwrap();
        let paths = make_paths(dir.path());
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        std::fs::write(&paths.events, "previous events").unwrap();
        std::fs::create_dir_all(&paths.stages).unwrap();
        std::fs::write(paths.stages.join("keep.txt"), "x").unwrap();

        assert!(write_outputs(&make_output(), &paths).is_err());
        assert_eq!(std::fs::read_to_string(&paths.events).unwrap(), "previous events");
        assert!(!paths.peaks.exists());
    }

    #[test]
    fn test_overwrite_leaves_no_stray_files() {
        let dir = tempdir().unwrap();
        let paths = make_paths(dir.path());
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        for path in [&paths.events, &paths.peaks, &paths.stages] {
            std::fs::write(path, "stale").unwrap();
        }

        write_outputs(&make_output(), &paths).unwrap();

        let entries = std::fs::read_dir(dir.path().join("out")).unwrap().count();
        assert_eq!(entries, 3);
        let events = std::fs::read_to_string(&paths.events).unwrap();
        assert!(events.starts_with("fighter_key,"));
    }
}
