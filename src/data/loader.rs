//! CSV loader for fight records
//!
//! Header names are normalized before lookup, string fields are trimmed and
//! placeholder tokens such as `NA` or `null` read as missing. Values that fail
//! to parse are treated as missing; only an absent required column is fatal.

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use crate::{CornerStats, DataConfig, FightError, FighterId, MatchRecord, Result, Side};

/// Tokens that stand for a missing value, compared case-insensitively
const MISSING_TOKENS: [&str; 5] = ["", "na", "n/a", "null", "none"];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y"];
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const REQUIRED_COLUMNS: [&str; 9] = [
    "r_id",
    "r_name",
    "b_id",
    "b_name",
    "date",
    "winner",
    "winner_id",
    "finish_round",
    "match_time_sec",
];

/// Per-corner columns without the `r_`/`b_` prefix
const REQUIRED_CORNER_COLUMNS: [&str; 8] = [
    "dob",
    "sig_str_landed",
    "sig_str_atmpted",
    "sig_str_acc",
    "td_landed",
    "td_atmpted",
    "td_acc",
    "ctrl",
];

/// Normalize a header: trimmed, lowercase, spaces replaced by underscores
pub fn normalize_column(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Trimmed value, or None for placeholder tokens
pub fn clean_field(raw: &str) -> Option<&str> {
    let value = raw.trim();
    let lower = value.to_lowercase();
    if MISSING_TOKENS.contains(&lower.as_str()) {
        None
    } else {
        Some(value)
    }
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
                .ok()
                .map(|dt| dt.date())
        })
}

/// Parse a number; `45%` reads as 0.45 and `m:ss` as seconds
pub fn parse_number(value: &str) -> Option<f64> {
    if let Some(pct) = value.strip_suffix('%') {
        return pct.trim().parse::<f64>().ok().map(|v| v / 100.0);
    }
    if let Some((minutes, seconds)) = value.split_once(':') {
        let minutes = minutes.trim().parse::<u32>().ok()?;
        let seconds = seconds.trim().parse::<f64>().ok()?;
        if !(0.0..60.0).contains(&seconds) {
            return None;
        }
        return Some(minutes as f64 * 60.0 + seconds);
    }
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Maps normalized column names to positions
struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    fn new(headers: &StringRecord) -> Self {
        let mut positions = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            // First occurrence wins for duplicated headers
            positions.entry(normalize_column(header)).or_insert(i);
        }
        ColumnIndex { positions }
    }

    fn required(&self, column: &str) -> Result<usize> {
        self.optional(column).ok_or_else(|| FightError::MissingColumn {
            column: column.to_string(),
        })
    }

    fn optional(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }
}

/// Column positions for one corner
struct CornerColumns {
    id: usize,
    name: usize,
    dob: usize,
    kd: Option<usize>,
    sig_str_landed: usize,
    sig_str_atmpted: usize,
    sig_str_acc: usize,
    total_str_landed: Option<usize>,
    total_str_atmpted: Option<usize>,
    td_landed: usize,
    td_atmpted: usize,
    td_acc: usize,
    sub_att: Option<usize>,
    ctrl: usize,
}

impl CornerColumns {
    fn resolve(index: &ColumnIndex, side: Side) -> Result<Self> {
        let col = |name: &str| format!("{}{}", side.prefix(), name);
        Ok(CornerColumns {
            id: index.required(&col("id"))?,
            name: index.required(&col("name"))?,
            dob: index.required(&col("dob"))?,
            kd: index.optional(&col("kd")),
            sig_str_landed: index.required(&col("sig_str_landed"))?,
            sig_str_atmpted: index.required(&col("sig_str_atmpted"))?,
            sig_str_acc: index.required(&col("sig_str_acc"))?,
            total_str_landed: index.optional(&col("total_str_landed")),
            total_str_atmpted: index.optional(&col("total_str_atmpted")),
            td_landed: index.required(&col("td_landed"))?,
            td_atmpted: index.required(&col("td_atmpted"))?,
            td_acc: index.required(&col("td_acc"))?,
            sub_att: index.optional(&col("sub_att")),
            ctrl: index.required(&col("ctrl"))?,
        })
    }
}

/// Column positions for the whole record
struct Schema {
    event_name: Option<usize>,
    date: usize,
    division: Option<usize>,
    winner: usize,
    winner_id: usize,
    finish_round: usize,
    match_time_sec: usize,
    total_rounds: Option<usize>,
    red: CornerColumns,
    blue: CornerColumns,
}

impl Schema {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let index = ColumnIndex::new(headers);

        // Report the first missing column in a stable order
        for column in REQUIRED_COLUMNS {
            index.required(column)?;
        }
        for side in Side::BOTH {
            for column in REQUIRED_CORNER_COLUMNS {
                index.required(&format!("{}{}", side.prefix(), column))?;
            }
        }

        Ok(Schema {
            event_name: index.optional("event_name"),
            date: index.required("date")?,
            division: index.optional("division"),
            winner: index.required("winner")?,
            winner_id: index.required("winner_id")?,
            finish_round: index.required("finish_round")?,
            match_time_sec: index.required("match_time_sec")?,
            total_rounds: index.optional("total_rounds"),
            red: CornerColumns::resolve(&index, Side::Red)?,
            blue: CornerColumns::resolve(&index, Side::Blue)?,
        })
    }
}

/// Cleaned view of one CSV row
struct Row<'a> {
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    fn text(&self, idx: usize) -> Option<&'a str> {
        self.record.get(idx).and_then(clean_field)
    }

    fn opt_text(&self, idx: Option<usize>) -> Option<&'a str> {
        idx.and_then(|i| self.text(i))
    }

    fn number(&self, idx: usize) -> Option<f64> {
        self.text(idx).and_then(parse_number)
    }

    fn opt_number(&self, idx: Option<usize>) -> Option<f64> {
        idx.and_then(|i| self.number(i))
    }

    fn date(&self, idx: usize) -> Option<NaiveDate> {
        let value = self.text(idx)?;
        let date = parse_date(value);
        if date.is_none() {
            log::debug!("Unparseable date '{}'", value);
        }
        date
    }

    fn corner(&self, cols: &CornerColumns) -> CornerStats {
        CornerStats {
            id: self.text(cols.id).map(|s| FighterId(s.to_string())),
            name: self.text(cols.name).unwrap_or_default().to_string(),
            dob: self.date(cols.dob),
            kd: self.opt_number(cols.kd),
            sig_str_landed: self.number(cols.sig_str_landed),
            sig_str_atmpted: self.number(cols.sig_str_atmpted),
            sig_str_acc: self.number(cols.sig_str_acc),
            total_str_landed: self.opt_number(cols.total_str_landed),
            total_str_atmpted: self.opt_number(cols.total_str_atmpted),
            td_landed: self.number(cols.td_landed),
            td_atmpted: self.number(cols.td_atmpted),
            td_acc: self.number(cols.td_acc),
            sub_att: self.opt_number(cols.sub_att),
            ctrl: self.number(cols.ctrl),
        }
    }

    fn match_record(&self, schema: &Schema, index: usize) -> MatchRecord {
        MatchRecord {
            index,
            event_name: self.opt_text(schema.event_name).map(str::to_string),
            date: self.date(schema.date),
            division: self.opt_text(schema.division).map(str::to_string),
            winner: self.text(schema.winner).map(str::to_string),
            winner_id: self.text(schema.winner_id).map(|s| FighterId(s.to_string())),
            finish_round: self.number(schema.finish_round),
            match_time_sec: self.number(schema.match_time_sec),
            total_rounds: self.opt_number(schema.total_rounds),
            red: self.corner(&schema.red),
            blue: self.corner(&schema.blue),
        }
    }

    /// Field values with placeholders collapsed, used to detect repeated rows
    fn dedup_key(&self) -> Vec<String> {
        self.record
            .iter()
            .map(|f| clean_field(f).unwrap_or_default().to_string())
            .collect()
    }
}

/// Read fight records from any CSV source
pub fn read_matches<R: Read>(reader: R, config: &DataConfig) -> Result<Vec<MatchRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let schema = Schema::resolve(&headers)?;

    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut matches = Vec::new();
    let mut duplicates = 0usize;
    let mut anonymous = 0usize;
    let mut total = 0usize;

    for result in reader.records() {
        let record = result?;
        total += 1;
        let row = Row { record: &record };

        if config.drop_duplicates && !seen.insert(row.dedup_key()) {
            duplicates += 1;
            continue;
        }

        let parsed = row.match_record(&schema, matches.len());
        if [&parsed.red, &parsed.blue]
            .iter()
            .any(|c| c.id.is_none() && c.name.is_empty())
        {
            anonymous += 1;
        }
        matches.push(parsed);
    }

    if duplicates > 0 {
        log::info!("Dropped {} duplicate rows", duplicates);
    }
    if anonymous > 0 {
        log::warn!(
            "{} rows have a corner with neither id nor name; those corners share an empty-name timeline",
            anonymous
        );
    }
    log::info!("Loaded {} fights from {} rows", matches.len(), total);

    Ok(matches)
}

/// Read fight records from a CSV file
pub fn load_matches<P: AsRef<Path>>(path: P, config: &DataConfig) -> Result<Vec<MatchRecord>> {
    let path = path.as_ref();
    log::info!("Loading fights from {}", path.display());
    let file = std::fs::File::open(path)?;
    read_matches(std::io::BufReader::new(file), config)
}
