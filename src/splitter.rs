//! Quarterly input splitter.
//!
//! Decomposes a year -> month -> day-of-month nested JSON document into
//! ISO-week buckets (`YYYY-weekNN`), writes one file per week, and verifies
//! that recombining the written files reproduces the input exactly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde_json::Value;

use crate::error::{ScheduleError, ScheduleResult};

const MONTH_ABBREVS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Month number (1-12) for a three-letter abbreviation.
pub fn month_number(abbrev: &str) -> Option<u32> {
    MONTH_ABBREVS
        .iter()
        .position(|m| *m == abbrev)
        .map(|i| i as u32 + 1)
}

/// ISO-week bucket key for a date, zero-padded: `2019-week03`.
pub fn week_key(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-week{:02}", iso.year(), iso.week())
}

/// Per-week buckets: week key -> (date string -> day record).
pub type WeekBuckets = BTreeMap<String, BTreeMap<String, Value>>;

fn as_object(value: &Value, what: &str) -> ScheduleResult<serde_json::Map<String, Value>> {
    value
        .as_object()
        .cloned()
        .ok_or_else(|| ScheduleError::malformed(format!("{} must be a JSON object", what)))
}

/// Split the nested quarterly document into ISO-week buckets, preserving
/// each day record verbatim.
pub fn split_into_weeks(data: &Value) -> ScheduleResult<WeekBuckets> {
    let mut weekly: WeekBuckets = BTreeMap::new();
    for (year_text, months) in as_object(data, "quarter input")? {
        let year: i32 = year_text
            .parse()
            .map_err(|_| ScheduleError::malformed(format!("bad year key '{}'", year_text)))?;
        for (month_text, days) in as_object(&months, "month map")? {
            let month = month_number(&month_text).ok_or_else(|| {
                ScheduleError::malformed(format!("unknown month abbreviation '{}'", month_text))
            })?;
            for (day_text, record) in as_object(&days, "day map")? {
                let day: u32 = day_text
                    .parse()
                    .map_err(|_| ScheduleError::malformed(format!("bad day key '{}'", day_text)))?;
                let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
                    ScheduleError::malformed(format!("invalid date {}-{}-{}", year, month_text, day))
                })?;
                weekly
                    .entry(week_key(date))
                    .or_default()
                    .insert(date.format("%Y-%m-%d").to_string(), record);
            }
        }
    }
    Ok(weekly)
}

/// Flatten the nested document to a single `date string -> record` map.
pub fn flatten(data: &Value) -> ScheduleResult<BTreeMap<String, Value>> {
    let mut flattened = BTreeMap::new();
    for (year_text, months) in as_object(data, "quarter input")? {
        for (month_text, days) in as_object(&months, "month map")? {
            let month = month_number(&month_text).ok_or_else(|| {
                ScheduleError::malformed(format!("unknown month abbreviation '{}'", month_text))
            })?;
            for (day_text, record) in as_object(&days, "day map")? {
                let day: u32 = day_text
                    .parse()
                    .map_err(|_| ScheduleError::malformed(format!("bad day key '{}'", day_text)))?;
                flattened.insert(format!("{}-{:02}-{:02}", year_text, month, day), record);
            }
        }
    }
    Ok(flattened)
}

/// Merge week buckets back into a single `date string -> record` map.
pub fn combine_weeks(weeks: &WeekBuckets) -> BTreeMap<String, Value> {
    let mut combined = BTreeMap::new();
    for days in weeks.values() {
        for (date, record) in days {
            combined.insert(date.clone(), record.clone());
        }
    }
    combined
}

/// Structural equality with NaN considered equal to NaN.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x == y {
                return true;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(xf), Some(yf)) => (xf.is_nan() && yf.is_nan()) || xf == yf,
                _ => false,
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).map(|y| deep_equal(x, y)).unwrap_or(false))
        }
        _ => a == b,
    }
}

/// Write one JSON file per week bucket. Buckets with fewer than seven days
/// get a `-partial` suffix. Returns the written paths in week order.
pub fn write_weeks(weeks: &WeekBuckets, outdir: &Path) -> ScheduleResult<Vec<PathBuf>> {
    std::fs::create_dir_all(outdir)?;
    let mut written = Vec::new();
    for (key, days) in weeks {
        let suffix = if days.len() < 7 { "-partial" } else { "" };
        let path = outdir.join(format!("{}{}.json", key, suffix));
        let text = serde_json::to_string_pretty(&days)?;
        std::fs::write(&path, text)?;
        log::info!("saved {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Re-read every JSON file in `outdir` and merge the top-level maps.
fn combine_files(outdir: &Path) -> ScheduleResult<BTreeMap<String, Value>> {
    let mut combined = BTreeMap::new();
    let mut paths: Vec<PathBuf> = std::fs::read_dir(outdir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
        .collect();
    paths.sort();
    for path in paths {
        let text = std::fs::read_to_string(&path)?;
        let days: BTreeMap<String, Value> = serde_json::from_str(&text)
            .map_err(|e| ScheduleError::malformed(format!("{}: {}", path.display(), e)))?;
        combined.extend(days);
    }
    Ok(combined)
}

fn map_to_value(map: &BTreeMap<String, Value>) -> Value {
    Value::Object(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

/// Split a quarterly file into per-week files and assert the lossless
/// round trip against the re-read output.
pub fn split_quarter(infile: &Path, outdir: &Path) -> ScheduleResult<Vec<PathBuf>> {
    let text = std::fs::read_to_string(infile)?;
    let data: Value = serde_json::from_str(&text)
        .map_err(|e| ScheduleError::malformed(format!("{}: {}", infile.display(), e)))?;

    let weeks = split_into_weeks(&data)?;
    let written = write_weeks(&weeks, outdir)?;

    let combined = combine_files(outdir)?;
    let flattened = flatten(&data)?;
    if !deep_equal(&map_to_value(&combined), &map_to_value(&flattened)) {
        return Err(ScheduleError::malformed(
            "combined weekly data does not match the original input".to_string(),
        ));
    }
    log::info!(
        "split {} into {} weekly files, round trip verified",
        infile.display(),
        written.len()
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn quarter_input() -> Value {
        json!({
            "2019": {
                "Jul": {
                    "1": {"Call": {"1": "AA", "2": "BB"}},
                    "2": {"Call": {"1": "CC", "2": "DD"}},
                    "8": {"Call": {"1": "EE", "2": "FF"}}
                },
                "Sep": {
                    "30": {"Call": {"1": "GG", "2": "HH"}}
                }
            }
        })
    }

    #[test]
    fn test_week_key_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2019, 1, 7).unwrap();
        assert_eq!(week_key(date), "2019-week02");
    }

    #[test]
    fn test_week_key_uses_iso_year() {
        // 2019-12-30 belongs to ISO week 1 of 2020.
        let date = NaiveDate::from_ymd_opt(2019, 12, 30).unwrap();
        assert_eq!(week_key(date), "2020-week01");
    }

    #[test]
    fn test_split_buckets_by_iso_week() {
        let weeks = split_into_weeks(&quarter_input()).unwrap();
        assert_eq!(
            weeks.keys().cloned().collect::<Vec<_>>(),
            vec!["2019-week27", "2019-week28", "2019-week40"]
        );
        assert_eq!(weeks["2019-week27"].len(), 2);
        assert!(weeks["2019-week27"].contains_key("2019-07-01"));
        assert!(weeks["2019-week40"].contains_key("2019-09-30"));
    }

    #[test]
    fn test_flatten_and_combine_agree() {
        let input = quarter_input();
        let weeks = split_into_weeks(&input).unwrap();
        let combined = combine_weeks(&weeks);
        let flattened = flatten(&input).unwrap();
        assert_eq!(combined, flattened);
    }

    #[test]
    fn test_unknown_month_is_rejected() {
        let input = json!({"2019": {"Juli": {"1": {}}}});
        assert!(matches!(
            split_into_weeks(&input),
            Err(ScheduleError::InputMalformed(_))
        ));
    }

    #[test]
    fn test_partial_suffix_for_short_weeks() {
        let dir = tempfile::tempdir().unwrap();
        let weeks = split_into_weeks(&quarter_input()).unwrap();
        let written = write_weeks(&weeks, dir.path()).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        // Every bucket here has fewer than 7 days.
        assert!(names.iter().all(|n| n.ends_with("-partial.json")));
    }

    #[test]
    fn test_split_quarter_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let infile = dir.path().join("quarter.json");
        std::fs::write(&infile, serde_json::to_string(&quarter_input()).unwrap()).unwrap();
        let outdir = dir.path().join("weeks");
        let written = split_quarter(&infile, &outdir).unwrap();
        assert_eq!(written.len(), 3);
    }

    #[test]
    fn test_deep_equal_mismatch() {
        let a = json!({"x": [1, 2, 3]});
        let b = json!({"x": [1, 2, 4]});
        assert!(!deep_equal(&a, &b));
        assert!(deep_equal(&a, &a));
    }

    proptest! {
        #[test]
        fn prop_split_round_trips(day_offsets in prop::collection::btree_set(0u32..364, 1..40)) {
            let base = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
            let mut input = serde_json::Map::new();
            let mut year_map: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
            for offset in &day_offsets {
                let date = base + chrono::Duration::days(*offset as i64);
                let month = MONTH_ABBREVS[date.month0() as usize].to_string();
                year_map
                    .entry(month)
                    .or_default()
                    .insert(date.day().to_string(), json!({"offset": offset}));
            }
            input.insert(
                "2019".to_string(),
                Value::Object(
                    year_map
                        .into_iter()
                        .map(|(m, days)| {
                            (m, Value::Object(days.into_iter().collect()))
                        })
                        .collect(),
                ),
            );
            let input = Value::Object(input);

            let weeks = split_into_weeks(&input).unwrap();
            let combined = combine_weeks(&weeks);
            let flattened = flatten(&input).unwrap();
            prop_assert_eq!(&combined, &flattened);
            // Day count is preserved.
            let bucketed: usize = weeks.values().map(|d| d.len()).sum();
            prop_assert_eq!(bucketed, day_offsets.len());
        }
    }
}
