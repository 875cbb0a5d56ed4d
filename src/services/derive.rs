//! Transition-role derivation from adjacent week snapshots.
//!
//! Consumes the flattened previous/current/next raw weeks and produces the
//! derived weekly schedule: per-day transition roles (Post-Call,
//! Post-Holiday, Post-Late, Pre-Call, Pre-Holiday) looked up from the
//! neighbouring workdays and weekend AM/PM shifts, the admin slots, the
//! off-site set, and the Unassigned pool.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{Datelike, Duration, NaiveDate};

use crate::api::{
    DayKind, DayRecord, DerivedWeekJson, Period, RawWeek, ADMIN_ID, PLACEHOLDER_ID,
};
use crate::calendar::HolidayCalendar;
use crate::error::{ScheduleError, ScheduleResult};
use crate::staff::Roster;

/// Three-letter weekday name used as the shift key ("Mon", "Tue", ...).
pub fn weekday_abbrev(date: NaiveDate) -> String {
    date.format("%a").to_string()
}

/// Shift records of one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub enum DayShifts {
    /// A workday has a single record.
    Work(DayRecord),
    /// Weekends and holidays carry separate AM and PM records.
    Split { am: DayRecord, pm: DayRecord },
}

impl DayShifts {
    /// The record governing the day itself (PM on split days).
    pub fn main(&self) -> &DayRecord {
        match self {
            DayShifts::Work(record) => record,
            DayShifts::Split { pm, .. } => pm,
        }
    }

    /// The AM record (the only record on workdays).
    pub fn am(&self) -> &DayRecord {
        match self {
            DayShifts::Work(record) => record,
            DayShifts::Split { am, .. } => am,
        }
    }
}

/// One raw week indexed by date, with day-kind classification.
#[derive(Debug, Clone)]
pub struct WeeklySnapshot {
    dates: Vec<NaiveDate>,
    kinds: Vec<DayKind>,
    shifts: BTreeMap<String, DayRecord>,
}

/// Merge the per-date shift maps of a raw week into one key -> record map.
fn flatten_week(raw: &RawWeek) -> BTreeMap<String, DayRecord> {
    let mut flat = BTreeMap::new();
    for day in raw.values() {
        for (key, record) in day {
            flat.insert(key.clone(), record.clone());
        }
    }
    flat
}

impl WeeklySnapshot {
    /// Classify the seven dates of `[start, start + 6]` and index the raw
    /// records by shift key.
    pub fn new(raw: &RawWeek, start: NaiveDate, calendar: &HolidayCalendar) -> Self {
        let dates: Vec<NaiveDate> = (0..7).map(|i| start + Duration::days(i)).collect();
        let kinds = dates
            .iter()
            .map(|&date| {
                let (is_workday, label) = calendar.is_workday(date);
                if is_workday {
                    DayKind::Weekday
                } else {
                    if label != Some(crate::calendar::WEEKEND_LABEL) {
                        log::info!(
                            "found a holiday {} on {} {}",
                            label.unwrap_or("?"),
                            date,
                            weekday_abbrev(date)
                        );
                    }
                    DayKind::Weekend
                }
            })
            .collect();
        WeeklySnapshot {
            dates,
            kinds,
            shifts: flatten_week(raw),
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn kind(&self, date: NaiveDate) -> Option<DayKind> {
        self.dates
            .iter()
            .position(|&d| d == date)
            .map(|i| self.kinds[i])
    }

    /// Shift records for a date in this snapshot. A weekend date with a
    /// single record is treated as `AM == PM` with a warning.
    pub fn values(&self, date: NaiveDate) -> ScheduleResult<DayShifts> {
        let name = weekday_abbrev(date);
        let kind = self.kind(date).ok_or_else(|| {
            ScheduleError::malformed(format!("{} is outside this week snapshot", date))
        })?;
        let matching: Vec<(&String, &DayRecord)> = self
            .shifts
            .iter()
            .filter(|(key, _)| key.starts_with(&name))
            .collect();

        if matching.is_empty() {
            return Err(ScheduleError::malformed(format!(
                "no shift record for {} ({})",
                date, name
            )));
        }

        match kind {
            DayKind::Weekday => {
                if matching.len() > 1 {
                    return Err(ScheduleError::malformed(format!(
                        "multiple shift records for workday {} ({})",
                        date, name
                    )));
                }
                Ok(DayShifts::Work(matching[0].1.clone()))
            }
            DayKind::Weekend => {
                if matching.len() < 2 {
                    log::warn!(
                        "{} ({}) has a single shift record; treating AM and PM as identical",
                        date,
                        name
                    );
                    let record = matching[0].1.clone();
                    return Ok(DayShifts::Split { am: record.clone(), pm: record });
                }
                let am = matching
                    .iter()
                    .find(|(key, _)| key.ends_with("AM"))
                    .map(|(_, record)| (*record).clone())
                    .ok_or_else(|| {
                        ScheduleError::malformed(format!("missing AM shift for {}", date))
                    })?;
                let pm = matching
                    .iter()
                    .find(|(key, _)| key.ends_with("PM"))
                    .map(|(_, record)| (*record).clone())
                    .ok_or_else(|| {
                        ScheduleError::malformed(format!("missing PM shift for {}", date))
                    })?;
                Ok(DayShifts::Split { am, pm })
            }
        }
    }

    /// Next day of the wanted kind strictly after `date` inside this week.
    fn next_of_kind(&self, date: NaiveDate, kind: DayKind) -> Option<NaiveDate> {
        self.dates
            .iter()
            .zip(&self.kinds)
            .find(|(&d, &k)| d > date && k == kind)
            .map(|(&d, _)| d)
    }

    /// Previous day of the wanted kind strictly before `date`.
    fn prev_of_kind(&self, date: NaiveDate, kind: DayKind) -> Option<NaiveDate> {
        self.dates
            .iter()
            .zip(&self.kinds)
            .rev()
            .find(|(&d, &k)| d < date && k == kind)
            .map(|(&d, _)| d)
    }
}

/// Values of the next day of a given kind, searching the current week
/// first and the following week otherwise. The flag reports whether that
/// day is literally tomorrow.
fn next_day_of_kind(
    date: NaiveDate,
    kind: DayKind,
    this_week: &WeeklySnapshot,
    next_week: &WeeklySnapshot,
) -> ScheduleResult<(DayShifts, bool)> {
    let (snapshot, found) = match this_week.next_of_kind(date, kind) {
        Some(found) => (this_week, found),
        None => {
            let found = next_week.next_of_kind(date, kind).ok_or_else(|| {
                ScheduleError::malformed(format!("no {:?} found after {}", kind, date))
            })?;
            (next_week, found)
        }
    };
    Ok((snapshot.values(found)?, found == date + Duration::days(1)))
}

/// Mirror of [`next_day_of_kind`] looking backwards.
fn prev_day_of_kind(
    date: NaiveDate,
    kind: DayKind,
    this_week: &WeeklySnapshot,
    prev_week: &WeeklySnapshot,
) -> ScheduleResult<(DayShifts, bool)> {
    let (snapshot, found) = match this_week.prev_of_kind(date, kind) {
        Some(found) => (this_week, found),
        None => {
            let found = prev_week.prev_of_kind(date, kind).ok_or_else(|| {
                ScheduleError::malformed(format!("no {:?} found before {}", kind, date))
            })?;
            (prev_week, found)
        }
    };
    Ok((snapshot.values(found)?, found == date - Duration::days(1)))
}

/// Covered period of a raw week snapshot (first to last date key).
pub fn week_period(raw: &RawWeek) -> ScheduleResult<Period> {
    let start = *raw
        .keys()
        .next()
        .ok_or_else(|| ScheduleError::malformed("week snapshot is empty".to_string()))?;
    let end = *raw.keys().next_back().expect("non-empty map has a last key");
    Ok(Period { start, end })
}

fn real_doctor(id: &str) -> Option<&str> {
    if id == PLACEHOLDER_ID || id == ADMIN_ID || id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// The five transition-role candidates for one workday, before and after
/// the tie-breakers.
#[derive(Debug, Default, Clone)]
struct TransitionRoles {
    post_call: Option<String>,
    post_late: Option<String>,
    post_holiday: Option<String>,
    pre_call: Option<String>,
    pre_holiday: Option<String>,
}

impl TransitionRoles {
    fn candidates_mut(&mut self) -> [&mut Option<String>; 5] {
        [
            &mut self.post_call,
            &mut self.post_late,
            &mut self.post_holiday,
            &mut self.pre_call,
            &mut self.pre_holiday,
        ]
    }
}

/// Derive the current week's schedule from the three adjacent snapshots.
pub fn derive_week(
    prev_raw: &RawWeek,
    current_raw: &RawWeek,
    next_raw: &RawWeek,
    roster: &Roster,
    calendar: &HolidayCalendar,
) -> ScheduleResult<DerivedWeekJson> {
    let period = week_period(current_raw)?;
    if period.start + Duration::days(6) != period.end {
        return Err(ScheduleError::malformed(format!(
            "current week {} - {} does not span 7 days",
            period.start, period.end
        )));
    }
    let prev_range = week_period(prev_raw)?;
    if prev_range.end + Duration::days(1) != period.start {
        return Err(ScheduleError::malformed(format!(
            "previous week ends {} but the current week starts {}",
            prev_range.end, period.start
        )));
    }
    let next_range = week_period(next_raw)?;
    if period.end + Duration::days(1) != next_range.start {
        return Err(ScheduleError::malformed(format!(
            "current week ends {} but the next week starts {}",
            period.end, next_range.start
        )));
    }

    let this_week = WeeklySnapshot::new(current_raw, period.start, calendar);
    let prev_week = WeeklySnapshot::new(prev_raw, period.start - Duration::days(7), calendar);
    let next_week = WeeklySnapshot::new(next_raw, period.end + Duration::days(1), calendar);

    let mut week = DerivedWeekJson {
        day: vec![],
        on_call: vec![],
        on_late: vec![],
        post_call: vec![],
        post_holiday: vec![],
        post_late: vec![],
        pre_call: vec![],
        pre_holiday: vec![],
        unassigned: vec![],
        admin: vec![],
        offsite: vec![],
        order: vec![],
        doctors: roster.everyone().to_vec(),
        period,
        solution: None,
    };

    for &date in this_week.dates() {
        let day_name = weekday_abbrev(date);
        let kind = this_week.kind(date).expect("date belongs to this week");
        let today = this_week.values(date)?;
        let record = today.main().clone();

        let on_call = record.call.first.clone();
        let on_late = record.call.second.clone();

        let admin = match record.admin {
            Some(count) if count > 0 => Some(vec![ADMIN_ID.to_string(); count as usize]),
            _ => None,
        };

        // Call duty overrides an erroneous off-site mark; unknown names in
        // the off-site list are logged and dropped.
        let mut offsite = Vec::new();
        for entry in &record.offsite {
            if *entry == on_call || *entry == on_late {
                log::warn!(
                    "{} is on call on {} and is removed from the off-site list",
                    entry,
                    day_name
                );
                continue;
            }
            if real_doctor(entry).is_some() && !roster.contains(entry) {
                log::warn!("unknown doctor '{}' in the off-site list on {}", entry, day_name);
                continue;
            }
            offsite.push(entry.clone());
        }

        let mut roles = TransitionRoles::default();
        let mut unassigned = Vec::new();

        if kind == DayKind::Weekday {
            let (next_workday, is_tomorrow) =
                next_day_of_kind(date, DayKind::Weekday, &this_week, &next_week)?;
            let (prev_workday, is_yesterday) =
                prev_day_of_kind(date, DayKind::Weekday, &this_week, &prev_week)?;

            if is_tomorrow {
                roles.pre_call = Some(next_workday.am().call.first.clone());
            } else {
                let (next_weekend, _) =
                    next_day_of_kind(date, DayKind::Weekend, &this_week, &next_week)?;
                roles.pre_call = Some(next_weekend.am().call.first.clone());
                roles.pre_holiday = Some(next_weekend.am().call.second.clone());
            }

            if is_yesterday {
                roles.post_call = Some(prev_workday.am().call.first.clone());
                roles.post_late = Some(prev_workday.am().call.second.clone());
            } else {
                let (prev_weekend, _) =
                    prev_day_of_kind(date, DayKind::Weekend, &this_week, &prev_week)?;
                roles.post_call = Some(prev_weekend.main().call.first.clone());
                roles.post_late = Some(prev_weekend.main().call.second.clone());
                let holiday_call = prev_weekend.am().call.first.clone();
                if Some(&holiday_call) != roles.post_call.as_ref()
                    && Some(&holiday_call) != roles.post_late.as_ref()
                {
                    roles.post_holiday = Some(holiday_call);
                }
            }

            // A doctor on late call one workday and on call the next is a
            // data error, not something to silently drop.
            if let Some(late) = roles.post_late.as_deref() {
                if real_doctor(late).is_some() && late == on_call {
                    return Err(ScheduleError::LateThenCall {
                        doctor: late.to_string(),
                        day: day_name,
                    });
                }
            }

            // Tie-breakers, in order.
            if roles.post_late == roles.pre_call {
                // Rare Monday-after-long-weekend collision.
                roles.pre_call = None;
            }
            if let Some(pre) = roles.pre_call.as_ref() {
                if Some(pre) == roles.post_call.as_ref()
                    || Some(pre) == roles.post_late.as_ref()
                    || Some(pre) == roles.post_holiday.as_ref()
                {
                    roles.pre_call = None;
                }
            }
            for candidate in roles.candidates_mut() {
                if let Some(doctor) = candidate.as_deref() {
                    if offsite.iter().any(|o| o == doctor) {
                        *candidate = None;
                    }
                }
            }
            for candidate in roles.candidates_mut() {
                if let Some(doctor) = candidate.as_deref() {
                    if doctor == on_call || doctor == on_late {
                        *candidate = None;
                    }
                }
            }

            // The Unassigned pool: everyone not covered by a role, the
            // off-site list, or an admin slot.
            let mut assigned: BTreeSet<&str> = BTreeSet::new();
            for value in [&on_call, &on_late] {
                if let Some(doctor) = real_doctor(value) {
                    assigned.insert(doctor);
                }
            }
            for candidate in [
                &roles.post_call,
                &roles.post_late,
                &roles.post_holiday,
                &roles.pre_call,
                &roles.pre_holiday,
            ]
            .into_iter()
            .flatten()
            {
                if let Some(doctor) = real_doctor(candidate) {
                    assigned.insert(doctor);
                }
            }
            for entry in &offsite {
                if let Some(doctor) = real_doctor(entry) {
                    assigned.insert(doctor);
                }
            }
            for doctor in &assigned {
                if !roster.contains(doctor) {
                    return Err(ScheduleError::malformed(format!(
                        "doctor '{}' assigned on {} is not in the registry",
                        doctor, day_name
                    )));
                }
            }
            unassigned = roster
                .everyone()
                .iter()
                .filter(|d| !assigned.contains(d.as_str()))
                .cloned()
                .collect();
        }

        week.order.push(day_name);
        week.day.push(kind);
        week.on_call.push(Some(on_call));
        week.on_late.push(Some(on_late));
        week.post_call.push(roles.post_call);
        week.post_late.push(roles.post_late);
        week.post_holiday.push(roles.post_holiday);
        week.pre_call.push(roles.pre_call);
        week.pre_holiday.push(roles.pre_holiday);
        week.unassigned.push(unassigned);
        week.admin.push(admin);
        week.offsite.push(offsite);
    }

    Ok(week)
}

// ----------------------------------------------------------------------
// Week-file naming and neighbour discovery
// ----------------------------------------------------------------------

/// Parse `YYYY-weekNN.json` into (year, week). One- and two-digit week
/// numbers are accepted.
pub fn extract_year_and_week(path: &Path) -> Option<(i32, u32)> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(".json")?;
    let (year_text, week_text) = stem.split_once("-week")?;
    if year_text.len() != 4 || week_text.is_empty() || week_text.len() > 2 {
        return None;
    }
    let year: i32 = year_text.parse().ok()?;
    let week: u32 = week_text.parse().ok()?;
    if !(1..=53).contains(&week) {
        return None;
    }
    Some((year, week))
}

/// `YYYY-weekNN` file stem for the ISO week containing `date + delta`.
pub fn week_file_stem(date: NaiveDate, delta_days: i64) -> String {
    let date = date + Duration::days(delta_days);
    let iso = date.iso_week();
    format!("{}-week{:02}", iso.year(), iso.week())
}

/// Find `basename` in `directory` or any of its subdirectories.
pub fn search_for_file(directory: &Path, basename: &str) -> ScheduleResult<PathBuf> {
    fn walk(dir: &Path, basename: &str) -> std::io::Result<Option<PathBuf>> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                if let Some(found) = walk(&path, basename)? {
                    return Ok(Some(found));
                }
            } else if path.file_name().map(|n| n == basename).unwrap_or(false) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
    walk(directory, basename)?
        .ok_or_else(|| ScheduleError::malformed(format!(
            "file {} not found under {}",
            basename,
            directory.display()
        )))
}

/// Locate the previous and next week files next to the current one.
pub fn find_neighbor_weeks(
    input: &Path,
    period: Period,
) -> ScheduleResult<(PathBuf, PathBuf)> {
    let directory = input.parent().unwrap_or_else(|| Path::new("."));
    let before = search_for_file(
        directory,
        &format!("{}.json", week_file_stem(period.start, -1)),
    )?;
    let after = search_for_file(
        directory,
        &format!("{}.json", week_file_stem(period.end, 1)),
    )?;
    Ok((before, after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CallSlots;
    use crate::staff::Doctor;

    fn doctor(id: &str) -> Doctor {
        Doctor {
            id: id.to_string(),
            name: format!("Dr {}", id),
            can_be_cardiac: id == "AA" || id == "CC",
            can_be_charge: id == "AA" || id == "BB",
            aliases: vec![],
            start: None,
            end: None,
        }
    }

    fn roster() -> Roster {
        Roster::from_doctors(
            ["AA", "BB", "CC", "DD", "EE", "FF", "GG", "HH"]
                .iter()
                .map(|id| doctor(id))
                .collect(),
        )
        .unwrap()
    }

    fn record(first: &str, second: &str) -> DayRecord {
        DayRecord {
            call: CallSlots { first: first.to_string(), second: second.to_string() },
            admin: None,
            offsite: vec![],
            requests: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// A plain Mon-Fri week with AM/PM weekend shifts. `calls` holds the
    /// call pairs for Mon..Fri, Sat AM/PM, Sun AM/PM in that order.
    fn raw_week(start: NaiveDate, calls: [(&str, &str); 9]) -> RawWeek {
        let mut week = RawWeek::new();
        for (i, (first, second)) in calls.iter().take(5).enumerate() {
            let day = start + Duration::days(i as i64);
            week.entry(day)
                .or_default()
                .insert(weekday_abbrev(day), record(first, second));
        }
        let saturday = start + Duration::days(5);
        let sunday = start + Duration::days(6);
        week.entry(saturday).or_default().insert(
            format!("{} AM", weekday_abbrev(saturday)),
            record(calls[5].0, calls[5].1),
        );
        week.entry(saturday).or_default().insert(
            format!("{} PM", weekday_abbrev(saturday)),
            record(calls[6].0, calls[6].1),
        );
        week.entry(sunday).or_default().insert(
            format!("{} AM", weekday_abbrev(sunday)),
            record(calls[7].0, calls[7].1),
        );
        week.entry(sunday).or_default().insert(
            format!("{} PM", weekday_abbrev(sunday)),
            record(calls[8].0, calls[8].1),
        );
        week
    }

    fn plain_calls() -> [(&'static str, &'static str); 9] {
        [
            ("AA", "BB"),
            ("CC", "DD"),
            ("EE", "FF"),
            ("GG", "HH"),
            ("AA", "BB"),
            ("CC", "DD"),
            ("EE", "FF"),
            ("GG", "HH"),
            ("AA", "BB"),
        ]
    }

    #[test]
    fn test_plain_week_transition_roles() {
        let calendar = HolidayCalendar::covering(date(2019, 3, 4), date(2019, 3, 24));
        let prev = raw_week(date(2019, 3, 4), plain_calls());
        let current = raw_week(
            date(2019, 3, 11),
            [
                ("CC", "DD"),
                ("EE", "FF"),
                ("GG", "HH"),
                ("AA", "BB"),
                ("CC", "DD"),
                ("EE", "FF"),
                ("GG", "HH"),
                ("AA", "BB"),
                ("CC", "DD"),
            ],
        );
        let next = raw_week(date(2019, 3, 18), plain_calls());

        let week = derive_week(&prev, &current, &next, &roster(), &calendar).unwrap();

        assert_eq!(week.order, vec!["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);
        // Monday: previous workday is Friday of the prior week, so the
        // post roles come from Sunday PM, and Sunday AM supplies
        // post-holiday when distinct.
        assert_eq!(week.post_call[0].as_deref(), Some("AA"));
        assert_eq!(week.post_late[0].as_deref(), Some("BB"));
        assert_eq!(week.post_holiday[0].as_deref(), Some("GG"));
        // Tuesday onwards: plain workday adjacency.
        assert_eq!(week.post_call[1].as_deref(), Some("CC"));
        assert_eq!(week.post_late[1].as_deref(), Some("DD"));
        assert_eq!(week.post_holiday[1], None);
        assert_eq!(week.pre_call[1].as_deref(), Some("GG"));
        // Friday: next workday is Monday, so pre-call comes from the
        // Saturday AM shift and pre-holiday from its late slot.
        assert_eq!(week.pre_call[4].as_deref(), Some("EE"));
        assert_eq!(week.pre_holiday[4].as_deref(), Some("FF"));
        // Weekend days carry no transition roles and no unassigned pool.
        assert_eq!(week.post_call[5], None);
        assert!(week.unassigned[5].is_empty());
        assert_eq!(week.day[5], DayKind::Weekend);
    }

    #[test]
    fn test_unassigned_pool_is_the_complement() {
        let calendar = HolidayCalendar::covering(date(2019, 3, 4), date(2019, 3, 24));
        let prev = raw_week(date(2019, 3, 4), plain_calls());
        let current = raw_week(date(2019, 3, 11), plain_calls());
        let next = raw_week(date(2019, 3, 18), plain_calls());
        let week = derive_week(&prev, &current, &next, &roster(), &calendar).unwrap();

        // Wednesday: on call EE/FF, post roles CC/DD, pre-call GG.
        let mut expected: Vec<String> =
            ["AA", "BB", "HH"].iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(week.unassigned[2], expected);
    }

    #[test]
    fn test_thanksgiving_week_pre_holiday() {
        // Thanksgiving 2019: Thu Nov 28 - Sun Dec 1 are closed.
        let calendar = HolidayCalendar::covering(date(2019, 11, 18), date(2019, 12, 8));
        let prev = raw_week(date(2019, 11, 18), plain_calls());
        let mut current = RawWeek::new();
        let monday = date(2019, 11, 25);
        for (i, (first, second)) in
            [("CC", "DD"), ("EE", "FF"), ("GG", "HH")].iter().enumerate()
        {
            let day = monday + Duration::days(i as i64);
            current
                .entry(day)
                .or_default()
                .insert(weekday_abbrev(day), record(first, second));
        }
        // Thu..Sun carry AM/PM shifts.
        let holiday_calls = [
            ("AA", "BB"), ("CC", "DD"), // Thu
            ("EE", "FF"), ("GG", "HH"), // Fri
            ("AA", "BB"), ("CC", "DD"), // Sat
            ("EE", "FF"), ("GG", "HH"), // Sun
        ];
        for i in 0..4 {
            let day = monday + Duration::days(3 + i as i64);
            let name = weekday_abbrev(day);
            current
                .entry(day)
                .or_default()
                .insert(format!("{} AM", name), record(holiday_calls[2 * i].0, holiday_calls[2 * i].1));
            current
                .entry(day)
                .or_default()
                .insert(format!("{} PM", name), record(holiday_calls[2 * i + 1].0, holiday_calls[2 * i + 1].1));
        }
        let next = raw_week(date(2019, 12, 2), plain_calls());

        let week = derive_week(&prev, &current, &next, &roster(), &calendar).unwrap();

        // Thursday and Friday are weekend-classified.
        assert_eq!(week.day[3], DayKind::Weekend);
        assert_eq!(week.day[4], DayKind::Weekend);
        // Wednesday's next workday is next Monday: pre-call and
        // pre-holiday come from the Thursday AM shift.
        assert_eq!(week.pre_call[2].as_deref(), Some("AA"));
        assert_eq!(week.pre_holiday[2].as_deref(), Some("BB"));
        // Weekend days report the PM call pair.
        assert_eq!(week.on_call[3].as_deref(), Some("CC"));
        assert_eq!(week.on_late[3].as_deref(), Some("DD"));
    }

    #[test]
    fn test_monday_after_long_weekend_post_holiday() {
        // Derive the week after Thanksgiving 2019; its Monday looks back
        // across the four-day closure.
        let calendar = HolidayCalendar::covering(date(2019, 11, 25), date(2019, 12, 15));
        let monday = date(2019, 11, 25);
        let mut prev = RawWeek::new();
        for (i, (first, second)) in
            [("CC", "DD"), ("EE", "FF"), ("GG", "HH")].iter().enumerate()
        {
            let day = monday + Duration::days(i as i64);
            prev.entry(day)
                .or_default()
                .insert(weekday_abbrev(day), record(first, second));
        }
        for i in 0..4 {
            let day = monday + Duration::days(3 + i as i64);
            let name = weekday_abbrev(day);
            // AM pair (EE, FF), PM pair (GG, HH) on Sunday; distinct pairs
            // elsewhere to keep the derivation unambiguous.
            let (am, pm) = if name == "Sun" {
                (("EE", "FF"), ("GG", "HH"))
            } else {
                (("AA", "BB"), ("CC", "DD"))
            };
            prev.entry(day)
                .or_default()
                .insert(format!("{} AM", name), record(am.0, am.1));
            prev.entry(day)
                .or_default()
                .insert(format!("{} PM", name), record(pm.0, pm.1));
        }
        let current = raw_week(
            date(2019, 12, 2),
            [
                ("AA", "BB"),
                ("CC", "DD"),
                ("EE", "FF"),
                ("GG", "HH"),
                ("AA", "BB"),
                ("CC", "DD"),
                ("EE", "FF"),
                ("GG", "HH"),
                ("AA", "BB"),
            ],
        );
        let next = raw_week(date(2019, 12, 9), plain_calls());

        let week = derive_week(&prev, &current, &next, &roster(), &calendar).unwrap();

        // Monday Dec 2: post roles from Sunday PM (GG, HH), post-holiday
        // from Sunday AM (EE) since it differs from both.
        assert_eq!(week.post_call[0].as_deref(), Some("GG"));
        assert_eq!(week.post_late[0].as_deref(), Some("HH"));
        assert_eq!(week.post_holiday[0].as_deref(), Some("EE"));
        // Tuesday: post-call is Monday's on-call, pre-call Wednesday's.
        assert_eq!(week.post_call[1].as_deref(), Some("AA"));
        assert_eq!(week.pre_call[1].as_deref(), Some("EE"));
    }

    #[test]
    fn test_offsite_candidate_is_dropped() {
        let calendar = HolidayCalendar::covering(date(2019, 3, 4), date(2019, 3, 24));
        let prev = raw_week(date(2019, 3, 4), plain_calls());
        let mut current = raw_week(date(2019, 3, 11), plain_calls());
        // AA (Monday's on-call, hence Tuesday's post-call) is off-site on
        // Tuesday.
        let tuesday = date(2019, 3, 12);
        current
            .get_mut(&tuesday)
            .unwrap()
            .get_mut("Tue")
            .unwrap()
            .offsite
            .push("AA".to_string());
        let next = raw_week(date(2019, 3, 18), plain_calls());
        let week = derive_week(&prev, &current, &next, &roster(), &calendar).unwrap();
        assert_eq!(week.post_call[1], None);
        assert!(week.offsite[1].contains(&"AA".to_string()));
    }

    #[test]
    fn test_call_duty_overrides_offsite() {
        let calendar = HolidayCalendar::covering(date(2019, 3, 4), date(2019, 3, 24));
        let prev = raw_week(date(2019, 3, 4), plain_calls());
        let mut current = raw_week(date(2019, 3, 11), plain_calls());
        // AA is Monday's on-call and also (erroneously) off-site.
        let monday = date(2019, 3, 11);
        current
            .get_mut(&monday)
            .unwrap()
            .get_mut("Mon")
            .unwrap()
            .offsite
            .push("AA".to_string());
        let next = raw_week(date(2019, 3, 18), plain_calls());
        let week = derive_week(&prev, &current, &next, &roster(), &calendar).unwrap();
        assert!(!week.offsite[0].contains(&"AA".to_string()));
        assert_eq!(week.on_call[0].as_deref(), Some("AA"));
    }

    #[test]
    fn test_unknown_offsite_doctor_is_dropped_with_warning() {
        let calendar = HolidayCalendar::covering(date(2019, 3, 4), date(2019, 3, 24));
        let prev = raw_week(date(2019, 3, 4), plain_calls());
        let mut current = raw_week(date(2019, 3, 11), plain_calls());
        current
            .get_mut(&date(2019, 3, 11))
            .unwrap()
            .get_mut("Mon")
            .unwrap()
            .offsite
            .push("Locum".to_string());
        let next = raw_week(date(2019, 3, 18), plain_calls());
        let week = derive_week(&prev, &current, &next, &roster(), &calendar).unwrap();
        assert!(!week.offsite[0].contains(&"Locum".to_string()));
    }

    #[test]
    fn test_late_then_call_is_an_error() {
        let calendar = HolidayCalendar::covering(date(2019, 3, 4), date(2019, 3, 24));
        let prev = raw_week(date(2019, 3, 4), plain_calls());
        // Monday late call DD is Tuesday's on-call.
        let current = raw_week(
            date(2019, 3, 11),
            [
                ("CC", "DD"),
                ("DD", "EE"),
                ("FF", "GG"),
                ("HH", "AA"),
                ("BB", "CC"),
                ("DD", "EE"),
                ("FF", "GG"),
                ("HH", "AA"),
                ("BB", "CC"),
            ],
        );
        let next = raw_week(date(2019, 3, 18), plain_calls());
        let result = derive_week(&prev, &current, &next, &roster(), &calendar);
        assert!(matches!(
            result,
            Err(ScheduleError::LateThenCall { ref doctor, ref day }) if doctor == "DD" && day == "Tue"
        ));
    }

    #[test]
    fn test_week_continuity_is_checked() {
        let calendar = HolidayCalendar::covering(date(2019, 3, 4), date(2019, 3, 24));
        let prev = raw_week(date(2019, 3, 4), plain_calls());
        let current = raw_week(date(2019, 3, 11), plain_calls());
        // Gap: next week starts a day late.
        let next = raw_week(date(2019, 3, 19), plain_calls());
        let result = derive_week(&prev, &current, &next, &roster(), &calendar);
        assert!(matches!(result, Err(ScheduleError::InputMalformed(_))));
    }

    #[test]
    fn test_single_shift_weekend_day_is_copied() {
        let calendar = HolidayCalendar::covering(date(2019, 3, 4), date(2019, 3, 24));
        let prev = raw_week(date(2019, 3, 4), plain_calls());
        let mut current = raw_week(date(2019, 3, 11), plain_calls());
        // Drop Saturday PM; AM stands in for both.
        let saturday = date(2019, 3, 16);
        current.get_mut(&saturday).unwrap().remove("Sat PM");
        let next = raw_week(date(2019, 3, 18), plain_calls());
        let week = derive_week(&prev, &current, &next, &roster(), &calendar).unwrap();
        // Saturday AM pair was ("CC", "DD") in plain_calls.
        assert_eq!(week.on_call[5].as_deref(), Some("CC"));
        assert_eq!(week.on_late[5].as_deref(), Some("DD"));
    }

    #[test]
    fn test_filename_parsing() {
        assert_eq!(
            extract_year_and_week(Path::new("data/2019-week03.json")),
            Some((2019, 3))
        );
        assert_eq!(
            extract_year_and_week(Path::new("2021-week7.json")),
            Some((2021, 7))
        );
        assert_eq!(extract_year_and_week(Path::new("2021-week99.json")), None);
        assert_eq!(extract_year_and_week(Path::new("week07.json")), None);
        assert_eq!(extract_year_and_week(Path::new("2021-week07.txt")), None);
    }

    #[test]
    fn test_week_file_stem_is_padded() {
        assert_eq!(week_file_stem(date(2019, 1, 14), 0), "2019-week03");
        // Stepping back across an ISO year boundary.
        assert_eq!(week_file_stem(date(2019, 1, 1), -1), "2019-week01");
    }
}
