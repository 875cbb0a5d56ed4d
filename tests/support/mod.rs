//! Shared fixtures for the end-to-end scenario tests.

use chrono::{Duration, NaiveDate};

use apap::api::{CallSlots, DayRecord, RawWeek};
use apap::services::derive::weekday_abbrev;
use apap::staff::{Doctor, Roster};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn doctor(id: &str, cardiac: bool, charge: bool) -> Doctor {
    Doctor {
        id: id.to_string(),
        name: format!("Dr {}", id),
        can_be_cardiac: cardiac,
        can_be_charge: charge,
        aliases: vec![],
        start: None,
        end: None,
    }
}

/// Registry of scenario S1: AA is charge+cardiac, BB charge, CC cardiac,
/// DD..HH uncredentialed.
pub fn roster() -> Roster {
    Roster::from_doctors(vec![
        doctor("AA", true, true),
        doctor("BB", false, true),
        doctor("CC", true, false),
        doctor("DD", false, false),
        doctor("EE", false, false),
        doctor("FF", false, false),
        doctor("GG", false, false),
        doctor("HH", false, false),
    ])
    .unwrap()
}

pub fn record(first: &str, second: &str) -> DayRecord {
    DayRecord {
        call: CallSlots {
            first: first.to_string(),
            second: second.to_string(),
        },
        admin: None,
        offsite: vec![],
        requests: None,
    }
}

/// Build a raw week: five workday call pairs, then Sat AM/PM and Sun AM/PM.
pub fn raw_week(start: NaiveDate, calls: [(&str, &str); 9]) -> RawWeek {
    let mut week = RawWeek::new();
    for (i, (first, second)) in calls.iter().take(5).enumerate() {
        let day = start + Duration::days(i as i64);
        week.entry(day)
            .or_default()
            .insert(weekday_abbrev(day), record(first, second));
    }
    for (i, day) in [start + Duration::days(5), start + Duration::days(6)]
        .into_iter()
        .enumerate()
    {
        let name = weekday_abbrev(day);
        let (am, pm) = (calls[5 + 2 * i], calls[6 + 2 * i]);
        week.entry(day)
            .or_default()
            .insert(format!("{} AM", name), record(am.0, am.1));
        week.entry(day)
            .or_default()
            .insert(format!("{} PM", name), record(pm.0, pm.1));
    }
    week
}

/// The three raw weeks whose derivation yields the standard plain test
/// week (2019-03-11 .. 2019-03-17): AA and DD alternate on call, CC is on
/// late call every workday.
pub fn plain_week_raws() -> (RawWeek, RawWeek, RawWeek) {
    // Previous week: only its Sunday shifts feed the Monday derivation.
    let prev = raw_week(
        date(2019, 3, 4),
        [
            ("AA", "BB"),
            ("CC", "DD"),
            ("EE", "FF"),
            ("GG", "HH"),
            ("AA", "BB"),
            ("CC", "DD"), // Sat AM
            ("GG", "HH"), // Sat PM
            ("EE", "HH"), // Sun AM: on-call EE collapses Monday post-holiday
            ("EE", "FF"), // Sun PM: Monday post-call EE, post-late FF
        ],
    );
    let current = raw_week(
        date(2019, 3, 11),
        [
            ("AA", "CC"),
            ("DD", "CC"),
            ("AA", "CC"),
            ("DD", "CC"),
            ("AA", "CC"),
            ("GG", "AA"), // Sat AM: Friday pre-call GG, pre-holiday dropped
            ("BB", "DD"), // Sat PM
            ("FF", "GG"), // Sun AM
            ("CC", "EE"), // Sun PM
        ],
    );
    let next = raw_week(
        date(2019, 3, 18),
        [
            ("DD", "BB"),
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
    (prev, current, next)
}
