//! Workday and holiday determination.
//!
//! Pure computation over `chrono` dates: the six US federal holidays the
//! department closes for, each expanded to its observed long-weekend span,
//! plus a supplementary date->label table read from a side file.
//!
//! Span rules:
//! - Fixed-date holidays (New Year's Day, Independence Day, Christmas):
//!   Tue-Thu is the single day; Monday extends back to Saturday; Friday
//!   extends forward to Sunday; a Saturday holiday is observed Friday
//!   (Fri-Sun); a Sunday holiday is observed Monday (Sat-Mon).
//! - Memorial Day and Labor Day: Sat-Mon.
//! - Thanksgiving: Thu-Sun.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::error::{ScheduleError, ScheduleResult};

/// Label used for plain Saturdays and Sundays.
pub const WEEKEND_LABEL: &str = "Weekend";

/// Holiday table for a span of years, consulted read-only after loading.
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    days: BTreeMap<NaiveDate, String>,
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> NaiveDate {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
        .unwrap_or_else(|| panic!("no {}th {:?} in {}-{:02}", n, weekday, year, month))
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, 5)
        .unwrap_or_else(|| nth_weekday(year, month, weekday, 4))
}

/// Observed span for a fixed-date holiday.
fn fixed_date_span(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    match date.weekday() {
        Weekday::Tue | Weekday::Wed | Weekday::Thu => (date, date),
        Weekday::Mon => (date - Duration::days(2), date),
        Weekday::Fri => (date, date + Duration::days(2)),
        // Observed Friday / Monday respectively.
        Weekday::Sat => (date - Duration::days(1), date + Duration::days(1)),
        Weekday::Sun => (date - Duration::days(1), date + Duration::days(1)),
    }
}

impl HolidayCalendar {
    /// Holiday spans for a single year.
    pub fn for_year(year: i32) -> Self {
        let mut calendar = HolidayCalendar::default();
        calendar.add_year(year);
        calendar
    }

    /// Holiday table wide enough to classify any date near `[start, end]`,
    /// including spans bleeding in from the adjacent years.
    pub fn covering(start: NaiveDate, end: NaiveDate) -> Self {
        let mut calendar = HolidayCalendar::default();
        for year in (start.year() - 1)..=(end.year() + 1) {
            calendar.add_year(year);
        }
        calendar
    }

    fn add_year(&mut self, year: i32) {
        let fixed = [
            (NaiveDate::from_ymd_opt(year, 1, 1).unwrap(), "New Year's Day"),
            (NaiveDate::from_ymd_opt(year, 7, 4).unwrap(), "Independence Day"),
            (NaiveDate::from_ymd_opt(year, 12, 25).unwrap(), "Christmas Day"),
        ];
        for (date, label) in fixed {
            let (span_start, span_end) = fixed_date_span(date);
            self.add_span(span_start, span_end, label);
        }

        let memorial = last_weekday(year, 5, Weekday::Mon);
        self.add_span(memorial - Duration::days(2), memorial, "Memorial Day");

        let labor = nth_weekday(year, 9, Weekday::Mon, 1);
        self.add_span(labor - Duration::days(2), labor, "Labor Day");

        let thanksgiving = nth_weekday(year, 11, Weekday::Thu, 4);
        self.add_span(thanksgiving, thanksgiving + Duration::days(3), "Thanksgiving");
    }

    fn add_span(&mut self, start: NaiveDate, end: NaiveDate, label: &str) {
        let mut date = start;
        while date <= end {
            self.days.insert(date, label.to_string());
            date += Duration::days(1);
        }
    }

    /// Overlay a single custom closure day.
    pub fn add_custom(&mut self, date: NaiveDate, label: impl Into<String>) {
        self.days.insert(date, label.into());
    }

    /// Overlay custom closure days from a headerless CSV `(date, label)`.
    pub fn load_custom(&mut self, path: &Path) -> ScheduleResult<()> {
        let file = std::fs::File::open(path)?;
        self.load_custom_from(file)
    }

    /// Overlay custom closure days from any CSV source.
    pub fn load_custom_from<R: Read>(&mut self, reader: R) -> ScheduleResult<()> {
        let mut csv_reader = csv::ReaderBuilder::new().has_headers(false).from_reader(reader);
        for record in csv_reader.records() {
            let record = record?;
            let date_text = record.get(0).unwrap_or("").trim();
            let label = record.get(1).unwrap_or("Holiday").trim();
            let date = NaiveDate::parse_from_str(date_text, "%Y-%m-%d").map_err(|e| {
                ScheduleError::malformed(format!("bad date '{}' in holiday table: {}", date_text, e))
            })?;
            self.add_custom(date, label);
        }
        Ok(())
    }

    /// Holiday label covering the date, if any.
    pub fn holiday(&self, date: NaiveDate) -> Option<&str> {
        self.days.get(&date).map(|s| s.as_str())
    }

    /// Whether the date is a plain workday. Returns the closure label
    /// otherwise ("Weekend" for ordinary Saturdays and Sundays).
    pub fn is_workday(&self, date: NaiveDate) -> (bool, Option<&str>) {
        if let Some(label) = self.holiday(date) {
            return (false, Some(label));
        }
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => (false, Some(WEEKEND_LABEL)),
            _ => (true, None),
        }
    }
}
