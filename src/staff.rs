//! Staff registry.
//!
//! Loads the physician roster from the staff CSV table and answers the
//! capability and identity questions the rest of the pipeline asks: who is
//! active for a given week, who can be charge or cardiac, and what
//! identifier a free-text name or alias resolves to.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::api::PLACEHOLDER_ID;
use crate::error::{ScheduleError, ScheduleResult};

/// A single physician record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doctor {
    /// Short unique token, e.g. `AA`.
    pub id: String,
    pub name: String,
    pub can_be_cardiac: bool,
    pub can_be_charge: bool,
    /// Alternate spellings that may appear in free-text requests.
    pub aliases: Vec<String>,
    /// Start of the active interval; `None` = open.
    pub start: Option<NaiveDate>,
    /// End of the active interval; `None` = open.
    pub end: Option<NaiveDate>,
}

impl Doctor {
    /// Whether the doctor's active interval intersects `[start, end]`.
    pub fn active_during(&self, start: NaiveDate, end: NaiveDate) -> bool {
        if let (Some(s), Some(e)) = (self.start, self.end) {
            if s >= e {
                return false;
            }
        }
        let starts_late = self.start.map(|s| s > end).unwrap_or(false);
        let ended_early = self.end.map(|e| e < start).unwrap_or(false);
        !starts_late && !ended_early
    }
}

/// On-disk row shape of the staff table.
#[derive(Debug, Deserialize)]
struct StaffRow {
    anst: String,
    diac: String,
    chrg: String,
    name: String,
    alias: String,
    start: String,
    end: String,
}

/// The set of physicians active over a week, plus the reserved placeholder.
#[derive(Debug, Clone)]
pub struct Roster {
    doctors: Vec<Doctor>,
    placeholder: Doctor,
    everyone: Vec<String>,
    charge: Vec<String>,
    cardiac: Vec<String>,
}

fn parse_flag(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("true")
}

fn parse_date(text: &str) -> ScheduleResult<Option<NaiveDate>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| ScheduleError::malformed(format!("bad date '{}' in staff table: {}", text, e)))
}

impl Roster {
    /// Load the roster from a CSV file, keeping only doctors active during
    /// `[start, end]`.
    pub fn load(path: &Path, start: NaiveDate, end: NaiveDate) -> ScheduleResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, start, end)
    }

    /// Load the roster from any CSV source (header row required).
    pub fn from_reader<R: Read>(reader: R, start: NaiveDate, end: NaiveDate) -> ScheduleResult<Self> {
        if end < start {
            return Err(ScheduleError::malformed(format!(
                "roster window end {} precedes start {}",
                end, start
            )));
        }
        let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let mut doctors = Vec::new();
        for row in csv_reader.deserialize::<StaffRow>() {
            let row = row?;
            let aliases: Vec<String> = row
                .alias
                .split(';')
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
            let doctor = Doctor {
                id: row.anst.trim().to_string(),
                name: row.name.trim().to_string(),
                can_be_cardiac: parse_flag(&row.diac),
                can_be_charge: parse_flag(&row.chrg),
                aliases,
                start: parse_date(&row.start)?,
                end: parse_date(&row.end)?,
            };
            if doctor.active_during(start, end) {
                doctors.push(doctor);
            }
        }
        Self::from_doctors(doctors)
    }

    /// Build a roster from in-memory records. Duplicate identifiers are
    /// fatal.
    pub fn from_doctors(doctors: Vec<Doctor>) -> ScheduleResult<Self> {
        let mut seen = HashSet::new();
        for doctor in &doctors {
            if !seen.insert(doctor.id.clone()) {
                return Err(ScheduleError::DuplicateDoctor(doctor.id.clone()));
            }
        }
        let mut everyone: Vec<String> = doctors.iter().map(|d| d.id.clone()).collect();
        everyone.sort();
        let charge = doctors
            .iter()
            .filter(|d| d.can_be_charge)
            .map(|d| d.id.clone())
            .collect();
        let cardiac = doctors
            .iter()
            .filter(|d| d.can_be_cardiac)
            .map(|d| d.id.clone())
            .collect();
        Ok(Roster {
            doctors,
            placeholder: Doctor {
                id: PLACEHOLDER_ID.to_string(),
                name: "Placeholder".to_string(),
                can_be_cardiac: false,
                can_be_charge: false,
                aliases: vec![],
                start: None,
                end: None,
            },
            everyone,
            charge,
            cardiac,
        })
    }

    /// Sorted identifiers of every active doctor.
    pub fn everyone(&self) -> &[String] {
        &self.everyone
    }

    /// Identifiers of doctors who may take the charge role.
    pub fn charge_doctors(&self) -> &[String] {
        &self.charge
    }

    /// Identifiers of doctors who may take the cardiac role.
    pub fn cardiac_doctors(&self) -> &[String] {
        &self.cardiac
    }

    /// The reserved `X` doctor used for structurally required but unfilled
    /// slots.
    pub fn placeholder(&self) -> &Doctor {
        &self.placeholder
    }

    pub fn contains(&self, id: &str) -> bool {
        self.everyone.binary_search_by(|probe| probe.as_str().cmp(id)).is_ok()
    }

    pub fn is_charge(&self, id: &str) -> bool {
        self.charge.iter().any(|c| c == id)
    }

    pub fn is_cardiac(&self, id: &str) -> bool {
        self.cardiac.iter().any(|c| c == id)
    }

    /// Display name for an identifier, if known.
    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.doctors.iter().find(|d| d.id == id).map(|d| d.name.as_str())
    }

    /// Resolve an identifier, display name, or alias to the canonical
    /// identifier. The placeholder resolves to itself.
    pub fn resolve(&self, text: &str) -> ScheduleResult<&str> {
        let text = text.trim();
        for doctor in self.doctors.iter().chain(std::iter::once(&self.placeholder)) {
            if text == doctor.id || text == doctor.name || doctor.aliases.iter().any(|a| a == text) {
                return Ok(&doctor.id);
            }
        }
        Err(ScheduleError::DoctorNotFound(text.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Doctor> {
        self.doctors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAFF_CSV: &str = "\
anst,diac,chrg,name,alias,start,end
AA,TRUE,TRUE,Abbot,Abby;A.A.,2015-01-01,
BB,FALSE,TRUE,Barker,,2015-01-01,
CC,TRUE,FALSE,Chen,,2015-01-01,
DD,FALSE,FALSE,Diaz,,2015-01-01,2018-06-30
EE,FALSE,FALSE,Egan,,2019-06-01,
";

    fn week() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2019, 3, 11).unwrap(),
            NaiveDate::from_ymd_opt(2019, 3, 17).unwrap(),
        )
    }

    #[test]
    fn test_load_filters_inactive() {
        let (start, end) = week();
        let roster = Roster::from_reader(STAFF_CSV.as_bytes(), start, end).unwrap();
        // DD ended before the week, EE starts after it.
        assert_eq!(roster.everyone(), &["AA", "BB", "CC"]);
    }

    #[test]
    fn test_capability_subsets() {
        let (start, end) = week();
        let roster = Roster::from_reader(STAFF_CSV.as_bytes(), start, end).unwrap();
        assert_eq!(roster.charge_doctors(), &["AA", "BB"]);
        assert_eq!(roster.cardiac_doctors(), &["AA", "CC"]);
        assert!(roster.is_charge("BB"));
        assert!(!roster.is_cardiac("BB"));
    }

    #[test]
    fn test_resolve_by_id_name_and_alias() {
        let (start, end) = week();
        let roster = Roster::from_reader(STAFF_CSV.as_bytes(), start, end).unwrap();
        assert_eq!(roster.resolve("AA").unwrap(), "AA");
        assert_eq!(roster.resolve("Abbot").unwrap(), "AA");
        assert_eq!(roster.resolve(" Abby ").unwrap(), "AA");
        assert_eq!(roster.resolve("X").unwrap(), "X");
        assert!(matches!(
            roster.resolve("Nobody"),
            Err(ScheduleError::DoctorNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_id_is_fatal() {
        let csv = "\
anst,diac,chrg,name,alias,start,end
AA,TRUE,TRUE,Abbot,,,
AA,FALSE,FALSE,Other,,,
";
        let (start, end) = week();
        let result = Roster::from_reader(csv.as_bytes(), start, end);
        assert!(matches!(result, Err(ScheduleError::DuplicateDoctor(id)) if id == "AA"));
    }

    #[test]
    fn test_open_intervals_are_always_active() {
        let doctor = Doctor {
            id: "ZZ".into(),
            name: "Zimmer".into(),
            can_be_cardiac: false,
            can_be_charge: false,
            aliases: vec![],
            start: None,
            end: None,
        };
        let (start, end) = week();
        assert!(doctor.active_during(start, end));
    }

    #[test]
    fn test_inverted_interval_is_never_active() {
        let doctor = Doctor {
            id: "ZZ".into(),
            name: "Zimmer".into(),
            can_be_cardiac: false,
            can_be_charge: false,
            aliases: vec![],
            start: NaiveDate::from_ymd_opt(2020, 1, 1),
            end: NaiveDate::from_ymd_opt(2019, 1, 1),
        };
        let (start, end) = week();
        assert!(!doctor.active_during(start, end));
    }
}
