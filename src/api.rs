//! Public data-transfer surface for the scheduler.
//!
//! This file consolidates the JSON document types exchanged with the
//! outside world: the raw weekly snapshot, the derived weekly schedule in
//! its transposed per-field-array form, the requirements overlay, and the
//! solved-schedule output. All types derive Serialize/Deserialize and use
//! the field names of the on-disk formats.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};

/// Reserved identifier for an unfilled slot.
pub const PLACEHOLDER_ID: &str = "X";

/// Sentinel identifier standing in for an unnamed admin slot.
pub const ADMIN_ID: &str = "AD";

/// Spellings accepted for the admin sentinel in free-text inputs.
pub const ADMIN_ALIASES: [&str; 3] = ["AD", "Admin", "Adm"];

/// The two call slots of a shift record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSlots {
    /// 1st call.
    #[serde(rename = "1")]
    pub first: String,
    /// 2nd call (late).
    #[serde(rename = "2")]
    pub second: String,
}

/// One raw shift record: who is on call, how many admin slots, who is away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    #[serde(rename = "Call")]
    pub call: CallSlots,
    /// Number of admin positions for the day.
    #[serde(rename = "Admin", default)]
    pub admin: Option<u32>,
    /// Doctors at Gillette/West/CVCC/Sedation or on vacation.
    #[serde(rename = "Offsite", default)]
    pub offsite: Vec<String>,
    /// Opaque free-text requests; parsed elsewhere.
    #[serde(rename = "Requests", default)]
    pub requests: Option<String>,
}

/// Raw weekly snapshot: date -> shift key ("Mon", "Sat AM", ...) -> record.
pub type RawWeek = BTreeMap<NaiveDate, BTreeMap<String, DayRecord>>;

/// Day classification in the derived schedule. A holiday on a weekday is a
/// `Weekend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayKind {
    Weekday,
    Weekend,
}

/// Closed week period, `end = start + 6 days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// The seven calendar dates of the week, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        (0..7).map(|i| self.start + chrono::Duration::days(i)).collect()
    }
}

/// Derived weekly schedule in the transposed (per-field parallel array)
/// form. Every array is indexed in step with `order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedWeekJson {
    #[serde(rename = "Day")]
    pub day: Vec<DayKind>,
    #[serde(rename = "OnCall")]
    pub on_call: Vec<Option<String>>,
    #[serde(rename = "OnLate")]
    pub on_late: Vec<Option<String>>,
    #[serde(rename = "Post-Call")]
    pub post_call: Vec<Option<String>>,
    #[serde(rename = "Post-Holiday")]
    pub post_holiday: Vec<Option<String>>,
    #[serde(rename = "Post-Late")]
    pub post_late: Vec<Option<String>>,
    #[serde(rename = "Pre-Call")]
    pub pre_call: Vec<Option<String>>,
    #[serde(rename = "Pre-Holiday")]
    pub pre_holiday: Vec<Option<String>>,
    #[serde(rename = "Unassigned")]
    pub unassigned: Vec<Vec<String>>,
    #[serde(rename = "Admin")]
    pub admin: Vec<Option<Vec<String>>>,
    #[serde(rename = "Offsite")]
    pub offsite: Vec<Vec<String>>,
    /// Weekday names ("Mon".."Sun") matching the array indices.
    #[serde(rename = "Order")]
    pub order: Vec<String>,
    /// Active registry for the week, sorted.
    #[serde(rename = "Doctors")]
    pub doctors: Vec<String>,
    #[serde(rename = "Period")]
    pub period: Period,
    /// Present only after the optimizer has run.
    #[serde(rename = "Solution", default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<SolutionJson>,
}

/// Solver output merged back into the schedule document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionJson {
    /// Per day: the solved Unassigned pool as (doctor, peel value) pairs,
    /// ordered by peel value.
    #[serde(rename = "Whine")]
    pub whine: Vec<Vec<(String, u32)>>,
    #[serde(rename = "Charge")]
    pub charge: Vec<Option<String>>,
    #[serde(rename = "Cardiac")]
    pub cardiac: Vec<Option<String>>,
    /// Per doctor: `[total_points, preassigned_points]`.
    #[serde(rename = "Points")]
    pub points: BTreeMap<String, (u32, u32)>,
    /// The central value mu the equity bands are anchored on.
    #[serde(rename = "Target")]
    pub target: f64,
    #[serde(rename = "Objective")]
    pub objective: ObjectiveBreakdown,
    #[serde(rename = "Solver")]
    pub solver: SolverTelemetry,
}

/// The weighted objective and its component terms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObjectiveBreakdown {
    pub total: f64,
    pub equity: f64,
    pub role_concentration: f64,
    pub charge_preference: f64,
}

/// Size and status of the solved program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverTelemetry {
    pub constraints: usize,
    pub variables: usize,
    pub status: String,
}

/// User-supplied per-day overlays applied before optimization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestsJson {
    /// Per day: `null` leaves the admin slots untouched; a list replaces
    /// them (entries are names, ids, or aliases).
    #[serde(rename = "Admin", default)]
    pub admin: Vec<Option<Vec<String>>>,
    /// Per day: peel-position pinnings `[doctor, order]` to add to the
    /// preassignments.
    #[serde(rename = "Whine", default)]
    pub whine: Vec<Option<Vec<(String, u32)>>>,
}

/// Read a raw weekly snapshot from disk.
pub fn read_raw_week(path: &Path) -> ScheduleResult<RawWeek> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| ScheduleError::malformed(format!("{}: {}", path.display(), e)))
}

/// Read a derived weekly schedule from disk.
pub fn read_derived_week(path: &Path) -> ScheduleResult<DerivedWeekJson> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| ScheduleError::malformed(format!("{}: {}", path.display(), e)))
}

/// Write a derived (or solved) weekly schedule to disk.
pub fn write_derived_week(path: &Path, week: &DerivedWeekJson) -> ScheduleResult<()> {
    let text = serde_json::to_string_pretty(week)?;
    std::fs::write(path, text)?;
    Ok(())
}

/// Read a requirements overlay from disk.
pub fn read_requests(path: &Path) -> ScheduleResult<RequestsJson> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| ScheduleError::malformed(format!("{}: {}", path.display(), e)))
}
