//! In-memory weekly schedule model.
//!
//! `DoctorSchedule` is built from the transposed derived-week document plus
//! the active roster. It materializes the per-day sets the optimizer needs
//! (working, off-site, preassigned peel positions, potential charge and
//! cardiac doctors) and runs the invariant validator.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::api::{
    DayKind, DerivedWeekJson, ObjectiveBreakdown, Period, SolutionJson, SolverTelemetry, ADMIN_ID,
    PLACEHOLDER_ID,
};
use crate::calendar::HolidayCalendar;
use crate::error::{ScheduleError, ScheduleResult};
use crate::models::points::{Assignment, Points, ShiftLabel, ADMIN_POINTS};
use crate::staff::Roster;

/// Solver output in model terms, prior to serialization.
#[derive(Debug, Clone)]
pub struct ScheduleSolution {
    /// Per day: solved Unassigned pool as (doctor, peel value), ordered by
    /// peel value.
    pub whine: Vec<Vec<(String, u32)>>,
    pub charge: Vec<Option<String>>,
    pub cardiac: Vec<Option<String>>,
    /// The central value mu.
    pub target: f64,
    pub objective: ObjectiveBreakdown,
    pub telemetry: SolverTelemetry,
}

/// A derived week bound to its roster, with all per-day sets materialized.
#[derive(Debug, Clone)]
pub struct DoctorSchedule {
    json: DerivedWeekJson,
    roster: Roster,
    calendar: HolidayCalendar,
    dates: Vec<NaiveDate>,
    working: Vec<Vec<String>>,
    offsite: Vec<Vec<String>>,
    assignments: Vec<Vec<Assignment>>,
    whine: Vec<Vec<String>>,
    admin_doctors: Vec<Vec<String>>,
    preassigned: Vec<BTreeMap<u32, String>>,
    pinned: Vec<Vec<(String, u32)>>,
    call_and_late: Vec<Vec<String>>,
    potential_charge: Vec<Vec<String>>,
    potential_cardiac: Vec<Vec<String>>,
    last_position: Vec<u32>,
    solution: Option<ScheduleSolution>,
}

fn clean_single(value: &Option<String>) -> Option<&str> {
    match value.as_deref() {
        Some(PLACEHOLDER_ID) | Some(ADMIN_ID) | None => None,
        Some(id) => Some(id),
    }
}

fn has_duplicates(items: &[String]) -> bool {
    let set: BTreeSet<&String> = items.iter().collect();
    set.len() != items.len()
}

impl DoctorSchedule {
    /// Bind a derived week to a roster. Shape errors (wrong array lengths,
    /// broken period) are fatal here; semantic violations are reported by
    /// [`DoctorSchedule::validate`].
    pub fn new(json: DerivedWeekJson, roster: Roster) -> ScheduleResult<Self> {
        let days = json.order.len();
        if days != 7 {
            return Err(ScheduleError::malformed(format!(
                "expected 7 days in Order, found {}",
                days
            )));
        }
        if json.period.start + chrono::Duration::days(6) != json.period.end {
            return Err(ScheduleError::malformed(format!(
                "period {} - {} does not span a week",
                json.period.start, json.period.end
            )));
        }
        let lengths = [
            json.day.len(),
            json.on_call.len(),
            json.on_late.len(),
            json.post_call.len(),
            json.post_holiday.len(),
            json.post_late.len(),
            json.pre_call.len(),
            json.pre_holiday.len(),
            json.unassigned.len(),
            json.admin.len(),
            json.offsite.len(),
        ];
        if lengths.iter().any(|&len| len != days) {
            return Err(ScheduleError::malformed(
                "per-field arrays do not all match the Order length".to_string(),
            ));
        }

        let calendar = HolidayCalendar::covering(json.period.start, json.period.end);
        let dates = json.period.dates();
        let mut schedule = DoctorSchedule {
            json,
            roster,
            calendar,
            dates,
            working: vec![],
            offsite: vec![],
            assignments: vec![],
            whine: vec![],
            admin_doctors: vec![],
            preassigned: vec![],
            pinned: vec![Vec::new(); 7],
            call_and_late: vec![],
            potential_charge: vec![],
            potential_cardiac: vec![],
            last_position: vec![],
            solution: None,
        };
        schedule.rebuild();
        Ok(schedule)
    }

    /// Recompute every derived per-day set from the JSON form. Called on
    /// construction and again after a requirements overlay mutates the
    /// underlying arrays.
    pub(crate) fn rebuild(&mut self) {
        let days = self.json.order.len();
        self.working = Vec::with_capacity(days);
        self.offsite = Vec::with_capacity(days);
        self.assignments = Vec::with_capacity(days);
        self.whine = Vec::with_capacity(days);
        self.admin_doctors = Vec::with_capacity(days);
        self.preassigned = Vec::with_capacity(days);
        self.call_and_late = Vec::with_capacity(days);
        self.potential_charge = Vec::with_capacity(days);
        self.potential_cardiac = Vec::with_capacity(days);
        self.last_position = Vec::with_capacity(days);

        for i in 0..days {
            let whine: Vec<String> = self.json.unassigned[i]
                .iter()
                .filter(|d| *d != PLACEHOLDER_ID && *d != ADMIN_ID)
                .cloned()
                .collect();
            let admin_doctors: Vec<String> = self.json.admin[i]
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .filter(|d| *d != ADMIN_ID && *d != PLACEHOLDER_ID)
                .cloned()
                .collect();
            let offsite: Vec<String> = self.json.offsite[i]
                .iter()
                .filter(|d| *d != PLACEHOLDER_ID)
                .cloned()
                .collect();

            let mut assignments = Vec::new();
            let mut preassigned = BTreeMap::new();
            let mut working = Vec::new();
            let mut tally: u32 = 1;
            for label in ShiftLabel::TURN_ORDER {
                match label {
                    ShiftLabel::Unassigned => {
                        let k = whine.len() as u32;
                        if k > 0 {
                            let range = Points::Range { lo: tally, hi: tally + k - 1 };
                            for doctor in &whine {
                                assignments.push(Assignment {
                                    doctor: doctor.clone(),
                                    points: range,
                                    shift: label,
                                });
                                working.push(doctor.clone());
                            }
                            tally += k;
                        }
                    }
                    ShiftLabel::Admin => {
                        for doctor in &admin_doctors {
                            assignments.push(Assignment {
                                doctor: doctor.clone(),
                                points: Points::Fixed(ADMIN_POINTS),
                                shift: label,
                            });
                            working.push(doctor.clone());
                        }
                    }
                    _ => {
                        if let Some(doctor) = clean_single(self.single_role(label, i)) {
                            assignments.push(Assignment {
                                doctor: doctor.to_string(),
                                points: Points::Fixed(tally),
                                shift: label,
                            });
                            preassigned.insert(tally, doctor.to_string());
                            working.push(doctor.to_string());
                            tally += 1;
                        }
                    }
                }
            }

            let call_and_late: Vec<String> = [&self.json.on_call[i], &self.json.on_late[i]]
                .into_iter()
                .filter_map(clean_single)
                .map(str::to_string)
                .collect();

            let mut potential_charge: Vec<String> = call_and_late
                .iter()
                .chain(whine.iter())
                .filter(|d| self.roster.is_charge(d))
                .cloned()
                .collect();
            potential_charge.sort();
            potential_charge.dedup();

            let mut potential_cardiac: Vec<String> = call_and_late
                .iter()
                .filter(|d| self.roster.is_cardiac(d))
                .cloned()
                .collect();
            potential_cardiac.sort();
            potential_cardiac.dedup();

            self.last_position.push(tally.saturating_sub(1));
            self.working.push(working);
            self.offsite.push(offsite);
            self.assignments.push(assignments);
            self.whine.push(whine);
            self.admin_doctors.push(admin_doctors);
            self.preassigned.push(preassigned);
            self.call_and_late.push(call_and_late);
            self.potential_charge.push(potential_charge);
            self.potential_cardiac.push(potential_cardiac);
        }
    }

    fn single_role(&self, label: ShiftLabel, day: usize) -> &Option<String> {
        match label {
            ShiftLabel::PostCall => &self.json.post_call[day],
            ShiftLabel::PostHoliday => &self.json.post_holiday[day],
            ShiftLabel::PostLate => &self.json.post_late[day],
            ShiftLabel::PreCall => &self.json.pre_call[day],
            ShiftLabel::PreHoliday => &self.json.pre_holiday[day],
            ShiftLabel::OnLate => &self.json.on_late[day],
            ShiftLabel::OnCall => &self.json.on_call[day],
            _ => unreachable!("{} is not a single-doctor label", label),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn period(&self) -> Period {
        self.json.period
    }

    /// Weekday names in date order ("Mon".."Sun").
    pub fn days(&self) -> &[String] {
        &self.json.order
    }

    pub fn date(&self, day: usize) -> NaiveDate {
        self.dates[day]
    }

    pub fn kind(&self, day: usize) -> DayKind {
        self.json.day[day]
    }

    /// Indices of the week's workdays, in date order.
    pub fn workdays(&self) -> Vec<usize> {
        (0..self.json.order.len())
            .filter(|&i| self.json.day[i] == DayKind::Weekday)
            .collect()
    }

    pub fn working(&self, day: usize) -> &[String] {
        &self.working[day]
    }

    pub fn offsite(&self, day: usize) -> &[String] {
        &self.offsite[day]
    }

    pub fn assignments(&self, day: usize) -> &[Assignment] {
        &self.assignments[day]
    }

    /// The Unassigned ("whine") pool for the day.
    pub fn whine(&self, day: usize) -> &[String] {
        &self.whine[day]
    }

    /// Doctors pinned to admin slots (sentinels excluded).
    pub fn admin_doctors(&self, day: usize) -> &[String] {
        &self.admin_doctors[day]
    }

    /// Count of admin slots for the day, filled or not.
    pub fn admin_slots(&self, day: usize) -> usize {
        self.json.admin[day].as_deref().map(|a| a.len()).unwrap_or(0)
    }

    pub fn preassigned(&self, day: usize) -> &BTreeMap<u32, String> {
        &self.preassigned[day]
    }

    /// Whine-position pinnings added by the requirements overlay.
    pub fn pinned(&self, day: usize) -> &[(String, u32)] {
        &self.pinned[day]
    }

    pub fn call_and_late(&self, day: usize) -> &[String] {
        &self.call_and_late[day]
    }

    pub fn potential_charge(&self, day: usize) -> &[String] {
        &self.potential_charge[day]
    }

    pub fn potential_cardiac(&self, day: usize) -> &[String] {
        &self.potential_cardiac[day]
    }

    /// Highest peel position on the day (the OnCall slot).
    pub fn last_position(&self, day: usize) -> u32 {
        self.last_position[day]
    }

    /// All peel positions on the day.
    pub fn orders(&self, day: usize) -> std::ops::RangeInclusive<u32> {
        1..=self.last_position[day]
    }

    /// Contiguous positions the Unassigned pool occupies, if non-empty.
    pub fn whine_range(&self, day: usize) -> Option<Points> {
        self.assignments[day]
            .iter()
            .find(|a| a.shift == ShiftLabel::Unassigned)
            .map(|a| a.points)
    }

    /// Peel position reserved for a charge doctor drawn from the
    /// Unassigned pool: the last position of the whine range.
    pub fn charge_order(&self, day: usize) -> Option<u32> {
        match self.whine_range(day) {
            Some(Points::Range { hi, .. }) => Some(hi),
            _ => None,
        }
    }

    /// Number of workdays on which the doctor works (any role, admin
    /// included).
    pub fn weekdays_worked(&self, doctor: &str) -> u32 {
        self.workdays()
            .into_iter()
            .filter(|&d| self.working[d].iter().any(|w| w == doctor))
            .count() as u32
    }

    /// Sum of settled points over the week: fixed transition roles, call
    /// roles, and admin slots. Unassigned ranges are excluded.
    pub fn preassigned_points(&self, doctor: &str) -> u32 {
        self.assignments
            .iter()
            .flatten()
            .filter(|a| a.doctor == doctor)
            .filter_map(|a| a.points.fixed())
            .sum()
    }

    /// Total points including the solved Unassigned positions, when a
    /// solution has been merged.
    pub fn total_points(&self, doctor: &str) -> u32 {
        let solved: u32 = self
            .solution
            .as_ref()
            .map(|s| {
                s.whine
                    .iter()
                    .flatten()
                    .filter(|(d, _)| d == doctor)
                    .map(|(_, p)| *p)
                    .sum()
            })
            .unwrap_or(0);
        self.preassigned_points(doctor) + solved
    }

    pub fn solution(&self) -> Option<&ScheduleSolution> {
        self.solution.as_ref()
    }

    // ------------------------------------------------------------------
    // Mutation (requirements overlay, solver merge)
    // ------------------------------------------------------------------

    /// Replace the day's admin slots with an explicit doctor list, removing
    /// those doctors from the Unassigned pool and the off-site set. The
    /// derived sets are rebuilt.
    pub(crate) fn set_admin(&mut self, day: usize, doctors: Vec<String>) {
        for doctor in &doctors {
            self.json.unassigned[day].retain(|d| d != doctor);
            self.json.offsite[day].retain(|d| d != doctor);
        }
        self.json.admin[day] = if doctors.is_empty() { None } else { Some(doctors) };
        self.rebuild();
    }

    /// Pin a whine doctor to a concrete peel position.
    pub(crate) fn pin_whine(&mut self, day: usize, doctor: String, position: u32) -> ScheduleResult<()> {
        let day_name = self.json.order[day].clone();
        if !self.working[day].iter().any(|w| *w == doctor) {
            return Err(ScheduleError::RequirementsConflict(format!(
                "{} is not working on {}",
                doctor, day_name
            )));
        }
        if let Some(existing) = self.preassigned[day].get(&position) {
            return Err(ScheduleError::RequirementsConflict(format!(
                "position {} on {} is already held by {}",
                position, day_name, existing
            )));
        }
        let in_range = self
            .whine_range(day)
            .map(|r| r.contains(position))
            .unwrap_or(false);
        if !in_range {
            return Err(ScheduleError::RequirementsConflict(format!(
                "position {} on {} is outside the unassigned range",
                position, day_name
            )));
        }
        if !self.whine[day].iter().any(|w| *w == doctor) {
            return Err(ScheduleError::RequirementsConflict(format!(
                "{} has a fixed role on {} and cannot be pinned",
                doctor, day_name
            )));
        }
        if self.pinned[day].iter().any(|(d, p)| *d == doctor || *p == position) {
            return Err(ScheduleError::RequirementsConflict(format!(
                "duplicate pinning for {} / position {} on {}",
                doctor, position, day_name
            )));
        }
        self.pinned[day].push((doctor, position));
        Ok(())
    }

    /// Merge the solver's answer into the schedule.
    pub fn merge_solution(&mut self, solution: ScheduleSolution) {
        let mut points = BTreeMap::new();
        self.solution = Some(solution);
        for doctor in self.roster.everyone().to_vec() {
            points.insert(
                doctor.clone(),
                (self.total_points(&doctor), self.preassigned_points(&doctor)),
            );
        }
        let solution = self.solution.as_ref().expect("just set");
        self.json.solution = Some(SolutionJson {
            whine: solution.whine.clone(),
            charge: solution.charge.clone(),
            cardiac: solution.cardiac.clone(),
            points,
            target: solution.target,
            objective: solution.objective,
            solver: solution.telemetry.clone(),
        });
    }

    /// The JSON document, including the solution when present.
    pub fn to_json(&self) -> &DerivedWeekJson {
        &self.json
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Check every schedule invariant; returns one message per violation.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.json.doctors != self.roster.everyone() {
            errors.push(format!(
                "doctor list in schedule does not match the staff registry ({:?} vs {:?})",
                self.json.doctors,
                self.roster.everyone()
            ));
        }

        for i in 0..self.json.order.len() {
            let day = &self.json.order[i];
            let (is_workday, label) = self.calendar.is_workday(self.dates[i]);
            match self.json.day[i] {
                DayKind::Weekday if !is_workday => errors.push(format!(
                    "{} is classified as a workday but {} is {}",
                    day,
                    self.dates[i],
                    label.unwrap_or("not one")
                )),
                DayKind::Weekend if is_workday => errors.push(format!(
                    "{} is classified as a weekend but {} is a plain workday",
                    day, self.dates[i]
                )),
                _ => {}
            }

            if self.json.day[i] == DayKind::Weekend {
                continue;
            }

            if has_duplicates(&self.working[i]) {
                errors.push(format!("duplicate doctors in the working list on {}", day));
            }
            if has_duplicates(&self.offsite[i]) {
                errors.push(format!("duplicate doctors in the off-site list on {}", day));
            }

            let mut present: Vec<String> = self.working[i]
                .iter()
                .chain(self.offsite[i].iter())
                .cloned()
                .collect();
            present.sort();
            if present != self.roster.everyone() {
                let everyone: BTreeSet<&String> = self.roster.everyone().iter().collect();
                let here: BTreeSet<&String> = present.iter().collect();
                let missing: Vec<&&String> = everyone.difference(&here).collect();
                let extra: Vec<&&String> = here.difference(&everyone).collect();
                errors.push(format!(
                    "working + off-site does not partition the registry on {} (missing {:?}, unexpected {:?})",
                    day, missing, extra
                ));
            }

            let charge = &self.potential_charge[i];
            let cardiac = &self.potential_cardiac[i];
            if charge.is_empty() {
                errors.push(format!("no potential charge doctor on {}", day));
            }
            if cardiac.is_empty() {
                errors.push(format!("no potential cardiac doctor on {}", day));
            }
            if charge.len() == 1 && cardiac.len() == 1 && charge[0] == cardiac[0] {
                errors.push(format!(
                    "same doctor ({}) is the only option for both charge and cardiac on {}",
                    charge[0], day
                ));
            } else {
                let union: BTreeSet<&String> = charge.iter().chain(cardiac.iter()).collect();
                if !charge.is_empty() && !cardiac.is_empty() && union.len() < 2 {
                    errors.push(format!(
                        "fewer than two distinct charge/cardiac candidates on {}",
                        day
                    ));
                }
            }

            for doctor in &self.admin_doctors[i] {
                if self.whine[i].contains(doctor) {
                    errors.push(format!(
                        "{} holds an admin slot on {} but is still in the unassigned pool",
                        doctor, day
                    ));
                }
            }
        }

        errors
    }

    /// Validate and convert violations into a `ValidationFailed` error.
    pub fn ensure_valid(&self) -> ScheduleResult<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ScheduleError::ValidationFailed(errors))
        }
    }
}
