//! MILP formulation of the weekly peel assignment problem.
//!
//! Builds a [`Program`] from a validated [`DoctorSchedule`]: peel-position
//! binaries for every working doctor, charge and cardiac election binaries,
//! equity-band indicators around a continuous central value, and the
//! week-wide role-concentration maxima. The weighted objective rewards
//! equity first, low role concentration second, and charge picks from the
//! call pair as a tie-break.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::api::{ObjectiveBreakdown, SolverTelemetry};
use crate::error::{ScheduleError, ScheduleResult};
use crate::models::points::{ShiftLabel, ADMIN_POINTS};
use crate::models::schedule::{DoctorSchedule, ScheduleSolution};
use crate::solver::{iis, Cmp, MilpBackend, Program, Solution, SolveOutcome, VarId};

/// Objective weights; the ordering `alpha >> beta >> gamma` must hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    /// Equity bands.
    pub alpha: f64,
    /// Role concentration (penalty).
    pub beta: f64,
    /// Charge-from-call preference.
    pub gamma: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Weights { alpha: 1.0, beta: 0.01, gamma: 0.001 }
    }
}

impl Weights {
    pub fn ensure_ordered(&self) -> ScheduleResult<()> {
        if self.alpha > self.beta && self.beta > self.gamma && self.gamma > 0.0 {
            Ok(())
        } else {
            Err(ScheduleError::Config(format!(
                "objective weights must satisfy alpha > beta > gamma > 0 (got {} / {} / {})",
                self.alpha, self.beta, self.gamma
            )))
        }
    }
}

/// Half-widths and objective weights of the equity bands.
const EQUITY_BANDS: [(f64, f64); 3] = [(1.0, 1.0), (0.5, 0.5), (0.2, 0.2)];

/// Outcome of an optimization run.
#[derive(Debug, Clone)]
pub enum AllocationOutcome {
    Solved(ScheduleSolution),
    Infeasible,
}

/// The built program plus the variable maps needed to read a solution back.
pub struct AllocationModel<'a> {
    schedule: &'a DoctorSchedule,
    weights: Weights,
    program: Program,
    /// (doctor, day, peel position) -> variable.
    x: HashMap<(String, usize, u32), VarId>,
    /// (doctor, day) -> charge election variable.
    z: HashMap<(String, usize), VarId>,
    /// (doctor, day) -> cardiac election variable.
    w: HashMap<(String, usize), VarId>,
    /// (band index, doctor) -> equity indicator.
    y: HashMap<(usize, String), VarId>,
    mu: VarId,
    max_cardiac: VarId,
    max_charge: VarId,
    max_both: VarId,
    workdays: Vec<usize>,
}

impl<'a> AllocationModel<'a> {
    /// Formulate the program for a validated schedule.
    pub fn build(schedule: &'a DoctorSchedule, weights: Weights) -> ScheduleResult<Self> {
        weights.ensure_ordered()?;

        let workdays = schedule.workdays();
        let days = schedule.days();
        let max_positions = workdays
            .iter()
            .map(|&d| schedule.last_position(d))
            .max()
            .unwrap_or(0);
        // Big-M for the equity linearization.
        let big_m = (workdays.len() as f64) * (max_positions as f64);

        let mut program = Program::new();
        let mut x = HashMap::new();
        let mut z = HashMap::new();
        let mut w = HashMap::new();
        let mut y = HashMap::new();

        // Peel-position binaries: preassigned roles are fixed through
        // their bounds, unassigned doctors range over the whine positions.
        for &d in &workdays {
            let day = &days[d];
            for (&position, doctor) in schedule.preassigned(d) {
                let var = program.add_binary(format!("x_{}_{}_{}", doctor, day, position), 0.0);
                program.fix(var, 1.0);
                x.insert((doctor.clone(), d, position), var);
            }
            if let Some(range) = schedule.whine_range(d) {
                for doctor in schedule.whine(d) {
                    for position in range.iter() {
                        let var = program
                            .add_binary(format!("x_{}_{}_{}", doctor, day, position), 0.0);
                        x.insert((doctor.clone(), d, position), var);
                    }
                }
            }
            for (doctor, position) in schedule.pinned(d) {
                let var = x.get(&(doctor.clone(), d, *position)).copied().ok_or_else(|| {
                    ScheduleError::RequirementsConflict(format!(
                        "pinned position {} for {} on {} is not available",
                        position, doctor, day
                    ))
                })?;
                program.fix(var, 1.0);
            }
        }

        // Election binaries. Charge picks drawn from the call pair carry
        // the gamma preference in the objective.
        for &d in &workdays {
            let day = &days[d];
            for doctor in schedule.potential_charge(d) {
                let on_call = schedule.call_and_late(d).contains(doctor);
                let objective = if on_call { weights.gamma } else { 0.0 };
                let var = program.add_binary(format!("z_{}_{}", doctor, day), objective);
                z.insert((doctor.clone(), d), var);
            }
            for doctor in schedule.potential_cardiac(d) {
                let var = program.add_binary(format!("w_{}_{}", doctor, day), 0.0);
                w.insert((doctor.clone(), d), var);
            }
        }

        // Week-wide role maxima and the equity central value.
        let horizon = workdays.len() as f64;
        let max_cardiac = program.add_continuous("max_in_cardiac", 0.0, horizon, -weights.beta);
        let max_charge = program.add_continuous("max_in_charge", 0.0, horizon, -weights.beta);
        let max_both = program.add_continuous("max_in_charge_cardiac", 0.0, 2.0 * horizon, -weights.beta);
        let mu = program.add_continuous("central_value", 0.0, big_m.max(1.0), 0.0);

        // Equity indicators for every doctor who works some weekday.
        for doctor in schedule.roster().everyone() {
            if schedule.weekdays_worked(doctor) == 0 {
                continue;
            }
            for (band, &(eps, weight)) in EQUITY_BANDS.iter().enumerate() {
                let var = program.add_binary(
                    format!("y_e{}_{}", eps, doctor),
                    weights.alpha * weight,
                );
                y.insert((band, doctor.clone()), var);
            }
        }

        let mut model = AllocationModel {
            schedule,
            weights,
            program,
            x,
            z,
            w,
            y,
            mu,
            max_cardiac,
            max_charge,
            max_both,
            workdays,
        };
        model.add_constraints(big_m);
        Ok(model)
    }

    fn add_constraints(&mut self, big_m: f64) {
        let schedule = self.schedule;
        let days = schedule.days();
        let workdays = self.workdays.clone();

        for &d in &workdays {
            let day = &days[d];

            // At most one doctor per peel position.
            for position in schedule.orders(d) {
                let terms: Vec<(VarId, f64)> = self
                    .x
                    .iter()
                    .filter(|((_, xd, xp), _)| *xd == d && *xp == position)
                    .map(|(_, &var)| (var, 1.0))
                    .collect();
                if !terms.is_empty() {
                    self.program.add_constraint(
                        format!("peel_unique_{}_{}", day, position),
                        terms,
                        Cmp::Le,
                        1.0,
                    );
                }
            }

            // Every peel-eligible doctor occupies exactly one position.
            let mut placed: BTreeMap<&String, Vec<(VarId, f64)>> = BTreeMap::new();
            for ((doctor, xd, _), &var) in &self.x {
                if *xd == d {
                    placed.entry(doctor).or_default().push((var, 1.0));
                }
            }
            for (doctor, terms) in placed {
                self.program.add_constraint(
                    format!("placed_once_{}_{}", day, doctor),
                    terms,
                    Cmp::Eq,
                    1.0,
                );
            }

            // Exactly one charge, from the eligible set.
            let charge_terms: Vec<(VarId, f64)> = schedule
                .potential_charge(d)
                .iter()
                .filter_map(|doctor| self.z.get(&(doctor.clone(), d)).map(|&v| (v, 1.0)))
                .collect();
            self.program
                .add_constraint(format!("one_charge_{}", day), charge_terms, Cmp::Eq, 1.0);

            // A charge doctor drawn from the whine pool must peel at the
            // charge order position.
            if let Some(charge_order) = schedule.charge_order(d) {
                for doctor in schedule.whine(d) {
                    if let Some(&z_var) = self.z.get(&(doctor.clone(), d)) {
                        let x_var = self.x[&(doctor.clone(), d, charge_order)];
                        self.program.add_constraint(
                            format!("charge_order_{}_{}", day, doctor),
                            vec![(x_var, 1.0), (z_var, -1.0)],
                            Cmp::Ge,
                            0.0,
                        );
                    }
                }
            }

            // Exactly one cardiac, from the call pair.
            let cardiac_terms: Vec<(VarId, f64)> = schedule
                .potential_cardiac(d)
                .iter()
                .filter_map(|doctor| self.w.get(&(doctor.clone(), d)).map(|&v| (v, 1.0)))
                .collect();
            self.program
                .add_constraint(format!("one_cardiac_{}", day), cardiac_terms, Cmp::Eq, 1.0);

            // Charge and cardiac cannot be the same doctor on a day.
            for doctor in schedule.potential_charge(d) {
                if let (Some(&z_var), Some(&w_var)) = (
                    self.z.get(&(doctor.clone(), d)),
                    self.w.get(&(doctor.clone(), d)),
                ) {
                    self.program.add_constraint(
                        format!("charge_cardiac_conflict_{}_{}", day, doctor),
                        vec![(z_var, 1.0), (w_var, 1.0)],
                        Cmp::Le,
                        1.0,
                    );
                }
            }
        }

        // No doctor is charge on consecutive workdays.
        for pair in workdays.windows(2) {
            let (d1, d2) = (pair[0], pair[1]);
            for doctor in schedule.roster().charge_doctors() {
                if let (Some(&z1), Some(&z2)) = (
                    self.z.get(&(doctor.clone(), d1)),
                    self.z.get(&(doctor.clone(), d2)),
                ) {
                    self.program.add_constraint(
                        format!("no_consecutive_charge_{}_{}_{}", doctor, days[d1], days[d2]),
                        vec![(z1, 1.0), (z2, 1.0)],
                        Cmp::Le,
                        1.0,
                    );
                }
            }
        }

        // Week-wide role-count maxima.
        for doctor in schedule.roster().cardiac_doctors() {
            let terms: Vec<(VarId, f64)> = self
                .workdays
                .iter()
                .filter_map(|&d| self.w.get(&(doctor.clone(), d)).map(|&v| (v, 1.0)))
                .collect();
            if !terms.is_empty() {
                let mut terms = terms;
                terms.push((self.max_cardiac, -1.0));
                self.program
                    .add_constraint(format!("max_cardiac_{}", doctor), terms, Cmp::Le, 0.0);
            }
        }
        for doctor in schedule.roster().charge_doctors() {
            let terms: Vec<(VarId, f64)> = self
                .workdays
                .iter()
                .filter_map(|&d| self.z.get(&(doctor.clone(), d)).map(|&v| (v, 1.0)))
                .collect();
            if !terms.is_empty() {
                let mut terms = terms;
                terms.push((self.max_charge, -1.0));
                self.program
                    .add_constraint(format!("max_charge_{}", doctor), terms, Cmp::Le, 0.0);
            }
        }
        for doctor in schedule.roster().charge_doctors() {
            if !schedule.roster().is_cardiac(doctor) {
                continue;
            }
            let mut terms: Vec<(VarId, f64)> = Vec::new();
            for &d in &self.workdays {
                if let Some(&z_var) = self.z.get(&(doctor.clone(), d)) {
                    terms.push((z_var, 1.0));
                }
                if let Some(&w_var) = self.w.get(&(doctor.clone(), d)) {
                    terms.push((w_var, 1.0));
                }
            }
            if !terms.is_empty() {
                terms.push((self.max_both, -1.0));
                self.program
                    .add_constraint(format!("max_both_{}", doctor), terms, Cmp::Le, 0.0);
            }
        }

        // Equity bands: y[eps, a] = 1 asserts the doctor's mean peel per
        // worked weekday sits within eps of the central value.
        for doctor in schedule.roster().everyone().to_vec() {
            let worked = schedule.weekdays_worked(&doctor);
            if worked == 0 {
                continue;
            }
            let divisor = worked as f64;
            let point_terms: Vec<(VarId, f64)> = self
                .x
                .iter()
                .filter(|((xa, _, _), _)| *xa == doctor)
                .map(|((_, _, position), &var)| (var, *position as f64 / divisor))
                .collect();
            let admin_slots: u32 = self
                .workdays
                .iter()
                .map(|&d| {
                    schedule
                        .assignments(d)
                        .iter()
                        .filter(|a| a.shift == ShiftLabel::Admin && a.doctor == doctor)
                        .count() as u32
                })
                .sum();
            let admin_ratio = (admin_slots * ADMIN_POINTS) as f64 / divisor;

            for (band, &(eps, _)) in EQUITY_BANDS.iter().enumerate() {
                let y_var = self.y[&(band, doctor.clone())];

                // ratio - (mu - eps) >= -M (1 - y)
                let mut lo_terms = point_terms.clone();
                lo_terms.push((self.mu, -1.0));
                lo_terms.push((y_var, -big_m));
                self.program.add_constraint(
                    format!("equity_low_e{}_{}", eps, doctor),
                    lo_terms,
                    Cmp::Ge,
                    -big_m - eps - admin_ratio,
                );

                // (mu + eps) - ratio >= -M (1 - y)
                let mut hi_terms: Vec<(VarId, f64)> =
                    point_terms.iter().map(|&(v, c)| (v, -c)).collect();
                hi_terms.push((self.mu, 1.0));
                hi_terms.push((y_var, -big_m));
                self.program.add_constraint(
                    format!("equity_high_e{}_{}", eps, doctor),
                    hi_terms,
                    Cmp::Ge,
                    -big_m - eps + admin_ratio,
                );
            }
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Solve the program and read the solution back into schedule terms.
    pub fn solve<B: MilpBackend>(
        &self,
        backend: &B,
        time_limit: Duration,
    ) -> ScheduleResult<AllocationOutcome> {
        log::info!(
            "solving allocation program: {} variables, {} constraints",
            self.program.num_variables(),
            self.program.num_constraints()
        );
        match backend.solve(&self.program, time_limit)? {
            SolveOutcome::Optimal(solution) => Ok(AllocationOutcome::Solved(self.read_back(&solution))),
            SolveOutcome::Infeasible => Ok(AllocationOutcome::Infeasible),
        }
    }

    fn read_back(&self, solution: &Solution) -> ScheduleSolution {
        let schedule = self.schedule;
        let day_count = schedule.days().len();
        let mut whine = vec![Vec::new(); day_count];
        let mut charge = vec![None; day_count];
        let mut cardiac = vec![None; day_count];

        for &d in &self.workdays {
            for doctor in schedule.whine(d) {
                if let Some(range) = schedule.whine_range(d) {
                    for position in range.iter() {
                        let var = self.x[&(doctor.clone(), d, position)];
                        if solution.is_one(var) {
                            whine[d].push((doctor.clone(), position));
                        }
                    }
                }
            }
            whine[d].sort_by_key(|(_, position)| *position);

            for doctor in schedule.potential_charge(d) {
                if solution.is_one(self.z[&(doctor.clone(), d)]) {
                    charge[d] = Some(doctor.clone());
                }
            }
            for doctor in schedule.potential_cardiac(d) {
                if solution.is_one(self.w[&(doctor.clone(), d)]) {
                    cardiac[d] = Some(doctor.clone());
                }
            }
        }

        let equity: f64 = EQUITY_BANDS
            .iter()
            .enumerate()
            .map(|(band, &(_, weight))| {
                let ones = self
                    .y
                    .iter()
                    .filter(|((b, _), &var)| *b == band && solution.is_one(var))
                    .count();
                weight * ones as f64
            })
            .sum();
        let role_concentration = solution.value(self.max_cardiac)
            + solution.value(self.max_charge)
            + solution.value(self.max_both);
        let charge_preference: f64 = self
            .workdays
            .iter()
            .flat_map(|&d| {
                schedule
                    .call_and_late(d)
                    .iter()
                    .filter_map(move |doctor| self.z.get(&(doctor.clone(), d)))
            })
            .filter(|&&var| solution.is_one(var))
            .count() as f64;
        let total = self.weights.alpha * equity - self.weights.beta * role_concentration
            + self.weights.gamma * charge_preference;

        ScheduleSolution {
            whine,
            charge,
            cardiac,
            target: solution.value(self.mu),
            objective: ObjectiveBreakdown {
                total,
                equity,
                role_concentration,
                charge_preference,
            },
            telemetry: SolverTelemetry {
                constraints: self.program.num_constraints(),
                variables: self.program.num_variables(),
                status: "Optimal".to_string(),
            },
        }
    }

    /// Explain an infeasible program: extract an IIS, map constraint names
    /// back to days, and report the problematic per-day sets along with
    /// the known structural dead ends.
    pub fn diagnose_infeasibility<B: MilpBackend>(
        &self,
        backend: &B,
        time_limit: Duration,
    ) -> ScheduleResult<String> {
        let schedule = self.schedule;
        let days = schedule.days();
        let names = iis(backend, &self.program, time_limit)?;

        let mut report = vec![format!(
            "no feasible assignment; {} constraints remain in the irreducible core",
            names.len()
        )];

        let mut incriminated: Vec<usize> = Vec::new();
        for &d in &self.workdays {
            if names.iter().any(|n| n.contains(days[d].as_str())) {
                incriminated.push(d);
            }
        }
        for &d in &incriminated {
            let day = &days[d];
            report.push(format!("--- {} ---", day));
            report.push(format!("  potential charge : {:?}", schedule.potential_charge(d)));
            report.push(format!("  potential cardiac: {:?}", schedule.potential_cardiac(d)));
            report.push(format!("  unassigned pool  : {:?}", schedule.whine(d)));
            report.push(format!("  admin            : {:?}", schedule.admin_doctors(d)));
            report.push(format!("  preassigned      : {:?}", schedule.preassigned(d)));
        }

        for &d in &self.workdays {
            let day = &days[d];
            let charge = schedule.potential_charge(d);
            let cardiac = schedule.potential_cardiac(d);
            if charge.is_empty() {
                report.push(format!("{}: no potential charge doctor", day));
            }
            if cardiac.is_empty() {
                report.push(format!("{}: no potential cardiac doctor", day));
            }
            if charge.len() == 1 && cardiac.len() == 1 && charge[0] == cardiac[0] {
                report.push(format!(
                    "{}: same physician ({}) is the only option for both charge and cardiac",
                    day, charge[0]
                ));
            } else {
                let union: std::collections::BTreeSet<&String> =
                    charge.iter().chain(cardiac.iter()).collect();
                if union.len() < 2 {
                    report.push(format!(
                        "{}: fewer than two distinct charge/cardiac candidates",
                        day
                    ));
                }
            }
        }

        Ok(report.join("\n"))
    }
}

/// Build, solve, and on infeasibility attach the diagnostic report to the
/// returned error.
pub fn optimize_schedule(
    schedule: &DoctorSchedule,
    weights: Weights,
    time_limit: Duration,
) -> ScheduleResult<ScheduleSolution> {
    let backend = crate::solver::MicrolpBackend;
    let model = AllocationModel::build(schedule, weights)?;
    match model.solve(&backend, time_limit)? {
        AllocationOutcome::Solved(solution) => Ok(solution),
        AllocationOutcome::Infeasible => {
            let report = model.diagnose_infeasibility(&backend, time_limit)?;
            log::error!("{}", report);
            Err(ScheduleError::Infeasible(report))
        }
    }
}
