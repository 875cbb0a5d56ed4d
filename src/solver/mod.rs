//! Abstract mixed-integer linear programming oracle.
//!
//! The optimization core builds a [`Program`] (binary and continuous
//! variables, named linear constraints, a linear objective) and hands it to
//! a [`MilpBackend`]. Any backend able to solve linear constraints over
//! binary variables satisfies the contract; the crate ships a pure-Rust one
//! in [`backend`].
//!
//! Infeasibility diagnostics come from [`iis`], a deletion filter that
//! shrinks the constraint set to an irreducible inconsistent subsystem by
//! re-solving without one constraint at a time.

pub mod backend;

pub use backend::MicrolpBackend;

use std::time::{Duration, Instant};

use crate::error::{ScheduleError, ScheduleResult};

/// Index of a variable inside its [`Program`].
pub type VarId = usize;

/// Variable domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarKind {
    Binary,
    Continuous { lo: f64, hi: f64 },
}

/// One decision variable.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    /// Coefficient in the (maximized) objective.
    pub objective: f64,
    /// Bound-fixed value, if any.
    pub fixed: Option<f64>,
}

/// Constraint comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Le,
    Ge,
    Eq,
}

/// One named linear constraint `terms <cmp> rhs`.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub cmp: Cmp,
    pub rhs: f64,
}

/// A maximization MILP.
#[derive(Debug, Clone, Default)]
pub struct Program {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn add_binary(&mut self, name: impl Into<String>, objective: f64) -> VarId {
        self.variables.push(Variable {
            name: name.into(),
            kind: VarKind::Binary,
            objective,
            fixed: None,
        });
        self.variables.len() - 1
    }

    pub fn add_continuous(
        &mut self,
        name: impl Into<String>,
        lo: f64,
        hi: f64,
        objective: f64,
    ) -> VarId {
        self.variables.push(Variable {
            name: name.into(),
            kind: VarKind::Continuous { lo, hi },
            objective,
            fixed: None,
        });
        self.variables.len() - 1
    }

    /// Fix a variable to a value through its bounds.
    pub fn fix(&mut self, var: VarId, value: f64) {
        self.variables[var].fixed = Some(value);
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(VarId, f64)>,
        cmp: Cmp,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            terms,
            cmp,
            rhs,
        });
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Copy of the program with a subset of the constraints, used by the
    /// IIS deletion filter.
    fn with_constraints(&self, keep: &[usize]) -> Program {
        Program {
            variables: self.variables.clone(),
            constraints: keep.iter().map(|&i| self.constraints[i].clone()).collect(),
        }
    }
}

/// Values for every variable of a solved program.
#[derive(Debug, Clone)]
pub struct Solution {
    values: Vec<f64>,
    objective: f64,
}

impl Solution {
    pub fn new(values: Vec<f64>, objective: f64) -> Self {
        Solution { values, objective }
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values[var]
    }

    /// Binary variable read-back with rounding tolerance.
    pub fn is_one(&self, var: VarId) -> bool {
        self.values[var] > 0.5
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }
}

/// Outcome of one solve call.
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    Optimal(Solution),
    Infeasible,
}

/// The opaque MILP oracle.
pub trait MilpBackend {
    /// Solve the program within the time budget. Running out of time
    /// without an incumbent is reported as `Infeasible`.
    fn solve(&self, program: &Program, time_limit: Duration) -> ScheduleResult<SolveOutcome>;
}

/// Shrink an infeasible program to an irreducible inconsistent subsystem by
/// deletion filtering: drop each constraint in turn and keep it only when
/// the rest becomes feasible without it.
///
/// Honors `time_limit` as a wall-clock deadline; on expiry the current
/// (possibly non-minimal) kept set is returned.
pub fn iis<B: MilpBackend>(
    backend: &B,
    program: &Program,
    time_limit: Duration,
) -> ScheduleResult<Vec<String>> {
    let started = Instant::now();
    let mut kept: Vec<usize> = (0..program.num_constraints()).collect();

    let mut cursor = 0;
    while cursor < kept.len() {
        if started.elapsed() > time_limit {
            log::warn!("IIS deletion filter hit the time limit; result may not be minimal");
            break;
        }
        let mut candidate = kept.clone();
        candidate.remove(cursor);
        let reduced = program.with_constraints(&candidate);
        let per_probe = time_limit
            .checked_sub(started.elapsed())
            .unwrap_or(Duration::ZERO);
        match backend.solve(&reduced, per_probe)? {
            SolveOutcome::Infeasible => {
                // Still infeasible without it: the constraint is not part
                // of the irreducible core.
                kept = candidate;
            }
            SolveOutcome::Optimal(_) => {
                cursor += 1;
            }
        }
    }

    Ok(kept
        .into_iter()
        .map(|i| program.constraints()[i].name.clone())
        .collect())
}

/// Sanity check used before handing a program to a backend.
pub fn validate_program(program: &Program) -> ScheduleResult<()> {
    for constraint in program.constraints() {
        for &(var, _) in &constraint.terms {
            if var >= program.num_variables() {
                return Err(ScheduleError::Solver(format!(
                    "constraint '{}' references unknown variable {}",
                    constraint.name, var
                )));
            }
        }
    }
    Ok(())
}
