//! Pure-Rust MILP backend built on `microlp`.
//!
//! Translates a [`Program`](super::Program) into a `microlp::Problem`,
//! runs its branch-and-bound, and maps the result back. All `microlp`
//! types stay confined to this file so another engine can be swapped in
//! behind [`MilpBackend`](super::MilpBackend).

use std::time::Duration;

use microlp::{ComparisonOp, OptimizationDirection, Problem};

use crate::error::{ScheduleError, ScheduleResult};
use crate::solver::{Cmp, MilpBackend, Program, Solution, SolveOutcome, VarKind};

/// Default backend.
///
/// `microlp` exposes no native time limit; the budget passed to
/// [`MilpBackend::solve`] bounds the surrounding IIS loop and is otherwise
/// best-effort here.
#[derive(Debug, Clone, Default)]
pub struct MicrolpBackend;

impl MilpBackend for MicrolpBackend {
    fn solve(&self, program: &Program, _time_limit: Duration) -> ScheduleResult<SolveOutcome> {
        super::validate_program(program)?;

        let mut problem = Problem::new(OptimizationDirection::Maximize);
        let vars: Vec<microlp::Variable> = program
            .variables()
            .iter()
            .map(|variable| match variable.kind {
                VarKind::Binary => {
                    let (lo, hi) = match variable.fixed {
                        Some(value) => {
                            let v = value.round() as i32;
                            (v, v)
                        }
                        None => (0, 1),
                    };
                    problem.add_integer_var(variable.objective, (lo, hi))
                }
                VarKind::Continuous { lo, hi } => {
                    let (lo, hi) = match variable.fixed {
                        Some(value) => (value, value),
                        None => (lo, hi),
                    };
                    problem.add_var(variable.objective, (lo, hi))
                }
            })
            .collect();

        for constraint in program.constraints() {
            let terms: Vec<(microlp::Variable, f64)> = constraint
                .terms
                .iter()
                .map(|&(var, coef)| (vars[var], coef))
                .collect();
            let op = match constraint.cmp {
                Cmp::Le => ComparisonOp::Le,
                Cmp::Ge => ComparisonOp::Ge,
                Cmp::Eq => ComparisonOp::Eq,
            };
            problem.add_constraint(&terms[..], op, constraint.rhs);
        }

        match problem.solve() {
            Ok(solution) => {
                let objective = solution.objective();
                let values = vars.iter().map(|v| solution[*v]).collect();
                Ok(SolveOutcome::Optimal(Solution::new(values, objective)))
            }
            Err(microlp::Error::Infeasible) => Ok(SolveOutcome::Infeasible),
            Err(other) => Err(ScheduleError::Solver(other.to_string())),
        }
    }
}
