//! Error types for the scheduling pipeline.
//!
//! Every fatal condition from the derivation, validation, overlay and
//! optimization stages maps onto one variant here so that callers (and the
//! CLI) can branch on the failure class. Messages carry the weekday and the
//! component that raised them.

/// Result type for scheduling operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Error taxonomy for the scheduling core.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// JSON parse failure, bad filename pattern, or a missing required field.
    #[error("malformed input: {0}")]
    InputMalformed(String),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying IO failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parse failure (staff or holiday tables).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Two staff rows share the same identifier.
    #[error("duplicate doctor identifier '{0}' in staff table")]
    DuplicateDoctor(String),

    /// A name, identifier, or alias did not resolve against the registry.
    #[error("could not find doctor with name or ID '{0}'")]
    DoctorNotFound(String),

    /// One or more schedule invariants were violated. Each entry names the
    /// day and the invariant.
    #[error("schedule validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    /// A requirements overlay entry collides with the schedule.
    #[error("requirements conflict: {0}")]
    RequirementsConflict(String),

    /// A doctor was on late-call one workday and on call the next. The
    /// source data tolerates this silently; we refuse it.
    #[error("doctor {doctor} was on late call the workday before {day} and is on call on {day}")]
    LateThenCall { doctor: String, day: String },

    /// The MILP has no solution within the time limit.
    #[error("no feasible assignment found: {0}")]
    Infeasible(String),

    /// The solver backend failed for a reason other than infeasibility.
    #[error("solver error: {0}")]
    Solver(String),

    /// Configuration file problems.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ScheduleError {
    /// Shorthand for a malformed-input error with a formatted message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        ScheduleError::InputMalformed(msg.into())
    }
}
