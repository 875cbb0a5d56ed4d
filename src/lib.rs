//! # APAP - Anesthesiologist Peel Assignment Planner
//!
//! Produces weekly shift schedules for a pool of anesthesiologists: each
//! working doctor is "peeled" into a strict departure order, a daily charge
//! and a daily cardiac doctor are elected from the eligible subsets, and
//! total points are balanced across the pool over the week.
//!
//! ## Pipeline
//!
//! 1. **Derive** ([`services::derive`]): three adjacent raw week snapshots
//!    (previous / current / next) become the derived weekly schedule with
//!    per-day transition roles and the Unassigned pool.
//! 2. **Model** ([`models::schedule`]): the derived week plus the staff
//!    registry materialize the per-day sets and run the invariant
//!    validator.
//! 3. **Overlay** ([`services::requirements`]): user-supplied admin
//!    rosters and pinned peel positions are applied.
//! 4. **Optimize** ([`models::allocation`]): a mixed-integer linear
//!    program assigns peel positions and elects charge/cardiac, balancing
//!    points through equity bands around a central value.
//! 5. **Report** ([`services::report`]): terminal tables and the solved
//!    JSON document.
//!
//! ## Architecture
//!
//! - [`api`]: JSON document types exchanged with the outside world
//! - [`staff`]: roster loading, capabilities, alias resolution
//! - [`calendar`]: workday/holiday classification
//! - [`splitter`]: quarterly input -> ISO week files, with round-trip
//!   verification
//! - [`models`]: schedule model, peel points, MILP formulation
//! - [`solver`]: abstract MILP oracle and the bundled backend
//! - [`services`]: derivation, overlays, reporting
//!
//! The scheduler is single-threaded and synchronous end to end; the only
//! blocking call is the solver invocation.

pub mod api;
pub mod calendar;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod solver;
pub mod splitter;
pub mod staff;
