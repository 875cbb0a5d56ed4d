//! Service layer: derivation, overlays, and reporting.
//!
//! These modules orchestrate the data model: `derive` turns three adjacent
//! raw week snapshots into a derived schedule, `requirements` applies the
//! user overlay, and `report` renders and persists solved schedules.

pub mod derive;
pub mod report;
pub mod requirements;

pub use derive::derive_week;
pub use report::{render_doctors, render_schedule};
pub use requirements::apply_requirements;
