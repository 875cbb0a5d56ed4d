//! Requirements overlay.
//!
//! Applies user-supplied per-day inputs to a constructed schedule before
//! optimization: explicit admin rosters (replacing the sentinel slots) and
//! pinned peel positions inside the Unassigned pool.

use crate::api::{RequestsJson, ADMIN_ALIASES, ADMIN_ID};
use crate::error::{ScheduleError, ScheduleResult};
use crate::models::schedule::DoctorSchedule;

/// Apply the overlay. Admin lists are applied first (they reshape the
/// whine ranges), peel pinnings second.
pub fn apply_requirements(
    schedule: &mut DoctorSchedule,
    requests: &RequestsJson,
) -> ScheduleResult<()> {
    let day_count = schedule.days().len();
    if requests.admin.len() > day_count || requests.whine.len() > day_count {
        return Err(ScheduleError::malformed(format!(
            "requests overlay has more than {} days",
            day_count
        )));
    }

    for (day, entry) in requests.admin.iter().enumerate() {
        let Some(names) = entry else { continue };
        let mut resolved = Vec::new();
        for name in names {
            if ADMIN_ALIASES.contains(&name.as_str()) {
                resolved.push(ADMIN_ID.to_string());
                continue;
            }
            match schedule.roster().resolve(name) {
                Ok(id) => resolved.push(id.to_string()),
                Err(_) => {
                    log::warn!(
                        "unknown doctor '{}' in the admin overlay for {}; entry skipped",
                        name,
                        schedule.days()[day]
                    );
                }
            }
        }
        log::info!(
            "admin overlay for {}: {:?}",
            schedule.days()[day],
            resolved
        );
        schedule.set_admin(day, resolved);
    }

    for (day, entry) in requests.whine.iter().enumerate() {
        let Some(pins) = entry else { continue };
        for (name, position) in pins {
            // An unresolvable name is a warning, not a failure; the pin is
            // left unapplied. Collisions and non-working doctors are still
            // fatal inside pin_whine.
            let id = match schedule.roster().resolve(name) {
                Ok(id) => id.to_string(),
                Err(_) => {
                    log::warn!(
                        "unknown doctor '{}' in the whine overlay for {}; pin left unapplied",
                        name,
                        schedule.days()[day]
                    );
                    continue;
                }
            };
            schedule.pin_whine(day, id, *position)?;
        }
    }

    Ok(())
}
