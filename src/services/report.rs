//! Schedule rendering and per-doctor statistics.
//!
//! Produces the two terminal views of a (solved) schedule: the day-by-day
//! peel table with TURN_ORDER rows plus Charge/Cardiac, and the per-doctor
//! summary with aggregate statistics and the |delta| histogram. Charge- and
//! cardiac-capable doctors are colour coded when colouring is enabled.

use colored::Colorize;

use crate::api::DayKind;
use crate::models::points::{Points, ShiftLabel, ADMIN_POINTS};
use crate::models::schedule::DoctorSchedule;

const NAME_WIDTH: usize = 12;
const CELL_WIDTH: usize = 4;

fn pad_left(text: &str, width: usize) -> String {
    format!("{:>width$}", text, width = width)
}

/// Pad first, colour second, so ANSI escapes never break the alignment.
fn doctor_cell(schedule: &DoctorSchedule, doctor: &str, color: bool) -> String {
    let known = schedule.roster().everyone().iter().any(|d| d == doctor);
    let text = if known { doctor } else { "__" };
    let padded = pad_left(text, CELL_WIDTH);
    if !color || !known {
        return padded;
    }
    let charge = schedule.roster().is_charge(doctor);
    let cardiac = schedule.roster().is_cardiac(doctor);
    match (charge, cardiac) {
        (true, true) => padded.magenta().to_string(),
        (true, false) => padded.blue().to_string(),
        (false, true) => padded.red().to_string(),
        (false, false) => padded,
    }
}

fn row(label: &str, day_cells: &[String], point_cells: Option<&[String]>) -> String {
    let mut line = format!("{:<width$}", label, width = NAME_WIDTH);
    for cell in day_cells {
        line.push_str(cell);
    }
    line.push_str("  | ");
    if let Some(points) = point_cells {
        for cell in points {
            line.push_str(cell);
        }
    }
    line
}

/// Render the day-by-day peel table.
pub fn render_schedule(schedule: &DoctorSchedule, color: bool) -> String {
    let days = schedule.days();
    let day_count = days.len();
    let mut output = Vec::new();

    let header_cells: Vec<String> = days.iter().map(|d| pad_left(d, CELL_WIDTH)).collect();
    let header = row("", &header_cells, Some(&header_cells));
    let separator = "-".repeat(header.len());
    output.push(header);

    let empty = || vec![pad_left("", CELL_WIDTH); day_count];

    // Fixed single-doctor rows in TURN_ORDER.
    for label in ShiftLabel::TURN_ORDER {
        match label {
            ShiftLabel::Unassigned => {
                output.push(separator.clone());
                let solved = schedule.solution().is_some();
                let title = if solved { "Assigned" } else { "Unassigned" };
                let max_rows = (0..day_count)
                    .map(|d| schedule.whine(d).len())
                    .max()
                    .unwrap_or(0);
                if max_rows == 0 {
                    output.push(row(title, &empty(), Some(&empty())));
                }
                for r in 0..max_rows {
                    let mut cells = Vec::new();
                    let mut points = Vec::new();
                    for d in 0..day_count {
                        let entry = if let Some(solution) = schedule.solution() {
                            solution.whine[d].get(r).map(|(doc, p)| (doc.clone(), *p))
                        } else {
                            schedule.whine(d).get(r).map(|doc| {
                                let lo = match schedule.whine_range(d) {
                                    Some(Points::Range { lo, .. }) => lo,
                                    _ => 0,
                                };
                                (doc.clone(), lo + r as u32)
                            })
                        };
                        match entry {
                            Some((doctor, value)) => {
                                cells.push(doctor_cell(schedule, &doctor, color));
                                points.push(pad_left(&value.to_string(), CELL_WIDTH));
                            }
                            None => {
                                cells.push(pad_left("", CELL_WIDTH));
                                points.push(pad_left("", CELL_WIDTH));
                            }
                        }
                    }
                    output.push(row(title, &cells, Some(&points)));
                }
            }
            ShiftLabel::Admin => {
                output.push(separator.clone());
                let admin_lists: Vec<&[String]> =
                    (0..day_count).map(|d| schedule.admin_doctors(d)).collect();
                let max_rows = (0..day_count)
                    .map(|d| schedule.admin_slots(d))
                    .max()
                    .unwrap_or(0);
                if max_rows == 0 {
                    output.push(row("Admin", &empty(), Some(&empty())));
                }
                for r in 0..max_rows {
                    let mut cells = Vec::new();
                    let mut points = Vec::new();
                    for (d, list) in admin_lists.iter().enumerate() {
                        match list.get(r) {
                            Some(doctor) => {
                                cells.push(doctor_cell(schedule, doctor, color));
                                points.push(pad_left(&ADMIN_POINTS.to_string(), CELL_WIDTH));
                            }
                            None if r < schedule.admin_slots(d) => {
                                cells.push(pad_left("AD", CELL_WIDTH));
                                points.push(pad_left(&ADMIN_POINTS.to_string(), CELL_WIDTH));
                            }
                            None => {
                                cells.push(pad_left("", CELL_WIDTH));
                                points.push(pad_left("", CELL_WIDTH));
                            }
                        }
                    }
                    output.push(row("Admin", &cells, Some(&points)));
                }
            }
            ShiftLabel::Assigned => {}
            single => {
                let mut cells = Vec::new();
                let mut points = Vec::new();
                for d in 0..day_count {
                    let holder = schedule
                        .assignments(d)
                        .iter()
                        .find(|a| a.shift == single)
                        .cloned();
                    match holder {
                        Some(assignment) => {
                            cells.push(doctor_cell(schedule, &assignment.doctor, color));
                            points.push(pad_left(&assignment.points.to_string(), CELL_WIDTH));
                        }
                        None => {
                            cells.push(pad_left("", CELL_WIDTH));
                            points.push(pad_left("", CELL_WIDTH));
                        }
                    }
                }
                output.push(row(single.as_str(), &cells, Some(&points)));
            }
        }
    }

    // Charge and cardiac picks.
    output.push(separator.clone());
    for (title, picks) in [
        ("Charge", schedule.solution().map(|s| s.charge.clone())),
        ("Cardiac", schedule.solution().map(|s| s.cardiac.clone())),
    ] {
        let cells: Vec<String> = (0..day_count)
            .map(|d| match picks.as_ref().and_then(|p| p[d].as_ref()) {
                Some(doctor) => doctor_cell(schedule, doctor, color),
                None if schedule.kind(d) == DayKind::Weekday => pad_left("__", CELL_WIDTH),
                None => pad_left("", CELL_WIDTH),
            })
            .collect();
        output.push(row(title, &cells, None));
    }

    // Daily totals.
    output.push(separator);
    let working: Vec<usize> = (0..day_count).map(|d| schedule.working(d).len()).collect();
    let sums: Vec<u32> = (0..day_count)
        .map(|d| {
            schedule
                .assignments(d)
                .iter()
                .filter_map(|a| a.points.fixed())
                .sum()
        })
        .collect();
    output.push(row(
        "Working",
        &working.iter().map(|w| pad_left(&w.to_string(), CELL_WIDTH)).collect::<Vec<_>>(),
        Some(&sums.iter().map(|s| pad_left(&s.to_string(), CELL_WIDTH)).collect::<Vec<_>>()),
    ));
    let offsite: Vec<usize> = (0..day_count).map(|d| schedule.offsite(d).len()).collect();
    output.push(row(
        "Offsite",
        &offsite.iter().map(|o| pad_left(&o.to_string(), CELL_WIDTH)).collect::<Vec<_>>(),
        None,
    ));
    let totals: Vec<String> = working
        .iter()
        .zip(&offsite)
        .map(|(w, o)| pad_left(&(w + o).to_string(), CELL_WIDTH))
        .collect();
    output.push(row("Total", &totals, None));

    output.join("\n")
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn fmt_stat(value: f64) -> String {
    format!("{:.1}", value)
}

/// Render the per-doctor summary table, aggregate statistics, and the
/// |delta| histogram.
pub fn render_doctors(schedule: &DoctorSchedule) -> String {
    let target = schedule.solution().map(|s| s.target);
    let mut output = Vec::new();

    let header = format!(
        "{:>10}{:>6}{:>6}{:>6}{:>7}{:>6}{:>6}",
        "Name", "ID", "Pt0", "Pt", "Delta", "Chg", "Car"
    );
    let separator = "-".repeat(header.len());
    output.push(header);
    output.push(separator.clone());

    let mut pre_points = Vec::new();
    let mut totals = Vec::new();
    let mut charge_counts = Vec::new();
    let mut cardiac_counts = Vec::new();
    let mut deltas = Vec::new();

    for doctor in schedule.roster().everyone() {
        let pre = schedule.preassigned_points(doctor);
        let total = schedule.total_points(doctor);
        let charge = schedule
            .solution()
            .map(|s| s.charge.iter().flatten().filter(|c| *c == doctor).count())
            .unwrap_or(0);
        let cardiac = schedule
            .solution()
            .map(|s| s.cardiac.iter().flatten().filter(|c| *c == doctor).count())
            .unwrap_or(0);
        let worked = schedule.weekdays_worked(doctor);
        let delta = match (target, worked) {
            (Some(mu), worked) if worked > 0 => Some(total as f64 / worked as f64 - mu),
            _ => None,
        };

        let blank_if_zero = |v: usize| if v > 0 { v.to_string() } else { String::new() };
        output.push(format!(
            "{:>10}{:>6}{:>6}{:>6}{:>7}{:>6}{:>6}",
            schedule.roster().name_of(doctor).unwrap_or(doctor),
            doctor,
            if pre > 0 { pre.to_string() } else { String::new() },
            if total > 0 { total.to_string() } else { String::new() },
            delta.map(|d| format!("{:+.1}", d)).unwrap_or_default(),
            blank_if_zero(charge),
            blank_if_zero(cardiac),
        ));

        if pre > 0 {
            pre_points.push(pre as f64);
        }
        if total > 0 {
            totals.push(total as f64);
        }
        if charge > 0 {
            charge_counts.push(charge as f64);
        }
        if cardiac > 0 {
            cardiac_counts.push(cardiac as f64);
        }
        if let Some(delta) = delta {
            deltas.push(delta);
        }
    }

    output.push(separator.clone());
    for (label, pick) in [
        ("Average", mean as fn(&[f64]) -> f64),
        ("Median", median as fn(&[f64]) -> f64),
        ("Min", |v: &[f64]| v.iter().cloned().fold(f64::INFINITY, f64::min)),
        ("Max", |v: &[f64]| v.iter().cloned().fold(f64::NEG_INFINITY, f64::max)),
    ] {
        let stat = |values: &[f64]| {
            if values.is_empty() {
                String::new()
            } else {
                fmt_stat(pick(values))
            }
        };
        output.push(format!(
            "{:>10}{:>6}{:>6}{:>6}{:>7}{:>6}{:>6}",
            label,
            "",
            stat(&pre_points),
            stat(&totals),
            "",
            stat(&charge_counts),
            stat(&cardiac_counts),
        ));
    }

    if !deltas.is_empty() {
        output.push(separator);
        output.push("|delta| histogram".to_string());
        let mut bands = [0usize; 4];
        for delta in &deltas {
            let band = delta.abs().round() as usize;
            bands[band.min(3)] += 1;
        }
        for (i, count) in bands.iter().enumerate() {
            let label = if i < 3 { format!("{}", i) } else { ">=3".to_string() };
            output.push(format!("{:>5}: {:<20} {}", label, "#".repeat(*count), count));
        }
    }

    output.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        DayKind, DerivedWeekJson, ObjectiveBreakdown, Period, SolverTelemetry,
    };
    use crate::models::schedule::ScheduleSolution;
    use crate::staff::{Doctor, Roster};
    use chrono::NaiveDate;

    fn doctor(id: &str, cardiac: bool, charge: bool) -> Doctor {
        Doctor {
            id: id.to_string(),
            name: format!("Dr {}", id),
            can_be_cardiac: cardiac,
            can_be_charge: charge,
            aliases: vec![],
            start: None,
            end: None,
        }
    }

    fn roster() -> Roster {
        Roster::from_doctors(vec![
            doctor("AA", true, true),
            doctor("BB", false, true),
            doctor("CC", true, false),
            doctor("DD", false, false),
            doctor("EE", false, false),
            doctor("FF", false, false),
            doctor("GG", false, false),
            doctor("HH", false, false),
        ])
        .unwrap()
    }

    fn plain_week() -> DerivedWeekJson {
        let some = |s: &str| Some(s.to_string());
        DerivedWeekJson {
            day: vec![
                DayKind::Weekday,
                DayKind::Weekday,
                DayKind::Weekday,
                DayKind::Weekday,
                DayKind::Weekday,
                DayKind::Weekend,
                DayKind::Weekend,
            ],
            on_call: vec![
                some("AA"), some("DD"), some("AA"), some("DD"), some("AA"),
                some("BB"), some("CC"),
            ],
            on_late: vec![
                some("CC"), some("CC"), some("CC"), some("CC"), some("CC"),
                some("DD"), some("EE"),
            ],
            post_call: vec![some("EE"), some("AA"), some("DD"), some("AA"), some("DD"), None, None],
            post_holiday: vec![None; 7],
            post_late: vec![some("FF"), None, None, None, None, None, None],
            pre_call: vec![some("DD"), None, None, None, some("GG"), None, None],
            pre_holiday: vec![None; 7],
            unassigned: vec![
                vec!["BB".into(), "GG".into(), "HH".into()],
                vec!["BB".into(), "EE".into(), "FF".into(), "GG".into(), "HH".into()],
                vec!["BB".into(), "EE".into(), "FF".into(), "GG".into(), "HH".into()],
                vec!["BB".into(), "EE".into(), "FF".into(), "GG".into(), "HH".into()],
                vec!["BB".into(), "EE".into(), "FF".into(), "HH".into()],
                vec![],
                vec![],
            ],
            admin: vec![None; 7],
            offsite: vec![vec![]; 7],
            order: ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            doctors: ["AA", "BB", "CC", "DD", "EE", "FF", "GG", "HH"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            period: Period {
                start: NaiveDate::from_ymd_opt(2019, 3, 11).unwrap(),
                end: NaiveDate::from_ymd_opt(2019, 3, 17).unwrap(),
            },
            solution: None,
        }
    }

    fn schedule() -> DoctorSchedule {
        DoctorSchedule::new(plain_week(), roster()).unwrap()
    }

    #[test]
    fn test_unsolved_table_shows_unassigned_rows() {
        let rendered = render_schedule(&schedule(), false);
        assert!(rendered.contains("Post-Call"));
        assert!(rendered.contains("Unassigned"));
        assert!(rendered.contains("Mon"));
        // Pre-solve charge picks are placeholders on workdays.
        assert!(rendered.contains("__"));
        assert!(rendered.contains("Working"));
    }

    #[test]
    fn test_solved_table_shows_assigned_rows() {
        let mut schedule = schedule();
        let day_count = schedule.days().len();
        let mut whine = vec![Vec::new(); day_count];
        whine[0] = vec![
            ("BB".to_string(), 4),
            ("GG".to_string(), 5),
            ("HH".to_string(), 6),
        ];
        let mut charge = vec![None; day_count];
        charge[0] = Some("BB".to_string());
        let mut cardiac = vec![None; day_count];
        cardiac[0] = Some("CC".to_string());
        schedule.merge_solution(ScheduleSolution {
            whine,
            charge,
            cardiac,
            target: 9.0,
            objective: ObjectiveBreakdown {
                total: 8.0,
                equity: 8.0,
                role_concentration: 2.0,
                charge_preference: 1.0,
            },
            telemetry: SolverTelemetry {
                constraints: 10,
                variables: 20,
                status: "Optimal".to_string(),
            },
        });
        let rendered = render_schedule(&schedule, false);
        assert!(rendered.contains("Assigned"));
        assert!(!rendered.contains("Unassigned"));
        assert!(rendered.contains("Charge"));
        assert!(rendered.contains("Cardiac"));
    }

    #[test]
    fn test_color_does_not_change_alignment() {
        colored::control::set_override(true);
        let plain = render_schedule(&schedule(), false);
        let colored_output = render_schedule(&schedule(), true);
        colored::control::unset_override();
        // Stripping ANSI escapes recovers the plain rendering.
        let stripped: String = {
            let mut out = String::new();
            let mut chars = colored_output.chars().peekable();
            while let Some(c) = chars.next() {
                if c == '\u{1b}' {
                    for d in chars.by_ref() {
                        if d == 'm' {
                            break;
                        }
                    }
                } else {
                    out.push(c);
                }
            }
            out
        };
        assert_eq!(plain, stripped);
    }

    #[test]
    fn test_doctor_summary_contains_stats() {
        let rendered = render_doctors(&schedule());
        assert!(rendered.contains("Name"));
        assert!(rendered.contains("Dr AA"));
        assert!(rendered.contains("Average"));
        assert!(rendered.contains("Median"));
    }

    #[test]
    fn test_doctor_summary_histogram_with_solution() {
        let mut schedule = schedule();
        let day_count = schedule.days().len();
        schedule.merge_solution(ScheduleSolution {
            whine: vec![Vec::new(); day_count],
            charge: vec![None; day_count],
            cardiac: vec![None; day_count],
            target: 7.0,
            objective: ObjectiveBreakdown {
                total: 0.0,
                equity: 0.0,
                role_concentration: 0.0,
                charge_preference: 0.0,
            },
            telemetry: SolverTelemetry {
                constraints: 0,
                variables: 0,
                status: "Optimal".to_string(),
            },
        });
        let rendered = render_doctors(&schedule);
        assert!(rendered.contains("|delta| histogram"));
        assert!(rendered.contains(">=3"));
    }

    #[test]
    fn test_mean_and_median() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(mean(&[]), 0.0);
    }
}
