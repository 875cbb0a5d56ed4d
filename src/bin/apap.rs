//! Command-line entry point for the peel assignment planner.
//!
//! Three subcommands cover the pipeline: `split-quarter` cuts a quarterly
//! document into ISO-week files, `derive` turns one week (plus its
//! neighbours) into a derived schedule, and `optimize` solves the peel
//! assignment for a derived week.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config as LogConfig, TermLogger, TerminalMode, WriteLogger,
};

use apap::api;
use apap::calendar::HolidayCalendar;
use apap::config::AppConfig;
use apap::error::ScheduleError;
use apap::models::allocation::optimize_schedule;
use apap::models::schedule::DoctorSchedule;
use apap::services::derive::{derive_week, extract_year_and_week, find_neighbor_weeks, week_period};
use apap::services::{apply_requirements, render_doctors, render_schedule};
use apap::splitter;
use apap::staff::Roster;

#[derive(Parser)]
#[command(
    name = "apap",
    version,
    about = "Weekly anesthesiologist peel-assignment planner"
)]
struct Cli {
    /// Optional TOML configuration file (staff paths, objective weights).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output as well.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Derive a weekly schedule from a raw week and its neighbours.
    Derive {
        /// Input week, named YYYY-weekNN.json; the adjacent week files are
        /// looked up next to it.
        #[arg(short, long)]
        input: PathBuf,
        /// Output path for the derived schedule.
        #[arg(short, long)]
        output: PathBuf,
        /// Optional requirements overlay (admin lists, pinned positions).
        #[arg(short, long)]
        requests: Option<PathBuf>,
    },
    /// Split a quarterly JSON document into per-ISO-week files.
    SplitQuarter {
        /// Quarterly input document.
        infile: PathBuf,
        /// Directory receiving the weekly files.
        #[arg(long)]
        outdir: PathBuf,
    },
    /// Solve the peel assignment for a derived week.
    Optimize {
        /// Derived schedule (output of `derive`).
        input: PathBuf,
        /// Output path for the solved schedule.
        output: PathBuf,
        /// Optional requirements overlay (admin lists, pinned positions).
        #[arg(short, long)]
        requests: Option<PathBuf>,
        /// Solver time limit in seconds.
        #[arg(long = "time-limit", alias = "time_limit")]
        time_limit: Option<u64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{:#}", error);
            eprintln!("error: {:#}", error);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr and, when a path is given, to a per-run file. The file is
/// removed again by [`clean_exit`] on success.
fn init_logging(verbose: bool, logfile: Option<&Path>) -> Result<()> {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let mut loggers: Vec<Box<dyn simplelog::SharedLogger>> = vec![TermLogger::new(
        level,
        LogConfig::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let Some(path) = logfile {
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("removing stale log file {}", path.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("creating log file {}", path.display()))?;
        loggers.push(WriteLogger::new(LevelFilter::Info, LogConfig::default(), file));
    }
    CombinedLogger::init(loggers).context("initializing logging")?;
    Ok(())
}

fn clean_exit(logfile: &Path) {
    if logfile.exists() {
        let _ = std::fs::remove_file(logfile);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Derive { input, output, requests } => {
            let logfile = output.with_extension("log");
            init_logging(cli.verbose, Some(&logfile))?;
            derive_command(&config, &input, &output, requests.as_deref())?;
            clean_exit(&logfile);
            Ok(())
        }
        Command::SplitQuarter { infile, outdir } => {
            init_logging(cli.verbose, None)?;
            let written = splitter::split_quarter(&infile, &outdir)?;
            println!("wrote {} weekly files to {}", written.len(), outdir.display());
            Ok(())
        }
        Command::Optimize { input, output, requests, time_limit } => {
            let logfile = output.with_extension("log");
            init_logging(cli.verbose, Some(&logfile))?;
            let limit = Duration::from_secs(time_limit.unwrap_or(config.time_limit_secs));
            optimize_command(&config, &input, &output, requests.as_deref(), limit)?;
            clean_exit(&logfile);
            Ok(())
        }
    }
}

fn load_roster(config: &AppConfig, period: apap::api::Period) -> Result<Roster> {
    Roster::load(&config.staff_file, period.start, period.end).with_context(|| {
        format!("loading staff table {}", config.staff_file.display())
    })
}

fn load_calendar(config: &AppConfig, period: apap::api::Period) -> Result<HolidayCalendar> {
    let mut calendar = HolidayCalendar::covering(
        period.start - chrono::Duration::days(7),
        period.end + chrono::Duration::days(7),
    );
    if let Some(path) = &config.holidays_file {
        calendar
            .load_custom(path)
            .with_context(|| format!("loading holiday table {}", path.display()))?;
    }
    Ok(calendar)
}

fn derive_command(
    config: &AppConfig,
    input: &Path,
    output: &Path,
    requests: Option<&Path>,
) -> Result<()> {
    if extract_year_and_week(input).is_none() {
        bail!(
            "file name does not match the expected format (YYYY-weekNN.json): {}",
            input.display()
        );
    }

    let current = api::read_raw_week(input)?;
    let period = week_period(&current)?;
    let (before_path, after_path) = find_neighbor_weeks(input, period)?;
    log::info!(
        "deriving {} using {} and {}",
        input.display(),
        before_path.display(),
        after_path.display()
    );
    let before = api::read_raw_week(&before_path)?;
    let after = api::read_raw_week(&after_path)?;

    let roster = load_roster(config, period)?;
    let calendar = load_calendar(config, period)?;
    let derived = derive_week(&before, &current, &after, &roster, &calendar)?;

    let mut schedule = DoctorSchedule::new(derived, roster)?;
    if let Some(path) = requests {
        let overlay = api::read_requests(path)?;
        apply_requirements(&mut schedule, &overlay)?;
    }

    println!("{}", render_schedule(&schedule, true));

    // Remove companions from an earlier failed run.
    let illegal = illegal_path(output);
    let err_file = output.with_extension("err");
    for stale in [&illegal, &err_file] {
        if stale.exists() {
            std::fs::remove_file(stale)
                .with_context(|| format!("removing stale {}", stale.display()))?;
        }
    }

    let violations = schedule.validate();
    if violations.is_empty() {
        api::write_derived_week(output, schedule.to_json())?;
        log::info!("derived schedule written to {}", output.display());
        Ok(())
    } else {
        std::fs::write(&err_file, violations.join("\n") + "\n")?;
        api::write_derived_week(&illegal, schedule.to_json())?;
        for violation in &violations {
            log::error!("{}", violation);
        }
        Err(ScheduleError::ValidationFailed(violations).into())
    }
}

/// `foo.json` -> `foo_ILLEGAL.json`.
fn illegal_path(output: &Path) -> PathBuf {
    let stem = output.file_stem().and_then(|s| s.to_str()).unwrap_or("schedule");
    output.with_file_name(format!("{}_ILLEGAL.json", stem))
}

fn optimize_command(
    config: &AppConfig,
    input: &Path,
    output: &Path,
    requests: Option<&Path>,
    time_limit: Duration,
) -> Result<()> {
    let derived = api::read_derived_week(input)?;
    let period = derived.period;
    let roster = load_roster(config, period)?;

    let mut schedule = DoctorSchedule::new(derived, roster)?;
    schedule.ensure_valid().context("schedule failed validation")?;

    if let Some(path) = requests {
        let overlay = api::read_requests(path)?;
        apply_requirements(&mut schedule, &overlay)?;
        schedule
            .ensure_valid()
            .context("schedule failed validation after applying the requirements overlay")?;
    }

    let solution = optimize_schedule(&schedule, config.weights(), time_limit)?;
    schedule.merge_solution(solution);

    println!("{}", render_schedule(&schedule, true));
    println!();
    println!("{}", render_doctors(&schedule));

    api::write_derived_week(output, schedule.to_json())?;
    log::info!("solved schedule written to {}", output.display());
    Ok(())
}
