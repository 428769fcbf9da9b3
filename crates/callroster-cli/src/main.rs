use anyhow::{Context, Result};
use callroster_core::config::{Settings, DEFAULT_SETTINGS_FILE};
use callroster_core::{date_key, parse_date_key, RunReport};
use callroster_engine::{distribute_and_report, ReportWrite, RunOutcome};
use callroster_notify::{ChannelId, Notifier, WahaConfig, WahaSink};
use callroster_storage::SqliteTableStore;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

mod logging;

use logging::{init_logging, LogOptions};

#[derive(Parser)]
#[command(name = "callroster")]
#[command(about = "Round-robin call assignment and daily stakeholder report", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign eligible orders, write the dated report section and notify the channel
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    #[arg(long, env = "CALLROSTER_SETTINGS", default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,
    /// Report date as DD-Mon-YYYY; defaults to today
    #[arg(long, value_parser = parse_report_date)]
    date: Option<NaiveDate>,
    #[arg(long)]
    debug: bool,
    /// Skip the notification phase
    #[arg(long)]
    no_notify: bool,
}

fn parse_report_date(value: &str) -> Result<NaiveDate, String> {
    parse_date_key(value.trim()).map_err(|err| format!("expected a date like 01-May-2025: {err}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let settings = load_settings(&args.settings);
    let log_options = match &settings {
        Ok(settings) => LogOptions {
            debug: args.debug,
            dir: Some(settings.logging.dir.clone().unwrap_or_else(|| PathBuf::from("."))),
            level: settings.logging.level.clone(),
        },
        Err(_) => LogOptions {
            debug: args.debug,
            dir: Some(PathBuf::from(".")),
            level: None,
        },
    };
    let _log_guard = init_logging(&log_options);

    let today = args.date.unwrap_or_else(|| Local::now().date_naive());
    let settings = match settings {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %format!("{err:#}"), "cannot load settings; nothing to do");
            return Ok(());
        }
    };

    let outcome = match open_store(&settings.store.path) {
        Ok(mut store) => distribute_and_report(&settings, &mut store, today),
        Err(err) => {
            error!(error = %format!("{err:#}"), "cannot open table store");
            None
        }
    };
    match &outcome {
        Some(outcome) => print_summary(outcome),
        None => println!("Run produced no result for {}", date_key(today)),
    }

    if args.no_notify {
        info!("notification disabled by flag");
        return Ok(());
    }
    notify(&settings, outcome.map(|outcome| outcome.report), today);
    Ok(())
}

fn load_settings(path: &Path) -> Result<Settings> {
    Settings::load(path).with_context(|| format!("failed to load settings from {}", path.display()))
}

fn open_store(path: &Path) -> Result<SqliteTableStore> {
    SqliteTableStore::open(path).with_context(|| format!("failed to open table store {}", path.display()))
}

/// Report to announce: the run's own, or an all-zero one over the roster.
fn report_to_send(settings: &Settings, report: Option<RunReport>, today: NaiveDate) -> Option<RunReport> {
    if let Some(report) = report {
        return Some(report);
    }
    match settings.roster() {
        Ok(roster) => {
            warn!("run produced no report; sending placeholder counts");
            Some(RunReport::zeroed(&roster, date_key(today)))
        }
        Err(err) => {
            warn!(error = %err, "no roster for placeholder report; skipping notification");
            None
        }
    }
}

fn notify(settings: &Settings, report: Option<RunReport>, today: NaiveDate) {
    let Some(notify) = settings.notify.as_ref() else {
        info!("no notify settings; skipping notification");
        return;
    };
    let Some(report) = report_to_send(settings, report, today) else {
        return;
    };
    let channel = match ChannelId::parse(&notify.channel) {
        Ok(channel) => channel,
        Err(err) => {
            error!(error = %err, "cannot notify");
            return;
        }
    };

    let notifier = Notifier::new(WahaSink::new(WahaConfig::from_settings(notify)), channel);
    if notifier.notify_report(&report).is_ok() {
        println!("Report sent to {}", notifier.channel());
    }
}

fn print_summary(outcome: &RunOutcome) {
    println!(
        "Assigned {} calls for {} across {} stakeholders",
        outcome.assigned(),
        outcome.date_key,
        outcome.report.stakeholders.len()
    );
    for entry in &outcome.report.stakeholders {
        println!("- {}: {}", entry.name, entry.total());
    }
    match &outcome.section {
        ReportWrite::Written(section) => println!("Report section: {section:?}"),
        ReportWrite::Skipped => println!("Report section: skipped (no eligible rows)"),
        ReportWrite::Failed(reason) => println!("Report section failed: {reason}"),
    }
    if !outcome.warnings.is_empty() {
        println!("{} schema warnings (see log)", outcome.warnings.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(yaml: &str) -> Settings {
        Settings::from_yaml_str(yaml).expect("settings")
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "callroster",
            "run",
            "--settings",
            "conf/settings.yaml",
            "--date",
            "01-May-2025",
            "--debug",
            "--no-notify",
        ])
        .expect("parse");
        let Commands::Run(args) = cli.command;
        assert_eq!(args.settings, PathBuf::from("conf/settings.yaml"));
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2025, 5, 1));
        assert!(args.debug);
        assert!(args.no_notify);
    }

    #[test]
    fn bad_date_is_rejected() {
        assert!(Cli::try_parse_from(["callroster", "run", "--date", "2025-05-01"]).is_err());
    }

    #[test]
    fn placeholder_report_covers_roster_with_zero_counts() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 1).expect("date");
        let report = report_to_send(&settings("stakeholders: [A, B]\n"), None, today).expect("placeholder");
        assert_eq!(report.date_key, "01-May-2025");
        assert_eq!(report.stakeholders.len(), 2);
        assert_eq!(report.grand_total(), 0);

        assert!(report_to_send(&settings("read_range: A:BD\n"), None, today).is_none());
    }

    #[test]
    fn run_report_is_preferred_over_placeholder() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 1).expect("date");
        let base = settings("stakeholders: [A]\n");
        let roster = base.roster().expect("roster");
        let mut report = RunReport::zeroed(&roster, "30-Apr-2025");
        report.stakeholders[0].fresh = 4;
        let chosen = report_to_send(&base, Some(report.clone()), today).expect("report");
        assert_eq!(chosen, report);
    }
}
