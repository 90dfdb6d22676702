use crate::infra::load_snapshot;
use chrono::{Local, NaiveDate};
use clap::Args;
use cmmc_tracker::assessment::{
    AssessmentService, DashboardSummary, InMemoryAssessmentStore, ScoreBreakdown,
};
use cmmc_tracker::config::AssessmentConfig;
use cmmc_tracker::error::AppError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreReportArgs {
    /// Assessment snapshot exported as JSON
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Assessment session to score (defaults to APP_DEFAULT_SESSION)
    #[arg(long)]
    pub(crate) session: Option<String>,
    /// Emit JSON instead of a text table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DashboardReportArgs {
    /// Assessment snapshot exported as JSON
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Assessment session to summarize (defaults to APP_DEFAULT_SESSION)
    #[arg(long)]
    pub(crate) session: Option<String>,
    /// Cutoff date for overdue POA&M items (defaults to APP_REFERENCE_DATE, then today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Emit JSON instead of a text summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_score_report(args: ScoreReportArgs) -> Result<(), AppError> {
    let settings = AssessmentConfig::from_env()?;
    let service = snapshot_service(&args.snapshot)?;
    let session = report_session(args.session, &settings);
    let breakdown = service.score_breakdown(&session)?;

    if args.json {
        print_json(&breakdown)
    } else {
        render_score_report(&session, &breakdown);
        Ok(())
    }
}

pub(crate) fn run_dashboard_report(args: DashboardReportArgs) -> Result<(), AppError> {
    let settings = AssessmentConfig::from_env()?;
    let service = snapshot_service(&args.snapshot)?;
    let session = report_session(args.session, &settings);
    let as_of = report_date(args.as_of, &settings, Local::now().date_naive());
    let summary = service.dashboard(&session, as_of)?;

    if args.json {
        print_json(&summary)
    } else {
        render_dashboard_report(&session, as_of, &summary);
        Ok(())
    }
}

/// `--session`, then `APP_DEFAULT_SESSION`.
fn report_session(flag: Option<String>, settings: &AssessmentConfig) -> String {
    flag.filter(|session| !session.is_empty())
        .unwrap_or_else(|| settings.default_session.clone())
}

/// `--as-of`, then `APP_REFERENCE_DATE`, then `today`.
fn report_date(
    flag: Option<NaiveDate>,
    settings: &AssessmentConfig,
    today: NaiveDate,
) -> NaiveDate {
    flag.or(settings.reference_date).unwrap_or(today)
}

fn snapshot_service(path: &Path) -> Result<AssessmentService<InMemoryAssessmentStore>, AppError> {
    let snapshot = load_snapshot(path)?;
    let store = InMemoryAssessmentStore::from_snapshot(snapshot);
    Ok(AssessmentService::new(Arc::new(store)))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_score_report(session: &str, breakdown: &ScoreBreakdown) {
    println!("SPRS score for session '{session}'");
    println!(
        "Base {} - deductions {} = {}",
        breakdown.base_score, breakdown.total_deduction, breakdown.sprs_score
    );

    let unmet: Vec<_> = breakdown
        .controls
        .iter()
        .filter(|control| control.deduction > 0)
        .collect();

    if unmet.is_empty() {
        println!("\nNo deductions: every control is met or not yet assessed.");
        return;
    }

    println!("\nDeductions");
    for control in unmet {
        println!(
            "- {} {} [{}] weight {} -> -{}",
            control.control_number, control.title, control.status, control.weight, control.deduction
        );
    }
}

fn render_dashboard_report(session: &str, as_of: NaiveDate, summary: &DashboardSummary) {
    println!("Assessment dashboard for session '{session}' (as of {as_of})");
    println!("SPRS score: {}", summary.sprs_score);
    println!(
        "Controls assessed: {}/{}",
        summary.assessed_controls, summary.total_controls
    );
    println!("In-scope boundary assets: {}", summary.boundary_count);

    println!("\nImplementation status");
    for entry in &summary.implementation_breakdown {
        println!("- {}: {}", entry.label, entry.value);
    }

    println!("\nFamily coverage");
    for family in &summary.family_heatmap {
        println!(
            "- {} {}: {}/{} implemented ({}%)",
            family.code, family.name, family.implemented, family.total, family.percentage
        );
    }

    let poam = &summary.poam_summary;
    println!(
        "\nPOA&M: {} total, {} open, {} in progress, {} overdue",
        poam.total, poam.open, poam.in_progress, poam.overdue
    );
    for entry in &poam.by_risk {
        println!("- {} risk: {}", entry.label, entry.value);
    }
}
