//! Text rendering of journey lists and reports

use console::style;
use portal_probe::{Journey, JourneyReport, StepOutcome, StepRecord};
use std::fmt::Write;

/// Aligned list of every journey with its summary
#[must_use]
pub fn render_journeys() -> String {
    let width = Journey::all()
        .iter()
        .map(|j| j.name().len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for journey in Journey::all() {
        let _ = writeln!(
            out,
            "  {}  {}",
            style(format!("{:<width$}", journey.name())).bold(),
            journey.description()
        );
    }
    out
}

fn render_step(out: &mut String, step: &StepRecord) {
    match &step.outcome {
        StepOutcome::Passed => {
            let _ = writeln!(
                out,
                "  {} {} {}",
                style("✓").green(),
                step.name,
                style(format!("({}ms)", step.elapsed_ms)).dim()
            );
        }
        StepOutcome::Skipped { reason } => {
            let _ = writeln!(
                out,
                "  {} {} {}",
                style("-").yellow(),
                step.name,
                style(format!("skipped: {reason}")).dim()
            );
        }
        StepOutcome::Failed { error } => {
            let _ = writeln!(out, "  {} {}", style("✗").red(), style(&step.name).red());
            for line in error.lines() {
                let _ = writeln!(out, "      {line}");
            }
            if let Some(ref shot) = step.screenshot {
                let _ = writeln!(out, "      screenshot: {}", shot.display());
            }
        }
    }
}

/// Per-step report for one journey
#[must_use]
pub fn render_report(report: &JourneyReport) -> String {
    let verdict = if report.passed {
        style("PASS").green().bold()
    } else {
        style("FAIL").red().bold()
    };
    let mut out = format!(
        "{verdict} {} {}\n",
        style(&report.journey).bold(),
        style(format!("({}ms, run {})", report.elapsed_ms, report.run_id)).dim()
    );
    for step in &report.steps {
        render_step(&mut out, step);
    }
    out
}

/// One-line totals
#[must_use]
pub fn render_summary(reports: &[JourneyReport]) -> String {
    let passed = reports.iter().filter(|r| r.passed).count();
    let failed = reports.len() - passed;
    let skipped: usize = reports
        .iter()
        .flat_map(|r| &r.steps)
        .filter(|s| matches!(s.outcome, StepOutcome::Skipped { .. }))
        .count();
    format!(
        "{} passed, {} failed, {} step(s) skipped",
        style(passed).green(),
        if failed > 0 {
            style(failed).red()
        } else {
            style(failed)
        },
        skipped
    )
}
