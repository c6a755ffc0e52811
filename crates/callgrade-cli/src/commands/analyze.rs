//! Full call analysis: four aspect judgments aggregated into a report.

use anyhow::Result;
use console::style;

use callgrade_core::{Aspect, Indicator, PerformanceReport};

use super::{cancel_on_ctrl_c, report_failure};
use crate::app;
use crate::args::AnalyzeArgs;

pub async fn run(args: AnalyzeArgs) -> Result<()> {
    let config = app::load_run_config(args.input.language.clone())?;
    let payload = app::load_payload(&args.input.file)?;
    let analyzer = app::build_analyzer(&config.client)?;
    let cancel = cancel_on_ctrl_c();

    match analyzer
        .analyze(&payload, &config.language, args.schedule, &cancel)
        .await
    {
        Ok(report) => print_report(&report, args.json),
        Err(err) => {
            report_failure(&err);
            std::process::exit(1);
        }
    }
}

/// Print a report as JSON or as a human-readable summary.
pub fn print_report(report: &PerformanceReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    for aspect in Aspect::all() {
        let score = report.aspect(*aspect);
        println!(
            "{:<14} {:>2}/10  {}",
            style(aspect.display_name()).bold(),
            score.normalized_score,
            score.judgment.justification
        );
    }
    println!();

    let marker = match report.indicator() {
        Indicator::Pass => style("✓").green().bold(),
        Indicator::Warn => style("!").yellow().bold(),
    };
    println!(
        "{} Overall: {}/10 ({})",
        marker, report.overall_score, report.overall_label
    );
    Ok(())
}
