//! Probe every configured key and print a health table.

use anyhow::Result;
use console::style;
use futures_util::future::join_all;

use callgrade_core::{CredentialStatus, Outcome, ProbeReport};

use crate::app;

pub async fn run() -> Result<()> {
    let config = app::load_run_config(None)?;
    let analyzer = app::build_analyzer(&config.client)?;
    let client = analyzer.client();

    println!(
        "Probing {} key(s) against {} model(s)...\n",
        client.pool().len(),
        client.models().len()
    );

    let reports = join_all((1..=client.pool().len()).map(|ordinal| client.probe(ordinal))).await;
    let statuses = client.pool().snapshot();

    let mut healthy = 0;
    for (report, status) in reports.iter().zip(&statuses) {
        if report.model.is_some() {
            healthy += 1;
        }
        println!("{}", row(report, status));
    }

    println!();
    println!("{}/{} key(s) usable", healthy, statuses.len());
    if healthy == 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn row(report: &ProbeReport, status: &CredentialStatus) -> String {
    let verdict = match &report.model {
        Some(model) => format!("{} {}", style("ok").green(), model),
        None => {
            let last = report.attempts.last().map(|a| a.outcome);
            match last {
                Some(Outcome::AuthInvalid) => style("invalid").red().to_string(),
                Some(Outcome::QuotaExceeded) => style("rate limited").yellow().to_string(),
                Some(outcome) => style(outcome.to_string()).yellow().to_string(),
                None => style("skipped").dim().to_string(),
            }
        }
    };

    let mut line = format!(
        "#{:<2} {:<8} {:<10} {}",
        status.ordinal,
        status.masked,
        status.state.to_string(),
        verdict
    );
    if let Some(ms) = status.cooldown_remaining_ms {
        line.push_str(&format!(" (cooling down {}s)", ms.div_ceil(1000)));
    }
    line
}
