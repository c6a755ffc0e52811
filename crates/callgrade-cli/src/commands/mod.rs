pub mod analyze;
pub mod check_keys;
pub mod score;
pub mod setup;
pub mod transcribe;

use callgrade_core::{AnalysisError, AttemptRecord};
use console::style;
use tokio_util::sync::CancellationToken;

/// Token that fires on Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, abandoning in-flight requests");
            trigger.cancel();
        }
    });
    token
}

/// Print the attempt trail of a failed session to stderr.
pub fn report_failure(err: &AnalysisError) {
    eprintln!("{} {}", style("✗").red().bold(), err);

    let trail = match err {
        AnalysisError::Aspect { source, .. } | AnalysisError::Transcript(source) => source.trail(),
        AnalysisError::Incomplete(_) => return,
    };
    if trail.is_empty() {
        eprintln!("  No credential was available to try.");
        return;
    }
    eprintln!("  Attempts:");
    for line in trail_lines(trail) {
        eprintln!("    {line}");
    }
}

fn trail_lines(trail: &[AttemptRecord]) -> Vec<String> {
    trail
        .iter()
        .map(|attempt| {
            let mut line = format!(
                "{} key #{:<2} {:<24} {}",
                attempt.timestamp.format("%H:%M:%S"),
                attempt.credential_ordinal,
                attempt.model_name,
                attempt.outcome
            );
            if let Some(detail) = &attempt.detail {
                line.push_str(": ");
                line.push_str(detail);
            }
            line
        })
        .collect()
}
