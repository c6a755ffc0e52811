//! Offline scoring: raw scores in, report out.

use anyhow::Result;

use callgrade_core::{
    Aspect, AspectJudgment, AspectSet, PerformanceReport, SentimentLabel,
};

use super::analyze::print_report;
use crate::args::ScoreArgs;

pub fn run(args: ScoreArgs) -> Result<()> {
    let report = build_report(&args)?;
    print_report(&report, args.json)
}

fn build_report(args: &ScoreArgs) -> Result<PerformanceReport> {
    let raw = [
        (Aspect::Positive, args.positive),
        (Aspect::CallOpening, args.opening),
        (Aspect::CallQuality, args.quality),
        (Aspect::CallClosing, args.closing),
    ];

    let mut set = AspectSet::new();
    for (aspect, score) in raw {
        if !score.is_finite() {
            anyhow::bail!("Score for {} must be a finite number", aspect);
        }
        set.insert(AspectJudgment::new(
            aspect,
            SentimentLabel::from_score(score),
            score,
            "Entered manually.",
        ));
    }

    let judgments = set
        .complete()
        .map_err(|missing| anyhow::anyhow!("Missing scores for {:?}", missing))?;
    Ok(PerformanceReport::aggregate(&judgments))
}
