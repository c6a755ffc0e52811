use serde::Serialize;
use std::fmt;

use super::normalize::{normalize, round_half_up};
use crate::aspect::{Aspect, AspectJudgment};

/// Qualitative label for the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverallLabel {
    Excellent,
    Good,
    Satisfactory,
    NeedsImprovement,
}

impl OverallLabel {
    /// `>= 8` Excellent, `>= 7` Good, `>= 5` Satisfactory, otherwise
    /// NeedsImprovement.
    pub fn for_score(overall_score: u8) -> Self {
        match overall_score {
            8.. => OverallLabel::Excellent,
            7 => OverallLabel::Good,
            5..=6 => OverallLabel::Satisfactory,
            _ => OverallLabel::NeedsImprovement,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OverallLabel::Excellent => "Excellent",
            OverallLabel::Good => "Good",
            OverallLabel::Satisfactory => "Satisfactory",
            OverallLabel::NeedsImprovement => "Needs Improvement",
        }
    }
}

impl fmt::Display for OverallLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Coarse pass/warn marker for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Pass,
    Warn,
}

/// Collects judgments until all four aspects are present.
#[derive(Debug, Clone, Default)]
pub struct AspectSet {
    positive: Option<AspectJudgment>,
    call_opening: Option<AspectJudgment>,
    call_quality: Option<AspectJudgment>,
    call_closing: Option<AspectJudgment>,
}

impl AspectSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a judgment in its aspect's slot, replacing any earlier one.
    pub fn insert(&mut self, judgment: AspectJudgment) {
        let slot = match judgment.aspect {
            Aspect::Positive => &mut self.positive,
            Aspect::CallOpening => &mut self.call_opening,
            Aspect::CallQuality => &mut self.call_quality,
            Aspect::CallClosing => &mut self.call_closing,
        };
        *slot = Some(judgment);
    }

    pub fn missing(&self) -> Vec<Aspect> {
        [
            (Aspect::Positive, &self.positive),
            (Aspect::CallOpening, &self.call_opening),
            (Aspect::CallQuality, &self.call_quality),
            (Aspect::CallClosing, &self.call_closing),
        ]
        .into_iter()
        .filter(|(_, slot)| slot.is_none())
        .map(|(aspect, _)| aspect)
        .collect()
    }

    /// All four judgments, or the aspects still missing.
    pub fn complete(self) -> Result<AspectJudgments, Vec<Aspect>> {
        match (
            self.positive,
            self.call_opening,
            self.call_quality,
            self.call_closing,
        ) {
            (Some(positive), Some(call_opening), Some(call_quality), Some(call_closing)) => {
                Ok(AspectJudgments {
                    positive,
                    call_opening,
                    call_quality,
                    call_closing,
                })
            }
            (positive, call_opening, call_quality, call_closing) => Err(AspectSet {
                positive,
                call_opening,
                call_quality,
                call_closing,
            }
            .missing()),
        }
    }
}

/// A complete set of four judgments. Only [`AspectSet::complete`] builds one.
#[derive(Debug, Clone, PartialEq)]
pub struct AspectJudgments {
    positive: AspectJudgment,
    call_opening: AspectJudgment,
    call_quality: AspectJudgment,
    call_closing: AspectJudgment,
}

impl AspectJudgments {
    pub fn get(&self, aspect: Aspect) -> &AspectJudgment {
        match aspect {
            Aspect::Positive => &self.positive,
            Aspect::CallOpening => &self.call_opening,
            Aspect::CallQuality => &self.call_quality,
            Aspect::CallClosing => &self.call_closing,
        }
    }
}

/// One aspect of the report: the judgment plus its normalized score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectScore {
    #[serde(flatten)]
    pub judgment: AspectJudgment,
    pub normalized_score: u8,
}

impl AspectScore {
    fn from_judgment(judgment: &AspectJudgment) -> Self {
        Self {
            judgment: judgment.clone(),
            normalized_score: normalize(judgment.raw_score),
        }
    }
}

/// Final coaching report for one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub positive: AspectScore,
    pub call_opening: AspectScore,
    pub call_quality: AspectScore,
    pub call_closing: AspectScore,
    pub overall_score: u8,
    pub overall_label: OverallLabel,
}

impl PerformanceReport {
    /// Normalize each aspect and combine them.
    ///
    /// `overall_score = round_half_up(mean(normalized scores))`.
    pub fn aggregate(judgments: &AspectJudgments) -> Self {
        let positive = AspectScore::from_judgment(&judgments.positive);
        let call_opening = AspectScore::from_judgment(&judgments.call_opening);
        let call_quality = AspectScore::from_judgment(&judgments.call_quality);
        let call_closing = AspectScore::from_judgment(&judgments.call_closing);

        let total: u32 = [&positive, &call_opening, &call_quality, &call_closing]
            .iter()
            .map(|s| u32::from(s.normalized_score))
            .sum();
        let overall_score = round_half_up(f64::from(total) / 4.0) as u8;

        Self {
            positive,
            call_opening,
            call_quality,
            call_closing,
            overall_score,
            overall_label: OverallLabel::for_score(overall_score),
        }
    }

    pub fn aspect(&self, aspect: Aspect) -> &AspectScore {
        match aspect {
            Aspect::Positive => &self.positive,
            Aspect::CallOpening => &self.call_opening,
            Aspect::CallQuality => &self.call_quality,
            Aspect::CallClosing => &self.call_closing,
        }
    }

    /// Normalized scores in report order.
    pub fn normalized_scores(&self) -> [u8; 4] {
        [
            self.positive.normalized_score,
            self.call_opening.normalized_score,
            self.call_quality.normalized_score,
            self.call_closing.normalized_score,
        ]
    }

    /// Pass at 7 and above. Presentation only.
    pub fn indicator(&self) -> Indicator {
        if self.overall_score >= 7 {
            Indicator::Pass
        } else {
            Indicator::Warn
        }
    }
}
