//! The four evaluated aspects of an agent's call and their prompts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// One evaluated dimension of an agent's call performance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Aspect {
    /// The agent's attitude towards the customer
    Positive,
    CallOpening,
    CallQuality,
    CallClosing,
}

impl Aspect {
    /// All aspects, in report order
    pub fn all() -> &'static [Aspect] {
        &[
            Aspect::Positive,
            Aspect::CallOpening,
            Aspect::CallQuality,
            Aspect::CallClosing,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Aspect::Positive => "positive",
            Aspect::CallOpening => "call-opening",
            Aspect::CallQuality => "call-quality",
            Aspect::CallClosing => "call-closing",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Aspect::Positive => "Attitude",
            Aspect::CallOpening => "Call Opening",
            Aspect::CallQuality => "Call Quality",
            Aspect::CallClosing => "Call Closing",
        }
    }

    fn focus(&self) -> &'static str {
        match self {
            Aspect::Positive => ATTITUDE_FOCUS,
            Aspect::CallOpening => OPENING_FOCUS,
            Aspect::CallQuality => QUALITY_FOCUS,
            Aspect::CallClosing => CLOSING_FOCUS,
        }
    }

    /// Full prompt for this aspect, for a call held in `language`.
    pub fn prompt(&self, language: &str) -> String {
        let language = match language.trim() {
            "" => "an unspecified language",
            other => other,
        };
        format!(
            "You are a quality analyst reviewing a recorded customer-service call \
             between an agent and a customer. The call is in {language}.\n\n\
             Evaluate only this aspect of the agent's performance: {name}.\n\
             {focus}\n\n\
             {JSON_CONTRACT}",
            name = self.display_name(),
            focus = self.focus(),
        )
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Aspect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "positive" | "attitude" => Ok(Aspect::Positive),
            "call-opening" | "opening" => Ok(Aspect::CallOpening),
            "call-quality" | "quality" => Ok(Aspect::CallQuality),
            "call-closing" | "closing" => Ok(Aspect::CallClosing),
            _ => Err(format!(
                "Unknown aspect: '{}'. Available: positive, call-opening, call-quality, call-closing",
                s
            )),
        }
    }
}

const ATTITUDE_FOCUS: &str = "Judge the agent's attitude: politeness, patience, empathy, \
and whether the agent stays positive and respectful even when the customer is frustrated.";

const OPENING_FOCUS: &str = "Judge how the agent opens the call: a clear greeting, \
introducing themselves and the company, and promptly offering help.";

const QUALITY_FOCUS: &str = "Judge the quality of the service: understanding the \
customer's issue, accuracy and clarity of the information given, and whether the issue \
is resolved or correctly escalated.";

const CLOSING_FOCUS: &str = "Judge how the agent closes the call: summarizing the outcome, \
asking whether anything else is needed, and a courteous farewell.";

const JSON_CONTRACT: &str = "Respond with only a JSON object of the form \
{\"sentiment\": \"POSITIVE\" | \"NEUTRAL\" | \"NEGATIVE\", \
\"score\": <number from -1.0 (very poor) to 1.0 (excellent)>, \
\"justification\": \"<one or two sentences in English>\"}.";

/// Sentiment label returned by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Label implied by a raw score, for judgments entered by hand.
    pub fn from_score(score: f64) -> Self {
        if score > 0.2 {
            SentimentLabel::Positive
        } else if score < -0.2 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

impl FromStr for SentimentLabel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "POSITIVE" => Ok(SentimentLabel::Positive),
            "NEUTRAL" | "MIXED" => Ok(SentimentLabel::Neutral),
            "NEGATIVE" => Ok(SentimentLabel::Negative),
            _ => Err(ParseError::UnknownSentiment(s.to_string())),
        }
    }
}

/// One aspect's judgment. `score` is always within [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AspectJudgment {
    #[serde(skip)]
    pub aspect: Aspect,
    #[serde(rename = "sentiment")]
    pub label: SentimentLabel,
    #[serde(rename = "score")]
    pub raw_score: f64,
    pub justification: String,
}

#[derive(Deserialize)]
struct WireJudgment {
    sentiment: String,
    score: f64,
    #[serde(default)]
    justification: String,
}

impl AspectJudgment {
    /// Build a judgment, clamping the score into [-1.0, 1.0].
    pub fn new(aspect: Aspect, label: SentimentLabel, raw_score: f64, justification: impl Into<String>) -> Self {
        Self {
            aspect,
            label,
            raw_score: clamp_score(raw_score),
            justification: justification.into(),
        }
    }

    /// Parse the service's JSON answer for `aspect`.
    ///
    /// Tolerates Markdown code fences and prose around the object. Scores
    /// outside [-1.0, 1.0] are clamped, never passed through.
    pub fn parse(aspect: Aspect, response: &str) -> Result<Self, ParseError> {
        let wire: WireJudgment = serde_json::from_str(extract_json_object(response)?)?;
        if !wire.score.is_finite() {
            return Err(ParseError::NonFiniteScore);
        }
        if !(-1.0..=1.0).contains(&wire.score) {
            tracing::warn!(
                aspect = %aspect,
                score = wire.score,
                "Service returned an out-of-range score, clamping"
            );
        }
        Ok(Self::new(
            aspect,
            wire.sentiment.parse()?,
            wire.score,
            wire.justification.trim(),
        ))
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() { 0.0 } else { score.clamp(-1.0, 1.0) }
}

/// Slice from the first `{` to the last `}`.
pub(crate) fn extract_json_object(text: &str) -> Result<&str, ParseError> {
    let start = text.find('{').ok_or(ParseError::NoJson)?;
    let end = text.rfind('}').ok_or(ParseError::NoJson)?;
    if end < start {
        return Err(ParseError::NoJson);
    }
    Ok(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let judgment = AspectJudgment::parse(
            Aspect::CallOpening,
            r#"{"sentiment": "POSITIVE", "score": 0.7, "justification": "Warm greeting."}"#,
        )
        .unwrap();
        assert_eq!(judgment.aspect, Aspect::CallOpening);
        assert_eq!(judgment.label, SentimentLabel::Positive);
        assert_eq!(judgment.raw_score, 0.7);
        assert_eq!(judgment.justification, "Warm greeting.");
    }

    #[test]
    fn test_parse_fenced_json() {
        let response = "```json\n{\"sentiment\": \"negative\", \"score\": -0.4, \"justification\": \"Abrupt.\"}\n```";
        let judgment = AspectJudgment::parse(Aspect::CallClosing, response).unwrap();
        assert_eq!(judgment.label, SentimentLabel::Negative);
        assert_eq!(judgment.raw_score, -0.4);
    }

    #[test]
    fn test_parse_clamps_out_of_range_scores() {
        let high = AspectJudgment::parse(
            Aspect::Positive,
            r#"{"sentiment": "POSITIVE", "score": 3.5, "justification": ""}"#,
        )
        .unwrap();
        assert_eq!(high.raw_score, 1.0);

        let low = AspectJudgment::parse(
            Aspect::Positive,
            r#"{"sentiment": "NEGATIVE", "score": -7}"#,
        )
        .unwrap();
        assert_eq!(low.raw_score, -1.0);
        assert_eq!(low.justification, "");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            AspectJudgment::parse(Aspect::Positive, "I think it went well"),
            Err(ParseError::NoJson)
        ));
        assert!(matches!(
            AspectJudgment::parse(Aspect::Positive, r#"{"sentiment": "GREAT", "score": 0.1}"#),
            Err(ParseError::UnknownSentiment(_))
        ));
        assert!(matches!(
            AspectJudgment::parse(Aspect::Positive, r#"{"sentiment": "POSITIVE"}"#),
            Err(ParseError::Json(_))
        ));
        assert!(matches!(
            AspectJudgment::parse(Aspect::Positive, "} oops {"),
            Err(ParseError::NoJson)
        ));
    }

    #[test]
    fn test_judgment_serializes_to_wire_shape() {
        let judgment = AspectJudgment::new(Aspect::CallQuality, SentimentLabel::Neutral, 0.0, "Okay.");
        let value = serde_json::to_value(&judgment).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"sentiment": "NEUTRAL", "score": 0.0, "justification": "Okay."})
        );
    }

    #[test]
    fn test_prompt_mentions_language_and_aspect() {
        let prompt = Aspect::CallOpening.prompt("Vietnamese");
        assert!(prompt.contains("The call is in Vietnamese."));
        assert!(prompt.contains("Call Opening"));
        assert!(prompt.contains("\"sentiment\""));
        assert!(Aspect::Positive.prompt("  ").contains("an unspecified language"));
    }

    #[test]
    fn test_aspect_from_str() {
        assert_eq!("attitude".parse::<Aspect>().unwrap(), Aspect::Positive);
        assert_eq!("Call-Closing".parse::<Aspect>().unwrap(), Aspect::CallClosing);
        assert!("tone".parse::<Aspect>().is_err());
        for aspect in Aspect::all() {
            assert_eq!(aspect.as_str().parse::<Aspect>().unwrap(), *aspect);
        }
    }

    #[test]
    fn test_label_from_score() {
        assert_eq!(SentimentLabel::from_score(0.8), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(0.0), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-0.5), SentimentLabel::Negative);
    }
}
