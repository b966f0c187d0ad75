//! Core data model types for mathcheck.
//!
//! Answer slots describe what a question part accepts; match results report
//! how a learner's inputs were credited against them. Question sets bundle
//! parts for the CLI and the batch grader.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::equivalence::Strategy;

/// One accepted answer for a slot.
///
/// On the wire a string is a fixed value and a list of strings is a pool of
/// interchangeable values shared with other slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerAlternative {
    Fixed(String),
    Pool(Vec<String>),
}

/// One input position of a question part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SlotRepr", into = "SlotRepr")]
pub struct AnswerSlot {
    pub alternatives: Vec<AnswerAlternative>,
}

/// Compact slot encodings: `"2"`, `["2", "-2"]`, or
/// `{ alternatives = ["1/2", "0.5"] }`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SlotRepr {
    Detailed { alternatives: Vec<AnswerAlternative> },
    Single(AnswerAlternative),
}

impl From<SlotRepr> for AnswerSlot {
    fn from(repr: SlotRepr) -> Self {
        match repr {
            SlotRepr::Detailed { alternatives } => AnswerSlot { alternatives },
            SlotRepr::Single(alternative) => AnswerSlot {
                alternatives: vec![alternative],
            },
        }
    }
}

impl From<AnswerSlot> for SlotRepr {
    fn from(mut slot: AnswerSlot) -> Self {
        match slot.alternatives.len() {
            1 => SlotRepr::Single(slot.alternatives.remove(0)),
            _ => SlotRepr::Detailed {
                alternatives: slot.alternatives,
            },
        }
    }
}

impl AnswerSlot {
    pub fn new(alternatives: Vec<AnswerAlternative>) -> Self {
        Self { alternatives }
    }

    /// A slot accepting exactly one value.
    pub fn fixed(value: impl Into<String>) -> Self {
        Self::new(vec![AnswerAlternative::Fixed(value.into())])
    }

    /// A slot drawing from a pool shared with other slots.
    pub fn pool<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(vec![AnswerAlternative::Pool(
            values.into_iter().map(Into::into).collect(),
        )])
    }

    /// Whether the slot's sole alternative is the "no answer required" sentinel.
    pub fn is_not_required(&self, sentinel: &str) -> bool {
        matches!(
            self.alternatives.as_slice(),
            [AnswerAlternative::Fixed(value)] if value.trim() == sentinel
        )
    }
}

/// Identity of one accepted value in the flattened alternative arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlternativeId {
    /// Slot that declared the alternative.
    pub slot: usize,
    /// Index into that slot's alternatives.
    pub alternative: usize,
    /// Position inside a pool; `None` for fixed alternatives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<usize>,
}

impl fmt::Display for AlternativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {} alt {}", self.slot + 1, self.alternative + 1)?;
        if let Some(member) = self.member {
            write!(f, " #{}", member + 1)?;
        }
        Ok(())
    }
}

/// Outcome for a single slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SlotStatus {
    Matched {
        alternative: AlternativeId,
        /// The accepted value that was credited.
        value: String,
        strategy: Strategy,
    },
    Unmatched,
    /// Sentinel slot, satisfied without input.
    NotRequired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotOutcome {
    pub slot: usize,
    /// The learner's input for this slot, if one was given.
    #[serde(default)]
    pub input: Option<String>,
    #[serde(flatten)]
    pub status: SlotStatus,
}

impl SlotOutcome {
    pub fn is_satisfied(&self) -> bool {
        !matches!(self.status, SlotStatus::Unmatched)
    }
}

/// Why inputs could not be matched at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeMismatch {
    InputCount { expected: usize, actual: usize },
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeMismatch::InputCount { expected, actual } => {
                write!(f, "expected {expected} inputs, got {actual}")
            }
        }
    }
}

/// Verdict of one verification call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// True iff every required slot was credited with a distinct alternative.
    pub passed: bool,
    pub slots: Vec<SlotOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<ShapeMismatch>,
}

impl MatchResult {
    pub fn matched_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s.status, SlotStatus::Matched { .. }))
            .count()
    }
}

/// One part of a question, answered through its slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionPart {
    pub id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub slots: Vec<AnswerSlot>,
    /// Proof-style parts the learner marks as done themselves.
    #[serde(default)]
    pub self_assessed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub parts: Vec<QuestionPart>,
}

/// A collection of questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuestionSet {
    pub fn find_part(&self, question_id: &str, part_id: &str) -> Option<&QuestionPart> {
        self.questions
            .iter()
            .find(|q| q.id == question_id)?
            .parts
            .iter()
            .find(|p| p.id == part_id)
    }

    pub fn part_count(&self) -> usize {
        self.questions.iter().map(|q| q.parts.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_compact_forms() {
        let slots: Vec<AnswerSlot> =
            serde_json::from_str(r#"["2", ["2", "-2"], {"alternatives": ["1/2", "0.5"]}]"#)
                .unwrap();
        assert_eq!(slots[0], AnswerSlot::fixed("2"));
        assert_eq!(slots[1], AnswerSlot::pool(["2", "-2"]));
        assert_eq!(
            slots[2].alternatives,
            vec![
                AnswerAlternative::Fixed("1/2".into()),
                AnswerAlternative::Fixed("0.5".into()),
            ]
        );

        let json = serde_json::to_string(&slots).unwrap();
        assert_eq!(
            json,
            r#"["2",["2","-2"],{"alternatives":["1/2","0.5"]}]"#
        );
    }

    #[test]
    fn sentinel_slot() {
        assert!(AnswerSlot::fixed("<none>").is_not_required("<none>"));
        assert!(AnswerSlot::fixed(" <none> ").is_not_required("<none>"));
        assert!(!AnswerSlot::fixed("0").is_not_required("<none>"));
        assert!(!AnswerSlot::pool(["<none>"]).is_not_required("<none>"));
    }

    #[test]
    fn match_result_json_shape() {
        let result = MatchResult {
            passed: false,
            slots: vec![
                SlotOutcome {
                    slot: 0,
                    input: Some("2".into()),
                    status: SlotStatus::Matched {
                        alternative: AlternativeId {
                            slot: 0,
                            alternative: 0,
                            member: Some(1),
                        },
                        value: "2".into(),
                        strategy: Strategy::Symbolic,
                    },
                },
                SlotOutcome {
                    slot: 1,
                    input: Some("x".into()),
                    status: SlotStatus::Unmatched,
                },
            ],
            mismatch: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["slots"][0]["outcome"], "matched");
        assert_eq!(value["slots"][0]["strategy"], "symbolic");
        assert_eq!(value["slots"][1]["outcome"], "unmatched");
        assert!(value.get("mismatch").is_none());

        let back: MatchResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
        assert_eq!(back.matched_count(), 1);
    }

    #[test]
    fn alternative_id_display() {
        let id = AlternativeId {
            slot: 0,
            alternative: 1,
            member: Some(0),
        };
        assert_eq!(id.to_string(), "slot 1 alt 2 #1");
        assert_eq!(
            ShapeMismatch::InputCount {
                expected: 2,
                actual: 1
            }
            .to_string(),
            "expected 2 inputs, got 1"
        );
    }
}
