//! Rule-based verdicts over extracted fields.

use crate::extraction::ExtractedFields;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionStatus {
    Valid,
    Invalid,
    #[serde(rename = "Ranked High")]
    RankedHigh,
    #[serde(rename = "Ranked Low")]
    RankedLow,
    Reviewed,
    Error,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "Valid",
            Self::Invalid => "Invalid",
            Self::RankedHigh => "Ranked High",
            Self::RankedLow => "Ranked Low",
            Self::Reviewed => "Reviewed",
            Self::Error => "Error",
        }
    }
}

/// Per-field contribution to a decision
pub type ExplainabilityMap = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub status: DecisionStatus,
    pub confidence: f64,
    pub explainability: Option<ExplainabilityMap>,
}

impl Decision {
    pub fn error() -> Self {
        Self {
            status: DecisionStatus::Error,
            confidence: 0.0,
            explainability: None,
        }
    }
}

/// Scores a verdict. Implementations must be deterministic.
pub trait ConfidenceModel: Send + Sync {
    fn score(
        &self,
        fields: &ExtractedFields,
        status: DecisionStatus,
    ) -> (f64, Option<ExplainabilityMap>);
}

/// Reports the same confidence for every verdict
#[derive(Debug, Clone, Copy)]
pub struct FixedConfidence(pub f64);

impl Default for FixedConfidence {
    fn default() -> Self {
        Self(0.9)
    }
}

impl ConfidenceModel for FixedConfidence {
    fn score(
        &self,
        _fields: &ExtractedFields,
        _status: DecisionStatus,
    ) -> (f64, Option<ExplainabilityMap>) {
        (self.0, None)
    }
}

pub trait DecisionEngine: Send + Sync {
    /// Never fails; internal problems come back as [`DecisionStatus::Error`]
    fn decide(&self, fields: &ExtractedFields) -> Decision;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// Field is present, contains `needle` and is not equal to `unless`
    ContainsExcept {
        field: String,
        needle: String,
        unless: String,
    },
    Contains { field: String, needle: String },
}

impl Condition {
    fn holds(&self, fields: &ExtractedFields) -> bool {
        match self {
            Condition::ContainsExcept {
                field,
                needle,
                unless,
            } => fields
                .get(field)
                .is_some_and(|value| value != unless.as_str() && value.contains(needle.as_str())),
            Condition::Contains { field, needle } => fields
                .get(field)
                .is_some_and(|value| value.contains(needle.as_str())),
        }
    }
}

/// Verdict for one document type: `pass` when the condition holds, else `fail`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRule {
    pub document_type: String,
    pub condition: Condition,
    pub pass: DecisionStatus,
    pub fail: DecisionStatus,
}

pub fn default_rules() -> Vec<DecisionRule> {
    vec![
        DecisionRule {
            document_type: "invoice".to_string(),
            condition: Condition::ContainsExcept {
                field: "total_amount".to_string(),
                needle: "₹".to_string(),
                unless: "₹0".to_string(),
            },
            pass: DecisionStatus::Valid,
            fail: DecisionStatus::Invalid,
        },
        DecisionRule {
            document_type: "resume".to_string(),
            condition: Condition::Contains {
                field: "skills".to_string(),
                needle: "AI".to_string(),
            },
            pass: DecisionStatus::RankedHigh,
            fail: DecisionStatus::RankedLow,
        },
    ]
}

pub struct RuleBasedDecisionEngine {
    rules: Vec<DecisionRule>,
    fallback: DecisionStatus,
    confidence: Box<dyn ConfidenceModel>,
}

impl Default for RuleBasedDecisionEngine {
    fn default() -> Self {
        Self::new(default_rules(), FixedConfidence::default())
    }
}

impl RuleBasedDecisionEngine {
    pub fn new(rules: Vec<DecisionRule>, confidence: impl ConfidenceModel + 'static) -> Self {
        Self {
            rules,
            fallback: DecisionStatus::Reviewed,
            confidence: Box::new(confidence),
        }
    }

    fn status_for(&self, document_type: &str, fields: &ExtractedFields) -> DecisionStatus {
        self.rules
            .iter()
            .find(|rule| rule.document_type == document_type)
            .map(|rule| {
                if rule.condition.holds(fields) {
                    rule.pass
                } else {
                    rule.fail
                }
            })
            .unwrap_or(self.fallback)
    }
}

impl DecisionEngine for RuleBasedDecisionEngine {
    fn decide(&self, fields: &ExtractedFields) -> Decision {
        let Some(document_type) = fields.document_type() else {
            tracing::error!("Decision requested for fields without a document type");
            return Decision::error();
        };

        let status = self.status_for(document_type, fields);
        let (confidence, explainability) = self.confidence.score(fields, status);
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            tracing::error!(confidence, "Confidence model returned an invalid score");
            return Decision::error();
        }

        tracing::info!(
            document_type,
            status = status.as_str(),
            confidence,
            "Decision made"
        );

        Decision {
            status,
            confidence,
            explainability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> ExtractedFields {
        pairs.iter().copied().collect()
    }

    fn status(pairs: &[(&str, &str)]) -> DecisionStatus {
        RuleBasedDecisionEngine::default().decide(&fields(pairs)).status
    }

    #[test]
    fn test_invoice_with_amount_is_valid() {
        let decision = RuleBasedDecisionEngine::default().decide(&fields(&[
            ("document_type", "invoice"),
            ("vendor", "ABC Pvt Ltd"),
            ("total_amount", "₹58,400"),
        ]));

        assert_eq!(
            decision,
            Decision {
                status: DecisionStatus::Valid,
                confidence: 0.9,
                explainability: None,
            }
        );
    }

    #[test]
    fn test_invoice_without_amount_is_invalid() {
        assert_eq!(
            status(&[("document_type", "invoice"), ("total_amount", "₹0")]),
            DecisionStatus::Invalid
        );
        assert_eq!(
            status(&[("document_type", "invoice"), ("total_amount", "58,400")]),
            DecisionStatus::Invalid
        );
        assert_eq!(status(&[("document_type", "invoice")]), DecisionStatus::Invalid);
    }

    #[test]
    fn test_resume_ranking() {
        assert_eq!(
            status(&[("document_type", "resume"), ("skills", "Python, AI")]),
            DecisionStatus::RankedHigh
        );
        assert_eq!(
            status(&[("document_type", "resume"), ("skills", "Python, ML")]),
            DecisionStatus::RankedLow
        );
        assert_eq!(
            status(&[("document_type", "resume"), ("skills", "None")]),
            DecisionStatus::RankedLow
        );
    }

    #[test]
    fn test_other_types_are_reviewed() {
        assert_eq!(
            status(&[("document_type", "report"), ("summary", "minutes")]),
            DecisionStatus::Reviewed
        );
        assert_eq!(status(&[("document_type", "receipt")]), DecisionStatus::Reviewed);
    }

    #[test]
    fn test_missing_type_is_error() {
        assert_eq!(
            RuleBasedDecisionEngine::default().decide(&fields(&[("vendor", "ABC Pvt Ltd")])),
            Decision::error()
        );
    }

    #[test]
    fn test_invalid_confidence_is_error() {
        let engine = RuleBasedDecisionEngine::new(default_rules(), FixedConfidence(f64::NAN));
        assert_eq!(
            engine.decide(&fields(&[("document_type", "report")])),
            Decision::error()
        );

        let engine = RuleBasedDecisionEngine::new(default_rules(), FixedConfidence(1.5));
        let decision = engine.decide(&fields(&[("document_type", "report")]));
        assert_eq!(decision.status, DecisionStatus::Error);
    }

    #[test]
    fn test_decision_is_pure() {
        let engine = RuleBasedDecisionEngine::default();
        let input = fields(&[("document_type", "resume"), ("skills", "AI, SQL")]);
        assert_eq!(engine.decide(&input), engine.decide(&input));
    }

    #[test]
    fn test_status_serializes_with_display_labels() {
        assert_eq!(
            serde_json::to_string(&DecisionStatus::RankedHigh).unwrap(),
            "\"Ranked High\""
        );
        assert_eq!(serde_json::to_string(&DecisionStatus::Valid).unwrap(), "\"Valid\"");
    }

    #[test]
    fn test_rules_deserialize_from_json() {
        let rules: Vec<DecisionRule> = serde_json::from_str(
            r#"[{
                "document_type": "receipt",
                "condition": {"kind": "contains", "field": "paid", "needle": "yes"},
                "pass": "Valid",
                "fail": "Ranked Low"
            }]"#,
        )
        .unwrap();
        let engine = RuleBasedDecisionEngine::new(rules, FixedConfidence::default());

        let paid = engine.decide(&fields(&[("document_type", "receipt"), ("paid", "yes")]));
        let unpaid = engine.decide(&fields(&[("document_type", "receipt"), ("paid", "no")]));
        // types without a rule fall back to review
        let invoice = engine.decide(&fields(&[
            ("document_type", "invoice"),
            ("total_amount", "₹58,400"),
        ]));

        assert_eq!(paid.status, DecisionStatus::Valid);
        assert_eq!(unpaid.status, DecisionStatus::RankedLow);
        assert_eq!(invoice.status, DecisionStatus::Reviewed);
    }
}
