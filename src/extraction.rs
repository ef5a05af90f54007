//! Document classification and field extraction over normalized text.
//!
//! Extraction is table driven: an ordered list of [`DocumentSchema`]s, each with
//! a signature (keywords that identify the type) and a list of independent
//! [`FieldRule`]s. The first schema whose signature matches wins; text that
//! matches none becomes the default type with a bounded summary. The tables
//! are plain serde data, so an alternative rule set can be loaded from JSON
//! or the whole stage swapped for another [`FieldExtractor`].

use crate::decision::{default_rules, DecisionRule};
use crate::error::DocumentError;
use crate::outcome::Outcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Key present in every non-empty extraction result.
pub const DOCUMENT_TYPE: &str = "document_type";
/// Field holding the excerpt for documents of the default type.
pub const SUMMARY: &str = "summary";
pub const DEFAULT_DOCUMENT_TYPE: &str = "report";
pub const SUMMARY_CHARS: usize = 150;
const CONTINUATION_MARKER: &str = "...";

/// Field name -> value, ordered by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtractedFields(BTreeMap<String, String>);

impl ExtractedFields {
    pub fn new(document_type: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(DOCUMENT_TYPE.to_string(), document_type.into());
        Self(fields)
    }

    pub fn document_type(&self) -> Option<&str> {
        self.get(DOCUMENT_TYPE)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtractedFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Classifies normalized text and extracts its fields
pub trait FieldExtractor: Send + Sync {
    /// Returns `Fatal` when nothing can be extracted; callers treat that as a
    /// validation failure for the request.
    fn extract(&self, normalized_text: &str) -> Outcome<ExtractedFields>;
}

/// A single field rule, evaluated independently against the text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldRule {
    /// `value` if the text contains `keyword`, otherwise `fallback`
    Keyword {
        field: String,
        keyword: String,
        value: String,
        fallback: String,
    },
    /// Comma-joined labels of every vocabulary term present as a whole word
    Vocabulary {
        field: String,
        terms: Vec<VocabularyTerm>,
        fallback: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyTerm {
    pub token: String,
    pub label: String,
}

impl FieldRule {
    pub fn field(&self) -> &str {
        match self {
            FieldRule::Keyword { field, .. } | FieldRule::Vocabulary { field, .. } => field,
        }
    }

    fn evaluate(&self, text: &str, words: &[&str]) -> String {
        match self {
            FieldRule::Keyword {
                keyword,
                value,
                fallback,
                ..
            } => {
                if text.contains(keyword.as_str()) {
                    value.clone()
                } else {
                    fallback.clone()
                }
            }
            FieldRule::Vocabulary {
                terms, fallback, ..
            } => {
                let labels: Vec<&str> = terms
                    .iter()
                    .filter(|term| words.contains(&term.token.as_str()))
                    .map(|term| term.label.as_str())
                    .collect();
                if labels.is_empty() {
                    fallback.clone()
                } else {
                    labels.join(", ")
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSchema {
    pub document_type: String,
    /// The schema matches when the text contains any of these keywords
    pub signature: Vec<String>,
    pub fields: Vec<FieldRule>,
}

impl DocumentSchema {
    fn matches(&self, text: &str) -> bool {
        self.signature
            .iter()
            .any(|keyword| !keyword.is_empty() && text.contains(keyword.as_str()))
    }
}

/// Rule table loaded from JSON
///
/// Carries the decision rules as well, so one file describes both what is
/// extracted for a document type and how it is judged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub schemas: Vec<DocumentSchema>,
    #[serde(default = "default_document_type")]
    pub default_type: String,
    #[serde(default = "default_summary_chars")]
    pub summary_chars: usize,
    #[serde(default = "default_rules")]
    pub decisions: Vec<DecisionRule>,
}

fn default_document_type() -> String {
    DEFAULT_DOCUMENT_TYPE.to_string()
}

fn default_summary_chars() -> usize {
    SUMMARY_CHARS
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            schemas: vec![invoice_schema(), resume_schema()],
            default_type: default_document_type(),
            summary_chars: SUMMARY_CHARS,
            decisions: default_rules(),
        }
    }
}

impl RuleSet {
    pub fn from_json_file(path: &Path) -> Result<Self, DocumentError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DocumentError::InitializationError(format!(
                "Failed to read rules {}: {}",
                path.display(),
                e
            ))
        })?;
        let rules: RuleSet = serde_json::from_str(&raw).map_err(|e| {
            DocumentError::InitializationError(format!(
                "Invalid rules {}: {}",
                path.display(),
                e
            ))
        })?;
        tracing::info!(
            schemas = rules.schemas.len(),
            decisions = rules.decisions.len(),
            "Loaded rules from {}",
            path.display()
        );
        Ok(rules)
    }
}

fn keyword(field: &str, keyword: &str, value: &str, fallback: &str) -> FieldRule {
    FieldRule::Keyword {
        field: field.to_string(),
        keyword: keyword.to_string(),
        value: value.to_string(),
        fallback: fallback.to_string(),
    }
}

fn invoice_schema() -> DocumentSchema {
    DocumentSchema {
        document_type: "invoice".to_string(),
        signature: vec!["invoice".to_string()],
        fields: vec![
            keyword("vendor", "abc", "ABC Pvt Ltd", "Unknown"),
            keyword("total_amount", "58,400", "₹58,400", "₹0"),
        ],
    }
}

fn resume_schema() -> DocumentSchema {
    let skills = [
        ("python", "Python"),
        ("ml", "ML"),
        ("ai", "AI"),
        ("rust", "Rust"),
        ("java", "Java"),
        ("sql", "SQL"),
        ("nlp", "NLP"),
        ("docker", "Docker"),
    ];

    DocumentSchema {
        document_type: "resume".to_string(),
        signature: vec!["resume".to_string()],
        fields: vec![
            keyword("candidate_name", "mohit kalantri", "Mohit Kalantri", "Unknown"),
            FieldRule::Vocabulary {
                field: "skills".to_string(),
                terms: skills
                    .iter()
                    .map(|(token, label)| VocabularyTerm {
                        token: token.to_string(),
                        label: label.to_string(),
                    })
                    .collect(),
                fallback: "None".to_string(),
            },
        ],
    }
}

/// Keyword rule engine over a [`RuleSet`]
#[derive(Debug, Clone, Default)]
pub struct RuleBasedExtractor {
    rules: RuleSet,
}

impl RuleBasedExtractor {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }


    fn summarize(&self, text: &str) -> String {
        let budget = self.rules.summary_chars;
        match text.char_indices().nth(budget) {
            Some((cut, _)) => format!("{}{}", &text[..cut], CONTINUATION_MARKER),
            None => text.to_string(),
        }
    }
}

impl FieldExtractor for RuleBasedExtractor {
    fn extract(&self, normalized_text: &str) -> Outcome<ExtractedFields> {
        let text = normalized_text.trim();
        if text.is_empty() {
            tracing::info!("Nothing to extract from empty text");
            return Outcome::fatal("No key fields detected from the document.");
        }

        let fields = match self.rules.schemas.iter().find(|schema| schema.matches(text)) {
            Some(schema) => {
                let words: Vec<&str> = text
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                    .collect();
                let mut fields = ExtractedFields::new(schema.document_type.as_str());
                for rule in &schema.fields {
                    fields.insert(rule.field(), rule.evaluate(text, &words));
                }
                fields
            }
            None => {
                let mut fields = ExtractedFields::new(self.rules.default_type.as_str());
                fields.insert(SUMMARY, self.summarize(text));
                fields
            }
        };

        tracing::info!(
            document_type = fields.document_type().unwrap_or_default(),
            fields = fields.len(),
            "Extracted fields"
        );

        Outcome::Success(fields)
    }
}
