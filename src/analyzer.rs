//! End-to-end analysis of one stored document.

use crate::decision::{Decision, DecisionEngine, RuleBasedDecisionEngine};
use crate::document::SourceDocument;
use crate::error::DocumentError;
use crate::extraction::{ExtractedFields, FieldExtractor, RuleBasedExtractor};
use crate::normalizer;
use crate::outcome::Outcome;
use crate::pipeline::DocumentPipeline;

pub const NO_TEXT_MESSAGE: &str = "No readable text found in the document.";
pub const NO_FIELDS_MESSAGE: &str = "No key fields detected from the document.";

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub fields: ExtractedFields,
    pub decision: Decision,
    /// Degradations that did not stop processing
    pub warnings: Vec<String>,
}

/// Resolve -> normalize -> extract -> decide
pub struct DocumentAnalyzer {
    pipeline: DocumentPipeline,
    extractor: Box<dyn FieldExtractor>,
    decider: Box<dyn DecisionEngine>,
}

impl DocumentAnalyzer {
    pub fn new(pipeline: DocumentPipeline) -> Self {
        Self {
            pipeline,
            extractor: Box::new(RuleBasedExtractor::default()),
            decider: Box::new(RuleBasedDecisionEngine::default()),
        }
    }

    pub fn with_extractor(mut self, extractor: impl FieldExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    pub fn with_decision_engine(mut self, decider: impl DecisionEngine + 'static) -> Self {
        self.decider = Box::new(decider);
        self
    }

    /// Analyze a stored document. Errors are always [`DocumentError::Validation`].
    pub fn analyze(&self, document: &SourceDocument) -> Result<Analysis, DocumentError> {
        let mut warnings = Vec::new();

        let raw = match self.pipeline.resolve(document) {
            Outcome::Success(text) => text,
            Outcome::Degraded { value, reason } => {
                warnings.push(reason);
                value
            }
            Outcome::Fatal(reason) => return Err(DocumentError::Validation(reason)),
        };
        if raw.trim().is_empty() {
            tracing::warn!(document_id = %document.id(), ?warnings, "{}", NO_TEXT_MESSAGE);
            return Err(DocumentError::Validation(NO_TEXT_MESSAGE.to_string()));
        }

        let text = normalizer::normalize(&raw);

        let fields = match self.extractor.extract(&text) {
            Outcome::Success(fields) => fields,
            Outcome::Degraded { value, reason } => {
                warnings.push(reason);
                value
            }
            Outcome::Fatal(reason) => {
                tracing::warn!(document_id = %document.id(), "Extraction failed: {}", reason);
                return Err(DocumentError::Validation(NO_FIELDS_MESSAGE.to_string()));
            }
        };
        if fields.is_empty() {
            return Err(DocumentError::Validation(NO_FIELDS_MESSAGE.to_string()));
        }

        let decision = self.decider.decide(&fields);

        Ok(Analysis {
            fields,
            decision,
            warnings,
        })
    }
}
