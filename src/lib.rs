//! Document understanding service.
//!
//! Uploaded images and PDFs are turned into text (embedded text layer first,
//! OCR with engine fallback otherwise), normalized, classified into a document
//! type with extracted fields, and given a rule-based decision.

pub mod analyzer;
pub mod artifact;
pub mod config;
pub mod decision;
pub mod document;
pub mod engine;
pub mod engines;
pub mod error;
pub mod extraction;
pub mod normalizer;
pub mod outcome;
pub mod pipeline;
pub mod preprocessing;
pub mod resolver;
pub mod server;
pub mod uploads;
