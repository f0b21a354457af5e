//! Response parsing — turns free-form oracle text into triage signals.
//!
//! The default `KeywordParser` is deliberately literal: it looks for the
//! markers it asked the model to emit and nothing else. Case variations
//! ("spam.", "Legitimate") are not recognised.
//!
//! Pure string matching — no LLM calls.

use crate::pipeline::types::{Category, Classification};

/// Marker the classification prompt asks for on spam.
pub const SPAM_MARKER: &str = "SPAM";
/// Marker the classification prompt asks for on legitimate mail.
pub const LEGITIMATE_MARKER: &str = "LEGITIMATE";
/// Reason markers, checked in order.
const REASON_MARKERS: [&str; 2] = ["reason:", "Reason:"];

/// Extracts structured signals from oracle responses.
///
/// Swap this out to support a structured-output oracle without touching
/// the workflow engine.
pub trait ResponseParser: Send + Sync {
    fn parse_classification(&self, text: &str) -> Classification;

    fn parse_draft(&self, text: &str) -> String;
}

/// Substring-based parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordParser;

impl ResponseParser for KeywordParser {
    fn parse_classification(&self, text: &str) -> Classification {
        parse_classification(text)
    }

    fn parse_draft(&self, text: &str) -> String {
        parse_draft(text)
    }
}

/// Classify a response.
///
/// Spam iff `SPAM` is present and `LEGITIMATE` is not; anything else,
/// including a response with neither marker, counts as legitimate.
pub fn parse_classification(text: &str) -> Classification {
    let is_spam = text.contains(SPAM_MARKER) && !text.contains(LEGITIMATE_MARKER);

    if is_spam {
        Classification {
            is_spam,
            reason: extract_reason(text),
            category: None,
        }
    } else {
        Classification {
            is_spam,
            reason: None,
            category: extract_category(text),
        }
    }
}

/// The drafting response is used verbatim.
pub fn parse_draft(text: &str) -> String {
    text.to_string()
}

/// Text after the first reason marker up to the end of that line.
fn extract_reason(text: &str) -> Option<String> {
    let (start, marker) = REASON_MARKERS
        .iter()
        .find_map(|m| text.find(m).map(|idx| (idx, *m)))?;

    let rest = &text[start + marker.len()..];
    let line = rest.split('\n').next().unwrap_or_default().trim();

    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

/// First category, in priority order, whose label occurs in the text.
fn extract_category(text: &str) -> Option<Category> {
    Category::ALL
        .into_iter()
        .find(|c| text.contains(c.label()))
}
