//! Rule-driven field extraction.

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::normalize::{collapse_whitespace, replace_private_use};
use crate::error::ConfigError;
use crate::models::rules::{DocumentRules, RuleSet};

/// Which view of the text a rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPass {
    /// The text as acquired, with line anchors.
    Raw,
    /// The text with every whitespace run collapsed to one space.
    Normalized,
}

/// Outcome of applying one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMatch {
    Matched { value: String, pass: MatchPass },
    /// The pattern matched but no group produced a value.
    EmptyCapture { pass: MatchPass },
    NoMatch,
}

impl FieldMatch {
    /// Value written to the record.
    pub fn value(&self) -> &str {
        match self {
            FieldMatch::Matched { value, .. } => value,
            _ => "",
        }
    }
}

/// A field rule compiled for both passes.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    raw: Regex,
    normalized: Regex,
}

impl CompiledRule {
    pub fn compile(name: &str, pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |e: regex::Error| ConfigError::InvalidPattern {
            field: name.to_string(),
            reason: e.to_string(),
        };
        let raw = RegexBuilder::new(pattern)
            .multi_line(true)
            .build()
            .map_err(invalid)?;
        let normalized = Regex::new(pattern).map_err(invalid)?;
        Ok(Self {
            name: name.to_string(),
            raw,
            normalized,
        })
    }

    /// Match against the raw text, then the normalized text if the raw pass found nothing.
    pub fn apply(&self, raw_text: &str, normalized_text: &str) -> FieldMatch {
        let (captures, pass) = match self.raw.captures(raw_text) {
            Some(caps) => (caps, MatchPass::Raw),
            None => match self.normalized.captures(normalized_text) {
                Some(caps) => (caps, MatchPass::Normalized),
                None => return FieldMatch::NoMatch,
            },
        };

        // First participating group wins, even when it trims to nothing.
        let value = captures
            .iter()
            .skip(1)
            .flatten()
            .next()
            .map(|group| group.as_str().trim())
            .unwrap_or("");

        if value.is_empty() {
            FieldMatch::EmptyCapture { pass }
        } else {
            FieldMatch::Matched {
                value: replace_private_use(value),
                pass,
            }
        }
    }
}

/// Applies the rule table of one document type.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    document_type: String,
    rules: Vec<CompiledRule>,
}

impl FieldExtractor {
    /// Compile the rules of a document type.
    pub fn from_rules(document_type: &str, rules: &DocumentRules) -> Result<Self, ConfigError> {
        let rules = rules
            .fields
            .iter()
            .map(|rule| CompiledRule::compile(&rule.name, &rule.pattern))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Compiled {} rules for '{}'", rules.len(), document_type);
        Ok(Self {
            document_type: document_type.to_string(),
            rules,
        })
    }

    /// Compile from a rule set; an unknown type yields an extractor with no rules.
    pub fn from_rule_set(document_type: &str, rule_set: &RuleSet) -> Result<Self, ConfigError> {
        match rule_set.for_type(document_type) {
            Ok(rules) => Self::from_rules(document_type, rules),
            Err(_) => {
                warn!("No field rules configured for '{}'", document_type);
                Ok(Self {
                    document_type: document_type.to_string(),
                    rules: Vec::new(),
                })
            }
        }
    }

    pub fn document_type(&self) -> &str {
        &self.document_type
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Apply every rule, returning each outcome in rule order.
    pub fn match_all(&self, text: &str) -> Vec<(&str, FieldMatch)> {
        let normalized = collapse_whitespace(text);
        self.rules
            .iter()
            .map(|rule| {
                let outcome = rule.apply(text, &normalized);
                match &outcome {
                    FieldMatch::Matched { value, pass } => {
                        debug!("{}: '{}' ({:?} pass)", rule.name, value, pass)
                    }
                    FieldMatch::EmptyCapture { pass } => {
                        debug!("{}: matched with empty capture ({:?} pass)", rule.name, pass)
                    }
                    FieldMatch::NoMatch => debug!("{}: no match", rule.name),
                }
                (rule.name.as_str(), outcome)
            })
            .collect()
    }

    /// Extract a record with one entry per rule.
    pub fn extract(&self, text: &str) -> Map<String, Value> {
        self.match_all(text)
            .into_iter()
            .map(|(name, outcome)| (name.to_string(), Value::String(outcome.value().to_string())))
            .collect()
    }
}
