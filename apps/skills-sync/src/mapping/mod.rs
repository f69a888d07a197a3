//! Row mapper: turns the survey CSV into per-candidate field updates.
//!
//! The mapping itself is configuration (`MappingConfig`); this module only
//! knows how to read a header, resolve which rules apply to it, and run those
//! rules over each data row lazily.

pub mod mapper;
pub mod rules;
pub mod values;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Serialize, Serializer};

use crate::summary::RecordFailure;

pub use mapper::RowMapper;
pub use rules::{ColumnRule, MappingConfig};

/// One CSV data line keyed by normalized header name.
#[derive(Debug, Clone)]
pub struct SourceRow {
    line: u64,
    cells: HashMap<String, String>,
}

impl SourceRow {
    pub fn new(line: u64, cells: HashMap<String, String>) -> Self {
        Self { line, cells }
    }

    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }
}

/// A transformed value ready to send to the target system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
    Number(i64),
    Tags(BTreeSet<String>),
}

impl FieldValue {
    /// Folds `other` into `self` when both are tag sets; scalar values are replaced.
    fn merge(&mut self, other: FieldValue) {
        match (self, other) {
            (FieldValue::Tags(existing), FieldValue::Tags(more)) => existing.extend(more),
            (slot, other) => *slot = other,
        }
    }
}

// Bullhorn stores multi-value skills as comma separated text blocks.
impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Flag(b) => serializer.serialize_bool(*b),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Number(n) => serializer.serialize_i64(*n),
            FieldValue::Tags(tags) => {
                serializer.serialize_str(&tags.iter().cloned().collect::<Vec<_>>().join(", "))
            }
        }
    }
}

/// Field changes for one existing candidate, addressed by its identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateUpdate {
    pub identifier: String,
    /// Log label, typically the employee name. Never sent to the target.
    #[serde(skip)]
    pub display: Option<String>,
    #[serde(skip)]
    pub line: u64,
    pub fields: BTreeMap<String, FieldValue>,
}

impl CandidateUpdate {
    pub fn new(identifier: impl Into<String>, line: u64) -> Self {
        Self {
            identifier: identifier.into(),
            display: None,
            line,
            fields: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, field: &str, value: FieldValue) {
        match self.fields.get_mut(field) {
            Some(existing) => existing.merge(value),
            None => {
                self.fields.insert(field.to_string(), value);
            }
        }
    }

    pub fn label(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.identifier)
    }
}

/// Result of mapping a single data row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Mapped(CandidateUpdate),
    /// No identifier on the row; counted and reported, not an error.
    Skipped { line: u64, display: Option<String> },
    Invalid(RecordFailure),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_serialize_as_joined_text() {
        let mut update = CandidateUpdate::new("001", 2);
        update.set(
            "domains",
            FieldValue::Tags(["Z", "X"].iter().map(|s| s.to_string()).collect()),
        );
        update.set(
            "domains",
            FieldValue::Tags(["Y"].iter().map(|s| s.to_string()).collect()),
        );
        update.set("skills", FieldValue::Flag(false));
        update.set("years", FieldValue::Number(3));

        let body = serde_json::to_value(&update.fields).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"domains": "X, Y, Z", "skills": false, "years": 3})
        );
    }

    #[test]
    fn test_label_falls_back_to_identifier() {
        let mut update = CandidateUpdate::new("42", 3);
        assert_eq!(update.label(), "42");
        update.display = Some("Ada Lovelace".into());
        assert_eq!(update.label(), "Ada Lovelace");
    }
}
