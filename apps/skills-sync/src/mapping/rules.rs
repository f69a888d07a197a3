use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{ConfigError, RecordError};
use crate::mapping::values::{is_null_like, parse_flag, split_tags};
use crate::mapping::{FieldValue, SourceRow};

/// Mapping shipped with the binary for the engineering skills survey.
const SKILLS_SURVEY_MAPPING: &str = include_str!("../../config/column_mapping.json");

/// Deployment-specific column → field mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    pub identifier_column: String,
    /// Human-readable column used only in log lines (e.g. the employee name).
    #[serde(default)]
    pub display_column: Option<String>,
    pub rules: Vec<ColumnRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnRule {
    /// Delimiter-separated list in a single cell.
    Tags {
        column: String,
        field: String,
        #[serde(default = "default_delimiter")]
        delimiter: char,
    },
    /// Yes/No cell.
    Flag { column: String, field: String },
    /// Free text copied as-is.
    Text { column: String, field: String },
    /// Bucketed answer translated through a lookup table.
    Enum {
        column: String,
        field: String,
        values: BTreeMap<String, i64>,
    },
    /// One Yes/No column per option; the header of every "Yes" becomes a tag.
    HeaderFlags { columns: Vec<String>, field: String },
    /// One proficiency column per option; qualifying levels become "<header> (Level n)".
    HeaderLevels {
        columns: Vec<String>,
        field: String,
        levels: Vec<String>,
    },
    /// An "Other ..." free-text column contributing a single tag.
    FreeTags { column: String, field: String },
}

fn default_delimiter() -> char {
    ','
}

impl ColumnRule {
    pub fn field(&self) -> &str {
        match self {
            ColumnRule::Tags { field, .. }
            | ColumnRule::Flag { field, .. }
            | ColumnRule::Text { field, .. }
            | ColumnRule::Enum { field, .. }
            | ColumnRule::HeaderFlags { field, .. }
            | ColumnRule::HeaderLevels { field, .. }
            | ColumnRule::FreeTags { field, .. } => field,
        }
    }

    pub fn columns(&self) -> Vec<&str> {
        match self {
            ColumnRule::Tags { column, .. }
            | ColumnRule::Flag { column, .. }
            | ColumnRule::Text { column, .. }
            | ColumnRule::Enum { column, .. }
            | ColumnRule::FreeTags { column, .. } => vec![column.as_str()],
            ColumnRule::HeaderFlags { columns, .. } | ColumnRule::HeaderLevels { columns, .. } => {
                columns.iter().map(String::as_str).collect()
            }
        }
    }

    pub fn produces_tags(&self) -> bool {
        matches!(
            self,
            ColumnRule::Tags { .. }
                | ColumnRule::HeaderFlags { .. }
                | ColumnRule::HeaderLevels { .. }
                | ColumnRule::FreeTags { .. }
        )
    }

    /// Transforms the relevant cells of `row`. `Ok(None)` leaves the field out.
    ///
    /// Columns absent from the row are ignored; the mapper only hands a rule
    /// rows whose header carries at least one of its columns.
    pub fn apply(&self, row: &SourceRow) -> Result<Option<FieldValue>, RecordError> {
        match self {
            ColumnRule::Tags {
                column, delimiter, ..
            } => Ok(row
                .get(column)
                .map(|cell| FieldValue::Tags(split_tags(cell, *delimiter)))),

            ColumnRule::Flag { column, .. } => match row.get(column) {
                None => Ok(None),
                Some(cell) => parse_flag(cell)
                    .map(|flag| Some(FieldValue::Flag(flag)))
                    .ok_or_else(|| RecordError::InvalidValue {
                        column: column.clone(),
                        value: cell.trim().to_string(),
                        expected: "Yes or No".to_string(),
                    }),
            },

            ColumnRule::Text { column, .. } => Ok(row.get(column).map(|cell| {
                if is_null_like(cell) {
                    FieldValue::Text(String::new())
                } else {
                    FieldValue::Text(cell.trim().to_string())
                }
            })),

            // An unlisted answer drops only this field; the rest of the row is still sent.
            ColumnRule::Enum {
                column,
                field,
                values,
            } => match row.get(column) {
                None => Ok(None),
                Some(cell) if is_null_like(cell) => Ok(None),
                Some(cell) => match values.get(cell.trim()) {
                    Some(n) => Ok(Some(FieldValue::Number(*n))),
                    None => {
                        warn!(
                            "Line {}: '{}' is not a known {} answer; '{}' will not be sent",
                            row.line(),
                            cell.trim(),
                            column,
                            field
                        );
                        Ok(None)
                    }
                },
            },

            ColumnRule::HeaderFlags { columns, .. } => {
                let tags: BTreeSet<String> = columns
                    .iter()
                    .filter(|col| {
                        row.get(col)
                            .is_some_and(|cell| cell.trim().eq_ignore_ascii_case("yes"))
                    })
                    .cloned()
                    .collect();
                Ok(Some(FieldValue::Tags(tags)))
            }

            ColumnRule::HeaderLevels {
                columns, levels, ..
            } => {
                let tags: BTreeSet<String> = columns
                    .iter()
                    .filter_map(|col| {
                        let level = row.get(col)?.trim();
                        levels
                            .iter()
                            .any(|l| l == level)
                            .then(|| format!("{col} (Level {level})"))
                    })
                    .collect();
                Ok(Some(FieldValue::Tags(tags)))
            }

            ColumnRule::FreeTags { column, .. } => Ok(row.get(column).map(|cell| {
                let mut tags = BTreeSet::new();
                if !is_null_like(cell) {
                    tags.insert(cell.trim().to_string());
                }
                FieldValue::Tags(tags)
            })),
        }
    }
}

impl MappingConfig {
    /// The built-in skills survey mapping.
    pub fn skills_survey() -> Result<Self, ConfigError> {
        Self::from_json(SKILLS_SURVEY_MAPPING)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: MappingConfig =
            serde_json::from_str(raw).map_err(|e| ConfigError::Mapping(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::MappingFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Loads `path` when given, otherwise falls back to the built-in mapping.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::skills_survey(),
        }
    }

    /// Rejects mappings that could not produce a well-formed update.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identifier_column.trim().is_empty() {
            return Err(ConfigError::Mapping(
                "identifier_column must not be empty".into(),
            ));
        }

        // field -> (produces tags, rule count)
        let mut fields: BTreeMap<&str, (bool, usize)> = BTreeMap::new();
        for rule in &self.rules {
            if rule.field().trim().is_empty() {
                return Err(ConfigError::Mapping("rule with empty field name".into()));
            }
            if rule.columns().iter().any(|c| c.trim().is_empty()) || rule.columns().is_empty() {
                return Err(ConfigError::Mapping(format!(
                    "rule for field '{}' names no usable column",
                    rule.field()
                )));
            }
            if let ColumnRule::HeaderLevels { levels, field, .. } = rule {
                if levels.is_empty() {
                    return Err(ConfigError::Mapping(format!(
                        "header_levels rule for '{field}' lists no levels"
                    )));
                }
            }

            let entry = fields
                .entry(rule.field())
                .or_insert((rule.produces_tags(), 0));
            if entry.0 != rule.produces_tags() {
                return Err(ConfigError::Mapping(format!(
                    "field '{}' mixes tag and scalar rules",
                    rule.field()
                )));
            }
            entry.1 += 1;
            if !entry.0 && entry.1 > 1 {
                return Err(ConfigError::Mapping(format!(
                    "scalar field '{}' is targeted by more than one rule",
                    rule.field()
                )));
            }
        }
        Ok(())
    }
}
