use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecordsIntoIter};
use tracing::debug;

use crate::errors::{RecordError, SchemaError};
use crate::mapping::values::{is_null_like, normalize_header};
use crate::mapping::{CandidateUpdate, ColumnRule, MappingConfig, RowOutcome, SourceRow};
use crate::summary::RecordFailure;

/// Applies a `MappingConfig` to raw CSV bytes.
#[derive(Debug, Clone)]
pub struct RowMapper {
    config: MappingConfig,
}

impl RowMapper {
    pub fn new(config: MappingConfig) -> Self {
        Self { config }
    }

    /// Reads and checks the header row, then returns a lazy iterator over the
    /// data rows. Fails before yielding anything if the identifier column is
    /// missing.
    pub fn map<'a>(&'a self, data: &'a [u8]) -> Result<MappedRows<'a>, SchemaError> {
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(data);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| SchemaError::Malformed(e.to_string()))?
            .iter()
            .map(normalize_header)
            .collect();

        let identifier_column = self.config.identifier_column.trim();
        if !headers.iter().any(|h| h == identifier_column) {
            return Err(SchemaError::MissingIdentifier {
                column: identifier_column.to_string(),
            });
        }

        let (active, inactive): (Vec<&ColumnRule>, Vec<&ColumnRule>) =
            self.config.rules.iter().partition(|rule| {
                rule.columns()
                    .iter()
                    .any(|column| headers.iter().any(|h| h == column))
            });
        for rule in &inactive {
            debug!(
                "No column of rule for field '{}' in header; field will not be sent",
                rule.field()
            );
        }
        debug!(
            "Header has {} columns, {} of {} rules active",
            headers.len(),
            active.len(),
            self.config.rules.len()
        );

        Ok(MappedRows {
            config: &self.config,
            headers,
            active,
            records: reader.into_records(),
        })
    }
}

/// Lazy, single-pass sequence of mapped rows.
pub struct MappedRows<'a> {
    config: &'a MappingConfig,
    headers: Vec<String>,
    active: Vec<&'a ColumnRule>,
    records: StringRecordsIntoIter<&'a [u8]>,
}

impl MappedRows<'_> {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn map_row(&self, row: &SourceRow) -> RowOutcome {
        let display = self
            .config
            .display_column
            .as_deref()
            .and_then(|column| row.get(column))
            .filter(|value| !is_null_like(value))
            .map(|value| value.trim().to_string());

        let identifier = row
            .get(self.config.identifier_column.trim())
            .map(str::trim)
            .unwrap_or_default();
        if is_null_like(identifier) {
            return RowOutcome::Skipped {
                line: row.line(),
                display,
            };
        }

        let mut update = CandidateUpdate::new(identifier, row.line());
        update.display = display;
        for rule in &self.active {
            match rule.apply(row) {
                Ok(Some(value)) => update.set(rule.field(), value),
                Ok(None) => {}
                Err(e) => {
                    return RowOutcome::Invalid(RecordFailure::new(
                        row.line(),
                        Some(update.identifier),
                        &e,
                    ))
                }
            }
        }
        RowOutcome::Mapped(update)
    }
}

impl Iterator for MappedRows<'_> {
    type Item = RowOutcome;

    fn next(&mut self) -> Option<RowOutcome> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                return Some(RowOutcome::Invalid(RecordFailure::new(
                    line,
                    None,
                    &RecordError::Malformed(e.to_string()),
                )));
            }
        };

        let line = record.position().map_or(0, |p| p.line());
        // Short rows are padded so every header resolves to a cell.
        let cells: HashMap<String, String> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();

        Some(self.map_row(&SourceRow::new(line, cells)))
    }
}
