//! CSV table loader
//!
//! Parses uploaded CSV bytes into a typed [`Table`]. Malformed input is
//! reported through the csv crate's own error messages.

use crate::schema::{infer_kind, InferenceConfig};
use ahash::AHashSet;
use csv::{ReaderBuilder, Trim};
use csvsense_core::value::is_null;
use csvsense_core::{Column, Error, Result, Table};
use std::path::Path;
use tracing::{debug, info};

/// CSV loader with kind inference
#[derive(Debug, Clone)]
pub struct TableLoader {
    /// Delimiter character (default: comma)
    delimiter: u8,

    /// Whether to trim whitespace from headers and values
    trim: bool,

    inference: InferenceConfig,
}

impl Default for TableLoader {
    fn default() -> Self {
        Self {
            delimiter: b',',
            trim: true,
            inference: InferenceConfig::default(),
        }
    }
}

impl TableLoader {
    pub fn new(inference: InferenceConfig) -> Self {
        Self {
            inference,
            ..Self::default()
        }
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set whether to trim whitespace
    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn inference(&self) -> &InferenceConfig {
        &self.inference
    }

    /// Read a CSV file from disk
    pub fn load_path(&self, path: &Path) -> Result<Table> {
        let bytes = std::fs::read(path)?;
        self.load_bytes(&bytes)
    }

    /// Parse CSV bytes. The first record is the header.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<Table> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(if self.trim { Trim::All } else { Trim::None })
            .flexible(false)
            .from_reader(bytes);

        let headers = reader
            .byte_headers()
            .map_err(|e| Error::Parse(format!("failed to read CSV headers: {}", e)))?
            .iter()
            .map(|h| String::from_utf8_lossy(h).into_owned())
            .collect::<Vec<_>>();

        if headers.is_empty() {
            return Err(Error::EmptyTable);
        }
        let names = unique_names(&headers);

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
        for result in reader.byte_records() {
            let record = result.map_err(|e| Error::Parse(e.to_string()))?;
            for (idx, field) in record.iter().enumerate() {
                let value = String::from_utf8_lossy(field);
                let cell = if is_null(&value) {
                    None
                } else {
                    Some(value.into_owned())
                };
                cells[idx].push(cell);
            }
        }

        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, values)| {
                let kind = infer_kind(&values, &self.inference);
                debug!(column = %name, %kind, "Inferred column kind");
                Column::new(name, kind, values)
            })
            .collect();

        let table = Table::new(columns)?;
        info!(
            table = %table.id(),
            rows = table.row_count(),
            columns = table.column_count(),
            "Loaded table"
        );
        Ok(table)
    }
}

/// Blank headers become `Unnamed: {i}`, repeats get a `.{n}` suffix
fn unique_names(headers: &[String]) -> Vec<String> {
    let mut seen = AHashSet::new();
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let base = if header.trim().is_empty() {
                format!("Unnamed: {}", i)
            } else {
                header.clone()
            };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}
