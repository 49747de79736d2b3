//! Lookup module - customer records in the sorted extract.
//!
//! The extract written by the transform is sorted by identification
//! number, so lookups are a binary search over the loaded rows.

use crate::config::LookupConfig;
use crate::transform::{compare_ids, Table, TransformError};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

/// Rows checked for ordering when loading.
const SORT_CHECK_ROWS: usize = 1000;

/// Shortest fragment that produces suggestions.
pub const MIN_FRAGMENT_LEN: usize = 3;

pub const DEFAULT_SUGGESTIONS: usize = 5;

/// One obligation row: every column except the customer fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obligation {
    pub fields: Vec<(String, Option<String>)>,
}

impl Obligation {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| value.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub id: String,
    pub holder_name: Option<String>,
    pub collector: Option<String>,
    pub obligations: Vec<Obligation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub id: String,
    pub holder_name: Option<String>,
    pub collector: Option<String>,
}

pub struct RecordIndex {
    table: Table,
    id_idx: usize,
    name_idx: usize,
    collector_idx: Option<usize>,
}

impl RecordIndex {
    /// Load a comma separated extract.
    pub fn load(path: &Path, config: &LookupConfig) -> Result<Self, TransformError> {
        let table = Table::read_csv(path, b',')?;
        let index = Self::from_table(table, config)?;
        tracing::info!("Loaded {} records from {}", index.len(), path.display());
        Ok(index)
    }

    pub fn from_table(mut table: Table, config: &LookupConfig) -> Result<Self, TransformError> {
        let id_idx = table.column_index(&config.id_column)?;
        let name_idx = table.column_index(&config.name_column)?;
        let collector_idx = table.column_index(&config.collector_column).ok();
        if collector_idx.is_none() {
            tracing::warn!("Column '{}' not found, collector left empty", config.collector_column);
        }

        table
            .rows
            .retain(|row| row[id_idx].as_deref().is_some_and(|v| !v.trim().is_empty()));

        let by_id = |a: &Vec<Option<String>>, b: &Vec<Option<String>>| {
            compare_ids(a[id_idx].as_deref(), b[id_idx].as_deref())
        };
        let head = &table.rows[..table.rows.len().min(SORT_CHECK_ROWS)];
        if head.windows(2).any(|w| by_id(&w[0], &w[1]) == Ordering::Greater) {
            tracing::warn!("Extract is not sorted by '{}', sorting in memory", config.id_column);
            table.rows.sort_by(by_id);
        }

        Ok(Self {
            table,
            id_idx,
            name_idx,
            collector_idx,
        })
    }

    pub fn len(&self) -> usize {
        self.table.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.rows.is_empty()
    }

    /// All rows whose id is exactly `id` (after trimming).
    ///
    /// The numeric order only locates the candidate range: "00042" and
    /// "42" sort together but are different customers.
    pub fn find(&self, id: &str) -> Vec<&Vec<Option<String>>> {
        let id = id.trim();
        if id.is_empty() {
            return Vec::new();
        }
        let rows = &self.table.rows;
        let key = |row: &Vec<Option<String>>| compare_ids(row[self.id_idx].as_deref(), Some(id));

        let start = rows.partition_point(|row| key(row) == Ordering::Less);
        let end = start + rows[start..].partition_point(|row| key(row) == Ordering::Equal);
        rows[start..end]
            .iter()
            .filter(|row| row[self.id_idx].as_deref().map(str::trim) == Some(id))
            .collect()
    }

    pub fn customer(&self, id: &str) -> Option<CustomerRecord> {
        let rows = self.find(id);
        let first = *rows.first()?;

        let obligations = rows
            .iter()
            .map(|row| Obligation {
                fields: self
                    .table
                    .headers
                    .iter()
                    .zip(row.iter())
                    .enumerate()
                    .filter(|(i, _)| !self.is_customer_column(*i))
                    .map(|(_, (name, value))| (name.clone(), value.clone()))
                    .collect(),
            })
            .collect();

        Some(CustomerRecord {
            id: id.trim().to_string(),
            holder_name: first[self.name_idx].clone(),
            collector: self.collector(first),
            obligations,
        })
    }

    /// Up to `limit` distinct ids starting with `fragment`.
    pub fn suggest(&self, fragment: &str, limit: usize) -> Vec<Suggestion> {
        let fragment = fragment.trim();
        if fragment.chars().count() < MIN_FRAGMENT_LEN {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut suggestions = Vec::new();
        for row in &self.table.rows {
            if suggestions.len() >= limit {
                break;
            }
            let Some(id) = row[self.id_idx].as_deref().map(str::trim) else {
                continue;
            };
            if id.starts_with(fragment) && seen.insert(id) {
                suggestions.push(Suggestion {
                    id: id.to_string(),
                    holder_name: row[self.name_idx].clone(),
                    collector: self.collector(row),
                });
            }
        }
        suggestions
    }

    fn collector(&self, row: &[Option<String>]) -> Option<String> {
        self.collector_idx.and_then(|i| row[i].clone())
    }

    fn is_customer_column(&self, idx: usize) -> bool {
        idx == self.id_idx || idx == self.name_idx || Some(idx) == self.collector_idx
    }
}
