//! # Tabular output of a hit batch
//!
//! Flattens enriched hits into rows (one row per hit, one column per distinct field ever
//! seen across the batch) and writes them with the `csv` crate.
//!
//! ## Overview
//! -----------------
//! - [`gen_csv_header`] computes the ordered union of all field names, in first-seen order.
//! - [`ColumnFilter`] drops columns by exact name or by regular expression, e.g. the large
//!   base64 payloads or the whole `image_brighter_count_<threshold>` family.
//! - [`write_to_csv`] writes the header and one row per hit; a hit lacking a column gets an
//!   empty cell.
//!
//! Values are rendered as plain text for strings and as compact JSON otherwise
//! (`crop_size` becomes `[w,h]`).
use std::collections::{HashMap, HashSet};
use std::io::Write;

use regex::Regex;
use serde_json::Value;

use crate::{hits::Hit, hitsieve_errors::HitSieveError};

/// Exclusion rules for output columns.
#[derive(Debug, Clone, Default)]
pub struct ColumnFilter {
    exclude: HashSet<String>,
    regex_exclude: Vec<Regex>,
}

impl ColumnFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude a column by its exact name.
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.exclude.insert(name.into());
        self
    }

    /// Exclude every column whose name matches `pattern` (anchored at both ends).
    pub fn exclude_regex(mut self, pattern: &str) -> Result<Self, HitSieveError> {
        self.regex_exclude
            .push(Regex::new(&format!("^(?:{pattern})$"))?);
        Ok(self)
    }

    /// `true` when the column survives every exclusion rule.
    pub fn keeps(&self, column: &str) -> bool {
        !self.exclude.contains(column) && !self.regex_exclude.iter().any(|r| r.is_match(column))
    }
}

/// Ordered union of the field names of `hits`, in first-seen order.
pub fn gen_csv_header(hits: &[Hit]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut header = Vec::new();
    for hit in hits {
        // names only, nothing is rendered
        hit.to_fields_where(|name| {
            if !seen.contains(name) {
                seen.insert(name.to_string());
                header.push(name.to_string());
            }
            false
        });
    }
    header
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Write `hits` as CSV.
///
/// Arguments
/// -----------------
/// * `output`: destination of the delimited text.
/// * `hits`: the enriched batch.
/// * `header`: full column list, usually from [`gen_csv_header`].
/// * `filter`: columns to drop from `header`.
///
/// Return
/// ----------
/// * The columns actually written, or a CSV/I/O error.
pub fn write_to_csv<W: Write>(
    output: W,
    hits: &[Hit],
    header: &[String],
    filter: &ColumnFilter,
) -> Result<Vec<String>, HitSieveError> {
    let columns: Vec<String> = header
        .iter()
        .filter(|c| filter.keeps(c))
        .cloned()
        .collect();

    let index: HashMap<&str, usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(&columns)?;
    let mut row = vec![String::new(); columns.len()];
    for hit in hits {
        row.iter_mut().for_each(String::clear);
        for (name, value) in hit.to_fields_where(|name| index.contains_key(name)) {
            if let Some(&i) = index.get(name.as_str()) {
                row[i] = render(&value);
            }
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(columns)
}
