//! In-memory table read from CSV and written as CSV or XLSX.

use super::mask::mask_product_number;
use super::order::compare_ids;
use super::TransformError;
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

/// Header row plus data rows. Empty or absent fields are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Numbers that survive a round trip through an XLSX number cell.
fn as_number(value: &str) -> Option<f64> {
    let value = value.trim();
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    // Only plain decimals; "+5", "1e5" and "-0" would not read back as typed
    if unsigned.is_empty()
        || !unsigned.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        || (unsigned == "0" && unsigned.len() != value.len())
    {
        return None;
    }
    let digits = unsigned.bytes().filter(u8::is_ascii_digit).count();
    // Leading zeros and long ids would be lost
    if digits > 15 || (unsigned.len() > 1 && unsigned.starts_with('0') && !unsigned.starts_with("0.")) {
        return None;
    }
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl Table {
    pub fn read_csv(path: &Path, delimiter: u8) -> Result<Self, TransformError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                h.trim().to_string()
            })
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row = (0..headers.len())
                .map(|i| record.get(i).filter(|v| !v.is_empty()).map(str::to_string))
                .collect();
            rows.push(row);
        }

        tracing::debug!("Read {} rows, {} columns from {}", rows.len(), headers.len(), path.display());
        Ok(Self { headers, rows })
    }

    pub fn column_index(&self, column: &str) -> Result<usize, TransformError> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| TransformError::MissingColumn {
                column: column.to_string(),
            })
    }

    /// New table with only `columns`, in the given order.
    pub fn project(&self, columns: &[String]) -> Result<Table, TransformError> {
        let indices = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>, _>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Table {
            headers: columns.to_vec(),
            rows,
        })
    }

    pub fn mask_column(&mut self, column: &str) -> Result<(), TransformError> {
        let idx = self.column_index(column)?;
        for row in &mut self.rows {
            let masked = mask_product_number(row[idx].as_deref());
            row[idx] = Some(masked).filter(|m| !m.is_empty());
        }
        Ok(())
    }

    /// Stable ascending sort by id.
    pub fn sort_by_column(&mut self, column: &str) -> Result<(), TransformError> {
        let idx = self.column_index(column)?;
        self.rows
            .sort_by(|a, b| compare_ids(a[idx].as_deref(), b[idx].as_deref()));
        Ok(())
    }

    /// Write to `path`: `.csv` as CSV, anything else as XLSX.
    ///
    /// `text_columns` are always written as strings in XLSX.
    pub fn save(&self, path: &Path, text_columns: &[&str]) -> Result<(), TransformError> {
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        if is_csv {
            self.write_csv(path)
        } else {
            self.write_xlsx(path, text_columns)
        }
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), TransformError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|v| v.as_deref().unwrap_or("")))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_xlsx(&self, path: &Path, text_columns: &[&str]) -> Result<(), TransformError> {
        let text: Vec<bool> = self
            .headers
            .iter()
            .map(|h| text_columns.contains(&h.as_str()))
            .collect();

        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let worksheet = workbook.add_worksheet();

        for (col, header) in self.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
        }

        for (r, row) in self.rows.iter().enumerate() {
            let row_num = r as u32 + 1;
            for (col, value) in row.iter().enumerate() {
                let Some(value) = value else { continue };
                match as_number(value).filter(|_| !text[col]) {
                    Some(n) => worksheet.write_number(row_num, col as u16, n)?,
                    None => worksheet.write_string(row_num, col as u16, value)?,
                };
            }
        }

        workbook.save(path)?;
        Ok(())
    }
}
