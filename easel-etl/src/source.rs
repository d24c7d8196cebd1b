//! Raw record sources
//!
//! Reads delimited tables into header-keyed string maps and the free-text
//! date source into lines. No interpretation of values happens here.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{EtlError, EtlResult};

/// One table row: column name -> cell text
pub type RawRecord = BTreeMap<String, String>;

/// Parsed delimited table
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<RawRecord>,
    /// Rows the CSV reader could not decode, as `(row number, error)`
    pub unreadable: Vec<(usize, String)>,
}

impl Table {
    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// Fail with [`EtlError::MissingColumn`] unless every column is present
    pub fn require_columns<'a>(
        &self,
        path: &Path,
        columns: impl IntoIterator<Item = &'a str>,
    ) -> EtlResult<()> {
        for column in columns {
            if !self.has_column(column) {
                return Err(EtlError::MissingColumn {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Read a CSV file with a header row
pub fn read_table(path: &Path) -> EtlResult<Table> {
    let file = File::open(path).map_err(|source| EtlError::Source {
        path: path.to_path_buf(),
        source,
    })?;

    let table = parse_table(file).map_err(|source| EtlError::Csv {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(
        path = %path.display(),
        rows = table.rows.len(),
        unreadable = table.unreadable.len(),
        "Read table"
    );

    Ok(table)
}

/// Parse CSV from any reader
///
/// Only a bad header fails the whole table. Rows that cannot be decoded are
/// collected in [`Table::unreadable`]; short rows simply lack the missing
/// columns; blank lines are skipped.
pub fn parse_table<R: Read>(reader: R) -> Result<Table, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut table = Table {
        headers,
        ..Table::default()
    };

    for (i, result) in rdr.records().enumerate() {
        // Row 1 is the header
        let row_number = i + 2;
        match result {
            Ok(record) => {
                let row: RawRecord = table
                    .headers
                    .iter()
                    .zip(record.iter())
                    .map(|(h, v)| (h.clone(), v.to_string()))
                    .collect();
                table.rows.push(row);
            }
            Err(e) => table.unreadable.push((row_number, e.to_string())),
        }
    }

    Ok(table)
}

/// Read a text file as lines (line endings stripped)
pub fn read_lines(path: &Path) -> EtlResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|source| EtlError::Source {
        path: PathBuf::from(path),
        source,
    })?;

    Ok(content.lines().map(str::to_string).collect())
}
