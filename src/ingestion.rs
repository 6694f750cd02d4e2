use crate::error::{Result, VarianceError};
use crate::schema::ColumnMapping;
use calamine::{open_workbook_auto, Data, Reader};
use csv::{ReaderBuilder, Trim};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// An uploaded table, kept as text exactly as read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// The three cells of one row that the pipeline cares about, still unparsed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLineItem {
    pub account_name: String,
    pub current: String,
    pub prior: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub account: usize,
    pub current: usize,
    pub prior: usize,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }

        debug!(
            "Read table with {} columns and {} rows",
            headers.len(),
            rows.len()
        );

        Ok(Self { headers, rows })
    }

    /// Reads the first worksheet of an `.xlsx`, `.xlsm`, `.xls` or `.ods`
    /// workbook. The first row is the header; every cell is kept as text.
    pub fn from_workbook(path: impl AsRef<Path>) -> Result<Self> {
        let mut workbook = open_workbook_auto(path.as_ref())?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(VarianceError::EmptyWorkbook)??;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect::<Vec<String>>());
        let headers: Vec<String> = rows
            .next()
            .map(|header| header.iter().map(|h| h.trim().to_string()).collect())
            .unwrap_or_default();
        let rows: Vec<Vec<String>> = rows.collect();

        debug!(
            "Read worksheet with {} columns and {} rows",
            headers.len(),
            rows.len()
        );

        Ok(Self { headers, rows })
    }

    /// Reads a workbook or a delimited file, chosen by extension. `.tsv` and
    /// `.tab` files are tab separated, `.ssv` semicolon separated, other text
    /// files comma separated.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if is_workbook(path) {
            return Self::from_workbook(path);
        }

        let delimiter = delimiter_for_path(path);
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, delimiter)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| VarianceError::MissingColumn {
                column: name.to_string(),
                available: self.headers.join(", "),
            })
    }

    pub fn resolve(&self, mapping: &ColumnMapping) -> Result<ResolvedColumns> {
        if self.headers.len() < 3 {
            return Err(VarianceError::TooFewColumns(self.headers.len()));
        }

        let columns = ResolvedColumns {
            account: self.column_index(&mapping.account)?,
            current: self.column_index(&mapping.current)?,
            prior: self.column_index(&mapping.prior)?,
        };

        let roles = [
            (&mapping.account, columns.account),
            (&mapping.current, columns.current),
            (&mapping.prior, columns.prior),
        ];
        for (i, (first, index)) in roles.iter().enumerate() {
            if let Some((second, _)) = roles[i + 1..].iter().find(|(_, other)| other == index) {
                return Err(VarianceError::AmbiguousColumns {
                    first: first.to_string(),
                    second: second.to_string(),
                    index: *index,
                });
            }
        }

        Ok(columns)
    }

    /// Mapping from the caller, or the first three columns if none was given.
    pub fn mapping_or_positional(&self, mapping: Option<&ColumnMapping>) -> Result<ColumnMapping> {
        match mapping {
            Some(mapping) => Ok(mapping.clone()),
            None => ColumnMapping::positional(&self.headers),
        }
    }

    pub fn extract(&self, mapping: &ColumnMapping) -> Result<Vec<RawLineItem>> {
        let columns = self.resolve(mapping)?;

        Ok(self
            .rows
            .iter()
            .map(|row| RawLineItem {
                account_name: cell(row, columns.account),
                current: cell(row, columns.current),
                prior: cell(row, columns.prior),
            })
            .collect())
    }
}

fn cell(row: &[String], idx: usize) -> String {
    row.get(idx).cloned().unwrap_or_default()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn is_workbook(path: &Path) -> bool {
    matches!(
        extension(path).as_deref(),
        Some("xlsx") | Some("xlsm") | Some("xlsb") | Some("xls") | Some("ods")
    )
}

fn delimiter_for_path(path: &Path) -> u8 {
    match extension(path).as_deref() {
        Some("tsv") | Some("tab") => b'\t',
        Some("ssv") => b';',
        _ => b',',
    }
}
