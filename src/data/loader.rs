//! Dataset Loader Module
//! Reads the statewide text extracts into string-typed tables using Polars.
//!
//! Files are decoded as Latin-1, so stray non-UTF-8 bytes in school names
//! never fail a read. No value is coerced here; every cell is a string or null.

use crate::data::columns::ColumnMap;
use crate::data::fixed_width;
use crate::data::DatasetKind;
use crate::error::DataError;
use polars::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// A table this narrow means the delimiter did not match the file.
const MISPARSE_MAX_COLUMNS: usize = 2;

/// Field separator conventions used by the published files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Tab,
    Caret,
}

impl Delimiter {
    pub fn byte(self) -> u8 {
        match self {
            Delimiter::Tab => b'\t',
            Delimiter::Caret => b'^',
        }
    }
}

/// Decode ISO-8859-1: every byte maps to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// An ordered, string-typed table with a stable set of column names.
#[derive(Debug, Clone)]
pub struct RawTable {
    dataset: DatasetKind,
    df: DataFrame,
    positional: bool,
}

impl RawTable {
    /// Build a table from rows of optional strings. Short rows are padded
    /// with nulls and long rows truncated to the header width.
    pub fn from_rows(
        dataset: DatasetKind,
        headers: &[String],
        rows: &[Vec<Option<String>>],
    ) -> Result<Self, DataError> {
        let columns: Vec<Column> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let values: Vec<Option<String>> =
                    rows.iter().map(|row| row.get(idx).cloned().flatten()).collect();
                Column::new(name.as_str().into(), values)
            })
            .collect();

        let df = DataFrame::new(columns).map_err(|source| DataError::Csv { dataset, source })?;
        Ok(Self {
            dataset,
            df,
            positional: false,
        })
    }

    pub fn dataset(&self) -> DatasetKind {
        self.dataset
    }

    /// True when the file had no header row and columns are named `C0`, `C1`, ...
    pub fn is_positional(&self) -> bool {
        self.positional
    }

    pub fn width(&self) -> usize {
        self.df.width()
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Resolve logical columns against this table's headers.
    pub fn column_map(&self) -> ColumnMap {
        ColumnMap::new(self.dataset, &self.column_names())
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// All rows, in file order.
    pub fn records(&self) -> Result<Vec<RawRecord<'_>>, DataError> {
        let columns = self
            .df
            .get_columns()
            .iter()
            .map(|col| col.str())
            .collect::<PolarsResult<Vec<&StringChunked>>>()
            .map_err(|source| DataError::Csv {
                dataset: self.dataset,
                source,
            })?;

        Ok((0..self.height())
            .map(|row| RawRecord {
                values: columns.iter().map(|ca| ca.get(row)).collect(),
            })
            .collect())
    }
}

/// One input line: column position to string value or null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord<'a> {
    values: Vec<Option<&'a str>>,
}

impl<'a> RawRecord<'a> {
    /// Value at a column position resolved through a [`ColumnMap`].
    pub fn at(&self, index: usize) -> Option<&'a str> {
        self.values.get(index).copied().flatten()
    }

    /// Value at an optional column position; a missing column reads as null.
    pub fn opt(&self, index: Option<usize>) -> Option<&'a str> {
        index.and_then(|i| self.at(i))
    }

    /// Trimmed value, with null and blank both reading as `""`.
    pub fn text(&self, index: usize) -> &'a str {
        self.at(index).map(str::trim).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Handles reading the statewide extracts.
pub struct DataLoader;

impl DataLoader {
    /// Read a dataset with its published delimiter convention.
    pub fn load(dataset: DatasetKind, path: &Path) -> Result<RawTable, DataError> {
        Self::read_table(dataset, path, dataset.delimiter())
    }

    /// Read a delimited file with a header row.
    ///
    /// Falls back to a headerless fixed-width parse when the delimiter
    /// yields two columns or fewer.
    pub fn read_table(
        dataset: DatasetKind,
        path: &Path,
        delimiter: Delimiter,
    ) -> Result<RawTable, DataError> {
        if !path.exists() {
            return Err(DataError::MissingFile {
                dataset,
                path: path.to_path_buf(),
            });
        }

        let bytes = fs::read(path).map_err(|source| DataError::Io {
            dataset,
            path: path.to_path_buf(),
            source,
        })?;
        let text = decode_latin1(&bytes);

        let table = Self::parse_delimited(dataset, &text, delimiter)?;
        debug!(
            %dataset,
            rows = table.height(),
            columns = table.width(),
            "Parsed delimited file"
        );

        if table.width() > MISPARSE_MAX_COLUMNS {
            info!(%dataset, path = %path.display(), rows = table.height(), "Loaded dataset");
            return Ok(table);
        }

        warn!(
            %dataset,
            columns = table.width(),
            "Delimiter produced too few columns, retrying as fixed-width"
        );
        let table = Self::parse_fixed_width(dataset, &text)?;
        info!(
            %dataset,
            path = %path.display(),
            rows = table.height(),
            columns = table.width(),
            "Loaded fixed-width dataset"
        );
        Ok(table)
    }

    /// Parse delimited text with a header row; every column is read as a string.
    pub fn parse_delimited(
        dataset: DatasetKind,
        text: &str,
        delimiter: Delimiter,
    ) -> Result<RawTable, DataError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .map_parse_options(|opts| {
                opts.with_separator(delimiter.byte())
                    .with_truncate_ragged_lines(true)
            })
            .into_reader_with_file_handle(Cursor::new(text.as_bytes().to_vec()))
            .finish()
            .map_err(|source| DataError::Csv { dataset, source })?;

        Ok(RawTable {
            dataset,
            df,
            positional: false,
        })
    }

    /// Parse headerless fixed-width text with inferred column boundaries.
    pub fn parse_fixed_width(dataset: DatasetKind, text: &str) -> Result<RawTable, DataError> {
        let rows = fixed_width::parse(text);
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let headers: Vec<String> = (0..width).map(|i| format!("C{i}")).collect();

        let mut table = RawTable::from_rows(dataset, &headers, &rows)?;
        table.positional = true;
        Ok(table)
    }
}
