// src/io/csv_reader.rs

//! CSV input for CSV-template mode.
//!
//! Exposes the ordered header list (with any byte-order mark stripped from
//! the first header) and a streaming sequence of row mappings. A path of
//! `-` reads from standard input.

use crate::constants::STDIN_FILE;
use crate::models::Row;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("failed to open \"{path}\": {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported charset \"{0}\": only utf-8 is supported")]
    UnsupportedCharset(String),
    #[error("\"{0}\" has no header row")]
    MissingHeaders(String),
    #[error("duplicate CSV header \"{0}\"")]
    DuplicateHeader(String),
    #[error("CSV parse error at record {record}: {source}")]
    Parse {
        record: u64,
        #[source]
        source: csv::Error,
    },
}

/// An open CSV input with its header row already read and validated.
pub struct CsvSource {
    headers: Vec<String>,
    reader: csv::Reader<Box<dyn Read>>,
    record_num: u64,
}

impl std::fmt::Debug for CsvSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSource").field("headers", &self.headers).finish()
    }
}

impl CsvSource {
    /// Opens `path` (`-` for stdin) with the given charset name. UTF-8 is
    /// the supported encoding; the charset argument exists so callers can
    /// reject anything else up front.
    pub fn open(path: &str, charset: &str) -> Result<Self, CsvError> {
        if !matches!(charset.to_lowercase().as_str(), "utf-8" | "utf8" | "utf-8-sig") {
            return Err(CsvError::UnsupportedCharset(charset.to_string()));
        }
        let input: Box<dyn Read> = if path == STDIN_FILE {
            Box::new(std::io::stdin())
        } else {
            Box::new(File::open(path).map_err(|source| CsvError::Open {
                path: path.to_string(),
                source,
            })?)
        };
        Self::from_reader(input, path)
    }

    fn from_reader(input: Box<dyn Read>, path: &str) -> Result<Self, CsvError> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(input);

        let header_record = reader
            .headers()
            .map_err(|source| CsvError::Parse { record: 0, source })?;
        if header_record.is_empty() {
            return Err(CsvError::MissingHeaders(path.to_string()));
        }

        let mut headers: Vec<String> = header_record.iter().map(str::to_string).collect();
        // Normalize a UTF-8 BOM on the first header.
        if let Some(first) = headers.first_mut() {
            *first = first.trim_start_matches('\u{feff}').to_string();
        }

        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.clone()) {
                return Err(CsvError::DuplicateHeader(header.clone()));
            }
        }

        Ok(Self { headers, reader, record_num: 0 })
    }

    /// Ordered, unique header names.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Reads the next data row as a header→value map. Rows shorter than
    /// the header list yield empty strings for the missing fields.
    pub fn next_row(&mut self) -> Option<Result<Row, CsvError>> {
        let mut record = StringRecord::new();
        self.record_num += 1;
        match self.reader.read_record(&mut record) {
            Ok(false) => None,
            Ok(true) => {
                let row = self
                    .headers
                    .iter()
                    .enumerate()
                    .map(|(i, header)| {
                        (header.clone(), record.get(i).unwrap_or("").to_string())
                    })
                    .collect();
                Some(Ok(row))
            }
            Err(source) => Some(Err(CsvError::Parse { record: self.record_num, source })),
        }
    }
}

impl Iterator for CsvSource {
    type Item = Result<Row, CsvError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row()
    }
}

// MARK: --- UNIT TESTS ---
