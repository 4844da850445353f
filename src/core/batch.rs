// src/core/batch.rs

//! The batch compiler: turns a batch script or a CSV file plus a command
//! template into a flat job list for the worker pool.
//!
//! Script mode reads full command lines; CSV-template mode replays one
//! template once per matching data row. Both emit `(jobs, job_count)` where
//! `job_count` excludes barriers.

use crate::constants::{BARRIER_KEYWORD, PROGRAM_NAME};
use crate::core::template::{self, TemplateError};
use crate::io::csv_reader::{CsvError, CsvSource};
use crate::models::{Job, RowFilter};
use std::io::BufRead;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("failed to read batch input: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: unbalanced quoting in \"{content}\"")]
    Quoting { line: usize, content: String },
    #[error("line {line}: expected \"{PROGRAM_NAME}\" or \"{BARRIER_KEYWORD}\", got \"{first}\"")]
    UnknownDirective { line: usize, first: String },
    #[error("line {line}: \"{BARRIER_KEYWORD}\" takes no arguments")]
    BarrierArguments { line: usize },
    #[error("matchfield \"{field}\" is not a CSV header; headers are: {}", .known.join(", "))]
    UnknownFilterField { field: String, known: Vec<String> },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Csv(#[from] CsvError),
}

/// Compiles a batch script into jobs.
///
/// Blank lines and `#` comments are skipped. Each remaining line is split
/// with POSIX shell word-splitting; a line starting with the program's own
/// invocation name yields a job from the rest of the line, and a line that
/// is exactly the barrier keyword yields a barrier. Anything else is a
/// fatal parse error naming the line.
pub fn compile_script(input: impl BufRead) -> Result<(Vec<Job>, usize), BatchError> {
    let mut jobs = Vec::new();
    let mut job_count = 0;

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line_num = index + 1;

        let tokens = shlex::split(trimmed).ok_or_else(|| BatchError::Quoting {
            line: line_num,
            content: trimmed.to_string(),
        })?;
        let Some(first) = tokens.first() else {
            continue;
        };

        if first.as_str() == PROGRAM_NAME {
            jobs.push(Job::Command(tokens[1..].to_vec()));
            job_count += 1;
        } else if first.as_str() == BARRIER_KEYWORD {
            if tokens.len() > 1 {
                return Err(BatchError::BarrierArguments { line: line_num });
            }
            jobs.push(Job::Barrier);
        } else {
            return Err(BatchError::UnknownDirective {
                line: line_num,
                first: first.clone(),
            });
        }
    }

    Ok((jobs, job_count))
}

/// Compiles a CSV file plus a command template into one job per matching
/// row.
///
/// The template is parsed against the CSV headers before the first row is
/// read, so unknown fields and bad patterns fail up front. A leading
/// program-name token in the template (people paste full command lines) is
/// accepted and skipped. Every `matchfield` filter must name a known
/// header and all filters must match a row for it to produce a job.
pub fn compile_csv(
    source: &mut CsvSource,
    template_tokens: &[String],
    filters: &[RowFilter],
) -> Result<(Vec<Job>, usize), BatchError> {
    let headers = source.headers().to_vec();

    for filter in filters {
        if !headers.iter().any(|h| *h == filter.field) {
            return Err(BatchError::UnknownFilterField {
                field: filter.field.clone(),
                known: headers,
            });
        }
    }

    let tokens = match template_tokens.first() {
        Some(first) if first.as_str() == PROGRAM_NAME => &template_tokens[1..],
        _ => template_tokens,
    };
    let parsed = template::parse_template(tokens, &headers)?;

    let mut jobs = Vec::new();
    for row in source.by_ref() {
        let row = row?;
        let matches = filters.iter().all(|filter| {
            let value = row.get(&filter.field).map(String::as_str).unwrap_or("");
            filter.pattern.is_match(value)
        });
        if matches {
            jobs.push(Job::Command(template::render(&parsed, &row)));
        }
    }

    let job_count = jobs.len();
    Ok((jobs, job_count))
}

// MARK: --- UNIT TESTS ---
