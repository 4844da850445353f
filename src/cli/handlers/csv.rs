// src/cli/handlers/csv.rs

//! `bulkctl csv <file> [charset <name>] [matchfield <field> <regex>]…
//! <command template…>`
//!
//! Replays one command template once per matching CSV row. The template
//! may reference row fields with `~~field~~`,
//! `~~field~!~pattern~!~replacement~~`, or the whole-token shorthand
//! `~field`; references are resolved against the CSV headers before any
//! row is read.

use anyhow::Result;
use regex::Regex;

use crate::{
    cli::handlers::commons,
    config,
    constants::STDIN_FILE,
    core::{
        args::{ArgStream, UsageErrorKind},
        batch as compiler,
        pool::{self, PoolOptions},
    },
    io::csv_reader::CsvSource,
    models::RowFilter,
    system::executor::ProcessRunner,
    CancellationToken,
};

pub fn handle(mut args: ArgStream, cancellation_token: &CancellationToken) -> Result<()> {
    let config = config::load()?;

    let path = args.read_string("csv file")?;
    let charset = commons::read_charset(&mut args, &config)?;
    let filters = read_filters(&mut args)?;

    let template_tokens = args.read_remaining();
    if template_tokens.is_empty() {
        return Err(args
            .usage_error(UsageErrorKind::Missing, "a command template after the csv options")
            .into());
    }

    if path == STDIN_FILE {
        commons::check_stdin_allowed(&config, &args)?;
    }
    let mut source = CsvSource::open(&path, &charset)?;
    let (jobs, total) = compiler::compile_csv(&mut source, &template_tokens, &filters)?;
    log::debug!("compiled {} jobs from \"{}\"", total, path);

    let runner = ProcessRunner;
    pool::run_batch(
        &jobs,
        total,
        &runner,
        cancellation_token,
        &PoolOptions { max_threads: config.max_threads },
    )?;
    Ok(())
}

/// Parses the `matchfield <field> <regex>` repetitions.
fn read_filters(args: &mut ArgStream) -> Result<Vec<RowFilter>> {
    let mut filters = Vec::new();
    while args.current() == Some("matchfield") {
        args.advance();
        let field = args.read_string("field name")?;
        let pattern_text = args.read_string("match pattern")?;
        let pattern = match Regex::new(&pattern_text) {
            Ok(p) => p,
            Err(e) => {
                args.put_back();
                return Err(args
                    .usage_error(
                        UsageErrorKind::Invalid,
                        format!("a valid pattern for matchfield: {}", e),
                    )
                    .into());
            }
        };
        filters.push(RowFilter { field, pattern });
    }
    Ok(filters)
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(tokens: &[&str]) -> ArgStream {
        ArgStream::new(tokens.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_read_filters_collects_pairs() {
        let mut args = stream(&["matchfield", "Org", "^eng$", "matchfield", "Status", "active", "info"]);
        let filters = read_filters(&mut args).unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].field, "Org");
        assert!(filters[1].pattern.is_match("active"));
        assert_eq!(args.current(), Some("info"));
    }

    #[test]
    fn test_read_filters_rejects_bad_pattern() {
        let mut args = stream(&["matchfield", "Org", "(unclosed"]);
        let err = read_filters(&mut args).unwrap_err();
        let usage = err.downcast_ref::<crate::core::args::UsageError>().unwrap();
        assert_eq!(usage.kind, UsageErrorKind::Invalid);
        assert!(usage.command_line.contains(">>>(unclosed<<<"));
    }

    #[test]
    fn test_read_filters_none_present() {
        let mut args = stream(&["update", "user", "~~Email~~"]);
        assert!(read_filters(&mut args).unwrap().is_empty());
        assert_eq!(args.remaining(), 3);
    }
}
