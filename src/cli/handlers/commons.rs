// src/cli/handlers/commons.rs

// Shared helpers used by multiple handlers.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::{
    config::Config,
    constants::STDIN_FILE,
    core::args::{ArgStream, UsageError, UsageErrorKind},
    remote::client::HttpRemoteClient,
};

/// Opens a batch input path, with `-` meaning standard input.
///
/// Reading from stdin cannot be combined with interactive debug mode:
/// both want the terminal, so the conflict is rejected at parse time.
pub fn open_batch_input(
    path: &str,
    config: &Config,
    args: &ArgStream,
) -> Result<Box<dyn BufRead>> {
    if path == STDIN_FILE {
        check_stdin_allowed(config, args)?;
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }
    let file =
        File::open(path).with_context(|| format!("failed to open batch file \"{}\"", path))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Rejects the stdin file convention when interactive debug mode is on.
pub fn check_stdin_allowed(config: &Config, args: &ArgStream) -> Result<(), UsageError> {
    if config.debug {
        return Err(args.usage_error(
            UsageErrorKind::MutuallyExclusive,
            "\"-\" (read from stdin) cannot be combined with interactive debug mode",
        ));
    }
    Ok(())
}

/// Reads an optional `charset <name>` pair off the stream, falling back to
/// the configured default. The name is validated immediately; `put_back`
/// re-anchors the usage marker on the offending token.
pub fn read_charset(args: &mut ArgStream, config: &Config) -> Result<String, UsageError> {
    if args.current() != Some("charset") {
        return Ok(config.charset.clone());
    }
    args.advance();
    let name = args.read_string("charset name")?;
    if !matches!(name.to_lowercase().as_str(), "utf-8" | "utf8" | "utf-8-sig") {
        args.put_back();
        return Err(args.usage_error(
            UsageErrorKind::Invalid,
            format!("a supported charset (utf-8), got \"{}\"", name),
        ));
    }
    Ok(name)
}

/// Builds the production API client from the configuration.
pub fn build_client(config: &Config) -> HttpRemoteClient {
    HttpRemoteClient::new(&config.api_base_url, config.auth_token.clone())
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(tokens: &[&str]) -> ArgStream {
        ArgStream::new(tokens.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_stdin_rejected_in_debug_mode() {
        let config = Config { debug: true, ..Config::default() };
        let args = stream(&["-"]);
        let err = check_stdin_allowed(&config, &args).unwrap_err();
        assert_eq!(err.kind, UsageErrorKind::MutuallyExclusive);
    }

    #[test]
    fn test_stdin_allowed_otherwise() {
        let config = Config::default();
        let args = stream(&["-"]);
        assert!(check_stdin_allowed(&config, &args).is_ok());
    }

    #[test]
    fn test_read_charset_defaults_without_consuming() {
        let config = Config::default();
        let mut args = stream(&["matchfield", "Org", "eng"]);
        assert_eq!(read_charset(&mut args, &config).unwrap(), "utf-8");
        assert_eq!(args.current(), Some("matchfield"));
    }

    #[test]
    fn test_read_charset_consumes_pair() {
        let config = Config::default();
        let mut args = stream(&["charset", "UTF-8", "next"]);
        assert_eq!(read_charset(&mut args, &config).unwrap(), "UTF-8");
        assert_eq!(args.current(), Some("next"));
    }

    #[test]
    fn test_read_charset_rejects_unsupported_with_marker() {
        let config = Config::default();
        let mut args = stream(&["charset", "latin-1"]);
        let err = read_charset(&mut args, &config).unwrap_err();
        assert_eq!(err.kind, UsageErrorKind::Invalid);
        assert!(err.command_line.contains(">>>latin-1<<<"), "got: {}", err.command_line);
    }
}
