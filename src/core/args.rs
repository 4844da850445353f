// src/core/args.rs

//! The argument cursor and the typed token readers built on it.
//!
//! Every command handler parses its arguments through one [`ArgStream`]: an
//! ordered token list plus a cursor. Centralizing consumption here gives all
//! handlers a single usage-error format (the consumed command line with a
//! `>>>token<<<` marker at the point where parsing stopped) and lets a
//! handler `put_back` one token when it discovers mid-parse that it picked
//! the wrong sub-grammar.

use chrono::NaiveDate;
use colored::Colorize;
use std::collections::HashMap;
use thiserror::Error;

/// Sub-kind of a usage error, mirrored in the rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageErrorKind {
    /// A value was present but blank where a non-blank value is required.
    Blank,
    /// A value list or set was empty.
    Empty,
    /// A value was present but malformed for the expected type.
    Invalid,
    /// A required value was absent (end of stream).
    Missing,
    /// Tokens were left over after the grammar completed.
    Extraneous,
    /// Two options that cannot be combined were both given.
    MutuallyExclusive,
}

impl UsageErrorKind {
    fn label(self) -> &'static str {
        match self {
            Self::Blank => "blank argument",
            Self::Empty => "empty argument",
            Self::Invalid => "invalid argument",
            Self::Missing => "missing argument",
            Self::Extraneous => "unexpected argument",
            Self::MutuallyExclusive => "mutually exclusive arguments",
        }
    }
}

/// A structured usage error: what the parser expected, plus the partially
/// consumed command line with a marker at the failure point.
///
/// Always fatal to the current command; the binary maps it to the usage
/// exit code.
#[derive(Error, Debug, Clone)]
#[error("{}: expected {expected}\n  Command: {command_line}", .kind.label())]
pub struct UsageError {
    pub kind: UsageErrorKind,
    pub expected: String,
    pub command_line: String,
}

/// A mutable cursor over the argument vector of one (sub-)invocation.
///
/// The cursor only moves forward, except for [`ArgStream::put_back`], which
/// rewinds by exactly one token to support lookahead failures.
#[derive(Debug, Clone)]
pub struct ArgStream {
    tokens: Vec<String>,
    cursor: usize,
}

impl ArgStream {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens, cursor: 0 }
    }

    /// The token under the cursor, if any.
    pub fn current(&self) -> Option<&str> {
        self.tokens.get(self.cursor).map(String::as_str)
    }

    /// Moves the cursor past the current token.
    pub fn advance(&mut self) {
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
        }
    }

    /// Rewinds the cursor by one token. Used when a handler has consumed a
    /// token and then discovers it belongs to a different sub-grammar.
    pub fn put_back(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Number of tokens not yet consumed.
    pub fn remaining(&self) -> usize {
        self.tokens.len() - self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    /// Consumes and returns every remaining token.
    pub fn read_remaining(&mut self) -> Vec<String> {
        let rest = self.tokens[self.cursor..].to_vec();
        self.cursor = self.tokens.len();
        rest
    }

    /// The full command line with `>>>token<<<` marking the cursor position.
    /// When the stream is exhausted the marker sits past the last token.
    fn marked_command_line(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.tokens.len() + 1);
        for (i, tok) in self.tokens.iter().enumerate() {
            if i == self.cursor {
                parts.push(format!(">>>{}<<<", tok));
            } else {
                parts.push(tok.clone());
            }
        }
        if self.cursor >= self.tokens.len() {
            parts.push(">>><<<".to_string());
        }
        parts.join(" ")
    }

    /// Builds a [`UsageError`] anchored at the current cursor position.
    pub fn usage_error(&self, kind: UsageErrorKind, expected: impl Into<String>) -> UsageError {
        UsageError {
            kind,
            expected: expected.into(),
            command_line: self.marked_command_line(),
        }
    }

    /// Fails with an `Extraneous` error if any tokens remain.
    pub fn expect_exhausted(&self) -> Result<(), UsageError> {
        if self.is_exhausted() {
            Ok(())
        } else {
            Err(self.usage_error(
                UsageErrorKind::Extraneous,
                format!("end of arguments, got \"{}\"", self.tokens[self.cursor..].join(" ")),
            ))
        }
    }

    // --- Typed readers -------------------------------------------------
    //
    // Each reader consumes zero or one token on success and leaves the
    // cursor on the offending token on failure, so the rendered marker
    // points at it.

    /// Reads one non-blank string token.
    pub fn read_string(&mut self, item: &str) -> Result<String, UsageError> {
        match self.current() {
            None => Err(self.usage_error(UsageErrorKind::Missing, format!("<{}>", item))),
            Some(tok) if tok.trim().is_empty() => {
                Err(self.usage_error(UsageErrorKind::Blank, format!("non-blank <{}>", item)))
            }
            Some(tok) => {
                let value = tok.to_string();
                self.advance();
                Ok(value)
            }
        }
    }

    /// Reads one integer within `min..=max`. Non-numeric input and
    /// out-of-range input produce distinct messages.
    pub fn read_integer(&mut self, item: &str, min: i64, max: i64) -> Result<i64, UsageError> {
        let tok = match self.current() {
            None => {
                return Err(self.usage_error(
                    UsageErrorKind::Missing,
                    format!("<{}> in range {}-{}", item, min, max),
                ));
            }
            Some(t) => t,
        };
        let parsed: i64 = match tok.parse() {
            Ok(n) => n,
            Err(_) => {
                return Err(
                    self.usage_error(UsageErrorKind::Invalid, format!("a number for <{}>", item))
                );
            }
        };
        if parsed < min || parsed > max {
            return Err(self.usage_error(
                UsageErrorKind::Invalid,
                format!("a number in range {}-{} for <{}>", min, max, item),
            ));
        }
        self.advance();
        Ok(parsed)
    }

    /// Reads one boolean token. Accepts on/off, true/false, yes/no,
    /// enabled/disabled, 1/0 (case-insensitive).
    pub fn read_boolean(&mut self, item: &str) -> Result<bool, UsageError> {
        const TRUE_VALUES: &[&str] = &["on", "true", "yes", "enabled", "1"];
        const FALSE_VALUES: &[&str] = &["off", "false", "no", "disabled", "0"];

        let tok = match self.current() {
            None => {
                return Err(self.usage_error(UsageErrorKind::Missing, format!("<{}> on|off", item)));
            }
            Some(t) => t.to_lowercase(),
        };
        if TRUE_VALUES.contains(&tok.as_str()) {
            self.advance();
            Ok(true)
        } else if FALSE_VALUES.contains(&tok.as_str()) {
            self.advance();
            Ok(false)
        } else {
            Err(self.usage_error(
                UsageErrorKind::Invalid,
                format!("one of {}|{} for <{}>", TRUE_VALUES.join("|"), FALSE_VALUES.join("|"), item),
            ))
        }
    }

    /// Reads one email address, lowercased. Requires a non-empty local part
    /// and domain.
    pub fn read_email(&mut self, item: &str) -> Result<String, UsageError> {
        let tok = match self.current() {
            None => {
                return Err(
                    self.usage_error(UsageErrorKind::Missing, format!("<{}> (email address)", item))
                );
            }
            Some(t) => t.trim().to_lowercase(),
        };
        if tok.is_empty() {
            return Err(self.usage_error(UsageErrorKind::Blank, format!("non-blank <{}>", item)));
        }
        let valid = match tok.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        };
        if !valid {
            return Err(self.usage_error(
                UsageErrorKind::Invalid,
                format!("an email address for <{}>", item),
            ));
        }
        self.advance();
        Ok(tok)
    }

    /// Reads one `YYYY-MM-DD` date.
    pub fn read_date(&mut self, item: &str) -> Result<NaiveDate, UsageError> {
        let tok = match self.current() {
            None => {
                return Err(
                    self.usage_error(UsageErrorKind::Missing, format!("<{}> (YYYY-MM-DD)", item))
                );
            }
            Some(t) => t,
        };
        match NaiveDate::parse_from_str(tok, "%Y-%m-%d") {
            Ok(date) => {
                self.advance();
                Ok(date)
            }
            Err(_) => Err(self.usage_error(
                UsageErrorKind::Invalid,
                format!("a date (YYYY-MM-DD) for <{}>", item),
            )),
        }
    }

    /// Reads one choice from `set`.
    ///
    /// Matching is case-insensitive; the raw token is tried first, then an
    /// underscore-stripped form. A non-member (or end of stream) returns
    /// `opts.default` without consuming input, unless `opts.required`, in
    /// which case it is a usage error. With `opts.map_choice`, a matched
    /// member that has a canonical mapping returns the mapped value.
    pub fn read_choice(
        &mut self,
        item: &str,
        set: &ChoiceSet,
        opts: &ChoiceOptions,
    ) -> Result<Option<String>, UsageError> {
        let tok = match self.current() {
            None => {
                if opts.required {
                    return Err(self.usage_error(
                        UsageErrorKind::Missing,
                        format!("one of {} for <{}>", set.describe(), item),
                    ));
                }
                return Ok(opts.default.clone());
            }
            Some(t) => t.to_lowercase(),
        };

        let member = set
            .resolve(&tok)
            .or_else(|| set.resolve(&tok.replace('_', "")));

        match member {
            Some(choice) => {
                self.advance();
                if opts.map_choice {
                    Ok(Some(set.canonical_value(&choice)))
                } else {
                    Ok(Some(choice))
                }
            }
            None if opts.required => Err(self.usage_error(
                UsageErrorKind::Invalid,
                format!("one of {} for <{}>", set.describe(), item),
            )),
            None => Ok(opts.default.clone()),
        }
    }
}

/// Options controlling one [`ArgStream::read_choice`] call site.
#[derive(Debug, Clone, Default)]
pub struct ChoiceOptions {
    /// Exhaustion or a non-member token is a fatal usage error instead of
    /// yielding the default.
    pub required: bool,
    /// Returned (without consuming input) when the next token is absent or
    /// not a member.
    pub default: Option<String>,
    /// Return the canonical mapped value instead of the member name.
    pub map_choice: bool,
}

impl ChoiceOptions {
    pub fn required() -> Self {
        Self { required: true, ..Self::default() }
    }

    pub fn with_default(default: &str) -> Self {
        Self { default: Some(default.to_string()), ..Self::default() }
    }
}

/// A closed set of choice members with optional aliases and canonical
/// value mappings. Members and aliases are stored lowercased.
#[derive(Debug, Clone, Default)]
pub struct ChoiceSet {
    members: Vec<String>,
    aliases: HashMap<String, String>,
    canonical: HashMap<String, String>,
}

impl ChoiceSet {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            members: members.into_iter().map(|m| m.as_ref().to_lowercase()).collect(),
            aliases: HashMap::new(),
            canonical: HashMap::new(),
        }
    }

    /// Registers `alias` as another spelling of `member`.
    pub fn alias(mut self, alias: &str, member: &str) -> Self {
        self.aliases.insert(alias.to_lowercase(), member.to_lowercase());
        self
    }

    /// Registers the canonical value returned for `member` when the call
    /// site asks for mapped choices.
    pub fn map_to(mut self, member: &str, value: &str) -> Self {
        self.canonical.insert(member.to_lowercase(), value.to_string());
        self
    }

    pub fn contains(&self, member: &str) -> bool {
        self.members.iter().any(|m| m == member)
    }

    fn resolve(&self, token: &str) -> Option<String> {
        if self.contains(token) {
            return Some(token.to_string());
        }
        self.aliases.get(token).cloned()
    }

    fn canonical_value(&self, member: &str) -> String {
        self.canonical.get(member).cloned().unwrap_or_else(|| member.to_string())
    }

    fn describe(&self) -> String {
        self.members.join("|").cyan().to_string()
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(tokens: &[&str]) -> ArgStream {
        ArgStream::new(tokens.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_cursor_movement_and_put_back() {
        let mut args = stream(&["info", "user", "a@b.com"]);
        assert_eq!(args.current(), Some("info"));
        args.advance();
        assert_eq!(args.current(), Some("user"));
        args.put_back();
        assert_eq!(args.current(), Some("info"));
        // put_back at the start is a no-op
        args.put_back();
        assert_eq!(args.current(), Some("info"));
        assert_eq!(args.remaining(), 3);
    }

    #[test]
    fn test_read_string_consumes_one_token() {
        let mut args = stream(&["alice", "bob"]);
        assert_eq!(args.read_string("name").unwrap(), "alice");
        assert_eq!(args.remaining(), 1);
    }

    #[test]
    fn test_read_string_blank_is_distinct_kind() {
        let mut args = stream(&[""]);
        let err = args.read_string("name").unwrap_err();
        assert_eq!(err.kind, UsageErrorKind::Blank);
    }

    #[test]
    fn test_read_string_missing_marks_end_of_line() {
        let mut args = stream(&["update", "user"]);
        args.advance();
        args.advance();
        let err = args.read_string("email").unwrap_err();
        assert_eq!(err.kind, UsageErrorKind::Missing);
        assert!(err.command_line.ends_with(">>><<<"), "got: {}", err.command_line);
    }

    #[test]
    fn test_read_integer_accepts_in_range() {
        let mut args = stream(&["42"]);
        assert_eq!(args.read_integer("count", 1, 100).unwrap(), 42);
        assert!(args.is_exhausted());
    }

    #[test]
    fn test_read_integer_idempotent_reparse() {
        let mut args = stream(&["42"]);
        let value = args.read_integer("count", 0, 100).unwrap();
        let mut again = stream(&[&value.to_string()]);
        assert_eq!(again.read_integer("count", 0, 100).unwrap(), value);
    }

    #[test]
    fn test_read_integer_distinct_messages() {
        let mut args = stream(&["abc"]);
        let err = args.read_integer("count", 1, 10).unwrap_err();
        assert_eq!(err.kind, UsageErrorKind::Invalid);
        assert!(err.expected.contains("a number"));
        assert!(!err.expected.contains("range"));

        let mut args = stream(&["11"]);
        let err = args.read_integer("count", 1, 10).unwrap_err();
        assert_eq!(err.kind, UsageErrorKind::Invalid);
        assert!(err.expected.contains("range 1-10"), "got: {}", err.expected);
    }

    #[test]
    fn test_read_integer_failure_does_not_consume() {
        let mut args = stream(&["abc", "next"]);
        let _ = args.read_integer("count", 1, 10).unwrap_err();
        assert_eq!(args.current(), Some("abc"));
    }

    #[test]
    fn test_read_boolean_spellings() {
        for spelling in ["on", "True", "YES", "enabled", "1"] {
            let mut args = stream(&[spelling]);
            assert!(args.read_boolean("flag").unwrap(), "{} should be true", spelling);
        }
        for spelling in ["off", "False", "no", "DISABLED", "0"] {
            let mut args = stream(&[spelling]);
            assert!(!args.read_boolean("flag").unwrap(), "{} should be false", spelling);
        }
        let mut args = stream(&["maybe"]);
        assert_eq!(args.read_boolean("flag").unwrap_err().kind, UsageErrorKind::Invalid);
    }

    #[test]
    fn test_read_email_lowercases() {
        let mut args = stream(&["Alice@Example.COM"]);
        assert_eq!(args.read_email("user").unwrap(), "alice@example.com");
    }

    #[test]
    fn test_read_email_rejects_malformed() {
        for bad in ["no-at-sign", "@domain", "local@", "a@b@c"] {
            let mut args = stream(&[bad]);
            let err = args.read_email("user").unwrap_err();
            assert_eq!(err.kind, UsageErrorKind::Invalid, "{} should be invalid", bad);
        }
    }

    #[test]
    fn test_read_date() {
        let mut args = stream(&["2024-02-29"]);
        let date = args.read_date("start").unwrap();
        assert_eq!(date.to_string(), "2024-02-29");

        let mut args = stream(&["2023-02-29"]);
        assert_eq!(args.read_date("start").unwrap_err().kind, UsageErrorKind::Invalid);
    }

    #[test]
    fn test_read_choice_case_insensitive_and_alias() {
        let set = ChoiceSet::new(["firstname", "lastname"]).alias("givenname", "firstname");
        let mut args = stream(&["FirstName"]);
        let got = args.read_choice("field", &set, &ChoiceOptions::required()).unwrap();
        assert_eq!(got.as_deref(), Some("firstname"));

        let mut args = stream(&["givenname"]);
        let got = args.read_choice("field", &set, &ChoiceOptions::required()).unwrap();
        assert_eq!(got.as_deref(), Some("firstname"));
    }

    #[test]
    fn test_read_choice_underscore_stripped_form() {
        let set = ChoiceSet::new(["firstname"]);
        let mut args = stream(&["first_name"]);
        let got = args.read_choice("field", &set, &ChoiceOptions::required()).unwrap();
        assert_eq!(got.as_deref(), Some("firstname"));
    }

    #[test]
    fn test_read_choice_default_does_not_consume() {
        let set = ChoiceSet::new(["csv", "json"]);
        let mut args = stream(&["somethingelse"]);
        let got = args.read_choice("format", &set, &ChoiceOptions::with_default("csv")).unwrap();
        assert_eq!(got.as_deref(), Some("csv"));
        assert_eq!(args.current(), Some("somethingelse"));
    }

    #[test]
    fn test_read_choice_exhausted_default_vs_required() {
        let set = ChoiceSet::new(["csv", "json"]);
        let mut args = stream(&[]);
        let got = args.read_choice("format", &set, &ChoiceOptions::with_default("json")).unwrap();
        assert_eq!(got.as_deref(), Some("json"));

        let err = args.read_choice("format", &set, &ChoiceOptions::required()).unwrap_err();
        assert_eq!(err.kind, UsageErrorKind::Missing);
    }

    #[test]
    fn test_read_choice_mapped_canonical_value() {
        let set = ChoiceSet::new(["archive", "delete"]).map_to("archive", "ARCHIVED");
        let mut args = stream(&["archive"]);
        let opts = ChoiceOptions { map_choice: true, required: true, ..Default::default() };
        let got = args.read_choice("action", &set, &opts).unwrap();
        assert_eq!(got.as_deref(), Some("ARCHIVED"));
    }

    #[test]
    fn test_marker_points_at_offending_token() {
        let mut args = stream(&["update", "user", "bogus"]);
        args.advance();
        args.advance();
        let err = args.read_email("email").unwrap_err();
        assert!(
            err.command_line.contains("update user >>>bogus<<<"),
            "got: {}",
            err.command_line
        );
    }

    #[test]
    fn test_expect_exhausted_reports_extraneous() {
        let mut args = stream(&["info", "user", "a@b.com", "leftover"]);
        args.advance();
        args.advance();
        args.advance();
        let err = args.expect_exhausted().unwrap_err();
        assert_eq!(err.kind, UsageErrorKind::Extraneous);
        assert!(err.expected.contains("leftover"));
    }

    #[test]
    fn test_read_remaining_drains() {
        let mut args = stream(&["a", "b", "c"]);
        args.advance();
        assert_eq!(args.read_remaining(), vec!["b", "c"]);
        assert!(args.is_exhausted());
        assert!(args.read_remaining().is_empty());
    }
}
