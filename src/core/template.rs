// src/core/template.rs

//! Parsing and rendering of CSV field substitutions inside command
//! templates.
//!
//! A template is the tail of a `csv` command line. Inside any token, a
//! `~~field~~` marker splices in the row's value for `field`, and a
//! `~~field~!~pattern~!~replacement~~` marker splices in the value after a
//! regex replacement. A token that is exactly `~field` is shorthand for a
//! single plain reference spanning the whole token. Templates are parsed
//! once, against the CSV header set, before any row is read; rendering is a
//! per-row string rebuild with no re-parsing.

use crate::models::{CommandTemplate, FieldRefKind, FieldReference, Row};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    // Non-greedy scan for ~~...~~ markers. The separator ~!~ contains no
    // doubled tilde, so the first closing ~~ after the opener terminates
    // the marker.
    static ref MARKER_RE: Regex = Regex::new(r"~~(.+?)~~").unwrap();
}

/// Errors from template parsing. All of these are raised before the first
/// data row is processed.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("unknown field \"{field}\" in \"{token}\"; CSV headers are: {}", .known.join(", "))]
    UnknownField {
        field: String,
        token: String,
        known: Vec<String>,
    },
    #[error("malformed substitution \"{marker}\" in \"{token}\": expected ~~field~~ or ~~field~!~pattern~!~replacement~~")]
    BadSyntax { marker: String, token: String },
    #[error("invalid pattern in \"{token}\": {source}")]
    BadPattern {
        token: String,
        #[source]
        source: regex::Error,
    },
}

/// Parses `tokens` into a [`CommandTemplate`], resolving every field
/// reference against `headers`. Unknown fields fail here, never during row
/// iteration.
pub fn parse_template(
    tokens: &[String],
    headers: &[String],
) -> Result<CommandTemplate, TemplateError> {
    let mut template = CommandTemplate {
        tokens: tokens.to_vec(),
        refs: Default::default(),
    };

    for (index, token) in tokens.iter().enumerate() {
        let refs = parse_token(token, headers)?;
        if !refs.is_empty() {
            template.refs.insert(index, refs);
        }
    }
    Ok(template)
}

fn parse_token(token: &str, headers: &[String]) -> Result<Vec<FieldReference>, TemplateError> {
    // Whole-token shorthand: ~field (a single tilde, not the ~~ marker).
    if let Some(field) = token.strip_prefix('~') {
        if !field.is_empty() && !field.starts_with('~') {
            check_field(field, token, headers)?;
            return Ok(vec![FieldReference {
                field: field.to_string(),
                kind: FieldRefKind::Plain,
                start: 0,
                end: token.len(),
            }]);
        }
    }

    let mut refs = Vec::new();
    for caps in MARKER_RE.captures_iter(token) {
        let whole = caps.get(0).unwrap();
        let content = caps.get(1).unwrap().as_str();
        let parts: Vec<&str> = content.split("~!~").collect();
        let (field, kind) = match parts.as_slice() {
            [field] => (*field, FieldRefKind::Plain),
            [field, pattern, replacement] => {
                let compiled = Regex::new(pattern).map_err(|source| TemplateError::BadPattern {
                    token: token.to_string(),
                    source,
                })?;
                (
                    *field,
                    FieldRefKind::Transform {
                        pattern: compiled,
                        replacement: rewrite_group_refs(replacement),
                    },
                )
            }
            _ => {
                return Err(TemplateError::BadSyntax {
                    marker: whole.as_str().to_string(),
                    token: token.to_string(),
                });
            }
        };
        check_field(field, token, headers)?;
        refs.push(FieldReference {
            field: field.to_string(),
            kind,
            start: whole.start(),
            end: whole.end(),
        });
    }
    Ok(refs)
}

fn check_field(field: &str, token: &str, headers: &[String]) -> Result<(), TemplateError> {
    if headers.iter().any(|h| h == field) {
        Ok(())
    } else {
        Err(TemplateError::UnknownField {
            field: field.to_string(),
            token: token.to_string(),
            known: headers.to_vec(),
        })
    }
}

/// Rewrites `\1`-style group references to the regex crate's `${1}` form.
/// Scripts written against the original tool use backslash references.
fn rewrite_group_refs(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(d) if d.is_ascii_digit() => {
                    out.push_str("${");
                    out.push(*d);
                    out.push('}');
                    chars.next();
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Renders one CSV row through the template. Token count is always
/// preserved; a missing or empty row value contributes the empty string
/// (and skips the regex transform), never an error.
pub fn render(template: &CommandTemplate, row: &Row) -> Vec<String> {
    template
        .tokens
        .iter()
        .enumerate()
        .map(|(index, token)| match template.refs.get(&index) {
            None => token.clone(),
            Some(refs) => render_token(token, refs, row),
        })
        .collect()
}

fn render_token(token: &str, refs: &[FieldReference], row: &Row) -> String {
    let mut out = String::with_capacity(token.len());
    let mut last_end = 0;
    for reference in refs {
        out.push_str(&token[last_end..reference.start]);
        let value = row.get(&reference.field).map(String::as_str).unwrap_or("");
        match &reference.kind {
            FieldRefKind::Plain => out.push_str(value),
            FieldRefKind::Transform { pattern, replacement } => {
                if !value.is_empty() {
                    out.push_str(&pattern.replace_all(value, replacement.as_str()));
                }
            }
        }
        last_end = reference.end;
    }
    out.push_str(&token[last_end..]);
    out
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_literal_template_renders_unchanged() {
        let tokens = toks(&["update", "user", "nobody"]);
        let template = parse_template(&tokens, &headers(&["Email"])).unwrap();
        assert!(template.is_literal());
        assert_eq!(render(&template, &row(&[("Email", "a@b.com")])), tokens);
    }

    #[test]
    fn test_render_preserves_token_count() {
        let tokens = toks(&["update", "user", "~~Email~~", "note", "x-~~Email~~-y"]);
        let template = parse_template(&tokens, &headers(&["Email"])).unwrap();
        let rendered = render(&template, &row(&[("Email", "a@b.com")]));
        assert_eq!(rendered.len(), tokens.len());
    }

    #[test]
    fn test_plain_substitution() {
        let tokens = toks(&["info", "user", "~~Email~~"]);
        let template = parse_template(&tokens, &headers(&["Email"])).unwrap();
        let rendered = render(&template, &row(&[("Email", "a@b.com")]));
        assert_eq!(rendered, toks(&["info", "user", "a@b.com"]));
    }

    #[test]
    fn test_regex_substitution_with_group_reference() {
        let tokens = toks(&[
            "update",
            "user",
            "~~Email~~",
            "firstname",
            r"~~First~!~^(\w).*~!~\1~~",
        ]);
        let template =
            parse_template(&tokens, &headers(&["Email", "First"])).unwrap();
        let rendered = render(
            &template,
            &row(&[("Email", "a@b.com"), ("First", "Alice")]),
        );
        assert_eq!(
            rendered,
            toks(&["update", "user", "a@b.com", "firstname", "A"])
        );
    }

    #[test]
    fn test_multiple_references_in_one_token() {
        let tokens = toks(&["~~First~~.~~Last~~@example.com"]);
        let template = parse_template(&tokens, &headers(&["First", "Last"])).unwrap();
        let rendered = render(
            &template,
            &row(&[("First", "alice"), ("Last", "smith")]),
        );
        assert_eq!(rendered, toks(&["alice.smith@example.com"]));
    }

    #[test]
    fn test_plain_and_regex_cooccur_in_one_token() {
        let tokens = toks(&[r"~~Last~~-~~First~!~^(\w).*~!~\1~~"]);
        let template = parse_template(&tokens, &headers(&["First", "Last"])).unwrap();
        let rendered = render(
            &template,
            &row(&[("First", "Alice"), ("Last", "Smith")]),
        );
        assert_eq!(rendered, toks(&["Smith-A"]));
    }

    #[test]
    fn test_whole_token_shorthand() {
        let tokens = toks(&["info", "user", "~Email"]);
        let template = parse_template(&tokens, &headers(&["Email"])).unwrap();
        let rendered = render(&template, &row(&[("Email", "a@b.com")]));
        assert_eq!(rendered, toks(&["info", "user", "a@b.com"]));
    }

    #[test]
    fn test_shorthand_requires_known_field() {
        let tokens = toks(&["~Missing"]);
        let err = parse_template(&tokens, &headers(&["Email"])).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownField { ref field, .. } if field == "Missing"));
    }

    #[test]
    fn test_unknown_field_fails_at_parse_time() {
        let tokens = toks(&["update", "user", "~~Emial~~"]);
        let err = parse_template(&tokens, &headers(&["Email", "First"])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Emial"));
        assert!(message.contains("Email, First"));
    }

    #[test]
    fn test_malformed_marker_is_rejected() {
        let tokens = toks(&["~~Email~!~pattern~~"]);
        let err = parse_template(&tokens, &headers(&["Email"])).unwrap_err();
        assert!(matches!(err, TemplateError::BadSyntax { .. }));
    }

    #[test]
    fn test_bad_pattern_is_rejected_at_parse_time() {
        let tokens = toks(&[r"~~Email~!~(unclosed~!~x~~"]);
        let err = parse_template(&tokens, &headers(&["Email"])).unwrap_err();
        assert!(matches!(err, TemplateError::BadPattern { .. }));
    }

    #[test]
    fn test_empty_value_contributes_empty_string() {
        let tokens = toks(&["phone", "~~Phone~~", "initial", r"~~Phone~!~^(\d).*~!~\1~~"]);
        let template = parse_template(&tokens, &headers(&["Phone"])).unwrap();
        // Empty value: plain yields "", transform is skipped.
        let rendered = render(&template, &row(&[("Phone", "")]));
        assert_eq!(rendered, toks(&["phone", "", "initial", ""]));
        // Absent value behaves the same.
        let rendered = render(&template, &row(&[]));
        assert_eq!(rendered, toks(&["phone", "", "initial", ""]));
    }

    #[test]
    fn test_lone_tilde_is_literal() {
        let tokens = toks(&["~"]);
        let template = parse_template(&tokens, &headers(&["Email"])).unwrap();
        assert!(template.is_literal());
        assert_eq!(render(&template, &row(&[])), toks(&["~"]));
    }

    #[test]
    fn test_group_ref_rewrite() {
        assert_eq!(rewrite_group_refs(r"\1"), "${1}");
        assert_eq!(rewrite_group_refs(r"a\2b"), "a${2}b");
        assert_eq!(rewrite_group_refs(r"\\"), r"\\");
        assert_eq!(rewrite_group_refs("plain"), "plain");
    }
}
