// src/models.rs

use regex::Regex;
use std::collections::HashMap;

/// A CSV data row, keyed by header name.
pub type Row = HashMap<String, String>;

/// One compiled unit of work for the batch executor.
///
/// A `Command` job is a fully-resolved argument vector for one independent
/// sub-invocation of the program. A `Barrier` is a synchronization point:
/// every job submitted before it must complete before any job after it is
/// submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Command(Vec<String>),
    Barrier,
}

/// A row filter from CSV-template mode: the row's value for `field` must
/// match `pattern` (all filters must match for the row to produce a job).
#[derive(Debug, Clone)]
pub struct RowFilter {
    pub field: String,
    pub pattern: Regex,
}

/// The substitution flavor of a [`FieldReference`].
#[derive(Debug, Clone)]
pub enum FieldRefKind {
    /// `~~field~~` or the whole-token shorthand `~field`: the row value is
    /// spliced in verbatim.
    Plain,
    /// `~~field~!~pattern~!~replacement~~`: the row value is passed through
    /// a regex replacement before splicing.
    Transform {
        pattern: Regex,
        replacement: String,
    },
}

/// One parsed substitution site inside a template token.
///
/// `start..end` are byte offsets of the full marker within the original
/// token; references within one token never overlap and are ordered
/// left-to-right.
#[derive(Debug, Clone)]
pub struct FieldReference {
    pub field: String,
    pub kind: FieldRefKind,
    pub start: usize,
    pub end: usize,
}

/// A parsed command template: the original tokens plus, for each token that
/// contains substitution sites, the ordered list of references found in it.
///
/// Immutable once built; rendered once per CSV row.
#[derive(Debug, Clone, Default)]
pub struct CommandTemplate {
    pub tokens: Vec<String>,
    pub refs: HashMap<usize, Vec<FieldReference>>,
}

impl CommandTemplate {
    /// True if no token contains a substitution site.
    pub fn is_literal(&self) -> bool {
        self.refs.is_empty()
    }
}
