//! Keyword search over the record set.

use super::columns::{ClientField, ColumnMap};
use super::{Record, RowIndex};
use std::fmt;
use std::str::FromStr;

/// How multiple keywords combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Every keyword must match (AND).
    #[default]
    All,
    /// At least one keyword must match (OR).
    Any,
}

impl MatchMode {
    pub fn toggle(self) -> Self {
        match self {
            MatchMode::All => MatchMode::Any,
            MatchMode::Any => MatchMode::All,
        }
    }

    /// Short label for the controls bar.
    pub fn label(&self) -> &'static str {
        match self {
            MatchMode::All => "AND",
            MatchMode::Any => "OR",
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "and" => Ok(MatchMode::All),
            "any" | "or" => Ok(MatchMode::Any),
            other => Err(format!(
                "Invalid match mode: '{}'. Must be 'all' (and) or 'any' (or)",
                other
            )),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::All => f.write_str("all"),
            MatchMode::Any => f.write_str("any"),
        }
    }
}

impl From<clientbook_cli::MatchModeArg> for MatchMode {
    fn from(arg: clientbook_cli::MatchModeArg) -> Self {
        match arg {
            clientbook_cli::MatchModeArg::All => MatchMode::All,
            clientbook_cli::MatchModeArg::Any => MatchMode::Any,
        }
    }
}

/// Split a query on Unicode whitespace.
pub fn tokenize(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_string).collect()
}

/// Filtered rows of a store, borrowed in original order with original indices.
#[derive(Debug, Clone)]
pub struct View<'a> {
    records: Vec<&'a Record>,
}

impl<'a> View<'a> {
    pub(crate) fn new(records: Vec<&'a Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&'a Record> {
        self.records.get(position).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.records.iter().copied()
    }

    pub fn indices(&self) -> Vec<RowIndex> {
        self.records.iter().map(|r| r.index).collect()
    }
}

/// Resolve configured search fields to column positions.
///
/// Each entry is a field key (`name`, `phone`, ...) or a literal column name.
/// Unknown entries are skipped; when nothing resolves every display column is
/// searched.
pub(crate) fn resolve_fields(
    specs: &[String],
    columns: &[String],
    map: &ColumnMap,
    display: &[String],
) -> Vec<usize> {
    let position = |name: &str| columns.iter().position(|c| c == name);

    let mut out: Vec<usize> = Vec::new();
    for spec in specs {
        let resolved = ClientField::from_key(spec)
            .and_then(|f| map.get(f))
            .and_then(position)
            .or_else(|| position(spec.trim()));
        match resolved {
            Some(pos) if !out.contains(&pos) => out.push(pos),
            Some(_) => {}
            None => tracing::warn!(field = %spec, "ignoring unknown search field"),
        }
    }

    if out.is_empty() {
        out = display.iter().filter_map(|c| position(c)).collect();
    }
    out
}

/// Does one row satisfy the lower-cased `needles` under `mode`?
///
/// A needle must fall inside a single field; fields are never concatenated.
pub(crate) fn row_matches(
    record: &Record,
    fields: &[usize],
    needles: &[String],
    mode: MatchMode,
) -> bool {
    let haystacks: Vec<String> = fields
        .iter()
        .filter_map(|&pos| record.values.get(pos))
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string().to_lowercase())
        .collect();

    let hit = |needle: &String| haystacks.iter().any(|h| h.contains(needle.as_str()));

    match mode {
        MatchMode::All => needles.iter().all(hit),
        MatchMode::Any => needles.iter().any(hit),
    }
}
