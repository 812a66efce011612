use crate::index::reader::SearchTable;
use crate::index::types::{PageKind, SearchRecord};
use crate::query::parser::{Query, QueryFilters, QueryNode};
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::Serialize;

/// Case-insensitive substring lookup over the table.
///
/// Returns every record whose key contains `query`, in table order. An
/// empty query returns every record; no match returns an empty vector.
pub fn lookup<'a>(table: &'a SearchTable, query: &str) -> Vec<&'a SearchRecord> {
    literal_hits(table, query)
        .into_iter()
        .filter_map(|hit| table.get(hit.index))
        .collect()
}

/// [`lookup`] as hits: record indices with the span of the query in each key.
/// No query syntax applies; `query` is matched as typed.
pub fn literal_hits(table: &SearchTable, query: &str) -> Vec<Hit> {
    let needle = query.to_lowercase();
    table
        .records()
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let start = record.search_key.find(needle.as_str())?;
            let span = (!needle.is_empty()).then_some((start, start + needle.len()));
            Some(Hit { index, span })
        })
        .collect()
}

/// A record matched by a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Hit {
    /// Index of the record in the table
    pub index: usize,
    /// Byte range of the first positive match within the record's search key
    pub span: Option<(usize, usize)>,
}

impl Hit {
    /// Map the match span onto the record's display name, when the name and
    /// the decoded key line up byte for byte
    pub fn name_span(&self, record: &SearchRecord) -> Option<(usize, usize)> {
        let (start, end) = self.span?;
        let lowered = record.name.to_lowercase();
        if lowered.len() != record.name.len() || lowered != record.search_key {
            return None;
        }
        record.name.get(start..end).map(|_| (start, end))
    }
}

/// Query executor
pub struct QueryExecutor<'a> {
    table: &'a SearchTable,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(table: &'a SearchTable) -> Self {
        Self { table }
    }

    /// Execute a query and return hits in table order
    pub fn execute(&self, query: &Query) -> Result<Vec<Hit>> {
        let matcher = Matcher::compile(&query.root)?;
        let filters = CompiledFilters::new(&query.filters);

        let limit = match query.options.limit {
            0 => usize::MAX,
            n => n,
        };

        let hits = self
            .table
            .records()
            .iter()
            .enumerate()
            .filter(|(_, record)| filters.accepts(record))
            .filter_map(|(index, record)| {
                matcher
                    .evaluate(&record.search_key)
                    .map(|span| Hit { index, span })
            })
            .take(limit)
            .collect();

        Ok(hits)
    }
}

/// Query tree with lowercased needles and compiled regexes
enum Matcher {
    Substring(String),
    Prefix(String),
    Regex(Regex),
    And(Vec<Matcher>),
    Or(Vec<Matcher>),
    Not(Box<Matcher>),
    Always,
}

impl Matcher {
    fn compile(node: &QueryNode) -> Result<Self> {
        Ok(match node {
            QueryNode::Literal(text) | QueryNode::Phrase(text) => {
                Matcher::Substring(text.to_lowercase())
            }
            QueryNode::Prefix(text) => Matcher::Prefix(text.to_lowercase()),
            QueryNode::Regex(pattern) => Matcher::Regex(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("Invalid regex: {}", pattern))?,
            ),
            QueryNode::And(nodes) => Matcher::And(
                nodes.iter().map(Matcher::compile).collect::<Result<Vec<_>>>()?,
            ),
            QueryNode::Or(nodes) => Matcher::Or(
                nodes.iter().map(Matcher::compile).collect::<Result<Vec<_>>>()?,
            ),
            QueryNode::Not(inner) => Matcher::Not(Box::new(Matcher::compile(inner)?)),
            QueryNode::Empty => Matcher::Always,
        })
    }

    /// `None` if the key does not match; otherwise the first positive span, if any
    fn evaluate(&self, key: &str) -> Option<Option<(usize, usize)>> {
        match self {
            Matcher::Substring(needle) => key
                .find(needle.as_str())
                .map(|start| Some((start, start + needle.len()))),
            Matcher::Prefix(needle) => key
                .starts_with(needle.as_str())
                .then_some(Some((0, needle.len()))),
            Matcher::Regex(re) => re.find(key).map(|m| Some((m.start(), m.end()))),
            Matcher::And(children) => {
                let mut span = None;
                for child in children {
                    let child_span = child.evaluate(key)?;
                    span = span.or(child_span);
                }
                Some(span)
            }
            Matcher::Or(children) => children.iter().find_map(|child| child.evaluate(key)),
            Matcher::Not(inner) => match inner.evaluate(key) {
                Some(_) => None,
                None => Some(None),
            },
            Matcher::Always => Some(None),
        }
    }
}

/// Filters with their comparison values prepared once per query
struct CompiledFilters {
    scope: Option<String>,
    section: Option<String>,
    kind: Option<Option<PageKind>>,
    page: Option<String>,
}

impl CompiledFilters {
    fn new(filters: &QueryFilters) -> Self {
        Self {
            scope: filters.scope.as_ref().map(|s| s.to_lowercase()),
            section: filters.section.as_ref().map(|s| s.to_lowercase()),
            kind: filters.kind.as_deref().map(PageKind::from_name),
            page: filters.page.as_ref().map(|s| s.to_lowercase()),
        }
    }

    fn accepts(&self, record: &SearchRecord) -> bool {
        if let Some(ref section) = self.section {
            match record.section() {
                Some(s) if s.name() == section => {}
                _ => return false,
            }
        }

        if let Some(ref scope) = self.scope
            && !record
                .locations
                .iter()
                .any(|l| l.scope.to_lowercase().contains(scope.as_str()))
        {
            return false;
        }

        if let Some(kind) = self.kind {
            // Unknown kind names match nothing
            let Some(kind) = kind else {
                return false;
            };
            if !record.locations.iter().any(|l| l.page_kind() == kind) {
                return false;
            }
        }

        if let Some(ref page) = self.page
            && !record
                .locations
                .iter()
                .any(|l| l.page.to_lowercase().contains(page.as_str()))
        {
            return false;
        }

        true
    }
}
