//! Untrusted candidate plans and their validation against the fallback
//!
//! A candidate arrives as free text from the advisor. It is decoded field by
//! field from a `serde_json::Value` (never straight into [`Plan`]), each
//! section is validated on its own, and the candidate replaces the
//! deterministic plan only when every section passed.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::mapping::{NameMapping, TargetSchema};
use super::rewriter::rewrite;
use crate::domain::{Plan, QueryOut, SqlStatement};

static FENCED_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("static regex"));

/// A query suggested by the advisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    pub id: String,
    pub text: String,
}

/// Decoded, normalized, not yet validated candidate sections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePlan {
    pub ddl: Vec<String>,
    pub migrations: Vec<String>,
    pub queries: Vec<CandidateQuery>,
}

impl CandidatePlan {
    /// Extract and decode a candidate from raw advisor output
    pub fn from_text(raw: &str) -> Option<Self> {
        let snippet = extract_json_snippet(raw)?;
        let value: Value = match serde_json::from_str(snippet) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "CandidatePlan::from_text: snippet is not JSON");
                return None;
            }
        };
        Self::from_value(&value)
    }

    /// Decode sections from a JSON object; anything that is not an object has no candidate
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            ddl: statements(object.get("ddl")),
            migrations: statements(object.get("migrations")),
            queries: queries(object.get("queries")),
        })
    }
}

/// Pick the JSON object out of free text
///
/// Prefers the first fenced code block holding an object, otherwise the span
/// from the first `{` to the last `}`.
pub fn extract_json_snippet(text: &str) -> Option<&str> {
    if text.is_empty() {
        return None;
    }
    if let Some(m) = FENCED_OBJECT.captures(text).and_then(|caps| caps.get(1)) {
        return Some(m.as_str());
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Outcome of merging a candidate into the fallback plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub plan: Plan,
    pub ddl_accepted: bool,
    pub migrations_accepted: bool,
    pub queries_accepted: bool,
}

impl MergeOutcome {
    /// True when the candidate replaced the fallback
    pub fn adopted(&self) -> bool {
        self.ddl_accepted && self.migrations_accepted && self.queries_accepted
    }
}

/// Validate every section of `candidate` and merge, or keep `fallback` whole
pub fn merge_with_fallback(
    candidate: &CandidatePlan,
    fallback: &Plan,
    target: &TargetSchema,
    mapping: &NameMapping,
) -> MergeOutcome {
    debug!(
        ddl_count = candidate.ddl.len(),
        migration_count = candidate.migrations.len(),
        query_count = candidate.queries.len(),
        "merge_with_fallback: called"
    );
    let ddl = select_ddl(&candidate.ddl, target);
    let migrations = select_migrations(&candidate.migrations, target);
    let queries = select_queries(&candidate.queries, &fallback.queries, target, mapping);

    let (ddl_accepted, migrations_accepted, queries_accepted) =
        (ddl.is_some(), migrations.is_some(), queries.is_some());
    debug!(
        ddl_accepted,
        migrations_accepted, queries_accepted, "merge_with_fallback: sections evaluated"
    );

    let plan = match (ddl, migrations, queries) {
        (Some(ddl), Some(migrations), Some(queries)) => Plan {
            ddl,
            migrations,
            queries,
        },
        _ => fallback.clone(),
    };

    MergeOutcome {
        plan,
        ddl_accepted,
        migrations_accepted,
        queries_accepted,
    }
}

/// De-duplicated DDL led by exactly the target `CREATE SCHEMA`, or `None`
fn select_ddl(candidate: &[String], target: &TargetSchema) -> Option<Vec<SqlStatement>> {
    if candidate.is_empty() {
        return None;
    }

    let mut seen = HashSet::new();
    let mut cleaned: Vec<String> = candidate
        .iter()
        .filter(|s| seen.insert(s.to_lowercase()))
        .cloned()
        .collect();

    let required = target.create_statement();
    match cleaned.first_mut() {
        Some(first) if first.to_lowercase().starts_with("create schema") => *first = required,
        _ => cleaned.insert(0, required),
    }

    let prefixed = cleaned.iter().skip(1).all(|s| target.is_referenced_by(s));
    prefixed.then(|| cleaned.into_iter().map(SqlStatement::new).collect())
}

fn select_migrations(candidate: &[String], target: &TargetSchema) -> Option<Vec<SqlStatement>> {
    if candidate.is_empty() || !candidate.iter().all(|s| target.is_referenced_by(s)) {
        return None;
    }
    Some(candidate.iter().cloned().map(SqlStatement::new).collect())
}

/// Candidate texts for known ids, fallback text for the rest
///
/// An empty workload leaves nothing to validate, so the section is rejected.
fn select_queries(
    candidate: &[CandidateQuery],
    fallback: &[QueryOut],
    target: &TargetSchema,
    mapping: &NameMapping,
) -> Option<Vec<QueryOut>> {
    let by_id: HashMap<&str, &str> = candidate.iter().map(|q| (q.id.as_str(), q.text.as_str())).collect();

    let selected: Vec<QueryOut> = fallback
        .iter()
        .map(|q| match by_id.get(q.id.as_str()) {
            Some(text) => QueryOut::new(q.id.clone(), rewrite(text.trim(), mapping)),
            None => q.clone(),
        })
        .collect();

    let prefixed = !selected.is_empty() && selected.iter().all(|q| target.is_referenced_by(&q.text));
    prefixed.then_some(selected)
}

fn normalize(statement: &str) -> String {
    statement.trim().trim_end_matches(';').trim_end().to_string()
}

/// Text of a scalar JSON value, `None` for empty strings and non-scalars
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn statements(section: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = section else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(map) => ["statement", "sql"]
                .iter()
                .find_map(|key| map.get(*key).and_then(scalar_text)),
            Value::String(s) => Some(s.clone()),
            // kept as JSON text so the prefix check rejects the section
            other => Some(other.to_string()),
        })
        .map(|s| normalize(&s))
        .filter(|s| !s.is_empty())
        .collect()
}

fn queries(section: Option<&Value>) -> Vec<CandidateQuery> {
    let Some(Value::Array(items)) = section else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let (id, text) = match item {
                Value::Object(map) => (
                    ["queryid", "query_id"]
                        .iter()
                        .find_map(|key| map.get(*key).and_then(scalar_text))?,
                    ["query", "sql"]
                        .iter()
                        .find_map(|key| map.get(*key).and_then(scalar_text))?,
                ),
                Value::Array(pair) if pair.len() >= 2 => (scalar_text(&pair[0])?, scalar_text(&pair[1])?),
                _ => return None,
            };
            Some(CandidateQuery { id, text })
        })
        .collect()
}
