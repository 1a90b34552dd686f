//! Optimization plan returned to clients

use serde::{Deserialize, Serialize};

/// One SQL statement of a plan section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlStatement {
    pub statement: String,
}

impl SqlStatement {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
        }
    }
}

/// A rewritten workload query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOut {
    #[serde(rename = "queryid")]
    pub id: String,

    #[serde(rename = "query")]
    pub text: String,
}

impl QueryOut {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Target schema DDL, migrations into it, and the rewritten workload
///
/// `ddl[0]` is always the `CREATE SCHEMA` statement for the target schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub ddl: Vec<SqlStatement>,
    pub migrations: Vec<SqlStatement>,
    pub queries: Vec<QueryOut>,
}

impl Plan {
    /// Serialize for persistence in a task record
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a plan previously written by [`Plan::to_json`]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Text of every DDL statement, in order
    pub fn ddl_texts(&self) -> impl Iterator<Item = &str> {
        self.ddl.iter().map(|s| s.statement.as_str())
    }

    /// Text of every migration statement, in order
    pub fn migration_texts(&self) -> impl Iterator<Item = &str> {
        self.migrations.iter().map(|s| s.statement.as_str())
    }
}
