//! Planning request as submitted by clients

use serde::{Deserialize, Serialize};

/// One DDL statement describing an existing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdlItem {
    pub statement: String,
}

impl DdlItem {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
        }
    }
}

/// One query of the observed workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadQuery {
    /// Opaque client-chosen identifier
    #[serde(rename = "queryid")]
    pub id: String,

    /// SQL text
    #[serde(rename = "query")]
    pub text: String,

    /// How often the query runs
    #[serde(rename = "runquantity")]
    pub run_quantity: u64,
}

impl WorkloadQuery {
    pub fn new(id: impl Into<String>, text: impl Into<String>, run_quantity: u64) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            run_quantity,
        }
    }
}

/// Everything a client sends to `/new`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningRequest {
    /// Warehouse connection descriptor (`jdbc://host:port/catalog/schema?user=...`)
    pub url: String,

    #[serde(default)]
    pub ddl: Vec<DdlItem>,

    #[serde(default)]
    pub queries: Vec<WorkloadQuery>,
}
