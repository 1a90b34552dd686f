//! Target schema naming and source-to-target name mapping

use rand::Rng;
use tracing::debug;

use super::ddl::{DEFAULT_CATALOG, TableIdentifier};

/// The schema every optimized artefact lands in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSchema {
    pub catalog: String,
    pub schema: String,
}

impl TargetSchema {
    pub fn new(catalog: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
        }
    }

    /// Fresh `opt_<8 hex>` schema in `catalog`
    pub fn generate(catalog: impl Into<String>) -> Self {
        let schema = format!("opt_{:08x}", rand::rng().random::<u32>());
        Self::new(catalog, schema)
    }

    /// Target schema for a run: catalog of the first parsed table, else the default catalog
    pub fn for_tables(tables: &[TableIdentifier]) -> Self {
        let catalog = tables
            .first()
            .map(|t| t.catalog.clone())
            .unwrap_or_else(|| DEFAULT_CATALOG.to_string());
        Self::generate(catalog)
    }

    /// `catalog.schema.`, the prefix every target object carries
    pub fn prefix(&self) -> String {
        format!("{}.{}.", self.catalog, self.schema)
    }

    /// `catalog.schema.table`
    pub fn qualify(&self, table: &str) -> String {
        format!("{}.{}.{}", self.catalog, self.schema, table)
    }

    /// `CREATE SCHEMA catalog.schema`
    pub fn create_statement(&self) -> String {
        format!("CREATE SCHEMA {}.{}", self.catalog, self.schema)
    }

    /// Case-insensitive check for the target prefix
    pub fn is_referenced_by(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.prefix().to_lowercase())
    }
}

/// Ordered map from every spelling of a source table name to its target name
///
/// The first registration of a key wins. Iteration follows insertion order,
/// which is also the order the rewriter substitutes in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMapping {
    entries: Vec<(String, String)>,
}

impl NameMapping {
    pub fn build(tables: &[TableIdentifier], target: &TargetSchema) -> Self {
        debug!(table_count = tables.len(), target = %target.prefix(), "NameMapping::build: called");
        let mut mapping = Self::default();
        for t in tables {
            let to = target.qualify(&t.table);
            let (c, s, n) = (&t.catalog, &t.schema, &t.table);
            for key in [
                format!("{c}.{s}.{n}"),
                format!("\"{c}\".\"{s}\".\"{n}\""),
                format!("{s}.{n}"),
                format!("\"{s}\".\"{n}\""),
                n.clone(),
                format!("\"{n}\""),
            ] {
                mapping.insert(key, to.clone());
            }
        }
        debug!(entry_count = mapping.len(), "NameMapping::build: done");
        mapping
    }

    fn insert(&mut self, key: String, target: String) {
        if self.get(&key).is_none() {
            self.entries.push((key, target));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
