//! Rule-based plan synthesis
//!
//! Always produces a complete plan. The advisor's candidate is merged into
//! this plan section by section and only replaces it when fully accepted.

use tracing::debug;

use super::ddl::TableIdentifier;
use super::mapping::{NameMapping, TargetSchema};
use super::properties::{has_with_clause, properties_list, with_clause};
use super::rewriter::rewrite_workload;
use crate::domain::{Plan, QueryOut, SqlStatement, WorkloadQuery};

/// Builds the fallback plan for one planning run
pub struct DeterministicPlanner<'a> {
    tables: &'a [TableIdentifier],
    target: &'a TargetSchema,
    mapping: &'a NameMapping,
}

impl<'a> DeterministicPlanner<'a> {
    pub fn new(tables: &'a [TableIdentifier], target: &'a TargetSchema, mapping: &'a NameMapping) -> Self {
        Self {
            tables,
            target,
            mapping,
        }
    }

    pub fn plan(&self, queries: &[WorkloadQuery]) -> Plan {
        debug!(
            table_count = self.tables.len(),
            query_count = queries.len(),
            target = %self.target.prefix(),
            "DeterministicPlanner::plan: called"
        );
        Plan {
            ddl: self.ddl(),
            migrations: self.migrations(),
            queries: self.queries(queries),
        }
    }

    pub fn ddl(&self) -> Vec<SqlStatement> {
        let mut statements = vec![SqlStatement::new(self.target.create_statement())];
        if self.tables.is_empty() {
            debug!("DeterministicPlanner::ddl: no parsed tables, using star schema");
            statements.extend(self.star_schema_ddl());
            return statements;
        }

        for t in self.tables {
            let mut statement = format!("CREATE TABLE {} {}", self.target.qualify(&t.table), t.body)
                .trim_end()
                .to_string();
            if !has_with_clause(&t.body) {
                statement.push_str(&with_clause());
            }
            statements.push(SqlStatement::new(statement));
        }
        statements
    }

    pub fn migrations(&self) -> Vec<SqlStatement> {
        if self.tables.is_empty() {
            return self.star_schema_migrations();
        }
        self.tables
            .iter()
            .map(|t| {
                SqlStatement::new(format!(
                    "INSERT INTO {}\nSELECT * FROM {}",
                    self.target.qualify(&t.table),
                    t.qualified()
                ))
            })
            .collect()
    }

    pub fn queries(&self, queries: &[WorkloadQuery]) -> Vec<QueryOut> {
        rewrite_workload(queries, self.mapping)
    }

    fn star_schema_ddl(&self) -> Vec<SqlStatement> {
        let props = properties_list();
        vec![
            SqlStatement::new(format!(
                "CREATE TABLE {} (\n  event_id BIGINT,\n  user_id BIGINT,\n  ts TIMESTAMP,\n  sku VARCHAR,\n  price DOUBLE\n)\n\
                 WITH (\n  partitioning = ARRAY['days(ts)'],\n  {}\n)",
                self.target.qualify("fact_events"),
                props
            )),
            SqlStatement::new(format!(
                "CREATE TABLE {} (\n  user_id BIGINT,\n  country VARCHAR,\n  segment VARCHAR\n)\nWITH (\n  {}\n)",
                self.target.qualify("dim_users"),
                props
            )),
        ]
    }

    fn star_schema_migrations(&self) -> Vec<SqlStatement> {
        let cat = &self.target.catalog;
        vec![
            SqlStatement::new(format!(
                "INSERT INTO {}\nSELECT e.event_id, e.user_id, e.ts, e.sku, e.price\n\
                 FROM {cat}.public.events e LEFT JOIN {cat}.public.items i\nON e.sku = i.sku",
                self.target.qualify("fact_events"),
            )),
            SqlStatement::new(format!(
                "INSERT INTO {}\nSELECT DISTINCT u.user_id, u.country, u.segment\nFROM {cat}.public.users u",
                self.target.qualify("dim_users"),
            )),
        ]
    }
}
