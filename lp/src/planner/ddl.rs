//! Table identifier extraction from `CREATE TABLE` statements

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::domain::DdlItem;

/// Catalog assumed for one- and two-part names
pub const DEFAULT_CATALOG: &str = "catalog";

/// Schema assumed for one-part names
pub const DEFAULT_SCHEMA: &str = "public";

static CREATE_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?([`"\w.]+)"#).expect("static regex")
});

/// A source table named by a DDL statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIdentifier {
    pub catalog: String,
    pub schema: String,
    pub table: String,
    /// Everything after the table name: columns, properties, `WITH (...)`
    pub body: String,
    /// The statement this identifier was parsed from, normalized
    pub original: String,
}

impl TableIdentifier {
    /// `catalog.schema.table`
    pub fn qualified(&self) -> String {
        format!("{}.{}.{}", self.catalog, self.schema, self.table)
    }

    /// Parse one statement, `None` when it does not create a table
    pub fn parse(statement: &str) -> Option<Self> {
        let stmt = statement.trim().trim_end_matches(';').trim_end();
        let caps = CREATE_TABLE.captures(stmt)?;
        let name = caps.get(1)?;

        let parts: Vec<&str> = name
            .as_str()
            .split('.')
            .map(|part| part.trim_matches(|c| c == '`' || c == '"'))
            .filter(|part| !part.is_empty())
            .collect();

        let (catalog, schema, table) = match parts.as_slice() {
            [table] => (DEFAULT_CATALOG, DEFAULT_SCHEMA, *table),
            [schema, table] => (DEFAULT_CATALOG, *schema, *table),
            [catalog, schema, table] => (*catalog, *schema, *table),
            _ => {
                debug!(name = %name.as_str(), "TableIdentifier::parse: unsupported name shape");
                return None;
            }
        };

        let mut body = stmt[name.end()..].trim_start().to_string();
        if body.is_empty() {
            // text ahead of `CREATE TABLE` (comments, other statements) is never the body
            let start = caps.get(0).map_or(0, |m| m.start());
            body = recover_body(&stmt[start..]).unwrap_or_default();
        }

        Some(Self {
            catalog: catalog.to_string(),
            schema: schema.to_string(),
            table: table.to_string(),
            body,
            original: stmt.to_string(),
        })
    }
}

/// Parse every table-creating statement, skipping the rest silently
pub fn parse_tables(items: &[DdlItem]) -> Vec<TableIdentifier> {
    debug!(item_count = items.len(), "parse_tables: called");
    let tables: Vec<TableIdentifier> = items
        .iter()
        .filter_map(|item| TableIdentifier::parse(&item.statement))
        .collect();
    debug!(table_count = tables.len(), "parse_tables: done");
    tables
}

/// Find the last top-level parenthesized block and return it with whatever follows
///
/// Quoted text and `--` comments are skipped so parentheses inside them do
/// not count.
fn recover_body(stmt: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut open_at = None;
    let mut last_block = None;
    let mut quote: Option<char> = None;
    let mut chars = stmt.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '-' if matches!(chars.peek(), Some((_, '-'))) => {
                for (_, skipped) in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
            }
            '(' => {
                if depth == 0 {
                    open_at = Some(idx);
                }
                depth += 1;
            }
            ')' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    last_block = open_at;
                }
            }
            _ => {}
        }
    }

    last_block.map(|start| stmt[start..].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_part_name() {
        let t = TableIdentifier::parse("CREATE TABLE sales.public.orders (id BIGINT, ts TIMESTAMP);").unwrap();
        assert_eq!(t.catalog, "sales");
        assert_eq!(t.schema, "public");
        assert_eq!(t.table, "orders");
        assert_eq!(t.body, "(id BIGINT, ts TIMESTAMP)");
        assert_eq!(t.qualified(), "sales.public.orders");
    }

    #[test]
    fn test_defaults_for_short_names() {
        let t = TableIdentifier::parse("create table orders (id int)").unwrap();
        assert_eq!((t.catalog.as_str(), t.schema.as_str()), ("catalog", "public"));

        let t = TableIdentifier::parse("CREATE TABLE shop.orders (id int)").unwrap();
        assert_eq!((t.catalog.as_str(), t.schema.as_str()), ("catalog", "shop"));
    }

    #[test]
    fn test_quoted_parts_are_unquoted() {
        let t = TableIdentifier::parse(r#"CREATE TABLE "sales"."public"."orders" (id INT)"#).unwrap();
        assert_eq!(t.qualified(), "sales.public.orders");

        let t = TableIdentifier::parse("CREATE TABLE `orders`(id INT)").unwrap();
        assert_eq!(t.table, "orders");
        assert_eq!(t.body, "(id INT)");
    }

    #[test]
    fn test_if_not_exists() {
        let t = TableIdentifier::parse("CREATE TABLE IF NOT EXISTS a.b.c (x INT)").unwrap();
        assert_eq!(t.qualified(), "a.b.c");
    }

    #[test]
    fn test_non_matching_and_too_many_parts_are_skipped() {
        assert!(TableIdentifier::parse("SELECT 1").is_none());
        assert!(TableIdentifier::parse("CREATE VIEW v AS SELECT 1").is_none());
        assert!(TableIdentifier::parse("CREATE TABLE a.b.c.d (x INT)").is_none());
        assert!(TableIdentifier::parse("").is_none());
    }

    #[test]
    fn test_missing_body_is_empty() {
        let t = TableIdentifier::parse("CREATE TABLE a.b.c").unwrap();
        assert_eq!(t.body, "");
    }

    #[test]
    fn test_leading_comment_is_not_the_body() {
        let t = TableIdentifier::parse("/* (a INT) */ CREATE TABLE t").unwrap();
        assert_eq!(t.table, "t");
        assert_eq!(t.body, "");

        let t = TableIdentifier::parse("-- orders (legacy)\nCREATE TABLE s.orders (id INT)").unwrap();
        assert_eq!(t.body, "(id INT)");
    }

    #[test]
    fn test_recover_body_skips_quotes_and_comments() {
        assert_eq!(
            recover_body("x (a INT, b VARCHAR(3)) WITH (format = 'ORC')").as_deref(),
            Some("(format = 'ORC')")
        );
        assert_eq!(recover_body("x '(' -- (ignored)\n(id INT)").as_deref(), Some("(id INT)"));
        assert_eq!(recover_body("no parens here"), None);
        assert_eq!(recover_body("unbalanced (a INT"), None);
    }

    #[test]
    fn test_parse_tables_keeps_order_and_skips() {
        let items = vec![
            DdlItem::new("CREATE TABLE a.b.one (x INT)"),
            DdlItem::new("DROP TABLE a.b.gone"),
            DdlItem::new("CREATE TABLE a.b.two (y INT)"),
        ];
        let tables = parse_tables(&items);
        let names: Vec<_> = tables.iter().map(|t| t.table.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
    }
}
