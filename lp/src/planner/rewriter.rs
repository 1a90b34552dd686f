//! Text-level query rewriting
//!
//! Substitutes source table names with their target names and adds fixed
//! optimization hints. Works on substrings, not on a parsed statement: names
//! inside string literals are rewritten too.

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use super::mapping::NameMapping;
use crate::domain::{QueryOut, WorkloadQuery};

/// Literal `(pattern, replacement)` hints applied after name substitution
pub const ANNOTATION_RULES: &[(&str, &str)] = &[
    ("SELECT *", "SELECT /* explicit columns required */ *"),
    ("JOIN", "/* ensure join keys are partition/sort-aligned */ JOIN"),
];

/// Substitute names, then annotate
pub fn rewrite(text: &str, mapping: &NameMapping) -> String {
    annotate(&substitute_names(text, mapping))
}

/// Rewrite a whole workload, keeping order and ids
pub fn rewrite_workload(queries: &[WorkloadQuery], mapping: &NameMapping) -> Vec<QueryOut> {
    debug!(query_count = queries.len(), "rewrite_workload: called");
    queries
        .iter()
        .map(|q| QueryOut::new(q.id.clone(), rewrite(&q.text, mapping)))
        .collect()
}

/// Replace every mapped name with its target, in mapping order
pub fn substitute_names(text: &str, mapping: &NameMapping) -> String {
    let mut out = text.to_string();
    for (key, target) in mapping.iter() {
        let Some(re) = key_pattern(key) else {
            continue;
        };
        out = replace_unqualified(&re, &out, target, !key.contains('.'));
    }
    out
}

/// Apply [`ANNOTATION_RULES`]; annotating twice gives the same text as once
pub fn annotate(text: &str) -> String {
    ANNOTATION_RULES.iter().fold(text.to_string(), |acc, (pattern, replacement)| {
        acc.replace(replacement, pattern).replace(pattern, replacement)
    })
}

fn key_pattern(key: &str) -> Option<Regex> {
    let escaped = regex::escape(key);
    let pattern = if key.starts_with('"') {
        escaped
    } else {
        format!(r"\b{}\b", escaped)
    };
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(%key, error = %e, "key_pattern: skipping unusable mapping key");
            None
        }
    }
}

/// Replace matches that are not a segment of a longer dotted or quoted name
///
/// A trailing `.` only blocks single-segment keys: `orders.id` is a column of
/// some `orders` alias, while `sales.public.orders.id` names the table itself.
fn replace_unqualified(re: &Regex, text: &str, target: &str, single_segment: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in re.find_iter(text) {
        let before = text[..m.start()].chars().next_back();
        let after = text[m.end()..].chars().next();
        let attached = matches!(before, Some('.') | Some('"'))
            || after == Some('"')
            || (single_segment && after == Some('.'));
        if attached {
            continue;
        }
        out.push_str(&text[last..m.start()]);
        out.push_str(target);
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::ddl::TableIdentifier;
    use crate::planner::mapping::TargetSchema;
    use proptest::prelude::*;

    fn orders_mapping() -> (TargetSchema, NameMapping) {
        let target = TargetSchema::new("sales", "opt_1234abcd");
        let table = TableIdentifier::parse("CREATE TABLE sales.public.orders (id BIGINT)").unwrap();
        let mapping = NameMapping::build(&[table], &target);
        (target, mapping)
    }

    #[test]
    fn test_bare_name_is_qualified() {
        let (_, mapping) = orders_mapping();
        assert_eq!(
            substitute_names("SELECT id FROM orders WHERE id = 1", &mapping),
            "SELECT id FROM sales.opt_1234abcd.orders WHERE id = 1"
        );
    }

    #[test]
    fn test_all_spellings_are_rewritten() {
        let (_, mapping) = orders_mapping();
        for query in [
            "SELECT 1 FROM sales.public.orders",
            "SELECT 1 FROM \"sales\".\"public\".\"orders\"",
            "SELECT 1 FROM public.orders",
            "SELECT 1 FROM \"public\".\"orders\"",
            "SELECT 1 FROM ORDERS",
            "SELECT 1 FROM \"orders\"",
        ] {
            assert_eq!(
                substitute_names(query, &mapping),
                "SELECT 1 FROM sales.opt_1234abcd.orders",
                "query: {query}"
            );
        }
    }

    #[test]
    fn test_word_boundaries() {
        let (_, mapping) = orders_mapping();
        assert_eq!(
            substitute_names("SELECT orders_total, o.orders FROM preorders", &mapping),
            "SELECT orders_total, o.orders FROM preorders"
        );
    }

    #[test]
    fn test_qualified_column_references_follow_the_table() {
        let (_, mapping) = orders_mapping();
        assert_eq!(
            substitute_names("SELECT sales.public.orders.id FROM sales.public.orders", &mapping),
            "SELECT sales.opt_1234abcd.orders.id FROM sales.opt_1234abcd.orders"
        );
        assert_eq!(
            substitute_names("SELECT public.orders.id, orders.ts FROM public.orders", &mapping),
            "SELECT sales.opt_1234abcd.orders.id, orders.ts FROM sales.opt_1234abcd.orders"
        );
    }

    #[test]
    fn test_annotations() {
        assert_eq!(
            annotate("SELECT * FROM a JOIN b ON a.k = b.k"),
            "SELECT /* explicit columns required */ * FROM a /* ensure join keys are partition/sort-aligned */ JOIN b ON a.k = b.k"
        );
        assert_eq!(annotate("select * from a"), "select * from a");
    }

    #[test]
    fn test_sales_orders_example() {
        let (target, mapping) = orders_mapping();
        let out = rewrite("SELECT * FROM orders", &mapping);
        assert_eq!(
            out,
            "SELECT /* explicit columns required */ * FROM sales.opt_1234abcd.orders"
        );
        assert!(target.is_referenced_by(&out));
    }

    #[test]
    fn test_rewrite_workload_keeps_ids_and_order() {
        let (_, mapping) = orders_mapping();
        let queries = vec![
            WorkloadQuery::new("b", "SELECT 1 FROM orders", 1),
            WorkloadQuery::new("a", "SELECT 2", 5),
        ];
        let out = rewrite_workload(&queries, &mapping);
        assert_eq!(out[0].id, "b");
        assert_eq!(out[1].id, "a");
        assert_eq!(out[1].text, "SELECT 2");
    }

    proptest! {
        #[test]
        fn prop_rewrite_is_idempotent(
            prefix in "[a-zA-Z ,=0-9]{0,20}",
            name in prop::sample::select(vec!["orders", "public.orders", "sales.public.orders", "\"orders\"", "ORDERS"]),
            join in any::<bool>(),
            projection_kind in 0u8..3,
        ) {
            let (_, mapping) = orders_mapping();
            let projection = match projection_kind {
                0 => "*".to_string(),
                1 => "id".to_string(),
                _ => format!("{name}.id"),
            };
            let join_clause = if join { " JOIN other ON other.id = x.id" } else { "" };
            let query = format!("SELECT {projection} FROM {name} x{join_clause} WHERE {prefix}");
            let once = rewrite(&query, &mapping);
            let twice = rewrite(&once, &mapping);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_annotate_is_idempotent(text in "(SELECT \\*|JOIN|[a-z ]){0,12}") {
            let once = annotate(&text);
            prop_assert_eq!(annotate(&once), once);
        }
    }
}
