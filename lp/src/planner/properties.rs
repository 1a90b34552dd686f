//! Recommended Iceberg table properties

use std::sync::LazyLock;

use regex::Regex;

static WITH_CLAUSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bWITH\s*\(").expect("static regex"));

/// Properties appended to generated tables that declare none of their own
pub const RECOMMENDED_PROPERTIES: &[(&str, &str)] = &[
    ("format-version", "2"),
    ("write.format.default", "PARQUET"),
    ("commit.manifest.min-count-to-merge", "5"),
    ("write.parquet.compression-codec", "zstd"),
    ("write.parquet.compression-level", "7"),
    ("write.target-file-size-bytes", "536870912"),
    ("history.expire.min-snapshots-to-keep", "5"),
];

/// `'k'='v'` pairs joined for a `WITH (...)` clause, two-space indented
pub fn properties_list() -> String {
    RECOMMENDED_PROPERTIES
        .iter()
        .map(|(k, v)| format!("'{}'='{}'", k, v))
        .collect::<Vec<_>>()
        .join(",\n  ")
}

/// Whether a table body already declares a `WITH (...)` properties clause
pub fn has_with_clause(body: &str) -> bool {
    WITH_CLAUSE.is_match(body)
}

/// Full `WITH (...)` clause, starting on a new line
pub fn with_clause() -> String {
    format!("\nWITH (\n  {}\n)", properties_list())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_clause_layout() {
        let clause = with_clause();
        assert!(clause.starts_with("\nWITH (\n  'format-version'='2',\n  'write.format.default'='PARQUET',"));
        assert!(clause.ends_with("'history.expire.min-snapshots-to-keep'='5'\n)"));
        assert_eq!(clause.matches("'='").count(), RECOMMENDED_PROPERTIES.len());
    }

    #[test]
    fn test_has_with_clause() {
        assert!(has_with_clause("(x INT) WITH (format = 'ORC')"));
        assert!(has_with_clause("(x INT)\nwith(partitioning = ARRAY['x'])"));
        assert!(!has_with_clause("(id BIGINT, withdrawn BOOLEAN)"));
        assert!(!has_with_clause("(with_tax DOUBLE) -- keep with care"));
        assert!(!has_with_clause(""));
    }
}
