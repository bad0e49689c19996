//! SQL text generation: dialects, literals, where expressions and statements.

mod builder;
pub mod dialect;
pub mod expr;
pub mod params;
pub use builder::*;
pub use dialect::Dialect;
pub use expr::{Comparator, Expr, Logic};
pub use params::*;

/// Whether a statement yields a result set rather than a row-count summary.
pub fn returns_rows(sql: &str) -> bool {
    let first = sql
        .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("")
        .to_uppercase();
    matches!(
        first.as_str(),
        "SELECT" | "SHOW" | "WITH" | "DESCRIBE" | "DESC" | "EXPLAIN" | "VALUES"
    )
}

#[cfg(test)]
mod tests {
    use super::returns_rows;

    #[test]
    fn detects_row_statements() {
        assert!(returns_rows("  select 1"));
        assert!(returns_rows("(SELECT 1) UNION (SELECT 2)"));
        assert!(returns_rows("SHOW TABLES"));
        assert!(!returns_rows("UPDATE t SET a = 1"));
        assert!(!returns_rows("INSERT INTO t VALUES (1)"));
        assert!(!returns_rows(""));
    }
}
