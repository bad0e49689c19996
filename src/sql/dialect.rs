//! Identifier quoting and literal escaping per SQL dialect.

use crate::sql::params::Literal;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    Postgres,
}

impl Dialect {
    /// Dialect from a connection URL scheme (`mysql://`, `postgres://`, `postgresql://`).
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split("://").next()?.to_lowercase();
        match scheme.as_str() {
            "mysql" | "mariadb" => Some(Dialect::MySql),
            "postgres" | "postgresql" => Some(Dialect::Postgres),
            _ => None,
        }
    }

    /// Quote identifier (safe: identifiers come from config or are checked by the caller).
    pub fn quote_ident(self, s: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", s.replace('`', "``")),
            Dialect::Postgres => format!("\"{}\"", s.replace('"', "\"\"")),
        }
    }

    /// `table.column`, both quoted.
    pub fn qualified(self, table: &str, column: &str) -> String {
        format!("{}.{}", self.quote_ident(table), self.quote_ident(column))
    }

    /// Escape a string for use between single quotes.
    pub fn escape_string(self, s: &str) -> String {
        match self {
            Dialect::MySql => {
                let mut out = String::with_capacity(s.len() + 8);
                for c in s.chars() {
                    match c {
                        '\0' => out.push_str("\\0"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        '"' => out.push_str("\\\""),
                        '\x1a' => out.push_str("\\Z"),
                        c => out.push(c),
                    }
                }
                out
            }
            // standard_conforming_strings: backslashes are literal, quotes are doubled
            Dialect::Postgres => s.replace('\0', "").replace('\'', "''"),
        }
    }

    pub fn quote_literal(self, s: &str) -> String {
        format!("'{}'", self.escape_string(s))
    }

    pub fn literal(self, lit: &Literal) -> String {
        match lit {
            Literal::Null => "NULL".to_string(),
            Literal::Constant(c) => c.clone(),
            Literal::Text(s) => self.quote_literal(s),
            Literal::List(items) if items.is_empty() => "(NULL)".to_string(),
            Literal::List(items) => format!(
                "({})",
                items.iter().map(|i| self.literal(i)).collect::<Vec<_>>().join(",")
            ),
        }
    }
}
