//! Database seam: one connection per request behind the `Database` trait.
//!
//! Statements are sent as plain text (no prepared statements): values are escaped and
//! inlined by the SQL builder.

mod mysql;
mod postgres;

pub use mysql::MySqlDatabase;
pub use postgres::PgDatabase;

use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::sql::Dialect;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgPool, PgPoolOptions};

pub type Row = Map<String, Value>;

/// Result of one statement: rows for SELECT-shaped statements, a summary otherwise.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Rows(Vec<Row>),
    Summary(Summary),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    #[serde(rename = "xsuccess")]
    pub success: bool,
    #[serde(rename = "xinsertid")]
    pub insert_id: Option<u64>,
    #[serde(rename = "xaffectedrows")]
    pub affected_rows: u64,
    #[serde(rename = "xinfo")]
    pub info: String,
}

impl QueryOutcome {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn insert_id(&self) -> Option<u64> {
        match self {
            QueryOutcome::Summary(s) => s.insert_id,
            QueryOutcome::Rows(_) => None,
        }
    }
}

/// A single connection. Everything a request runs goes through the same handle.
#[async_trait]
pub trait Database: Send {
    fn dialect(&self) -> Dialect;

    async fn execute(&mut self, sql: &str) -> Result<QueryOutcome, AppError>;

    /// Current autocommit flag, if the backend has one.
    async fn autocommit(&mut self) -> Result<Option<bool>, AppError> {
        Ok(None)
    }

    async fn set_autocommit(&mut self, _on: bool) -> Result<(), AppError> {
        Ok(())
    }

    /// Close the connection instead of returning it to the pool; its session state is unknown.
    fn discard(&mut self) {}
}

/// Hands out connections; one per request.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn Database>, AppError>;
}

#[derive(Clone, Debug)]
pub enum DbPool {
    Postgres(PgPool),
    MySql(MySqlPool),
}

/// Pool-backed connector.
#[derive(Clone, Debug)]
pub struct SqlConnector {
    pool: DbPool,
    /// Include SQL text in query errors.
    reporting: bool,
}

impl SqlConnector {
    pub fn new(pool: DbPool, reporting: bool) -> Self {
        SqlConnector { pool, reporting }
    }

    /// Connect lazily; the dialect follows the URL scheme.
    pub fn connect_lazy(config: &DatabaseConfig, reporting: bool) -> Result<Self, AppError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| AppError::Internal("database.url is not configured".into()))?;
        let pool = match Dialect::from_url(url) {
            Some(Dialect::Postgres) => DbPool::Postgres(
                PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect_lazy(url)?,
            ),
            Some(Dialect::MySql) => DbPool::MySql(
                MySqlPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect_lazy(url)?,
            ),
            None => {
                return Err(AppError::Internal(format!(
                    "unsupported database url scheme: {}",
                    url.split("://").next().unwrap_or("")
                )))
            }
        };
        Ok(SqlConnector::new(pool, reporting))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Connector for SqlConnector {
    async fn acquire(&self) -> Result<Box<dyn Database>, AppError> {
        let db: Box<dyn Database> = match &self.pool {
            DbPool::Postgres(p) => Box::new(PgDatabase::new(p.acquire().await?, self.reporting)),
            DbPool::MySql(p) => Box::new(MySqlDatabase::new(p.acquire().await?, self.reporting)),
        };
        Ok(db)
    }
}

/// `Invalid query: <sql> # <error>`, with the SQL hidden unless reporting is on.
pub(crate) fn query_error(sql: &str, err: &sqlx::Error, reporting: bool) -> AppError {
    let shown = if reporting { sql } else { "[query obfuscated]" };
    AppError::Query {
        message: format!("Invalid query: {} # {}", shown, err),
    }
}

/// Try each decodable type in turn; first non-null hit wins.
macro_rules! cell {
    ($row:expr, $name:expr, $ty:ty, $conv:expr) => {
        if let Ok(Some(v)) = $row.try_get::<Option<$ty>, _>($name) {
            return $conv(v);
        }
    };
}
pub(crate) use cell;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_uses_x_keys() {
        let outcome = QueryOutcome::Summary(Summary {
            success: true,
            insert_id: Some(9),
            affected_rows: 1,
            info: String::new(),
        });
        assert_eq!(
            outcome.to_json(),
            serde_json::json!({"xsuccess": true, "xinsertid": 9, "xaffectedrows": 1, "xinfo": ""})
        );
        assert_eq!(outcome.insert_id(), Some(9));
    }

    #[test]
    fn query_error_hides_sql() {
        let err = sqlx::Error::RowNotFound;
        let shown = query_error("SELECT secret", &err, true).to_string();
        assert!(shown.starts_with("Invalid query: SELECT secret # "));
        let hidden = query_error("SELECT secret", &err, false).to_string();
        assert!(hidden.starts_with("Invalid query: [query obfuscated] # "));
        assert!(!hidden.contains("secret"));
    }
}
