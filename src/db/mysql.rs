//! MySQL connection, with autocommit control for transactions.

use super::{cell, query_error, Database, QueryOutcome, Row, Summary};
use crate::error::AppError;
use crate::sql::{returns_rows, Dialect};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::MySqlRow;
use sqlx::pool::PoolConnection;
use sqlx::{Column, MySql, Row as _};

pub struct MySqlDatabase {
    conn: PoolConnection<MySql>,
    reporting: bool,
}

impl MySqlDatabase {
    pub fn new(conn: PoolConnection<MySql>, reporting: bool) -> Self {
        MySqlDatabase { conn, reporting }
    }
}

#[async_trait]
impl Database for MySqlDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn execute(&mut self, sql: &str) -> Result<QueryOutcome, AppError> {
        tracing::debug!(sql = %sql, "query");
        if returns_rows(sql) {
            let conn: &mut sqlx::MySqlConnection = &mut self.conn;
            let rows = sqlx::Executor::fetch_all(conn, sqlx::raw_sql(sql))
                .await
                .map_err(|e| query_error(sql, &e, self.reporting))?;
            return Ok(QueryOutcome::Rows(rows.iter().map(row_to_map).collect()));
        }
        let conn: &mut sqlx::MySqlConnection = &mut self.conn;
        let done = sqlx::Executor::execute(conn, sqlx::raw_sql(sql))
            .await
            .map_err(|e| query_error(sql, &e, self.reporting))?;
        let insert_id = Some(done.last_insert_id()).filter(|id| *id != 0);
        Ok(QueryOutcome::Summary(Summary {
            success: true,
            insert_id,
            affected_rows: done.rows_affected(),
            info: String::new(),
        }))
    }

    fn discard(&mut self) {
        tracing::warn!("connection discarded");
        self.conn.close_on_drop();
    }

    async fn autocommit(&mut self) -> Result<Option<bool>, AppError> {
        let sql = "SELECT @@autocommit AS autocommit";
        let conn: &mut sqlx::MySqlConnection = &mut self.conn;
        let rows = sqlx::Executor::fetch_all(conn, sqlx::raw_sql(sql))
            .await
            .map_err(|e| query_error(sql, &e, self.reporting))?;
        Ok(rows
            .first()
            .and_then(|r| r.try_get::<Option<i64>, _>("autocommit").ok().flatten())
            .map(|v| v != 0))
    }

    async fn set_autocommit(&mut self, on: bool) -> Result<(), AppError> {
        let sql = if on { "SET AUTOCOMMIT=1" } else { "SET AUTOCOMMIT=0" };
        tracing::debug!(sql = %sql, "query");
        let conn: &mut sqlx::MySqlConnection = &mut self.conn;
        sqlx::Executor::execute(conn, sqlx::raw_sql(sql))
            .await
            .map_err(|e| query_error(sql, &e, self.reporting))?;
        Ok(())
    }
}

fn row_to_map(row: &MySqlRow) -> Row {
    let mut map = Row::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &MySqlRow, name: &str) -> Value {
    cell!(row, name, i64, |n: i64| Value::Number(n.into()));
    cell!(row, name, u64, |n: u64| Value::Number(n.into()));
    cell!(row, name, i32, |n: i32| Value::Number(n.into()));
    cell!(row, name, f64, |n: f64| serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null));
    cell!(row, name, bool, Value::Bool);
    cell!(row, name, chrono::DateTime<chrono::Utc>, |d: chrono::DateTime<chrono::Utc>| {
        Value::String(d.to_rfc3339())
    });
    cell!(row, name, chrono::NaiveDateTime, |d: chrono::NaiveDateTime| {
        Value::String(d.format("%Y-%m-%d %H:%M:%S").to_string())
    });
    cell!(row, name, chrono::NaiveDate, |d: chrono::NaiveDate| {
        Value::String(d.format("%Y-%m-%d").to_string())
    });
    cell!(row, name, String, Value::String);
    cell!(row, name, Value, |j: Value| j);
    // DECIMAL and other text-protocol values
    match row.try_get_unchecked::<Option<String>, _>(name) {
        Ok(Some(s)) => Value::String(s),
        _ => Value::Null,
    }
}
