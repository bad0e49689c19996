//! PostgreSQL connection.

use super::{cell, query_error, Database, QueryOutcome, Row, Summary};
use crate::error::AppError;
use crate::sql::{returns_rows, Dialect};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgRow;
use sqlx::{Column, Postgres, Row as _};

pub struct PgDatabase {
    conn: PoolConnection<Postgres>,
    reporting: bool,
}

impl PgDatabase {
    pub fn new(conn: PoolConnection<Postgres>, reporting: bool) -> Self {
        PgDatabase { conn, reporting }
    }
}

#[async_trait]
impl Database for PgDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn execute(&mut self, sql: &str) -> Result<QueryOutcome, AppError> {
        tracing::debug!(sql = %sql, "query");
        if returns_rows(sql) {
            let conn: &mut sqlx::PgConnection = &mut self.conn;
            let rows = sqlx::Executor::fetch_all(conn, sqlx::raw_sql(sql))
                .await
                .map_err(|e| query_error(sql, &e, self.reporting))?;
            return Ok(QueryOutcome::Rows(rows.iter().map(row_to_map).collect()));
        }
        let conn: &mut sqlx::PgConnection = &mut self.conn;
        let done = sqlx::Executor::execute(conn, sqlx::raw_sql(sql))
            .await
            .map_err(|e| query_error(sql, &e, self.reporting))?;
        Ok(QueryOutcome::Summary(Summary {
            success: true,
            insert_id: None,
            affected_rows: done.rows_affected(),
            info: String::new(),
        }))
    }

    fn discard(&mut self) {
        tracing::warn!("connection discarded");
        self.conn.close_on_drop();
    }
}

fn row_to_map(row: &PgRow) -> Row {
    let mut map = Row::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    cell!(row, name, i16, |n: i16| Value::Number(n.into()));
    cell!(row, name, i32, |n: i32| Value::Number(n.into()));
    cell!(row, name, i64, |n: i64| Value::Number(n.into()));
    cell!(row, name, f32, |n: f32| serde_json::Number::from_f64(n as f64)
        .map(Value::Number)
        .unwrap_or(Value::Null));
    cell!(row, name, f64, |n: f64| serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null));
    cell!(row, name, bool, Value::Bool);
    cell!(row, name, uuid::Uuid, |u: uuid::Uuid| Value::String(u.to_string()));
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
    // numeric and other text-format values
    match row.try_get_unchecked::<Option<String>, _>(name) {
        Ok(Some(s)) => Value::String(s),
        _ => Value::Null,
    }
}
