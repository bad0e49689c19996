//! Shared fixtures: a recording in-memory database and an app config.
#![allow(dead_code)]

use async_trait::async_trait;
use restframe::config::load_from_str;
use restframe::db::{QueryOutcome, Row, Summary};
use restframe::sql::Dialect;
use restframe::{AppConfig, AppError, AppState, Connector, Database};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub type Log = Arc<Mutex<Vec<String>>>;

/// Records every statement. SELECTs return `rows`; other statements affect one row.
/// Statements containing `fail_on` fail with a query error.
#[derive(Clone, Default)]
pub struct RecordingDatabase {
    pub log: Log,
    pub rows: Vec<Row>,
    pub fail_on: Option<String>,
    pub autocommit: Option<bool>,
    pub discarded: Arc<AtomicBool>,
}

impl RecordingDatabase {
    pub fn statements(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, sql: &str) -> usize {
        self.statements().iter().filter(|s| s.as_str() == sql).count()
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Database for RecordingDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn execute(&mut self, sql: &str) -> Result<QueryOutcome, AppError> {
        self.log.lock().unwrap().push(sql.to_string());
        if let Some(needle) = &self.fail_on {
            if sql.contains(needle.as_str()) {
                return Err(AppError::Query {
                    message: format!("Invalid query: {} # duplicate entry", sql),
                });
            }
        }
        if sql.starts_with("SELECT") {
            return Ok(QueryOutcome::Rows(self.rows.clone()));
        }
        Ok(QueryOutcome::Summary(Summary {
            success: true,
            insert_id: sql.starts_with("INSERT").then_some(7),
            affected_rows: 1,
            info: String::new(),
        }))
    }

    async fn autocommit(&mut self) -> Result<Option<bool>, AppError> {
        Ok(self.autocommit)
    }

    async fn set_autocommit(&mut self, on: bool) -> Result<(), AppError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("SET AUTOCOMMIT={}", u8::from(on)));
        Ok(())
    }

    fn discard(&mut self) {
        self.discarded.store(true, Ordering::SeqCst);
    }
}

/// Hands out clones of one recording database sharing its log.
pub struct FakeConnector(pub RecordingDatabase);

#[async_trait]
impl Connector for FakeConnector {
    async fn acquire(&self) -> Result<Box<dyn Database>, AppError> {
        Ok(Box::new(self.0.clone()))
    }
}

pub fn config() -> AppConfig {
    load_from_str(
        r#"{
        "site": { "params": { "xformat": "xml" } },
        "routes": [
            { "pattern": "/users", "params": { "xfront": "model", "xmodel": "user" } },
            { "pattern": "/users/:id", "params": { "xfront": "model", "xmodel": "user" } },
            { "pattern": "/batch", "params": { "xfront": "transaction" } },
            { "pattern": "/status/:xmethod", "params": { "xfront": "controller", "xcontroller": "status" } },
            { "pattern": "/nowhere", "params": { "xfront": "missing" } },
            { "pattern": "/home", "params": { "xredirect": "users" } }
        ],
        "models": [
            {
                "name": "user",
                "table": "users",
                "fields": ["id", { "name": "name", "column": "full_name" }, "email", "created", "modified"],
                "required": { "put": ["name"], "post": ["id"] },
                "validation": { "email": { "format": "email" } }
            }
        ]
    }"#,
    )
    .unwrap()
}

pub fn user_row() -> Row {
    json!({ "id": 42, "full_name": "Ann", "email": "ann@example.com" })
        .as_object()
        .cloned()
        .unwrap()
}

pub fn state(db: RecordingDatabase) -> AppState {
    AppState::new(config(), Arc::new(FakeConnector(db))).unwrap()
}
