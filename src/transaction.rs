//! Nested transactions over one connection.
//!
//! Nesting is counted per handle: only the outermost `start` issues `BEGIN` and only the
//! matching outermost `commit` issues `COMMIT`. Operations run through `execute` never
//! propagate their errors; they are recorded and `end` rolls back if any were.
//! A failed COMMIT rolls back. A handle dropped while open discards its connection.

use crate::db::Database;
use crate::error::AppError;
use crate::model::Model;
use crate::service::{CrudService, Verb};
use serde_json::{json, Value};

pub struct Transaction<'db> {
    db: &'db mut dyn Database,
    depth: u32,
    autocommit_backup: Option<bool>,
    results: Vec<Value>,
    failures: Vec<AppError>,
    last_insert_id: Option<u64>,
}

impl<'db> Transaction<'db> {
    pub fn new(db: &'db mut dyn Database) -> Self {
        Transaction {
            db,
            depth: 0,
            autocommit_backup: None,
            results: Vec::new(),
            failures: Vec::new(),
            last_insert_id: None,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn failures(&self) -> &[AppError] {
        &self.failures
    }

    pub async fn start(&mut self) -> Result<(), AppError> {
        if self.depth == 0 {
            self.autocommit_backup = self.db.autocommit().await?;
            if self.autocommit_backup.is_some() {
                self.db.set_autocommit(false).await?;
            }
            if let Err(e) = self.db.execute("BEGIN").await {
                if self.restore_autocommit().await.is_err() {
                    self.db.discard();
                }
                return Err(e);
            }
            tracing::info!("transaction started");
        }
        self.depth += 1;
        Ok(())
    }

    pub async fn commit(&mut self) -> Result<(), AppError> {
        if self.depth == 0 {
            return Err(AppError::Internal(
                "Cannot commit when no transaction in progress".into(),
            ));
        }
        self.depth -= 1;
        if self.depth == 0 {
            if let Err(e) = self.db.execute("COMMIT").await {
                tracing::warn!(error = %e, "commit failed");
                self.reset().await;
                return Err(e);
            }
            if let Err(e) = self.restore_autocommit().await {
                self.db.discard();
                return Err(e);
            }
            tracing::info!("transaction committed");
        }
        Ok(())
    }

    /// Roll back whatever the nesting level and reset it.
    pub async fn rollback(&mut self) -> Result<Value, AppError> {
        self.depth = 0;
        let rolled_back = self.db.execute("ROLLBACK").await;
        let restored = self.restore_autocommit().await;
        if rolled_back.is_err() || restored.is_err() {
            self.db.discard();
        }
        rolled_back?;
        restored?;
        tracing::info!(failures = self.failures.len(), "transaction rolled back");
        Ok(self.summary())
    }

    /// Best-effort ROLLBACK and autocommit restore; the connection is discarded if either fails.
    async fn reset(&mut self) {
        self.depth = 0;
        let rolled_back = self.db.execute("ROLLBACK").await.is_ok();
        let restored = self.restore_autocommit().await.is_ok();
        if !(rolled_back && restored) {
            self.db.discard();
        }
    }

    async fn restore_autocommit(&mut self) -> Result<(), AppError> {
        if let Some(on) = self.autocommit_backup.take() {
            self.db.set_autocommit(on).await?;
        }
        Ok(())
    }

    /// Commit, or roll back and fail with every recorded error.
    pub async fn end(&mut self) -> Result<Value, AppError> {
        if self.failures.is_empty() {
            self.commit().await?;
            return Ok(self.summary());
        }
        self.rollback().await?;
        let failures = std::mem::take(&mut self.failures);
        tracing::warn!(failures = failures.len(), "transaction failed");
        Err(AppError::Transaction {
            failures,
            results: Value::Array(self.results.clone()),
        })
    }

    fn ensure_started(&self) -> Result<(), AppError> {
        if self.depth == 0 {
            return Err(AppError::Internal("No transaction in progress".into()));
        }
        Ok(())
    }

    /// Run a model operation. Its error, if any, is recorded rather than returned.
    pub async fn execute(&mut self, model: &Model<'_>, verb: Verb) -> Result<(), AppError> {
        self.ensure_started()?;
        self.last_insert_id = None;
        match CrudService::run(&mut *self.db, model, verb).await {
            Ok(outcome) => {
                self.last_insert_id = outcome.insert_id();
                self.results.push(json!({
                    "xmodel": model.name(),
                    "xmethod": verb.as_str(),
                    "xparams": model.params(),
                    "result": outcome.to_json(),
                }));
            }
            Err(e) => {
                tracing::debug!(model = %model.name(), error = %e, "operation failed");
                self.failures.push(e);
            }
        }
        Ok(())
    }

    /// Run a raw statement. Its error, if any, is recorded rather than returned.
    pub async fn execute_sql(&mut self, sql: &str) -> Result<(), AppError> {
        self.ensure_started()?;
        self.last_insert_id = None;
        match self.db.execute(sql).await {
            Ok(outcome) => {
                self.last_insert_id = outcome.insert_id();
                self.results.push(json!({ "result": outcome.to_json() }));
            }
            Err(e) => self.failures.push(e),
        }
        Ok(())
    }

    /// `xsuccess`, total `xaffectedrows` and every recorded result.
    pub fn summary(&self) -> Value {
        let affected: u64 = self
            .results
            .iter()
            .filter_map(|r| r["result"]["xaffectedrows"].as_u64())
            .sum();
        json!({
            "xsuccess": self.failures.is_empty(),
            "xaffectedrows": affected,
            "xresults": self.results,
        })
    }

    /// Insert id of the last operation, if it produced one.
    pub fn insert_id(&self) -> Option<u64> {
        self.last_insert_id
    }

    /// Start, run every operation, end.
    pub async fn apply(db: &'db mut dyn Database, operations: &[(Model<'_>, Verb)]) -> Result<Value, AppError> {
        let mut tx = Transaction::new(db);
        tx.start().await?;
        for (model, verb) in operations {
            tx.execute(model, *verb).await?;
        }
        tx.end().await
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.depth > 0 {
            tracing::warn!(depth = self.depth, "transaction dropped while open");
            self.db.discard();
        }
    }
}
