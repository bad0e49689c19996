//! Generic CRUD execution: checks, statement building and result mapping.

use crate::db::{Database, QueryOutcome, Row};
use crate::error::AppError;
use crate::model::Model;
use crate::params::ParamValue;
use crate::service::FieldValidator;
use crate::sql::{count_sql, delete_sql, insert_sql, select_sql, update_sql};
use axum::http::Method;
use std::fmt;

/// Model operation. `post` updates and `put` inserts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Get,
    Count,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn from_method(method: &Method) -> Result<Self, AppError> {
        match *method {
            Method::GET | Method::HEAD => Ok(Verb::Get),
            Method::POST => Ok(Verb::Post),
            Method::PUT => Ok(Verb::Put),
            Method::DELETE => Ok(Verb::Delete),
            _ => Err(AppError::MethodNotAllowed(method.to_string())),
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.to_lowercase().as_str() {
            "get" => Ok(Verb::Get),
            "count" => Ok(Verb::Count),
            "post" => Ok(Verb::Post),
            "put" => Ok(Verb::Put),
            "delete" => Ok(Verb::Delete),
            other => Err(AppError::MethodNotAllowed(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Count => "count",
            Verb::Post => "post",
            Verb::Put => "put",
            Verb::Delete => "delete",
        }
    }

    /// Key into the model's required-field lists; counting shares the read list.
    fn required_key(self) -> &'static str {
        match self {
            Verb::Count => "get",
            v => v.as_str(),
        }
    }

    fn validates(self) -> bool {
        matches!(self, Verb::Post | Verb::Put | Verb::Delete)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct CrudService;

impl CrudService {
    /// Mandatory fields present and field rules satisfied.
    pub fn check(model: &Model<'_>, verb: Verb) -> Result<(), AppError> {
        let def = model.def();
        let params = model.params();
        let mandatory = def.required_for(verb.required_key());
        let missing: Vec<&str> = mandatory
            .iter()
            .filter(|f| matches!(params.get(f), None | Some(ParamValue::Null)))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Missing mandatory params for {} action: {}",
                verb,
                missing.join(", ")
            )));
        }
        if !verb.validates() {
            return Ok(());
        }
        let invalids: std::collections::BTreeMap<_, _> = FieldValidator::invalids(params, &def.validation)
            .into_iter()
            .filter(|(field, _)| params.contains(field) || mandatory.contains(field))
            .collect();
        if invalids.is_empty() {
            return Ok(());
        }
        tracing::debug!(model = %def.name, invalids = ?invalids, "invalid item data");
        Err(AppError::Invalid {
            invalids,
            params: params.clone(),
        })
    }

    /// Statement for `verb`, after checks.
    pub fn statement(model: &Model<'_>, verb: Verb) -> Result<String, AppError> {
        Self::check(model, verb)?;
        match verb {
            Verb::Get => select_sql(model),
            Verb::Count => count_sql(model),
            Verb::Post => update_sql(model),
            Verb::Put => insert_sql(model),
            Verb::Delete => delete_sql(model),
        }
    }

    pub async fn run(db: &mut dyn Database, model: &Model<'_>, verb: Verb) -> Result<QueryOutcome, AppError> {
        let sql = Self::statement(model, verb)?;
        Self::query(db, model, &sql).await
    }

    pub async fn get(db: &mut dyn Database, model: &Model<'_>) -> Result<QueryOutcome, AppError> {
        Self::run(db, model, Verb::Get).await
    }

    pub async fn count(db: &mut dyn Database, model: &Model<'_>) -> Result<QueryOutcome, AppError> {
        Self::run(db, model, Verb::Count).await
    }

    pub async fn post(db: &mut dyn Database, model: &Model<'_>) -> Result<QueryOutcome, AppError> {
        Self::run(db, model, Verb::Post).await
    }

    pub async fn put(db: &mut dyn Database, model: &Model<'_>) -> Result<QueryOutcome, AppError> {
        Self::run(db, model, Verb::Put).await
    }

    pub async fn delete(db: &mut dyn Database, model: &Model<'_>) -> Result<QueryOutcome, AppError> {
        Self::run(db, model, Verb::Delete).await
    }

    /// Execute `sql`; result columns are renamed to model fields where mapped.
    pub async fn query(db: &mut dyn Database, model: &Model<'_>, sql: &str) -> Result<QueryOutcome, AppError> {
        Ok(match db.execute(sql).await? {
            QueryOutcome::Rows(rows) => QueryOutcome::Rows(
                rows.into_iter()
                    .map(|row| {
                        row.into_iter()
                            .map(|(k, v)| (model.modelfield(&k).to_string(), v))
                            .collect::<Row>()
                    })
                    .collect(),
            ),
            summary => summary,
        })
    }
}
