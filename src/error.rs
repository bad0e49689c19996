//! Typed errors and HTTP mapping.

use crate::params::Params;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate field '{field}' in model '{model}'")]
    DuplicateField { model: String, field: String },
    #[error("duplicate model name: {0}")]
    DuplicateModel(String),
    #[error("invalid primary key: model {model} field {field}")]
    InvalidPrimaryKey { model: String, field: String },
    #[error("route pattern is missing or empty")]
    MissingPattern,
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// One failed operation recorded by a transaction, kept for the aggregate error.
#[derive(Debug, Serialize)]
pub struct FailedOperation {
    pub index: usize,
    pub status: u16,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("invalid item data")]
    Invalid {
        invalids: BTreeMap<String, String>,
        params: Params,
    },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error("{message}")]
    Query { message: String },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("internal: {0}")]
    Internal(String),
    #[error("{} operation(s) failed during the transaction", failures.len())]
    Transaction {
        failures: Vec<AppError>,
        results: serde_json::Value,
    },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Invalid { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::Db(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Query { .. }
            | AppError::Db(_)
            | AppError::Internal(_)
            | AppError::Transaction { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Invalid { .. } => "invalid_item",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::MethodNotAllowed(_) => "method_not_allowed",
            AppError::NotImplemented(_) => "not_implemented",
            AppError::Query { .. } => "query_error",
            AppError::Db(sqlx::Error::RowNotFound) => "not_found",
            AppError::Db(_) => "database_error",
            AppError::Internal(_) => "internal_error",
            AppError::Transaction { .. } => "transaction_failed",
        }
    }

    /// Structured data attached to the error, if any.
    pub fn data(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Invalid { invalids, params } => Some(serde_json::json!({
                "invalids": invalids,
                "params": params,
            })),
            AppError::Transaction { failures, results } => {
                let failures: Vec<FailedOperation> = failures
                    .iter()
                    .enumerate()
                    .map(|(index, e)| FailedOperation {
                        index,
                        status: e.status().as_u16(),
                        message: e.to_string(),
                    })
                    .collect();
                Some(serde_json::json!({
                    "exceptions": failures,
                    "results": results,
                }))
            }
            _ => None,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                details: self.data(),
            },
        };
        (status, Json(body)).into_response()
    }
}
