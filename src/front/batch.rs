//! Transaction front: runs a batch of model operations in one transaction.
//!
//! `xoperations` is a JSON array of objects, each with `xmodel`, an optional `xmethod`
//! (default `put`) and the operation's own params.

use super::{encoded, Front};
use crate::error::AppError;
use crate::model::Model;
use crate::params::{ParamValue, Params};
use crate::response::Reply;
use crate::service::Verb;
use crate::state::AppState;
use crate::transaction::Transaction;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub struct BatchFront;

/// One batch entry: model, verb and params.
#[derive(Debug, PartialEq)]
pub struct Operation {
    pub model: String,
    pub verb: Verb,
    pub params: Params,
}

impl BatchFront {
    pub fn operations(params: &Params) -> Result<Vec<Operation>, AppError> {
        let items: Vec<Value> = match params.get("xoperations") {
            Some(ParamValue::Text(s)) => match serde_json::from_str(s) {
                Ok(Value::Array(items)) => items,
                Ok(single @ Value::Object(_)) => vec![single],
                _ => return Err(AppError::BadRequest("xoperations must be a JSON array".into())),
            },
            Some(ParamValue::List(items)) => items
                .iter()
                .map(|i| {
                    i.as_text()
                        .and_then(|s| serde_json::from_str(s).ok())
                        .ok_or_else(|| AppError::BadRequest("xoperations items must be JSON objects".into()))
                })
                .collect::<Result<_, _>>()?,
            _ => return Err(AppError::BadRequest("Missing mandatory params: xoperations".into())),
        };
        items.iter().map(operation).collect()
    }
}

fn operation(item: &Value) -> Result<Operation, AppError> {
    let map: &Map<String, Value> = item
        .as_object()
        .ok_or_else(|| AppError::BadRequest("xoperations items must be JSON objects".into()))?;
    let mut params = Params::from_map(map);
    let model = params
        .remove("xmodel")
        .and_then(|v| v.as_text().map(str::to_string))
        .ok_or_else(|| AppError::BadRequest("Model param missing in operation".into()))?;
    let verb = match params.remove("xmethod") {
        Some(ParamValue::Text(m)) => Verb::parse(&m)?,
        _ => Verb::Put,
    };
    Ok(Operation { model, verb, params })
}

#[async_trait]
impl Front for BatchFront {
    async fn post(&self, state: &AppState, params: &Params) -> Result<Reply, AppError> {
        let operations = BatchFront::operations(params)?;
        let mut db = state.db.acquire().await?;
        let dialect = db.dialect();
        let models = operations
            .into_iter()
            .map(|op| Ok((Model::load(&state.models, &op.model, op.params, dialect)?, op.verb)))
            .collect::<Result<Vec<_>, AppError>>()?;
        tracing::info!(operations = models.len(), "batch transaction");
        let summary = Transaction::apply(&mut *db, &models).await?;
        encoded(state, params, &summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operations() {
        let params = Params::from_json(&serde_json::json!({
            "xoperations": [
                {"xmodel": "user", "name": "Ann"},
                {"xmodel": "user", "xmethod": "post", "id": 1, "name": "Bob"}
            ]
        }));
        let ops = BatchFront::operations(&params).unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].verb, Verb::Put);
        assert_eq!(ops[1].verb, Verb::Post);
        assert_eq!(ops[1].params.text("id"), Some("1"));
        assert!(!ops[1].params.contains("xmethod"));
    }

    #[test]
    fn rejects_malformed_operations() {
        assert_eq!(BatchFront::operations(&Params::new()).unwrap_err().status(), 400);
        let p = Params::from_query("xoperations=%5B%7B%22name%22%3A1%7D%5D");
        assert_eq!(BatchFront::operations(&p).unwrap_err().status(), 400);
        let p = Params::from_query("xoperations=%5B%7B%22xmodel%22%3A%22u%22%7D%5D");
        assert_eq!(BatchFront::operations(&p).unwrap()[0].model, "u");
    }
}
