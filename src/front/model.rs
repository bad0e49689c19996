//! Model front: runs a model verb and encodes the result.

use super::{encoded, Front};
use crate::error::AppError;
use crate::model::Model;
use crate::params::Params;
use crate::response::Reply;
use crate::service::{CrudService, Verb};
use crate::state::AppState;
use async_trait::async_trait;

pub struct ModelFront;

impl ModelFront {
    async fn run(&self, state: &AppState, params: &Params, verb: Verb) -> Result<Reply, AppError> {
        let name = params
            .text("xmodel")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest("Model param missing".into()))?;
        let mut db = state.db.acquire().await?;
        let model = Model::load(&state.models, name, params.clone(), db.dialect())?;
        tracing::info!(model = %name, verb = %verb, "model call");
        let outcome = CrudService::run(&mut *db, &model, verb).await?;
        encoded(state, params, &outcome.to_json())
    }
}

#[async_trait]
impl Front for ModelFront {
    /// `xmethod=count` counts instead of selecting.
    async fn get(&self, state: &AppState, params: &Params) -> Result<Reply, AppError> {
        let verb = match params.text("xmethod") {
            Some(m) if m.eq_ignore_ascii_case("count") => Verb::Count,
            _ => Verb::Get,
        };
        self.run(state, params, verb).await
    }

    async fn post(&self, state: &AppState, params: &Params) -> Result<Reply, AppError> {
        self.run(state, params, Verb::Post).await
    }

    async fn put(&self, state: &AppState, params: &Params) -> Result<Reply, AppError> {
        self.run(state, params, Verb::Put).await
    }

    async fn delete(&self, state: &AppState, params: &Params) -> Result<Reply, AppError> {
        self.run(state, params, Verb::Delete).await
    }
}
