//! Controller front: calls `xcontroller`'s action and encodes its return value.

use super::{encoded, Front};
use crate::error::AppError;
use crate::params::Params;
use crate::response::Reply;
use crate::state::AppState;
use async_trait::async_trait;

pub struct ControllerFront;

impl ControllerFront {
    /// Action from `xmethod`, else the verb. Dashes are dropped; a leading `_` marks a
    /// method that is not meant to be called.
    pub fn action(params: &Params, verb: &str) -> Result<String, AppError> {
        let raw = params.text("xmethod").filter(|s| !s.is_empty()).unwrap_or(verb);
        let action = raw.replace('-', "");
        if action.is_empty() {
            return Err(AppError::BadRequest("Method param missing".into()));
        }
        if action.starts_with('_') {
            return Err(AppError::Unauthorized(format!(
                "Method {} is not meant to be called",
                action
            )));
        }
        Ok(action)
    }

    async fn call(&self, state: &AppState, params: &Params, verb: &str) -> Result<Reply, AppError> {
        let name = params
            .text("xcontroller")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest("Controller param missing".into()))?;
        let action = Self::action(params, verb)?;
        let controller = state.controllers.get(name)?;
        tracing::info!(controller = %name, action = %action, "controller call");
        let data = controller.call(&action, params, state).await?;
        encoded(state, params, &data)
    }
}

#[async_trait]
impl Front for ControllerFront {
    async fn get(&self, state: &AppState, params: &Params) -> Result<Reply, AppError> {
        self.call(state, params, "get").await
    }

    async fn post(&self, state: &AppState, params: &Params) -> Result<Reply, AppError> {
        self.call(state, params, "post").await
    }

    async fn put(&self, state: &AppState, params: &Params) -> Result<Reply, AppError> {
        self.call(state, params, "put").await
    }

    async fn delete(&self, state: &AppState, params: &Params) -> Result<Reply, AppError> {
        self.call(state, params, "delete").await
    }
}
