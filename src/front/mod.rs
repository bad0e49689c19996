//! Fronts: route a request to a model, controller or batch and encode what it returns.
//!
//! The `xfront` param names the front; the HTTP verb picks its method.

mod batch;
mod controller;
pub mod encode;
mod model;

pub use batch::BatchFront;
pub use controller::ControllerFront;
pub use encode::{Encoder, Format};
pub use model::ModelFront;

use crate::error::AppError;
use crate::params::Params;
use crate::response::Reply;
use crate::state::AppState;
use async_trait::async_trait;
use axum::http::Method;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Front: Send + Sync {
    async fn get(&self, _state: &AppState, _params: &Params) -> Result<Reply, AppError> {
        Err(AppError::MethodNotAllowed("get".into()))
    }

    async fn post(&self, _state: &AppState, _params: &Params) -> Result<Reply, AppError> {
        Err(AppError::MethodNotAllowed("post".into()))
    }

    async fn put(&self, _state: &AppState, _params: &Params) -> Result<Reply, AppError> {
        Err(AppError::MethodNotAllowed("put".into()))
    }

    async fn delete(&self, _state: &AppState, _params: &Params) -> Result<Reply, AppError> {
        Err(AppError::MethodNotAllowed("delete".into()))
    }

    /// Error reply in the requested format.
    fn handle_error(&self, state: &AppState, params: &Params, err: AppError) -> Reply {
        error_reply(state, params, err)
    }
}

/// Fronts by name.
#[derive(Clone)]
pub struct FrontRegistry {
    fronts: HashMap<String, Arc<dyn Front>>,
}

impl Default for FrontRegistry {
    /// `model`, `controller` and `transaction`.
    fn default() -> Self {
        FrontRegistry::empty()
            .register("model", ModelFront)
            .register("controller", ControllerFront)
            .register("transaction", BatchFront)
    }
}

impl FrontRegistry {
    pub fn empty() -> Self {
        FrontRegistry {
            fronts: HashMap::new(),
        }
    }

    pub fn register(mut self, name: &str, front: impl Front + 'static) -> Self {
        self.fronts.insert(name.to_string(), Arc::new(front));
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Front>, AppError> {
        self.fronts
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("front '{}' does not exist", name)))
    }
}

/// Encode `data` in the format the params ask for.
pub fn encoded(state: &AppState, params: &Params, data: &Value) -> Result<Reply, AppError> {
    let encoder = Encoder::from_params(params, &state.config.rest)?;
    Ok(Reply::ok(encoder.content_type(), encoder.encode(data)?))
}

/// `{error, message, data, status}` in the requested format; falls back to the JSON
/// error envelope when that format cannot be produced.
pub fn error_reply(state: &AppState, params: &Params, err: AppError) -> Reply {
    let status = err.status();
    tracing::warn!(status = status.as_u16(), error = %err, "request failed");
    let body = json!({
        "error": err.to_string(),
        "message": err.to_string(),
        "data": err.data(),
        "status": status.as_u16(),
    });
    match encoded(state, params, &body) {
        Ok(reply) => reply.with_status(status),
        Err(_) => {
            let fallback = json!({
                "error": {"code": err.code(), "message": err.to_string(), "details": err.data()}
            });
            Reply::ok("application/json; charset=UTF-8", fallback.to_string()).with_status(status)
        }
    }
}

/// Route the request, then hand it to the front named by `xfront`.
pub async fn dispatch(state: &AppState, method: &Method, path: &str, request: Params) -> Reply {
    let params = match state.router.route(path, request.clone()) {
        Ok(p) => p,
        Err(e) => return error_reply(state, &request, e),
    };

    if let Some(target) = params.text("xredirect").filter(|t| !t.is_empty()) {
        let location = state.router.redirect_url(target);
        tracing::info!(location = %location, "redirect");
        return Reply::redirect(location);
    }

    let front = match params.text("xfront") {
        Some(name) => state.fronts.get(name),
        None => Err(AppError::BadRequest("Front param missing".into())),
    };
    let front = match front {
        Ok(f) => f,
        Err(e) => return error_reply(state, &params, e),
    };

    let result = match *method {
        Method::GET | Method::HEAD => front.get(state, &params).await,
        Method::POST => front.post(state, &params).await,
        Method::PUT => front.put(state, &params).await,
        Method::DELETE => front.delete(state, &params).await,
        _ => Err(AppError::MethodNotAllowed(method.to_string())),
    };
    result.unwrap_or_else(|e| front.handle_error(state, &params, e))
}
