//! Application controllers, registered by name and called by the controller front.

use crate::error::AppError;
use crate::params::Params;
use crate::state::AppState;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Controller: Send + Sync {
    /// Run `action` with the request params. Unknown actions should fail with
    /// [`unknown_action`].
    async fn call(&self, action: &str, params: &Params, state: &AppState) -> Result<Value, AppError>;
}

pub fn unknown_action(action: &str) -> AppError {
    AppError::BadRequest(format!("Controller method not found: {}", action))
}

#[derive(Clone, Default)]
pub struct ControllerRegistry {
    controllers: HashMap<String, Arc<dyn Controller>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: &str, controller: impl Controller + 'static) -> Self {
        self.controllers.insert(name.to_string(), Arc::new(controller));
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Controller>, AppError> {
        self.controllers
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("controller '{}' does not exist", name)))
    }
}
