//! Shared application state, passed to every front and controller.

use crate::config::{resolve, AppConfig, ModelRegistry};
use crate::controller::ControllerRegistry;
use crate::db::Connector;
use crate::error::ConfigError;
use crate::front::FrontRegistry;
use crate::router::Router;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Connector>,
    pub config: Arc<AppConfig>,
    pub models: Arc<ModelRegistry>,
    pub router: Arc<Router>,
    pub fronts: Arc<FrontRegistry>,
    pub controllers: Arc<ControllerRegistry>,
}

impl AppState {
    /// Resolve `config` and wire the built-in fronts; no controllers yet.
    pub fn new(config: AppConfig, db: Arc<dyn Connector>) -> Result<Self, ConfigError> {
        let (models, router) = resolve(&config)?;
        Ok(AppState {
            db,
            config: Arc::new(config),
            models: Arc::new(models),
            router: Arc::new(router),
            fronts: Arc::new(FrontRegistry::default()),
            controllers: Arc::new(ControllerRegistry::new()),
        })
    }

    pub fn with_controllers(mut self, controllers: ControllerRegistry) -> Self {
        self.controllers = Arc::new(controllers);
        self
    }

    pub fn with_fronts(mut self, fronts: FrontRegistry) -> Self {
        self.fronts = Arc::new(fronts);
        self
    }
}
