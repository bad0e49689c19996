//! Example consumer: serves the models and routes in `config/`.
//!
//! Run from this directory: `cargo run` (set `DATABASE_URL`, optionally `APP_PROFILE`).

use async_trait::async_trait;
use restframe::controller::unknown_action;
use restframe::{
    app_routes, load_from_env, logging, AppError, AppState, Controller, ControllerRegistry,
    Params, SqlConnector,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

/// `GET /status/:xmethod`: small controller showing the controller front.
struct StatusController;

#[async_trait]
impl Controller for StatusController {
    async fn call(&self, action: &str, params: &Params, state: &AppState) -> Result<Value, AppError> {
        match action {
            "get" | "models" => Ok(json!({ "models": state.models.names().collect::<Vec<_>>() })),
            "echo" => Ok(serde_json::to_value(params).unwrap_or(Value::Null)),
            other => Err(unknown_action(other)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_from_env()?;
    logging::init("restframe=info,example_consumer=info");

    let connector = SqlConnector::connect_lazy(&config.database, config.error.reporting)?;
    let controllers = ControllerRegistry::new().register("status", StatusController);
    let state = AppState::new(config, Arc::new(connector))?.with_controllers(controllers);

    let app = app_routes(state);
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
