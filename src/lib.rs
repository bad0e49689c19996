//! restframe: configuration-driven REST dispatch library.

pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod front;
pub mod handlers;
pub mod logging;
pub mod model;
pub mod params;
pub mod response;
pub mod router;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod transaction;

pub use config::{load_from_dir, load_from_env, resolve, AppConfig, ConfigLayers, ModelRegistry};
pub use controller::{Controller, ControllerRegistry};
pub use db::{Connector, Database, QueryOutcome, SqlConnector};
pub use error::{AppError, ConfigError};
pub use front::{dispatch, Front, FrontRegistry};
pub use model::Model;
pub use params::{ParamValue, Params};
pub use response::Reply;
pub use router::Router;
pub use routes::{app_routes, common_routes_with_ready};
pub use service::{CrudService, Verb};
pub use state::AppState;
pub use transaction::Transaction;
