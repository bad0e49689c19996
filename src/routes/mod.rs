mod common;
mod dispatch;

pub use common::common_routes_with_ready;
pub use dispatch::app_routes;
