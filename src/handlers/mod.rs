//! HTTP handlers.

pub mod dispatch;
pub use dispatch::*;
