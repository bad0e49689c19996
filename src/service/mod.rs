//! CrudService: generic model operations over the SQL builder.

mod crud;
mod validation;
pub use crud::{CrudService, Verb};
pub use validation::FieldValidator;
