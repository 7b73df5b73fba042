//! Execution layer: validation plus the CRUD and aggregate operations every delegate exposes.

mod conn;
mod crud;
mod validation;
pub use conn::Conn;
pub use crud::{CrudService, BULK_LIMIT};
pub use validation::RequestValidator;
