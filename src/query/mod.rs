//! Guarded query execution and schema introspection.
//!
//! Every statement, including the explorer's own introspection queries,
//! goes through [`QueryExecutor::execute`] and therefore through the
//! statement classifier.

pub mod executor;
pub mod explorer;

pub use executor::QueryExecutor;
pub use explorer::{SchemaExplorer, SYSTEM_SCHEMAS};
