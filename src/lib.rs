//! Redshift Warden - guarded SQL execution against Amazon Redshift.
//!
//! Statements are classified against an access mode before they reach the
//! warehouse, a single session is managed explicitly, and schema metadata is
//! summarised as text for SQL-generation collaborators. [`Warden`] is the
//! entry point.

pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;
pub mod safety;
pub mod warden;

pub use error::{Result, WardenError};
pub use safety::AccessMode;
pub use warden::Warden;
