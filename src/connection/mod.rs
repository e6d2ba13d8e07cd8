//! Connection management.
//!
//! One [`ConnectionManager`] owns one [`ConnectionState`]; reconnecting always
//! closes the previous session first.

mod cursor;
pub mod manager;
mod state;

pub use cursor::Cursor;
pub use manager::{ConnectionInfo, ConnectionManager};
pub use state::ConnectionState;
