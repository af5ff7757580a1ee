//! Connection bootstrap, live watches and logging setup.

pub mod connection;
pub mod tracing;

pub use connection::{Bootstrap, Connection, ConnectionConfig};
pub use self::tracing::setup_tracing;
