//! Database connectivity and fact collection.

mod auth;
pub mod collector;
mod connection;
mod query;
pub mod types;

pub use collector::{FactSession, FactSource, MssqlFactSource, MssqlSession};
pub use connection::{create_pool, pool_status, ConnectionPool, PoolStatus};
pub use query::{QueryExecutor, QueryResult, ResultRow};
pub use types::{SqlValue, TypeMapper};
