//! Graph backend access.

pub mod backend;
pub mod executor;
pub mod neo4j_http;
pub mod pool;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{BackendError, BackendErrorKind, GraphBackend, GraphConnection, Query, Row};
pub use executor::{QueryExecutor, ResultSet};
pub use neo4j_http::Neo4jHttpBackend;
pub use pool::{GraphSession, PoolStats, SessionPool};
