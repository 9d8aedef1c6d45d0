//! Process-wide server context.
//!
//! Built once at startup and passed explicitly to the protocol layers; holds
//! the configuration, the frozen tool registry, the session pool and the
//! executor. There are no globals.

use std::sync::Arc;

use crate::graph::{GraphBackend, Neo4jHttpBackend, QueryExecutor, SessionPool};
use crate::tools::{register_builtin_tools, Dispatcher, ToolRegistry};
use crate::types::{Config, Result};

#[derive(Debug)]
pub struct ServerContext {
    config: Config,
    registry: Arc<ToolRegistry>,
    pool: SessionPool,
    executor: QueryExecutor,
}

impl ServerContext {
    /// Connect to the configured Neo4j endpoint and register built-in tools.
    pub async fn start(config: Config) -> Result<Self> {
        let backend = Arc::new(Neo4jHttpBackend::new(&config.backend)?);
        Self::with_backend(config, backend).await
    }

    /// Build against an arbitrary backend. Fails with `BackendUnavailable`
    /// when the backend cannot be reached.
    pub async fn with_backend(config: Config, backend: Arc<dyn GraphBackend>) -> Result<Self> {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry)?;
        Self::with_registry(config, backend, registry).await
    }

    /// Build with a caller-supplied registry.
    pub async fn with_registry(
        config: Config,
        backend: Arc<dyn GraphBackend>,
        registry: ToolRegistry,
    ) -> Result<Self> {
        config.validate()?;
        let pool = SessionPool::connect(backend, config.pool.clone()).await?;
        let executor = QueryExecutor::new(config.executor.clone());
        tracing::info!(tools = registry.len(), "server context ready");
        Ok(Self {
            config,
            registry: Arc::new(registry),
            pool,
            executor,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    /// A dispatcher sharing this context's registry, pool and executor.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.registry.clone(), self.pool.clone(), self.executor.clone())
    }

    /// Close the pool. Leased sessions are discarded as they come back.
    pub fn shutdown(&self) {
        self.pool.close();
    }
}
