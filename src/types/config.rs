//! Configuration structures.
//!
//! Configuration is read once at startup from an optional JSON file and then
//! overridden from environment variables. The resulting tree is immutable;
//! components receive the section they need by value.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::{Error, Result as CrateResult};

/// Global server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, JsonSchema)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Graph backend endpoint and credentials.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Session pool sizing and timeouts.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Query execution timeout and retry policy.
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// IPC transport configuration.
    #[serde(default)]
    pub ipc: IpcConfig,
}

impl Config {
    /// Load from an optional JSON file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> CrateResult<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str(&raw)?
            }
            None => Config::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides on top of the current values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get("NEO4J_URI") {
            self.backend.uri = v;
        }
        if let Some(v) = get("NEO4J_USER") {
            self.backend.user = v;
        }
        if let Some(v) = get("NEO4J_PASSWORD") {
            self.backend.password = v;
        }
        if let Some(v) = get("NEO4J_DATABASE") {
            self.backend.database = v;
        }
        if let Some(v) = get("GRAPH_TOOLS_LISTEN_ADDR") {
            self.server.listen_addr = v;
        }
        if let Some(v) = get("GRAPH_TOOLS_POOL_SIZE").and_then(|v| v.parse().ok()) {
            self.pool.max_size = v;
        }
        if let Some(v) = get("GRAPH_TOOLS_LOG_LEVEL") {
            self.observability.log_level = v;
        }
    }

    /// Reject settings the core cannot run with.
    pub fn validate(&self) -> CrateResult<()> {
        if self.pool.max_size == 0 {
            return Err(Error::internal("pool.max_size must be positive"));
        }
        if self.backend.uri.trim().is_empty() {
            return Err(Error::internal("backend.uri cannot be empty"));
        }
        let timeouts = [
            ("pool.acquire_timeout", self.pool.acquire_timeout),
            ("executor.query_timeout", self.executor.query_timeout),
            ("backend.connect_timeout", self.backend.connect_timeout),
        ];
        for (field, value) in timeouts {
            if value.is_zero() {
                return Err(Error::internal(format!("{} must be positive", field)));
            }
        }
        Ok(())
    }

    /// JSON schema of the configuration file.
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(Config)).unwrap_or_default()
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ServerConfig {
    /// Protocol server bind address (TCP).
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7700".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Graph backend endpoint and credentials.
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BackendConfig {
    /// Base HTTP URI of the Neo4j server.
    pub uri: String,

    /// Database name.
    pub database: String,

    pub user: String,

    pub password: String,

    /// Timeout for establishing a connection.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("uri", &self.uri)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            database: "neo4j".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Session pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of backend connections (fixed for the process lifetime).
    pub max_size: usize,

    /// How long `acquire` waits for a free session.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub acquire_timeout: Duration,

    /// Idle connections older than this are liveness-checked before reuse.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub stale_after: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            acquire_timeout: Duration::from_secs(5),
            stale_after: Duration::from_secs(30),
        }
    }
}

/// Query execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Upper bound for a single query attempt.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub query_timeout: Duration,

    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,

    /// Backoff before the first retry; doubled per attempt.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub base_backoff: Duration,

    /// Cap for the exponential backoff.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub max_backoff: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(30),
            max_retries: 3,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
        }
    }
}

/// IPC transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct IpcConfig {
    /// Maximum frame payload size in bytes.
    pub max_frame_bytes: u32,

    /// Maximum concurrent TCP connections. Connections beyond this limit
    /// are rejected.
    pub max_connections: usize,

    /// Per-frame read timeout. Connections idle beyond this duration are dropped.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub read_timeout: Duration,

    /// Per-frame write timeout. Slow consumers that cannot accept a response
    /// within this window are dropped.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub write_timeout: Duration,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: 5 * 1024 * 1024,
            max_connections: 256,
            read_timeout: Duration::from_secs(300),
            write_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"pool": {{"max_size": 2, "acquire_timeout": "250ms"}}, "executor": {{"max_retries": 5}}}}"#
        )
        .unwrap();

        let raw = std::fs::read_to_string(file.path()).unwrap();
        let config: Config = serde_json::from_str(&raw).unwrap();

        assert_eq!(config.pool.max_size, 2);
        assert_eq!(config.pool.acquire_timeout, Duration::from_millis(250));
        assert_eq!(config.pool.stale_after, Duration::from_secs(30));
        assert_eq!(config.executor.max_retries, 5);
        assert_eq!(config.backend.database, "neo4j");
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("NEO4J_URI", "http://graph:7474"),
            ("NEO4J_PASSWORD", "secret"),
            ("GRAPH_TOOLS_POOL_SIZE", "3"),
            ("GRAPH_TOOLS_POOL_SIZE_IGNORED", "x"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend.uri, "http://graph:7474");
        assert_eq!(config.backend.password, "secret");
        assert_eq!(config.pool.max_size, 3);
    }

    #[test]
    fn zero_pool_size_rejected() {
        let mut config = Config::default();
        config.pool.max_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pool.max_size"));
    }

    #[test]
    fn password_is_redacted_in_debug() {
        let mut backend = BackendConfig::default();
        backend.password = "hunter2".into();
        let rendered = format!("{:?}", backend);
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn schema_names_sections() {
        let schema = Config::json_schema();
        let props = &schema["properties"];
        assert!(props.get("pool").is_some());
        assert!(props.get("executor").is_some());
    }
}
