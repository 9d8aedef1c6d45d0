//! Neo4j backend over the HTTP transactional endpoint.
//!
//! Every query is a single auto-commit transaction:
//! `POST {uri}/db/{database}/tx/commit` with
//! `{"statements": [{"statement": ..., "parameters": {...}}]}`.
//! reqwest keeps TCP connections alive underneath, so a "connection" here is
//! a lightweight handle whose liveness is checked with `RETURN 1`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::graph::backend::{BackendError, GraphBackend, GraphConnection, Query, Row};
use crate::types::{BackendConfig, Error, Result};

const SYNTAX_ERROR: &str = "Neo.ClientError.Statement.SyntaxError";
const CONSTRAINT_FAILED: &str = "Neo.ClientError.Schema.ConstraintValidationFailed";
const TRANSIENT_PREFIX: &str = "Neo.TransientError.";

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<DataRow>,
}

#[derive(Debug, Deserialize)]
struct DataRow {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Neo4jError {
    code: String,
    #[serde(default)]
    message: String,
}

/// Map a Neo4j status code onto a backend error class.
pub fn classify_status(code: &str, message: &str) -> BackendError {
    let text = format!("{}: {}", code, message);
    if code == SYNTAX_ERROR {
        BackendError::syntax(text)
    } else if code == CONSTRAINT_FAILED {
        BackendError::constraint(text)
    } else if code.starts_with(TRANSIENT_PREFIX) {
        BackendError::transient(text)
    } else {
        BackendError::fatal(text)
    }
}

/// Zip column names with each positional row.
fn normalize_rows(result: StatementResult) -> Vec<Row> {
    let columns = result.columns;
    result
        .data
        .into_iter()
        .map(|data| {
            columns
                .iter()
                .cloned()
                .zip(data.row)
                .collect::<Map<String, Value>>()
        })
        .collect()
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_connect() {
        BackendError::unavailable(err.to_string())
    } else if err.is_timeout() || err.is_request() || err.is_body() {
        BackendError::connection_lost(err.to_string())
    } else {
        BackendError::fatal(err.to_string())
    }
}

/// Neo4j HTTP backend.
#[derive(Clone)]
pub struct Neo4jHttpBackend {
    client: reqwest::Client,
    base_url: String,
    commit_url: String,
    user: String,
    password: String,
}

impl std::fmt::Debug for Neo4jHttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neo4jHttpBackend")
            .field("commit_url", &self.commit_url)
            .finish()
    }
}

impl Neo4jHttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| Error::internal(format!("failed to build http client: {}", e)))?;

        let base_url = config.uri.trim_end_matches('/').to_string();
        let commit_url = format!("{}/db/{}/tx/commit", base_url, config.database);

        Ok(Self {
            client,
            base_url,
            commit_url,
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    /// Authenticated auto-commit request carrying `body`.
    fn commit_request(&self, body: &Value) -> reqwest::RequestBuilder {
        self.client
            .post(&self.commit_url)
            .basic_auth(&self.user, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
    }

    pub fn commit_url(&self) -> &str {
        &self.commit_url
    }
}

#[async_trait]
impl GraphBackend for Neo4jHttpBackend {
    async fn connect(&self) -> std::result::Result<Box<dyn GraphConnection>, BackendError> {
        // Discovery endpoint: reachable without credentials.
        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| BackendError::unavailable(e.to_string()))?;
        if response.status().is_server_error() {
            return Err(BackendError::unavailable(format!(
                "discovery endpoint returned {}",
                response.status()
            )));
        }
        Ok(Box::new(Neo4jHttpConnection {
            backend: self.clone(),
        }))
    }

    fn endpoint(&self) -> String {
        self.commit_url.clone()
    }
}

struct Neo4jHttpConnection {
    backend: Neo4jHttpBackend,
}

#[async_trait]
impl GraphConnection for Neo4jHttpConnection {
    async fn run(&mut self, query: &Query) -> std::result::Result<Vec<Row>, BackendError> {
        let body = serde_json::json!({
            "statements": [{
                "statement": query.text,
                "parameters": query.params,
            }]
        });

        let response = self
            .backend
            .commit_request(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(BackendError::fatal(format!("authentication rejected ({})", status)));
        }
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(BackendError::transient(format!("backend busy ({})", status)));
        }
        if !status.is_success() {
            return Err(BackendError::fatal(format!("unexpected HTTP status {}", status)));
        }

        let tx: TxResponse = response.json().await.map_err(transport_error)?;
        if let Some(err) = tx.errors.first() {
            return Err(classify_status(&err.code, &err.message));
        }

        Ok(tx.results.into_iter().next().map(normalize_rows).unwrap_or_default())
    }

    async fn ping(&mut self) -> std::result::Result<(), BackendError> {
        self.run(&Query::new("RETURN 1 AS ok")).await.map(|_| ())
    }
}
