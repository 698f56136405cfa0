use crate::config::ResolvedConfig;
use crate::error::{CgError, Result};
use crate::storage::StorageEngine;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const ENGINE_NAME: &str = "dgraph";

/// Dgraph over its HTTP API
pub struct DgraphEngine {
    client: Client,
    host: String,
}

impl DgraphEngine {
    pub fn new(host: &str) -> Result<Self> {
        Self::validate_host_url(host)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("cg/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
        })
    }

    pub fn connect(config: &ResolvedConfig) -> Result<Arc<dyn StorageEngine>> {
        tracing::debug!(host = %config.host, "creating dgraph storage engine");
        Ok(Arc::new(Self::new(&config.host)?))
    }

    fn validate_host_url(host: &str) -> Result<()> {
        let parsed = Url::parse(host)
            .map_err(|_| CgError::Storage(format!("Invalid dgraph host URL: {host}")))?;

        match parsed.scheme() {
            "https" | "http" => Ok(()),
            scheme => Err(CgError::Storage(format!(
                "Unsupported dgraph host scheme: {scheme}"
            ))),
        }
    }

    fn check_errors(response: Value) -> Result<Value> {
        if let Some(errors) = response.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let messages: Vec<&str> = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .collect();
                return Err(CgError::Storage(messages.join("; ")));
            }
        }
        Ok(response)
    }
}

impl StorageEngine for DgraphEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn query(&self, query: &str) -> Result<Value> {
        let url = format!("{}/query", self.host);
        tracing::debug!(%url, "dgraph query");

        let response: Value = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/dql")
            .body(query.to_string())
            .send()?
            .error_for_status()?
            .json()?;

        let response = Self::check_errors(response)?;
        Ok(response.get("data").cloned().unwrap_or(response))
    }

    fn write(&self, mutation: &Value) -> Result<()> {
        let url = format!("{}/mutate?commitNow=true", self.host);
        tracing::debug!(%url, "dgraph mutation");

        let response: Value = self
            .client
            .post(&url)
            .json(&json!({ "set": mutation }))
            .send()?
            .error_for_status()?
            .json()?;

        Self::check_errors(response)?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        // Requests are independent; there is no session to tear down.
        tracing::debug!(host = %self.host, "closing dgraph storage engine");
        Ok(())
    }
}
