//! Run tracing client.
//!
//! Posts one record per traced QA call to an observability endpoint. The
//! API key is passed in at construction; it is never written to the process
//! environment.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use lexq_core::config::RunTracingConfig;
use lexq_core::error::LexqError;
use lexq_core::services::{NoopTracer, RunTracer, RunTracerFactory};
use lexq_core::types::RunRecord;

use crate::http::{build_client, ensure_success, join_url};

#[derive(Debug, Serialize)]
struct RunPayload<'a> {
    id: String,
    name: &'a str,
    run_type: &'static str,
    session_name: &'a str,
    inputs: &'a serde_json::Value,
    outputs: &'a serde_json::Value,
    start_time: String,
    end_time: String,
    extra: serde_json::Value,
}

/// `RunTracer` that posts records to `<endpoint>/runs`.
pub struct HttpRunTracer {
    url: String,
    project: String,
    api_key: String,
    client: Client,
}

impl HttpRunTracer {
    pub fn new(config: &RunTracingConfig, api_key: String) -> Result<Self, LexqError> {
        let client = build_client(config.request_timeout_secs)
            .map_err(|e| LexqError::Tracing(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            url: join_url(&config.endpoint, "runs"),
            project: config.project.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl RunTracer for HttpRunTracer {
    async fn record(&self, run: RunRecord) -> Result<(), LexqError> {
        let payload = RunPayload {
            id: run.id.to_string(),
            name: &run.name,
            run_type: "llm",
            session_name: &self.project,
            inputs: &run.inputs,
            outputs: &run.outputs,
            start_time: run.start_time.to_rfc3339(),
            end_time: run.end_time.to_rfc3339(),
            extra: serde_json::json!({ "metadata": { "session_id": run.session_id } }),
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| LexqError::Tracing(format!("request failed: {}", e)))?;

        ensure_success(response, LexqError::Tracing).await?;
        tracing::debug!(run_id = %run.id, "Run recorded");
        Ok(())
    }
}

/// Builds an [`HttpRunTracer`] per invocation, or a no-op tracer when run
/// tracing is disabled.
#[derive(Debug, Clone)]
pub struct HttpRunTracerFactory {
    config: RunTracingConfig,
}

impl HttpRunTracerFactory {
    pub fn new(config: RunTracingConfig) -> Self {
        Self { config }
    }
}

impl RunTracerFactory for HttpRunTracerFactory {
    fn build(&self, api_key: String) -> Result<Box<dyn RunTracer>, LexqError> {
        if !self.config.enabled {
            return Ok(Box::new(NoopTracer));
        }
        Ok(Box::new(HttpRunTracer::new(&self.config, api_key)?))
    }
}
