//! Capability traits for the external collaborators of a turn.
//!
//! The turn handler only talks to these traits, so alternate backends and
//! test doubles substitute without touching the orchestration.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatMessage, Credentials, QaRequest, QaResponse, Role, RunRecord};

/// Read-one-parameter-by-name secret store.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_parameter(&self, name: &str) -> Result<String>;
}

/// Exchanges a user identity for delegated, time-limited credentials.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self, identity: &str) -> Result<Credentials>;
}

/// Client for the hosted QA service, bound to one set of credentials.
#[async_trait]
pub trait QaServiceClient: Send + Sync {
    async fn chat(&self, request: QaRequest) -> Result<QaResponse>;
}

/// Builds a [`QaServiceClient`] bound to freshly exchanged credentials.
pub trait QaClientFactory: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn QaServiceClient>>;
}

/// Append-only conversation history keyed by session id.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// All messages of a session, oldest first. Unknown sessions are empty.
    async fn messages(&self, session_id: &str) -> Result<Vec<ChatMessage>>;

    /// Append one message to the end of a session's history.
    async fn append_message(&self, session_id: &str, role: Role, content: &str) -> Result<()>;

    /// Append a user message and the assistant reply as one unit.
    ///
    /// Either both messages are persisted or neither is.
    async fn append_turn(&self, session_id: &str, user: &str, assistant: &str) -> Result<()>;
}

/// Records traced runs with an external observability service.
#[async_trait]
pub trait RunTracer: Send + Sync {
    async fn record(&self, run: RunRecord) -> Result<()>;
}

/// Builds a [`RunTracer`] from the API key fetched for this invocation.
pub trait RunTracerFactory: Send + Sync {
    fn build(&self, api_key: String) -> Result<Box<dyn RunTracer>>;
}

/// Tracer that drops every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

#[async_trait]
impl RunTracer for NoopTracer {
    async fn record(&self, run: RunRecord) -> Result<()> {
        tracing::trace!(run_id = %run.id, "Run tracing disabled; record dropped");
        Ok(())
    }
}

/// Factory for when run tracing is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracerFactory;

impl RunTracerFactory for NoopTracerFactory {
    fn build(&self, _api_key: String) -> Result<Box<dyn RunTracer>> {
        Ok(Box::new(NoopTracer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_noop_tracer_accepts_records() {
        let tracer: Box<dyn RunTracer> = Box::new(NoopTracer);
        let run = RunRecord {
            id: Uuid::new_v4(),
            name: "qa".to_string(),
            session_id: "s1".to_string(),
            inputs: serde_json::json!({}),
            outputs: serde_json::json!({}),
            start_time: Utc::now(),
            end_time: Utc::now(),
        };
        assert!(tracer.record(run).await.is_ok());
    }
}
