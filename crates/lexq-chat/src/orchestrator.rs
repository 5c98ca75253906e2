//! Turn handler: the orchestration sequence for one dialog turn.
//!
//! secret -> delegated credentials -> QA client -> history -> optional
//! rewrite -> answer -> persist turn -> merge session attributes.
//! Every step runs sequentially; any failure aborts the turn.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use lexq_core::config::LexqConfig;
use lexq_core::error::LexqError;
use lexq_core::services::{
    CredentialProvider, HistoryStore, NoopTracer, QaClientFactory, QaServiceClient, RunTracer,
    RunTracerFactory, SecretStore,
};
use lexq_core::types::{
    ChatMessage, QaResponse, RunRecord, SessionAttributes, CONVERSATION_ID_KEY, MESSAGE_ID_KEY,
};

use crate::envelope::{DialogEvent, DialogResponse};
use crate::error::ChatError;
use crate::prompt;

/// Per-deployment settings the handler needs on every turn.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    /// Secret parameter holding the run tracing API key.
    pub api_key_parameter: String,
    /// Identity delegated credentials are requested for.
    pub user_identity: String,
    /// Answer the rewritten question instead of the raw utterance.
    pub use_standalone_question: bool,
    /// Carry the prior conversation and message ids into the answer call.
    pub continue_conversation: bool,
}

impl TurnSettings {
    pub fn from_config(config: &LexqConfig) -> Self {
        Self {
            api_key_parameter: config.secrets.api_key_parameter.clone(),
            user_identity: config.credentials.user_identity.clone(),
            use_standalone_question: config.qa.use_standalone_question,
            continue_conversation: config.qa.continue_conversation,
        }
    }
}

/// Result of one handled turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub session_attributes: SessionAttributes,
    /// The rewritten question, when history existed.
    pub standalone_question: Option<String>,
}

/// The external collaborators of a turn.
#[derive(Clone)]
pub struct TurnServices {
    pub secrets: Arc<dyn SecretStore>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub qa: Arc<dyn QaClientFactory>,
    pub history: Arc<dyn HistoryStore>,
    pub tracer: Arc<dyn RunTracerFactory>,
}

/// Coordinates one turn across the secret store, credential exchange, QA
/// service and history store.
pub struct TurnHandler {
    services: TurnServices,
    settings: TurnSettings,
}

impl TurnHandler {
    pub fn new(services: TurnServices, settings: TurnSettings) -> Self {
        Self { services, settings }
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    /// Handle a raw dialog platform event and build the response envelope.
    pub async fn handle_event(&self, event: &DialogEvent) -> Result<DialogResponse, ChatError> {
        let outcome = self
            .handle(
                &event.input_transcript,
                &event.session_id,
                event.session_attributes(),
            )
            .await?;

        info!(
            session_id = %event.session_id,
            intent = %event.intent_name(),
            session_attributes = ?outcome.session_attributes,
            "Returning session attributes to dialog platform"
        );

        Ok(DialogResponse::fulfilled(
            event.intent_name(),
            &outcome.reply,
            outcome.session_attributes,
        ))
    }

    /// Handle one utterance for a session.
    ///
    /// The utterance is not validated; an empty string is sent to the QA
    /// service as-is.
    pub async fn handle(
        &self,
        utterance: &str,
        session_id: &str,
        prior_attributes: SessionAttributes,
    ) -> Result<TurnOutcome, ChatError> {
        debug!(session_id = %session_id, "Handling turn");

        // Step 1: secret.
        let api_key = self
            .services
            .secrets
            .get_parameter(&self.settings.api_key_parameter)
            .await
            .map_err(ChatError::Secret)?;

        // Step 2: delegated credentials, fresh every turn.
        let credentials = self
            .services
            .credentials
            .credentials(&self.settings.user_identity)
            .await
            .map_err(ChatError::Credentials)?;
        if credentials.is_expired(Utc::now()) {
            return Err(ChatError::Credentials(LexqError::Credentials(
                "issued credentials are already expired".to_string(),
            )));
        }

        // Step 3: clients bound to this turn's credentials and secret.
        let qa = self
            .services
            .qa
            .connect(&credentials)
            .map_err(ChatError::QaService)?;
        let tracer = self.build_tracer(api_key);

        // Step 4: history. Unknown sessions come back empty.
        let history = self
            .services
            .history
            .messages(session_id)
            .await
            .map_err(ChatError::History)?;

        // Step 5: standalone question, only when there is history to resolve against.
        let standalone_question = if history.is_empty() {
            None
        } else {
            Some(self.contextualize(qa.as_ref(), &history, utterance).await?)
        };

        let question = match (&standalone_question, self.settings.use_standalone_question) {
            (Some(standalone), true) => standalone.as_str(),
            _ => utterance,
        };

        // Step 6: answer.
        let started = Utc::now();
        let (conversation_id, parent_message_id) = if self.settings.continue_conversation {
            (
                non_empty(prior_attributes.get(CONVERSATION_ID_KEY)),
                non_empty(prior_attributes.get(MESSAGE_ID_KEY)),
            )
        } else {
            (None, None)
        };
        let request =
            prompt::answer_request(history, question, conversation_id, parent_message_id);
        let response = qa.chat(request).await.map_err(ChatError::QaService)?;
        let conversation_id = response
            .conversation_id()
            .map_err(ChatError::QaService)?
            .to_string();
        let message_id = response
            .system_message_id()
            .map_err(ChatError::QaService)?
            .to_string();

        // Step 7: persist the turn as one unit.
        self.services
            .history
            .append_turn(session_id, utterance, &response.text)
            .await
            .map_err(ChatError::History)?;

        // Only persisted turns are traced.
        self.trace_run(tracer.as_ref(), session_id, question, &response, started)
            .await;

        // Step 8: merge ids into the caller's attributes.
        let session_attributes =
            merge_session_attributes(prior_attributes, conversation_id, message_id);

        info!(
            session_id = %session_id,
            rewritten = standalone_question.is_some(),
            reply_len = response.text.len(),
            "Turn completed"
        );

        Ok(TurnOutcome {
            reply: response.text,
            session_attributes,
            standalone_question,
        })
    }

    // -- Private helpers --

    async fn contextualize(
        &self,
        qa: &dyn QaServiceClient,
        history: &[ChatMessage],
        utterance: &str,
    ) -> Result<String, ChatError> {
        let response = qa
            .chat(prompt::rewrite_request(history, utterance))
            .await
            .map_err(ChatError::Rewrite)?;
        let standalone = response.text.trim().to_string();
        debug!(standalone = %standalone, "Question rewritten");
        Ok(standalone)
    }

    fn build_tracer(&self, api_key: String) -> Box<dyn RunTracer> {
        match self.services.tracer.build(api_key) {
            Ok(tracer) => tracer,
            Err(e) => {
                warn!(error = %e, "Run tracer unavailable; tracing disabled for this turn");
                Box::new(NoopTracer)
            }
        }
    }

    async fn trace_run(
        &self,
        tracer: &dyn RunTracer,
        session_id: &str,
        question: &str,
        response: &QaResponse,
        started: chrono::DateTime<Utc>,
    ) {
        let run = RunRecord {
            id: Uuid::new_v4(),
            name: "qa_chain".to_string(),
            session_id: session_id.to_string(),
            inputs: serde_json::json!({ "question": question }),
            outputs: serde_json::json!({ "answer": response.text, "response": response.raw }),
            start_time: started,
            end_time: Utc::now(),
        };
        if let Err(e) = tracer.record(run).await {
            warn!(error = %e, session_id = %session_id, "Failed to record run");
        }
    }
}

/// Copy `prior` and overwrite the two reserved keys.
pub fn merge_session_attributes(
    mut prior: SessionAttributes,
    conversation_id: String,
    message_id: String,
) -> SessionAttributes {
    prior.insert(CONVERSATION_ID_KEY.to_string(), conversation_id);
    prior.insert(MESSAGE_ID_KEY.to_string(), message_id);
    prior
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

// =============================================================================
// Tests
// =============================================================================
