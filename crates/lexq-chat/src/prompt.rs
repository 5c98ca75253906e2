//! Instruction templates and request builders for the QA service.

use lexq_core::types::{ChatMessage, QaRequest};

/// Answer-style instruction for the final QA call.
pub const QA_SYSTEM_PROMPT: &str =
    "Answer using the context below. Keep to 3 sentences max. Say \"I don't know\" if unsure.";

/// Instruction for rewriting a follow-up into a standalone question.
pub const CONTEXTUALIZE_SYSTEM_PROMPT: &str = "Given a chat history and the latest user question \
which might reference context in the chat history, formulate a standalone question \
which can be understood without the chat history. Do NOT answer the question, \
just reformulate it if needed and otherwise return it as is.";

/// Request asking the service to rewrite `question` into a standalone one.
///
/// Sent outside the service-side conversation so the rewrite does not
/// become part of it.
pub fn rewrite_request(history: &[ChatMessage], question: &str) -> QaRequest {
    QaRequest {
        system_prompt: CONTEXTUALIZE_SYSTEM_PROMPT.to_string(),
        history: history.to_vec(),
        question: question.to_string(),
        conversation_id: None,
        parent_message_id: None,
    }
}

/// Request for the answer itself, continuing the service-side
/// conversation when the previous turn left its ids behind.
pub fn answer_request(
    history: Vec<ChatMessage>,
    question: &str,
    conversation_id: Option<String>,
    parent_message_id: Option<String>,
) -> QaRequest {
    QaRequest {
        system_prompt: QA_SYSTEM_PROMPT.to_string(),
        history,
        question: question.to_string(),
        conversation_id,
        parent_message_id,
    }
}
