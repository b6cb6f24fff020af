//! Question-answering chain.
//!
//! The chat route hands every query to a [`QaChain`]. The service builds one
//! at startup and shares it for the lifetime of the process.

use futures::future::BoxFuture;
use tracing::debug;

use crate::config::ChainConfig;
use crate::error::ServiceResult;
use crate::history::ChatMessage;
use crate::ollama::{OllamaClient, OllamaMessage};
use crate::reports::ReportLibrary;

/// Answers a question given the conversation so far
pub trait QaChain: Send + Sync {
    fn query<'a>(
        &'a self,
        message: &'a str,
        history: &'a [ChatMessage],
    ) -> BoxFuture<'a, ServiceResult<String>>;
}

/// QA chain backed by an Ollama chat model, with uploaded text reports as context
pub struct OllamaQaChain {
    client: OllamaClient,
    reports: ReportLibrary,
    config: ChainConfig,
}

impl OllamaQaChain {
    pub fn new(client: OllamaClient, reports: ReportLibrary, config: ChainConfig) -> Self {
        Self {
            client,
            reports,
            config,
        }
    }

    async fn answer(&self, message: &str, history: &[ChatMessage]) -> ServiceResult<String> {
        let context = if self.config.include_reports {
            self.reports.context(self.config.max_context_chars).await
        } else {
            None
        };

        debug!(
            model = %self.client.model(),
            history_len = history.len(),
            has_context = context.is_some(),
            "Querying QA chain"
        );

        let messages = build_messages(&self.config.system_prompt, context, message, history);
        self.client.chat(messages).await
    }
}

impl QaChain for OllamaQaChain {
    fn query<'a>(
        &'a self,
        message: &'a str,
        history: &'a [ChatMessage],
    ) -> BoxFuture<'a, ServiceResult<String>> {
        Box::pin(self.answer(message, history))
    }
}

/// System prompt, optional report context, history in order, then the new message
fn build_messages(
    system_prompt: &str,
    context: Option<String>,
    message: &str,
    history: &[ChatMessage],
) -> Vec<OllamaMessage> {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(OllamaMessage::system(system_prompt));

    if let Some(context) = context {
        messages.push(OllamaMessage::system(format!(
            "Uploaded medical reports:\n\n{}",
            context
        )));
    }

    messages.extend(history.iter().map(OllamaMessage::from));
    messages.push(OllamaMessage::from(&ChatMessage::user(message)));
    messages
}
