// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-backed reply generation for the Igrelay gateway.
//!
//! Implements [`ReplyProvider`] against the Chat Completions API: a bounded
//! context window of recent exchanges, the business's system prompt, and a
//! single timed-out call per inbound message.

pub mod client;
pub mod types;

use async_trait::async_trait;
use igrelay_config::model::OpenAiConfig;
use igrelay_core::{AiErrorKind, Direction, IgrelayError, ReplyProvider, ReplyRequest};
use tracing::{debug, info, warn};

use crate::client::OpenAiClient;
use crate::types::{ChatMessage, ChatRequest};

/// Reply sent when the inbound message has no usable text.
const EMPTY_MESSAGE_REPLY: &str =
    "I received your message but it appears to be empty. Could you please try again?";

/// OpenAI responder implementing [`ReplyProvider`].
///
/// API key resolution order: config -> `OPENAI_API_KEY` env var -> error.
pub struct OpenAiResponder {
    client: OpenAiClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
    max_message_length: usize,
}

impl OpenAiResponder {
    /// Creates a responder from the given configuration.
    pub fn new(config: &OpenAiConfig) -> Result<Self, IgrelayError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = OpenAiClient::new(
            api_key,
            std::time::Duration::from_secs(config.request_timeout_secs),
            config.api_base_url.clone(),
        )?;

        info!(model = config.model, "OpenAI responder initialized");

        Ok(Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            max_message_length: config.max_message_length,
        })
    }

    /// Builds the chat message array: system prompt, prior turns, then the
    /// new message.
    fn build_messages(&self, request: &ReplyRequest) -> Vec<ChatMessage> {
        let system = request
            .system_prompt
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| default_system_prompt(&request.business_name));

        let mut messages = vec![ChatMessage::system(system)];
        for turn in &request.history {
            messages.push(match turn.direction {
                Direction::Inbound => ChatMessage::user(turn.text.clone()),
                Direction::Outbound => ChatMessage::assistant(turn.text.clone()),
            });
        }

        let mut text = request.message_text.clone();
        if text.chars().count() > self.max_message_length {
            warn!(
                limit = self.max_message_length,
                "inbound message truncated before prompting"
            );
            text = text.chars().take(self.max_message_length).collect();
        }
        messages.push(ChatMessage::user(text));
        messages
    }
}

#[async_trait]
impl ReplyProvider for OpenAiResponder {
    async fn generate_reply(&self, request: ReplyRequest) -> Result<String, IgrelayError> {
        if request.message_text.trim().is_empty() {
            return Ok(EMPTY_MESSAGE_REPLY.to_string());
        }

        let api_request = ChatRequest {
            model: self.model.clone(),
            messages: self.build_messages(&request),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        debug!(
            turns = api_request.messages.len(),
            business = %request.business_name,
            "requesting completion"
        );

        let response = self.client.chat(&api_request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| IgrelayError::Provider {
                kind: AiErrorKind::ProviderUnavailable,
                message: "provider returned no choices".into(),
            })?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(IgrelayError::Provider {
                kind: AiErrorKind::ContentRejected,
                message: "provider filtered the completion".into(),
            });
        }

        match choice.message.content {
            Some(content) if !content.trim().is_empty() => Ok(content.trim().to_string()),
            _ => Err(IgrelayError::Provider {
                kind: AiErrorKind::ProviderUnavailable,
                message: "provider returned an empty completion".into(),
            }),
        }
    }
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, IgrelayError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("OPENAI_API_KEY").map_err(|_| {
        IgrelayError::Config(
            "OpenAI API key not found. Set openai.api_key in config or the OPENAI_API_KEY environment variable.".into(),
        )
    })
}

/// Default system prompt when the business has not configured one.
fn default_system_prompt(business_name: &str) -> String {
    format!(
        "You are an AI assistant for {business_name}, a business that sells products online. \
         Introduce yourself as an AI assistant, keep replies concise and helpful, and never \
         invent product names, prices, or availability. If you do not know something, say so \
         and suggest contacting the business directly."
    )
}
