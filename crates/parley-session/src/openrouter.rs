//! OpenRouter-backed implementation of the [`Translator`] collaborator.
//!
//! Talks to an OpenAI-compatible chat completions endpoint. The prompt
//! instructs the model to output only the translation of the full stable
//! prefix, with the previous (source, translation) pair as context so
//! the reply extends the earlier answer instead of rephrasing it.

use parley_types::{Direction, TranslationPair};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::TranslatorConfig;
use crate::error::SessionError;
use crate::translate::{BoxFuture, Translator};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// LLM translation client for OpenRouter (or any OpenAI-compatible API).
#[derive(Debug, Clone)]
pub struct OpenRouterTranslator {
    client: reqwest::Client,
    config: TranslatorConfig,
}

impl OpenRouterTranslator {
    /// Builds a client from the translator configuration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Http` if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(config: TranslatorConfig) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { client, config })
    }

    async fn translate(
        &self,
        source_text: &str,
        context: Option<&TranslationPair>,
        direction: &Direction,
    ) -> Result<String, SessionError> {
        let prompt = build_prompt(source_text, context, direction);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        debug!(model = %self.config.model, source_words = parley_types::word_count(source_text), "translation request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SessionError::TranslationUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SessionError::TranslationUnavailable(format!(
                "translation API returned {}",
                response.status()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| SessionError::TranslationUnavailable(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                SessionError::TranslationUnavailable("translation API returned no choices".into())
            })?;

        Ok(strip_wrapping_quotes(content.trim()).to_string())
    }
}

impl Translator for OpenRouterTranslator {
    fn request_translation<'a>(
        &'a self,
        source_text: &'a str,
        context: Option<&'a TranslationPair>,
        direction: &'a Direction,
    ) -> BoxFuture<'a, Result<String, SessionError>> {
        Box::pin(self.translate(source_text, context, direction))
    }
}

/// Builds the translation prompt for the chat completions API.
fn build_prompt(source_text: &str, context: Option<&TranslationPair>, direction: &Direction) -> String {
    let source_lang = direction.source.display_name();
    let target_lang = direction.target.display_name();

    match context {
        Some(pair) if !pair.source_text.is_empty() && !pair.translated_text.is_empty() => format!(
            "Translate from {source_lang} to {target_lang}. \
             Output ONLY the translation, nothing else.\n\n\
             Context: \"{}\" = \"{}\"\n\
             Full text: \"{source_text}\"",
            pair.source_text, pair.translated_text,
        ),
        _ => format!(
            "Translate from {source_lang} to {target_lang}. \
             Output ONLY the translation, nothing else.\n\n\
             Text: \"{source_text}\"",
        ),
    }
}

/// Removes one pair of wrapping double quotes, if the model added them.
fn strip_wrapping_quotes(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_without_context() {
        let prompt = build_prompt("Привет как", None, &Direction::default());
        assert!(prompt.starts_with("Translate from Russian to English."));
        assert!(prompt.contains("Text: \"Привет как\""));
        assert!(!prompt.contains("Context:"));
    }

    #[test]
    fn prompt_with_context() {
        let pair = TranslationPair::new("Привет как", "Hello how");
        let prompt = build_prompt("Привет как дела", Some(&pair), &Direction::default());
        assert!(prompt.contains("Context: \"Привет как\" = \"Hello how\""));
        assert!(prompt.contains("Full text: \"Привет как дела\""));
    }

    #[test]
    fn empty_context_falls_back_to_plain_prompt() {
        let pair = TranslationPair::new("", "");
        let prompt = build_prompt("Привет", Some(&pair), &Direction::default());
        assert!(prompt.contains("Text: \"Привет\""));
        assert!(!prompt.contains("Context:"));
    }

    #[test]
    fn wrapping_quotes_are_stripped() {
        assert_eq!(strip_wrapping_quotes("\"Hello how\""), "Hello how");
        assert_eq!(strip_wrapping_quotes("Hello how"), "Hello how");
        assert_eq!(strip_wrapping_quotes("\"unbalanced"), "\"unbalanced");
        assert_eq!(strip_wrapping_quotes("\""), "\"");
    }
}
