use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ProviderKind, ProviderOutput, TranslationProvider, build_client, ensure_success};
use crate::error::TranslateError;

const OPENAI_URL: &str = "https://api.openai.com";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Translation through the OpenAI chat-completions API.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Result<Self, TranslateError> {
        let base_url = base_url.unwrap_or_else(|| OPENAI_URL.to_string());
        Ok(Self {
            client: build_client(ProviderKind::OpenAi, timeout)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

fn system_prompt(source_lang: Option<&str>, target_lang: &str) -> String {
    let from = source_lang
        .map(|lang| format!(" from {lang}"))
        .unwrap_or_default();
    format!(
        "Translate the user's message{from} into {target_lang}. Translate verbatim, \
         keep names, emoji and formatting, and return only the translation."
    )
}

#[async_trait]
impl TranslationProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: Option<&str>,
        target_lang: &str,
    ) -> Result<ProviderOutput, TranslateError> {
        let prompt = system_prompt(source_lang, target_lang);
        let request = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: [
                ChatMessage { role: "system", content: &prompt },
                ChatMessage { role: "user", content: text },
            ],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| TranslateError::Http {
                provider: ProviderKind::OpenAi,
                source,
            })?;
        debug!("OpenAI responded {} for target {}", response.status(), target_lang);

        let parsed: ChatResponse = ensure_success(ProviderKind::OpenAi, response)
            .await?
            .json()
            .await
            .map_err(|source| TranslateError::Http {
                provider: ProviderKind::OpenAi,
                source,
            })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| TranslateError::InvalidResponse {
                provider: ProviderKind::OpenAi,
                message: "no completion content".into(),
            })?;

        Ok(ProviderOutput {
            text,
            detected_source_lang: source_lang.map(str::to_string),
        })
    }
}
