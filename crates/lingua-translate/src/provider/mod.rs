pub mod deepl;
pub mod openai;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TranslateError;

pub use deepl::DeepLProvider;
pub use openai::OpenAiProvider;

/// Where a translation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Noop,
    Cache,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "deepl")]
    DeepL,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Cache => "cache",
            Self::OpenAi => "openai",
            Self::DeepL => "deepl",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw result of one provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOutput {
    pub text: String,
    pub detected_source_lang: Option<String>,
}

/// A remote machine-translation service.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn translate(
        &self,
        text: &str,
        source_lang: Option<&str>,
        target_lang: &str,
    ) -> Result<ProviderOutput, TranslateError>;
}

pub(crate) fn build_client(provider: ProviderKind, timeout: Duration) -> Result<reqwest::Client, TranslateError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|source| TranslateError::Http { provider, source })
}

/// Map non-2xx responses to [`TranslateError::BadGateway`].
pub(crate) async fn ensure_success(
    provider: ProviderKind,
    response: reqwest::Response,
) -> Result<reqwest::Response, TranslateError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TranslateError::bad_gateway(provider, status.as_u16(), &body))
}
