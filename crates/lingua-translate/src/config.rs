use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::provider::ProviderKind;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Operational override that pins every call to one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedProvider {
    Noop,
    OpenAi,
    DeepL,
}

impl ForcedProvider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Noop => ProviderKind::Noop,
            Self::OpenAi => ProviderKind::OpenAi,
            Self::DeepL => ProviderKind::DeepL,
        }
    }
}

impl FromStr for ForcedProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "noop" => Ok(Self::Noop),
            "openai" => Ok(Self::OpenAi),
            "deepl" => Ok(Self::DeepL),
            other => Err(format!("unknown translation provider '{other}' (expected noop, openai or deepl)")),
        }
    }
}

/// Credentials and endpoints for the translation providers.
#[derive(Clone)]
pub struct ProviderConfig {
    pub deepl_api_key: Option<String>,
    /// Overrides the DeepL base URL (derived from the key type otherwise).
    pub deepl_api_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_api_url: Option<String>,
    pub openai_model: String,
    pub forced_provider: Option<ForcedProvider>,
    /// Applied to every provider HTTP request.
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            deepl_api_key: None,
            deepl_api_url: None,
            openai_api_key: None,
            openai_api_url: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            forced_provider: None,
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProviderConfig {
    /// True when at least one real provider has a credential.
    pub fn has_credentials(&self) -> bool {
        non_empty(&self.deepl_api_key).is_some() || non_empty(&self.openai_api_key).is_some()
    }

    pub(crate) fn deepl_key(&self) -> Option<&str> {
        non_empty(&self.deepl_api_key)
    }

    pub(crate) fn openai_key(&self) -> Option<&str> {
        non_empty(&self.openai_api_key)
    }
}

// Keys are never printed.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("deepl_api_key", &self.deepl_key().map(|_| "<set>"))
            .field("deepl_api_url", &self.deepl_api_url)
            .field("openai_api_key", &self.openai_key().map(|_| "<set>"))
            .field("openai_api_url", &self.openai_api_url)
            .field("openai_model", &self.openai_model)
            .field("forced_provider", &self.forced_provider)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Cache and fan-out sizing.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    /// Maximum provider calls in flight for one multi-target request.
    pub concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
