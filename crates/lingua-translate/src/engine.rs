use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures_util::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{CacheStats, CachedTranslation, TranslationCache};
use crate::config::{EngineConfig, ForcedProvider, ProviderConfig};
use crate::error::TranslateError;
use crate::provider::{DeepLProvider, OpenAiProvider, ProviderKind, TranslationProvider};

/// One primary target plus optional auxiliary targets that are only
/// pre-warmed in the cache.
#[derive(Debug, Clone, Default)]
pub struct TranslateRequest {
    pub text: String,
    pub target_lang: String,
    pub source_lang: Option<String>,
    pub extra_targets: Vec<String>,
}

impl TranslateRequest {
    pub fn new(text: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_lang: target_lang.into(),
            ..Default::default()
        }
    }

    pub fn from_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = Some(source_lang.into());
        self
    }

    pub fn with_extra_targets(mut self, targets: impl IntoIterator<Item = String>) -> Self {
        self.extra_targets = targets.into_iter().collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub text: String,
    pub translated_text: String,
    pub target_lang: String,
    pub detected_source_lang: Option<String>,
    pub provider: ProviderKind,
}

/// Result of translating one text into several languages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationSet {
    pub translations: BTreeMap<String, String>,
    /// First detected source language, else the declared one.
    pub source_lang: Option<String>,
}

/// Per-target result of a fan-out.
#[derive(Debug)]
pub struct TargetOutcome {
    pub target_lang: String,
    pub result: Result<Translation, TranslateError>,
}

enum Route {
    Noop,
    Chain {
        primary: Arc<dyn TranslationProvider>,
        fallback: Option<Arc<dyn TranslationProvider>>,
    },
}

/// Cheap to clone; all clones share providers and cache.
#[derive(Clone)]
pub struct TranslationEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    deepl: Option<Arc<dyn TranslationProvider>>,
    openai: Option<Arc<dyn TranslationProvider>>,
    forced: Option<ForcedProvider>,
    cache: TranslationCache,
    concurrency: usize,
}

impl TranslationEngine {
    /// Build an engine with HTTP providers for every configured credential.
    pub fn new(providers: &ProviderConfig, config: EngineConfig) -> Result<Self, TranslateError> {
        let deepl = match providers.deepl_key() {
            Some(key) => Some(Arc::new(DeepLProvider::new(
                key.to_string(),
                providers.deepl_api_url.clone(),
                providers.request_timeout,
            )?) as Arc<dyn TranslationProvider>),
            None => None,
        };
        let openai = match providers.openai_key() {
            Some(key) => Some(Arc::new(OpenAiProvider::new(
                key.to_string(),
                providers.openai_api_url.clone(),
                providers.openai_model.clone(),
                providers.request_timeout,
            )?) as Arc<dyn TranslationProvider>),
            None => None,
        };
        Ok(Self::with_providers(deepl, openai, providers.forced_provider, config))
    }

    /// Build an engine around already-constructed providers.
    pub fn with_providers(
        deepl: Option<Arc<dyn TranslationProvider>>,
        openai: Option<Arc<dyn TranslationProvider>>,
        forced: Option<ForcedProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                deepl,
                openai,
                forced,
                cache: TranslationCache::new(&config.cache),
                concurrency: config.concurrency.max(1),
            }),
        }
    }

    /// True when any real provider has a credential.
    pub fn is_configured(&self) -> bool {
        self.inner.deepl.is_some() || self.inner.openai.is_some()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Translate into `target_lang`. Extra targets are translated in the
    /// background to warm the cache; their outcome does not affect the result.
    pub async fn translate(&self, request: TranslateRequest) -> Result<Translation, TranslateError> {
        let TranslateRequest {
            text,
            target_lang,
            source_lang,
            extra_targets,
        } = request;

        let primary = self
            .translate_one(&text, source_lang.as_deref(), &target_lang)
            .await?;

        let extras: Vec<String> = dedup_langs(extra_targets)
            .into_iter()
            .filter(|lang| !lang.eq_ignore_ascii_case(&target_lang))
            .collect();
        if !extras.is_empty() && primary.provider != ProviderKind::Noop {
            // Detached: the handle is dropped, the task keeps running.
            drop(self.fan_out(text, source_lang, extras));
        }

        Ok(primary)
    }

    /// Translate into every target and wait for all of them. At most
    /// `concurrency` provider calls are in flight; the first error aborts.
    pub async fn translate_targets(
        &self,
        text: &str,
        targets: &[String],
        source_lang: Option<&str>,
    ) -> Result<TranslationSet, TranslateError> {
        let targets = dedup_langs(targets.iter().cloned());

        let results: Vec<Translation> = stream::iter(targets)
            .map(|target| async move { self.translate_one(text, source_lang, &target).await })
            .buffer_unordered(self.inner.concurrency)
            .try_collect()
            .await?;

        let detected = results
            .iter()
            .find_map(|t| t.detected_source_lang.clone());

        Ok(TranslationSet {
            source_lang: detected.or_else(|| source_lang.map(str::to_string)),
            translations: results
                .into_iter()
                .map(|t| (t.target_lang, t.translated_text))
                .collect(),
        })
    }

    /// Translate into each target on a spawned task with bounded concurrency.
    /// Failures are logged and reported per target, never propagated.
    pub fn fan_out(
        &self,
        text: String,
        source_lang: Option<String>,
        targets: Vec<String>,
    ) -> JoinHandle<Vec<TargetOutcome>> {
        let engine = self.clone();
        tokio::spawn(async move {
            let engine = &engine;
            let text = text.as_str();
            let source = source_lang.as_deref();

            let outcomes: Vec<TargetOutcome> = stream::iter(targets)
                .map(|target_lang| async move {
                    let result = engine.translate_one(text, source, &target_lang).await;
                    TargetOutcome { target_lang, result }
                })
                .buffer_unordered(engine.inner.concurrency)
                .collect()
                .await;

            for outcome in &outcomes {
                if let Err(e) = &outcome.result {
                    warn!("Fan-out translation to {} failed: {}", outcome.target_lang, e);
                }
            }
            outcomes
        })
    }

    fn route(&self) -> Result<Route, TranslateError> {
        let inner = &self.inner;
        let pinned = |provider: &Option<Arc<dyn TranslationProvider>>, kind| {
            provider
                .clone()
                .map(|primary| Route::Chain { primary, fallback: None })
                .ok_or(TranslateError::ProviderNotConfigured(kind))
        };

        match inner.forced {
            Some(ForcedProvider::Noop) => Ok(Route::Noop),
            Some(ForcedProvider::OpenAi) => pinned(&inner.openai, ProviderKind::OpenAi),
            Some(ForcedProvider::DeepL) => pinned(&inner.deepl, ProviderKind::DeepL),
            None => Ok(match (&inner.deepl, &inner.openai) {
                (Some(deepl), openai) => Route::Chain {
                    primary: deepl.clone(),
                    fallback: openai.clone(),
                },
                (None, Some(openai)) => Route::Chain {
                    primary: openai.clone(),
                    fallback: None,
                },
                (None, None) => Route::Noop,
            }),
        }
    }

    async fn translate_one(
        &self,
        text: &str,
        source_lang: Option<&str>,
        target_lang: &str,
    ) -> Result<Translation, TranslateError> {
        let (primary, fallback) = match self.route()? {
            Route::Noop => {
                return Ok(Translation {
                    text: text.to_string(),
                    translated_text: text.to_string(),
                    target_lang: target_lang.to_string(),
                    detected_source_lang: source_lang.map(str::to_string),
                    provider: ProviderKind::Noop,
                });
            }
            Route::Chain { primary, fallback } => (primary, fallback),
        };

        let key = TranslationCache::key(source_lang, target_lang, text);
        if let Some(hit) = self.inner.cache.get(&key) {
            debug!("Translation cache hit for target {}", target_lang);
            return Ok(Translation {
                text: text.to_string(),
                translated_text: hit.text,
                target_lang: target_lang.to_string(),
                detected_source_lang: hit.detected_source_lang,
                provider: ProviderKind::Cache,
            });
        }

        let (output, provider) = match primary.translate(text, source_lang, target_lang).await {
            Ok(output) => (output, primary.kind()),
            Err(e) => match fallback {
                Some(fallback) => {
                    warn!("{} failed for target {}, falling back to {}: {}", primary.kind(), target_lang, fallback.kind(), e);
                    let output = fallback.translate(text, source_lang, target_lang).await?;
                    (output, fallback.kind())
                }
                None => return Err(e),
            },
        };

        self.inner.cache.insert(
            key,
            CachedTranslation {
                text: output.text.clone(),
                detected_source_lang: output.detected_source_lang.clone(),
            },
        );

        Ok(Translation {
            text: text.to_string(),
            translated_text: output.text,
            target_lang: target_lang.to_string(),
            detected_source_lang: output.detected_source_lang,
            provider,
        })
    }
}

/// Drop blanks and case-insensitive duplicates, keeping first-seen order.
fn dedup_langs(langs: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    langs
        .into_iter()
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty() && seen.insert(lang.to_ascii_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_spelling() {
        let langs = vec!["fr".into(), "ES".into(), " fr ".into(), "es".into(), "".into()];
        assert_eq!(dedup_langs(langs), vec!["fr".to_string(), "ES".to_string()]);
    }

    #[tokio::test]
    async fn forced_provider_without_credential_errors() {
        let engine = TranslationEngine::with_providers(
            None,
            None,
            Some(ForcedProvider::DeepL),
            EngineConfig::default(),
        );
        let err = engine.translate(TranslateRequest::new("hi", "fr")).await.unwrap_err();
        assert!(matches!(err, TranslateError::ProviderNotConfigured(ProviderKind::DeepL)));
    }

    #[tokio::test]
    async fn no_credentials_passes_text_through() {
        let engine = TranslationEngine::new(&ProviderConfig::default(), EngineConfig::default()).unwrap();
        assert!(!engine.is_configured());

        let t = engine.translate(TranslateRequest::new("hello", "fr")).await.unwrap();
        assert_eq!(t.translated_text, "hello");
        assert_eq!(t.provider, ProviderKind::Noop);
        assert_eq!(engine.cache_stats().misses, 0);
    }
}
