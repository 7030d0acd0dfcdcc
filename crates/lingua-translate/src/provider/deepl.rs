use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ProviderKind, ProviderOutput, TranslationProvider, build_client, ensure_success};
use crate::error::TranslateError;

const DEEPL_FREE_URL: &str = "https://api-free.deepl.com";
const DEEPL_PRO_URL: &str = "https://api.deepl.com";

#[derive(Serialize)]
struct TranslateBody<'a> {
    text: [&'a str; 1],
    target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_lang: Option<String>,
}

#[derive(Deserialize)]
struct TranslateResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Deserialize)]
struct DeepLTranslation {
    detected_source_language: Option<String>,
    text: String,
}

/// Client for the DeepL `/v2/translate` endpoint.
#[derive(Debug, Clone)]
pub struct DeepLProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl DeepLProvider {
    /// Free-tier keys (suffix `:fx`) go to the free API host unless
    /// `base_url` overrides it.
    pub fn new(api_key: String, base_url: Option<String>, timeout: Duration) -> Result<Self, TranslateError> {
        let base_url = base_url.unwrap_or_else(|| {
            if api_key.ends_with(":fx") {
                DEEPL_FREE_URL.to_string()
            } else {
                DEEPL_PRO_URL.to_string()
            }
        });
        Ok(Self {
            client: build_client(ProviderKind::DeepL, timeout)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TranslationProvider for DeepLProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DeepL
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: Option<&str>,
        target_lang: &str,
    ) -> Result<ProviderOutput, TranslateError> {
        let body = TranslateBody {
            text: [text],
            target_lang: target_lang.to_uppercase(),
            // DeepL source codes carry no region ("EN", not "EN-US").
            source_lang: source_lang
                .and_then(|lang| lang.split('-').next())
                .map(str::to_uppercase),
        };

        let response = self
            .client
            .post(format!("{}/v2/translate", self.base_url))
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|source| TranslateError::Http {
                provider: ProviderKind::DeepL,
                source,
            })?;
        debug!("DeepL responded {} for target {}", response.status(), body.target_lang);

        let parsed: TranslateResponse = ensure_success(ProviderKind::DeepL, response)
            .await?
            .json()
            .await
            .map_err(|source| TranslateError::Http {
                provider: ProviderKind::DeepL,
                source,
            })?;

        let first = parsed
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| TranslateError::InvalidResponse {
                provider: ProviderKind::DeepL,
                message: "empty translations array".into(),
            })?;

        Ok(ProviderOutput {
            text: first.text,
            detected_source_lang: first.detected_source_language.map(|l| l.to_lowercase()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str) -> DeepLProvider {
        DeepLProvider::new("test-key:fx".into(), Some(base_url.into()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn base_url_follows_key_type() {
        let free = DeepLProvider::new("abc:fx".into(), None, Duration::from_secs(1)).unwrap();
        assert_eq!(free.base_url(), DEEPL_FREE_URL);
        let pro = DeepLProvider::new("abc".into(), None, Duration::from_secs(1)).unwrap();
        assert_eq!(pro.base_url(), DEEPL_PRO_URL);
    }

    #[tokio::test]
    async fn sends_uppercased_codes_and_parses_detection() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .and(header("Authorization", "DeepL-Auth-Key test-key:fx"))
            .and(body_json(serde_json::json!({
                "text": ["hello"],
                "target_lang": "PT-BR",
                "source_lang": "EN"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [{"detected_source_language": "EN", "text": "olá"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = provider(&server.uri())
            .translate("hello", Some("en-US"), "pt-br")
            .await
            .unwrap();

        assert_eq!(out.text, "olá");
        assert_eq!(out.detected_source_lang.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn non_2xx_becomes_bad_gateway() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(ResponseTemplate::new(456).set_body_string("Quota exceeded"))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .translate("hello", None, "de")
            .await
            .unwrap_err();

        match err {
            TranslateError::BadGateway { provider, status, body } => {
                assert_eq!(provider, ProviderKind::DeepL);
                assert_eq!(status, 456);
                assert_eq!(body, "Quota exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_translation_list_is_invalid() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "translations": [] })))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).translate("x", None, "de").await.unwrap_err();
        assert!(matches!(err, TranslateError::InvalidResponse { .. }));
    }
}
