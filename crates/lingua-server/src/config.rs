use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};

use lingua_translate::{CacheConfig, EngineConfig, ForcedProvider, ProviderConfig};

const PLACEHOLDER_SECRET: &str = "dev-secret-change-me";

/// Everything the binary reads from the environment, parsed once at startup.
#[derive(Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    pub providers: ProviderConfig,
    pub engine: EngineConfig,
    pub room_limit_per_minute: u32,
    pub lang_limit_per_minute: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("LINGUA_JWT_SECRET").ok_or_else(|| anyhow!("LINGUA_JWT_SECRET must be set"))?;
        if jwt_secret == PLACEHOLDER_SECRET {
            bail!("LINGUA_JWT_SECRET is still the placeholder value");
        }

        let forced_provider = var("TRANSLATE_PROVIDER")
            .map(|v| v.parse::<ForcedProvider>().map_err(|e| anyhow!(e)))
            .transpose()?;

        let defaults = ProviderConfig::default();
        let providers = ProviderConfig {
            deepl_api_key: var("DEEPL_API_KEY"),
            deepl_api_url: var("DEEPL_API_URL"),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_api_url: var("OPENAI_API_URL"),
            openai_model: var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            forced_provider,
            request_timeout: parse_or(&var, "TRANSLATE_TIMEOUT_MS", 10_000).map(Duration::from_millis)?,
        };

        let engine = EngineConfig {
            cache: CacheConfig {
                max_entries: parse_or(&var, "TRANSLATE_CACHE_SIZE", 2000)?,
                ttl: parse_or(&var, "TRANSLATE_CACHE_TTL_MS", 600_000).map(Duration::from_millis)?,
            },
            concurrency: parse_or(&var, "TRANSLATE_CONCURRENCY", 4)?,
        };

        Ok(Self {
            host: var("LINGUA_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&var, "LINGUA_PORT", 3000)?,
            db_path: var("LINGUA_DB_PATH").unwrap_or_else(|| "lingua.db".into()),
            jwt_secret,
            providers,
            engine,
            room_limit_per_minute: parse_or(&var, "AUTO_TRANSLATE_ROOM_LIMIT", 30)?,
            lang_limit_per_minute: parse_or(&var, "AUTO_TRANSLATE_LANG_LIMIT", 30)?,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.parse().with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}
