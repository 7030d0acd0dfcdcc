use thiserror::Error;

use crate::provider::ProviderKind;

/// Upstream response bodies are cut to this many characters in errors.
pub const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum TranslateError {
    /// The provider answered with a non-2xx status.
    #[error("{provider} returned {status}: {body}")]
    BadGateway {
        provider: ProviderKind,
        status: u16,
        body: String,
    },

    #[error("{provider} request failed: {source}")]
    Http {
        provider: ProviderKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned an unusable response: {message}")]
    InvalidResponse {
        provider: ProviderKind,
        message: String,
    },

    #[error("translation provider '{0}' is forced but has no credential")]
    ProviderNotConfigured(ProviderKind),
}

impl TranslateError {
    pub fn bad_gateway(provider: ProviderKind, status: u16, body: &str) -> Self {
        Self::BadGateway {
            provider,
            status,
            body: truncate_body(body),
        }
    }

    pub fn provider(&self) -> ProviderKind {
        match self {
            Self::BadGateway { provider, .. }
            | Self::Http { provider, .. }
            | Self::InvalidResponse { provider, .. } => *provider,
            Self::ProviderNotConfigured(provider) => *provider,
        }
    }
}

fn truncate_body(body: &str) -> String {
    let mut chars = body.chars();
    let truncated: String = chars.by_ref().take(MAX_ERROR_BODY_CHARS).collect();
    if chars.next().is_some() {
        format!("{truncated}…")
    } else {
        truncated
    }
}
