//! Translation engine for outgoing chat messages.
//!
//! Picks a provider per call (DeepL, then OpenAI, else pass-through), caches
//! results process-wide and fans auxiliary languages out on a bounded pool.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod provider;

pub use cache::{CacheConfig, CacheStats, TranslationCache};
pub use config::{EngineConfig, ForcedProvider, ProviderConfig};
pub use engine::{TargetOutcome, TranslateRequest, Translation, TranslationEngine, TranslationSet};
pub use error::TranslateError;
pub use provider::{ProviderKind, ProviderOutput, TranslationProvider};
