use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use lingua_translate::TranslationEngine;
use lingua_types::models::{AutoTranslateMode, Message};

use crate::collaborators::{MembershipDirectory, MessageRepository, RateLimiter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoProvider,
    NoText,
    AutoTranslateOff,
    RoomRateLimited,
}

/// What one backfill run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackfillReport {
    Skipped(SkipReason),
    Completed {
        translated: Vec<String>,
        failed: Vec<String>,
        rate_limited: Vec<String>,
    },
}

/// Best-effort background translation for rooms with auto-translate on.
#[derive(Clone)]
pub struct AutoTranslator {
    translator: TranslationEngine,
    directory: Arc<dyn MembershipDirectory>,
    repository: Arc<dyn MessageRepository>,
    limiter: Arc<dyn RateLimiter>,
}

impl AutoTranslator {
    pub fn new(
        translator: TranslationEngine,
        directory: Arc<dyn MembershipDirectory>,
        repository: Arc<dyn MessageRepository>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            translator,
            directory,
            repository,
            limiter,
        }
    }

    /// Run [`Self::backfill`] on a detached task. Errors are logged there and
    /// never reach the caller.
    pub fn spawn(&self, message: Message) -> JoinHandle<()> {
        let this = self.clone();
        let span = info_span!("auto_translate", message_id = %message.id, room_id = %message.chat_room_id);
        tokio::spawn(
            async move {
                match this.backfill(&message).await {
                    Ok(BackfillReport::Skipped(reason)) => debug!("Backfill skipped: {:?}", reason),
                    Ok(BackfillReport::Completed { translated, failed, rate_limited }) => info!(
                        "Backfill done: translated={:?} failed={:?} rate_limited={:?}",
                        translated, failed, rate_limited
                    ),
                    Err(e) => warn!("Backfill aborted: {:#}", e),
                }
            }
            .instrument(span),
        )
    }

    pub async fn backfill(&self, message: &Message) -> Result<BackfillReport> {
        if !self.translator.is_configured() {
            return Ok(BackfillReport::Skipped(SkipReason::NoProvider));
        }

        // Media-only messages have nothing to translate.
        if message.raw_content.trim().is_empty() {
            return Ok(BackfillReport::Skipped(SkipReason::NoText));
        }

        let room_id = message.chat_room_id;
        if self.repository.auto_translate_mode(room_id).await? != AutoTranslateMode::On {
            return Ok(BackfillReport::Skipped(SkipReason::AutoTranslateOff));
        }

        if !self.limiter.allow(&format!("translate:{}", room_id)) {
            return Ok(BackfillReport::Skipped(SkipReason::RoomRateLimited));
        }

        // Every member's language, the sender's included, so stored
        // translations cover the whole room.
        let participants = self.directory.participants(room_id).await?;
        let mut seen = HashSet::new();
        let languages: Vec<String> = participants
            .into_iter()
            .map(|p| p.preferred_language)
            .filter(|lang| !lang.is_empty() && seen.insert(lang.clone()))
            .collect();

        let (allowed, rate_limited): (Vec<String>, Vec<String>) = languages
            .into_iter()
            .partition(|lang| self.limiter.allow(&format!("translate:{}:{}", room_id, lang)));

        let outcomes = self
            .translator
            .fan_out(message.raw_content.clone(), None, allowed)
            .await
            .map_err(|e| anyhow!("Translation task failed: {}", e))?;

        let mut translations = BTreeMap::new();
        let mut failed = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(t) => {
                    translations.insert(outcome.target_lang, t.translated_text);
                }
                Err(_) => failed.push(outcome.target_lang),
            }
        }

        if !translations.is_empty() {
            self.repository.merge_translations(message.id, &translations).await?;
        }

        failed.sort();
        Ok(BackfillReport::Completed {
            translated: translations.into_keys().collect(),
            failed,
            rate_limited,
        })
    }
}
