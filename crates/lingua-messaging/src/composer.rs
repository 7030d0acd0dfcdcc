use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use lingua_translate::{TranslationEngine, TranslationSet};
use lingua_types::models::{Message, MessageKey, MessageOptions, Participant};

use crate::collaborators::{EnvelopeEncryptor, MembershipDirectory, MessageRepository, Moderator};
use crate::error::ComposeError;
use crate::expiry::PlanCeilings;

/// A freshly stored message with the wrapped keys that were stored with it.
#[derive(Debug, Clone)]
pub struct ComposedMessage {
    pub message: Message,
    pub wrapped_keys: HashMap<Uuid, String>,
}

/// Turns a send request into a moderated, translated, encrypted and
/// persisted message.
#[derive(Clone)]
pub struct MessageComposer {
    directory: Arc<dyn MembershipDirectory>,
    repository: Arc<dyn MessageRepository>,
    moderator: Arc<dyn Moderator>,
    encryptor: Arc<dyn EnvelopeEncryptor>,
    translator: TranslationEngine,
    ceilings: PlanCeilings,
}

impl MessageComposer {
    pub fn new(
        directory: Arc<dyn MembershipDirectory>,
        repository: Arc<dyn MessageRepository>,
        moderator: Arc<dyn Moderator>,
        encryptor: Arc<dyn EnvelopeEncryptor>,
        translator: TranslationEngine,
    ) -> Self {
        Self {
            directory,
            repository,
            moderator,
            encryptor,
            translator,
            ceilings: PlanCeilings::default(),
        }
    }

    pub fn with_ceilings(mut self, ceilings: PlanCeilings) -> Self {
        self.ceilings = ceilings;
        self
    }

    pub async fn create_message(
        &self,
        sender_id: Uuid,
        chat_room_id: Uuid,
        raw_content: &str,
        options: MessageOptions,
    ) -> Result<ComposedMessage, ComposeError> {
        let sender = self
            .directory
            .find_sender(sender_id)
            .await?
            .ok_or(ComposeError::Unauthorized(sender_id))?;

        if !self.directory.is_participant(chat_room_id, sender_id).await? {
            return Err(ComposeError::Forbidden {
                user_id: sender_id,
                room_id: chat_room_id,
            });
        }

        validate(raw_content, &options)?;

        let participants = self.directory.participants(chat_room_id).await?;

        let is_explicit = self.moderator.classify_explicit(raw_content)?;
        let cleaned = self.moderator.sanitize(raw_content)?;

        let targets = target_languages(&participants, sender_id);

        // Translation and encryption share no data; run them side by side.
        let translation = async {
            if cleaned.trim().is_empty() {
                debug!("No text to translate");
                return Ok(TranslationSet::default());
            }
            self.translator
                .translate_targets(&cleaned, &targets, None)
                .await
                .map_err(ComposeError::from)
        };
        let encryption = {
            let encryptor = self.encryptor.clone();
            let plaintext = cleaned.clone();
            let sender = sender.as_participant();
            let recipients = participants.clone();
            async move {
                tokio::task::spawn_blocking(move || {
                    encryptor.encrypt_for_recipients(plaintext.as_bytes(), &sender, &recipients)
                })
                .await
                .map_err(|e| anyhow!("Encryption task failed: {}", e))?
                .map_err(ComposeError::from)
            }
        };
        let (translated, envelope) = tokio::try_join!(translation, encryption)?;

        let now = Utc::now();
        let expires_at = self.ceilings.resolve_expires_at(
            now,
            options.expire_seconds,
            sender.auto_delete_seconds,
            sender.plan,
        );

        let message = Message {
            id: Uuid::new_v4(),
            chat_room_id,
            sender_id,
            raw_content: cleaned,
            translations: translated.translations,
            translated_from: translated
                .source_lang
                .or_else(|| Some(sender.preferred_language.clone())),
            is_explicit,
            content_ciphertext: envelope.ciphertext,
            expires_at,
            image_url: options.image_url,
            audio_url: options.audio_url,
            audio_duration_sec: options.audio_duration_sec,
            is_auto_reply: options.is_auto_reply,
            attachments: options.attachments,
            created_at: now,
        };

        let keys: Vec<MessageKey> = envelope
            .wrapped_keys
            .iter()
            .map(|(user_id, wrapped_key)| MessageKey {
                message_id: message.id,
                user_id: *user_id,
                wrapped_key: wrapped_key.clone(),
            })
            .collect();

        self.repository.insert_message(&message, &keys).await?;

        info!(
            "Message {} stored in room {} ({} keys, {} translations, explicit={})",
            message.id,
            chat_room_id,
            keys.len(),
            message.translations.len(),
            is_explicit
        );

        Ok(ComposedMessage {
            message,
            wrapped_keys: envelope.wrapped_keys,
        })
    }
}

fn validate(raw_content: &str, options: &MessageOptions) -> Result<(), ComposeError> {
    let has_media = options.image_url.is_some() || options.audio_url.is_some() || options.attachments.is_some();
    if raw_content.trim().is_empty() && !has_media {
        return Err(ComposeError::InvalidInput("message has no content".into()));
    }
    Ok(())
}

/// Distinct preferred languages of everyone except the sender, in room order.
fn target_languages(participants: &[Participant], sender_id: Uuid) -> Vec<String> {
    let mut seen = HashSet::new();
    let targets: Vec<String> = participants
        .iter()
        .filter(|p| p.user_id != sender_id)
        .map(|p| p.preferred_language.clone())
        .filter(|lang| !lang.is_empty() && seen.insert(lang.clone()))
        .collect();
    debug!("Translation targets: {:?}", targets);
    targets
}
