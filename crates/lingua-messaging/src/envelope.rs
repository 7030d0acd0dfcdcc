use std::collections::HashMap;

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use tracing::debug;

use lingua_crypto::encrypt::{open, seal};
use lingua_crypto::keys::{StaticSecret, generate_content_key, public_key_from_base64};
use lingua_crypto::wrap::{unwrap_key, wrap_key};
use lingua_types::models::Participant;

use crate::collaborators::{Envelope, EnvelopeEncryptor};

/// AES-256-GCM content encryption with the content key sealed to each
/// participant's X25519 public key.
#[derive(Debug, Clone, Copy, Default)]
pub struct SealedEnvelopeEncryptor;

impl EnvelopeEncryptor for SealedEnvelopeEncryptor {
    fn encrypt_for_recipients(
        &self,
        plaintext: &[u8],
        sender: &Participant,
        recipients: &[Participant],
    ) -> Result<Envelope> {
        let content_key = generate_content_key();
        let ciphertext = seal(&content_key, plaintext)?;

        let mut wrapped_keys = HashMap::new();
        for participant in std::iter::once(sender).chain(recipients) {
            if wrapped_keys.contains_key(&participant.user_id) {
                continue;
            }
            let Some(encoded) = participant
                .public_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
            else {
                debug!("User {} has no public key, skipping key wrap", participant.user_id);
                continue;
            };

            let public = public_key_from_base64(encoded)
                .with_context(|| format!("Invalid public key for user {}", participant.user_id))?;
            let wrapped = wrap_key(&public, &content_key)?;
            wrapped_keys.insert(participant.user_id, BASE64.encode(wrapped));
        }

        Ok(Envelope {
            ciphertext,
            wrapped_keys,
        })
    }
}

/// Client side: unwrap the content key and decrypt the message body.
pub fn open_envelope(secret: &StaticSecret, wrapped_key: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let wrapped = BASE64.decode(wrapped_key).context("Wrapped key is not base64")?;
    let content_key = unwrap_key(secret, &wrapped)?;
    open(&content_key, ciphertext)
}
