use aes_gcm::aead::OsRng;
use anyhow::{Result, anyhow};
use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::encrypt::{open, seal};

const WRAP_INFO: &[u8] = b"lingua-message-key";
const PUBLIC_KEY_LEN: usize = 32;

/// Wrap a content key for one recipient.
///
/// Layout: `ephemeral_public(32) || nonce(12) || AES-GCM(content_key)`.
/// The wrapping key is HKDF-SHA256 over the X25519 shared secret, salted
/// with both public keys.
pub fn wrap_key(recipient: &PublicKey, content_key: &[u8; 32]) -> Result<Vec<u8>> {
    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(recipient);

    let wrapping_key = derive_wrapping_key(shared.as_bytes(), &ephemeral_public, recipient)?;
    let sealed = seal(&wrapping_key, content_key)?;

    let mut wrapped = Vec::with_capacity(PUBLIC_KEY_LEN + sealed.len());
    wrapped.extend_from_slice(ephemeral_public.as_bytes());
    wrapped.extend_from_slice(&sealed);
    Ok(wrapped)
}

/// Recover a content key with the recipient's secret.
pub fn unwrap_key(secret: &StaticSecret, wrapped: &[u8]) -> Result<[u8; 32]> {
    if wrapped.len() <= PUBLIC_KEY_LEN {
        return Err(anyhow!("Wrapped key too short: {} bytes", wrapped.len()));
    }
    let (ephemeral_bytes, sealed) = wrapped.split_at(PUBLIC_KEY_LEN);
    let ephemeral_bytes: [u8; PUBLIC_KEY_LEN] = ephemeral_bytes
        .try_into()
        .map_err(|_| anyhow!("Invalid ephemeral key"))?;
    let ephemeral_public = PublicKey::from(ephemeral_bytes);
    let recipient_public = PublicKey::from(secret);

    let shared = secret.diffie_hellman(&ephemeral_public);
    let wrapping_key = derive_wrapping_key(shared.as_bytes(), &ephemeral_public, &recipient_public)?;

    let key = open(&wrapping_key, sealed)?;
    key.try_into()
        .map_err(|_| anyhow!("Unwrapped key has wrong length"))
}

fn derive_wrapping_key(
    shared: &[u8; 32],
    ephemeral_public: &PublicKey,
    recipient_public: &PublicKey,
) -> Result<[u8; 32]> {
    let mut salt = [0u8; 2 * PUBLIC_KEY_LEN];
    salt[..PUBLIC_KEY_LEN].copy_from_slice(ephemeral_public.as_bytes());
    salt[PUBLIC_KEY_LEN..].copy_from_slice(recipient_public.as_bytes());

    let hk = Hkdf::<Sha256>::new(Some(&salt), shared);
    let mut okm = [0u8; 32];
    hk.expand(WRAP_INFO, &mut okm)
        .map_err(|e| anyhow!("HKDF expand failed: {}", e))?;
    Ok(okm)
}
