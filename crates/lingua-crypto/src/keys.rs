use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;
use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
pub use x25519_dalek::{PublicKey, StaticSecret};

/// Generate a random 256-bit AES-256-GCM key for one message.
pub fn generate_content_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    key
}

/// Generate a long-lived X25519 keypair for a user.
pub fn generate_keypair() -> (StaticSecret, PublicKey) {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);
    (secret, public)
}

/// Encode a key to base64 for storage/transport.
pub fn key_to_base64(key: &[u8; 32]) -> String {
    BASE64.encode(key)
}

/// Decode a base64 32-byte key.
pub fn key_from_base64(encoded: &str) -> Result<[u8; 32]> {
    let bytes = BASE64.decode(encoded.trim())?;
    let key: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("Invalid key length"))?;
    Ok(key)
}

/// Decode a user's base64 X25519 public key.
pub fn public_key_from_base64(encoded: &str) -> Result<PublicKey> {
    Ok(PublicKey::from(key_from_base64(encoded)?))
}
