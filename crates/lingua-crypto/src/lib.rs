/// Lingua Crypto Library
///
/// Envelope encryption for chat messages:
/// - each message is encrypted once with a random AES-256-GCM content key
/// - the content key is wrapped separately for every recipient's X25519 key
///
/// The server only performs the sealing side. Unwrapping lives here too so
/// clients and tests share one implementation.

pub mod encrypt;
pub mod keys;
pub mod wrap;
