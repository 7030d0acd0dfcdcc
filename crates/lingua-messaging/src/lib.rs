//! The message-send pipeline: compose, moderate, translate, encrypt and
//! persist a chat message, then backfill translations in the background.

pub mod autotranslate;
pub mod collaborators;
pub mod composer;
pub mod envelope;
pub mod error;
pub mod expiry;
pub mod moderation;
pub mod ratelimit;

pub use autotranslate::{AutoTranslator, BackfillReport, SkipReason};
pub use collaborators::{
    Envelope, EnvelopeEncryptor, MembershipDirectory, MessageRepository, Moderator, RateLimiter,
};
pub use composer::{ComposedMessage, MessageComposer};
pub use envelope::SealedEnvelopeEncryptor;
pub use error::ComposeError;
pub use expiry::PlanCeilings;
pub use moderation::WordListModerator;
pub use ratelimit::{RoomLanguageLimiter, TokenBucketLimiter};
