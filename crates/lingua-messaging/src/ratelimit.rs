use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::collaborators::RateLimiter;

/// Above this many tracked keys, full buckets are pruned on the next call.
const MAX_TRACKED_KEYS: usize = 10_000;

struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// In-process token bucket per key.
///
/// Each key holds up to `capacity` tokens and regains them continuously over
/// `period`. Refill and consume happen under one lock, so concurrent callers
/// on the same key see a consistent count.
pub struct TokenBucketLimiter {
    capacity: f64,
    refill_per_sec: f64,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl TokenBucketLimiter {
    pub fn new(capacity: u32, period: Duration) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            capacity,
            refill_per_sec: capacity / period.as_secs_f64().max(f64::EPSILON),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn per_minute(capacity: u32) -> Self {
        Self::new(capacity, Duration::from_secs(60))
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.refilled_at = now;
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        if buckets.len() >= MAX_TRACKED_KEYS && !buckets.contains_key(key) {
            buckets.retain(|_, bucket| {
                let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
                bucket.tokens + elapsed * self.refill_per_sec < self.capacity
            });
        }

        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.capacity,
            refilled_at: now,
        });
        self.refill(bucket, now);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Separate budgets for room keys (`translate:{room}`) and per-language keys
/// (`translate:{room}:{lang}`).
pub struct RoomLanguageLimiter {
    room: TokenBucketLimiter,
    language: TokenBucketLimiter,
}

impl RoomLanguageLimiter {
    pub fn per_minute(room_capacity: u32, language_capacity: u32) -> Self {
        Self {
            room: TokenBucketLimiter::per_minute(room_capacity),
            language: TokenBucketLimiter::per_minute(language_capacity),
        }
    }
}

impl RateLimiter for RoomLanguageLimiter {
    fn allow(&self, key: &str) -> bool {
        if key.matches(':').count() >= 2 {
            self.language.allow(key)
        } else {
            self.room.allow(key)
        }
    }
}
