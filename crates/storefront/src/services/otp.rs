//! One-time password storage for phone login.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use rand::Rng;

use bazaar_core::Phone;

/// Upper bound on outstanding codes held in memory.
const MAX_PENDING_CODES: u64 = 100_000;

/// Wrong guesses a code survives; the next one discards it.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// Expiring phone-to-code store.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Store `code` for `phone`, replacing any earlier code.
    async fn put(&self, phone: &Phone, code: String, ttl: Duration);

    /// Consume the code for `phone` if it equals `code` and has not expired.
    ///
    /// A wrong code leaves the stored code in place until
    /// [`MAX_FAILED_ATTEMPTS`] wrong codes have been tried, after which the
    /// phone needs a fresh code.
    async fn take_if_matches(&self, phone: &Phone, code: &str) -> bool;
}

#[derive(Debug, Clone)]
struct PendingCode {
    code: String,
    expires_at: Instant,
    failures: Arc<AtomicU32>,
}

impl PendingCode {
    fn matches(&self, code: &str) -> bool {
        self.expires_at > Instant::now() && self.code == code
    }
}

/// [`OtpStore`] backed by a moka cache.
///
/// The cache-wide time-to-live evicts abandoned codes; each entry also carries
/// its own deadline so shorter per-code lifetimes are honored.
#[derive(Clone)]
pub struct MokaOtpStore {
    cache: Cache<String, PendingCode>,
}

impl MokaOtpStore {
    /// Create a store whose entries are evicted after at most `max_ttl`.
    #[must_use]
    pub fn new(max_ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(MAX_PENDING_CODES)
                .time_to_live(max_ttl)
                .build(),
        }
    }
}

#[async_trait]
impl OtpStore for MokaOtpStore {
    async fn put(&self, phone: &Phone, code: String, ttl: Duration) {
        let entry = PendingCode {
            code,
            expires_at: Instant::now() + ttl,
            failures: Arc::new(AtomicU32::new(0)),
        };
        self.cache.insert(phone.as_str().to_owned(), entry).await;
    }

    async fn take_if_matches(&self, phone: &Phone, code: &str) -> bool {
        let key = phone.as_str().to_owned();
        let Some(pending) = self.cache.get(&key).await else {
            return false;
        };
        if !pending.matches(code) {
            let failures = pending.failures.fetch_add(1, Ordering::SeqCst) + 1;
            if failures >= MAX_FAILED_ATTEMPTS {
                tracing::warn!(failures, "Too many wrong login codes, discarding code");
                self.cache.invalidate(&key).await;
            }
            return false;
        }
        // Only one concurrent verifier gets the removed entry
        self.cache
            .remove(&key)
            .await
            .is_some_and(|removed| removed.matches(code))
    }
}

/// Generate a six-digit numeric code.
#[must_use]
pub fn generate_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000_u32))
}
