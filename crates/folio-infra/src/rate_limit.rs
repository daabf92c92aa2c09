//! Upload rate limiter
//!
//! Fixed-window counters keyed by caller (`user:{name}` or `ip:{addr}`),
//! spread over independently locked shards. The counters are the only
//! cross-request mutable state in the upload path.

use folio_core::Config;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const DEFAULT_SHARD_COUNT: usize = 16;
const DEFAULT_MAX_BUCKETS: usize = 10_000;

#[derive(Clone, Debug)]
struct RateLimitBucket {
    count: u32,
    reset_at: Instant,
}

impl RateLimitBucket {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + window,
        }
    }

    fn check_and_increment(&mut self, limit: u32, window: Duration) -> (bool, u32) {
        let now = Instant::now();

        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }

        if self.count < limit {
            self.count += 1;
            (true, limit.saturating_sub(self.count))
        } else {
            (false, 0)
        }
    }

    fn reset_in(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }

    fn is_stale(&self, now: Instant, grace: Duration) -> bool {
        self.reset_at <= now && now.duration_since(self.reset_at) >= grace
    }
}

/// Sharded fixed-window rate limiter
///
/// Keys are hashed to a shard so concurrent uploads from different callers
/// rarely contend on the same mutex. Each shard holds at most `max_buckets`
/// entries; beyond that, stale buckets are dropped first and then the bucket
/// closest to expiry is evicted.
#[derive(Clone, Debug)]
pub struct UploadRateLimiter {
    shards: Vec<Arc<Mutex<HashMap<String, RateLimitBucket>>>>,
    limit: u32,
    window: Duration,
    max_buckets: usize,
}

impl UploadRateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_shards(limit, window, DEFAULT_SHARD_COUNT, DEFAULT_MAX_BUCKETS)
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.upload_rate_limit, config.upload_rate_window())
    }

    /// # Arguments
    /// * `limit` - Requests allowed per key per window
    /// * `window` - Window length
    /// * `shard_count` - Number of shards (at least 1)
    /// * `max_buckets` - Per-shard bucket ceiling before eviction
    pub fn with_shards(limit: u32, window: Duration, shard_count: usize, max_buckets: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Arc::new(Mutex::new(HashMap::new())))
            .collect();
        Self {
            shards,
            limit,
            window,
            max_buckets: max_buckets.max(1),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    /// Count one request against `key`.
    ///
    /// Returns the remaining allowance, or the time until the window resets
    /// when the key is exhausted.
    pub async fn check_rate_limit(&self, key: &str) -> Result<u32, Duration> {
        let shard_index = self.shard_index(key);
        let mut buckets = self.shards[shard_index].lock().await;

        if buckets.len() >= self.max_buckets && !buckets.contains_key(key) {
            let now = Instant::now();
            buckets.retain(|_, bucket| !bucket.is_stale(now, Duration::ZERO));

            if buckets.len() >= self.max_buckets {
                let oldest_key = buckets
                    .iter()
                    .min_by_key(|(_, bucket)| bucket.reset_at)
                    .map(|(k, _)| k.clone());

                if let Some(key_to_remove) = oldest_key {
                    buckets.remove(&key_to_remove);
                    tracing::debug!(
                        removed_key = %key_to_remove,
                        shard_index,
                        remaining_buckets = buckets.len(),
                        "Evicted oldest rate limit bucket due to capacity limit"
                    );
                }
            }
        }

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| RateLimitBucket::new(self.window));

        match bucket.check_and_increment(self.limit, self.window) {
            (true, remaining) => Ok(remaining),
            (false, _) => Err(bucket.reset_in()),
        }
    }

    /// Drop buckets whose window ended at least one window ago.
    pub async fn cleanup_expired_buckets(&self) -> usize {
        let now = Instant::now();
        let mut total_cleaned = 0;

        for shard in &self.shards {
            let mut buckets = shard.lock().await;
            let before = buckets.len();
            buckets.retain(|_, bucket| !bucket.is_stale(now, self.window));
            total_cleaned += before - buckets.len();
        }

        if total_cleaned > 0 {
            tracing::debug!(
                buckets_cleaned = total_cleaned,
                "Cleaned up expired rate limit buckets across all shards"
            );
        }
        total_cleaned
    }

    pub async fn bucket_count(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.lock().await.len();
        }
        total
    }
}

/// Periodically sweep expired buckets until the returned handle is aborted.
pub fn start_bucket_sweeper(limiter: Arc<UploadRateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            limiter.cleanup_expired_buckets().await;
        }
    })
}
