//! Optional cache for script-derived variable sequences

use crate::platform::script::VariableSequence;
use moka::future::Cache;
use std::time::Duration;

/// Upper bound on distinct script keys kept at once
const MAX_ENTRIES: u64 = 16;

/// Variable sequences keyed by script endpoint, expiring after a TTL.
///
/// The player script rotates infrequently, so callers extracting many
/// embeds can skip refetching it for a while.
#[derive(Clone)]
pub struct VariableCache {
    inner: Cache<String, VariableSequence>,
}

impl VariableCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(MAX_ENTRIES)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<VariableSequence> {
        self.inner.get(key).await
    }

    /// Empty sequences are never stored, they are a failure signal
    pub async fn insert(&self, key: &str, vars: VariableSequence) {
        if vars.is_empty() {
            return;
        }
        self.inner.insert(key.to_string(), vars).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }
}
