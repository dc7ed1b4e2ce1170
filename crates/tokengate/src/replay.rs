//! `jti` replay guard
//!
//! A token identifier is live from its first acceptance until the expiry it was
//! recorded with. Re-presenting a live identifier is a replay; once the entry
//! has expired the identifier may be used again by a later token.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, VerifyError};

/// Storage seam for replay detection
///
/// Implementations must make `check_and_record` atomic per `jti`: two
/// concurrent calls with the same live identifier must not both succeed.
#[async_trait]
pub trait ReplayStore: Send + Sync + std::fmt::Debug {
    /// Record `jti` as seen until `expiry`, or fail with [`VerifyError::Replay`]
    /// if it is already live at `now`
    async fn check_and_record(&self, jti: &str, expiry: i64, now: i64) -> Result<()>;
}

/// In-process replay cache
///
/// Expired entries are swept lazily on every call, before the lookup.
#[derive(Debug, Default)]
pub struct MemoryReplayCache {
    entries: Mutex<HashMap<String, i64>>,
}

impl MemoryReplayCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resident entries (including any not yet swept)
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Whether `jti` is resident
    pub fn contains(&self, jti: &str) -> bool {
        self.entries.lock().contains_key(jti)
    }

    fn record(&self, jti: &str, expiry: i64, now: i64) -> Result<()> {
        let mut entries = self.entries.lock();

        let before = entries.len();
        entries.retain(|_, recorded| *recorded > now);
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged, "Swept expired replay entries");
        }

        if let Some(&recorded) = entries.get(jti)
            && recorded > now
        {
            warn!(jti = %jti, expires_at = recorded, "Replayed token identifier");
            return Err(VerifyError::Replay {
                jti: jti.to_string(),
            });
        }

        entries.insert(jti.to_string(), expiry);
        Ok(())
    }
}

#[async_trait]
impl ReplayStore for MemoryReplayCache {
    async fn check_and_record(&self, jti: &str, expiry: i64, now: i64) -> Result<()> {
        self.record(jti, expiry, now)
    }
}
