use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;

use crate::model::{CachePayload, ListingItem};

/// File-backed cache for the last successful listings payload. One slot,
/// single writer assumed, last write wins. Staleness tolerance absorbs the
/// races a multi-instance deployment could produce.
#[derive(Debug, Clone)]
pub struct ListingCache {
    path: PathBuf,
    ttl: Duration,
}

impl ListingCache {
    pub fn new(path: PathBuf, ttl: Duration) -> Self {
        Self { path, ttl }
    }

    /// Returns the cached payload only if it is younger than the TTL.
    pub fn load_fresh(&self) -> Option<CachePayload> {
        let payload = self.load_any()?;
        let age = Utc::now().signed_duration_since(payload.cached_at);
        if age.to_std().ok()? <= self.ttl {
            Some(payload)
        } else {
            None
        }
    }

    /// Returns the cached payload regardless of age, for stale-on-error
    /// fallback. Unreadable or corrupt files read as no cache.
    pub fn load_any(&self) -> Option<CachePayload> {
        let text = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&text) {
            Ok(payload) => Some(payload),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "discarding corrupt cache file");
                None
            }
        }
    }

    /// Overwrites the cache with a fresh payload. Write failures are logged
    /// and swallowed; a dead cache must not fail a successful fetch.
    pub fn store(&self, products: &[ListingItem], complete: bool) {
        let payload = CachePayload {
            products: products.to_vec(),
            cached_at: Utc::now(),
            complete,
        };
        match serde_json::to_string(&payload) {
            Ok(text) => {
                if let Err(err) = fs::write(&self.path, text) {
                    tracing::warn!(path = %self.path.display(), %err, "failed to write cache");
                }
            }
            Err(err) => tracing::warn!(%err, "failed to serialize cache payload"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn temp_cache(name: &str, ttl: Duration) -> ListingCache {
        let path = std::env::temp_dir().join(format!(
            "ebay-showcase-test-{name}-{}.json",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        ListingCache::new(path, ttl)
    }

    fn item(id: &str) -> ListingItem {
        ListingItem {
            id: id.into(),
            title: format!("Item {id}"),
            price: "9.99".into(),
            currency: "USD".into(),
            url: ListingItem::item_url(id),
            image: None,
            condition: None,
            location: None,
        }
    }

    #[test]
    fn missing_file_reads_as_no_cache() {
        let cache = temp_cache("missing", Duration::from_secs(60));
        assert!(cache.load_any().is_none());
        assert!(cache.load_fresh().is_none());
    }

    #[test]
    fn store_then_load_round_trips() {
        let cache = temp_cache("roundtrip", Duration::from_secs(60));
        cache.store(&[item("1"), item("2")], true);
        let payload = cache.load_fresh().expect("fresh payload");
        assert_eq!(payload.products.len(), 2);
        assert_eq!(payload.products[0].id, "1");
        assert!(payload.complete);
    }

    #[test]
    fn payloads_without_a_complete_marker_read_as_incomplete() {
        // Cache files written before the marker existed carry no
        // `complete` field; they must still load.
        let cache = temp_cache("legacy", Duration::from_secs(60));
        let text = format!(
            r#"{{"products":[],"cachedAt":"{}"}}"#,
            Utc::now().to_rfc3339()
        );
        fs::write(cache.path.clone(), text).unwrap();
        let payload = cache.load_fresh().expect("legacy payload");
        assert!(!payload.complete);
    }

    #[test]
    fn expired_payload_is_stale_but_still_loadable() {
        let cache = temp_cache("expired", Duration::from_secs(60));
        let payload = CachePayload {
            products: vec![item("1")],
            cached_at: Utc::now() - ChronoDuration::hours(2),
            complete: true,
        };
        fs::write(cache.path.clone(), serde_json::to_string(&payload).unwrap()).unwrap();
        assert!(cache.load_fresh().is_none());
        assert!(cache.load_any().is_some());
    }

    #[test]
    fn corrupt_file_reads_as_no_cache() {
        let cache = temp_cache("corrupt", Duration::from_secs(60));
        fs::write(cache.path.clone(), "{not json").unwrap();
        assert!(cache.load_any().is_none());
    }
}
