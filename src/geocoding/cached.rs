use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::RngExt;
use tracing::{debug, warn};

use super::{Geocoder, GeocodingCandidate, normalize_query};
use crate::cache::PersistentCache;
use crate::error::PipelineError;

/// Remembers successful lookups in the persistent cache
pub struct CachedGeocoder {
    inner: Arc<dyn Geocoder>,
    cache: PersistentCache,
    ttl: Duration,
}

impl CachedGeocoder {
    #[must_use]
    pub fn new(inner: Arc<dyn Geocoder>, cache: PersistentCache, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    fn key(query: &str) -> String {
        format!("geocode:{}", normalize_query(query))
    }
}

#[async_trait]
impl Geocoder for CachedGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<GeocodingCandidate>, PipelineError> {
        let key = Self::key(query);

        match self.cache.get::<Vec<GeocodingCandidate>>(&key).await {
            Ok(Some(cached)) => {
                debug!("Geocoding cache hit for '{}'", key);
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => warn!("Geocoding cache read failed: {:#}", e),
        }

        let candidates = self.inner.search(query).await?;
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let jitter: f64 = rand::rng().random_range(0.9..1.1);
        let ttl = self.ttl.mul_f64(jitter);
        if let Err(e) = self.cache.put(&key, candidates.clone(), ttl).await {
            warn!("Geocoding cache write failed: {:#}", e);
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGeocoder {
        calls: AtomicUsize,
        answer: Result<Vec<GeocodingCandidate>, PipelineError>,
    }

    #[async_trait]
    impl Geocoder for CountingGeocoder {
        async fn search(&self, _query: &str) -> Result<Vec<GeocodingCandidate>, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    fn setup(
        answer: Result<Vec<GeocodingCandidate>, PipelineError>,
    ) -> (tempfile::TempDir, Arc<CountingGeocoder>, CachedGeocoder) {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentCache::open(dir.path().join("cache")).unwrap();
        let inner = Arc::new(CountingGeocoder {
            calls: AtomicUsize::new(0),
            answer,
        });
        let cached = CachedGeocoder::new(inner.clone(), cache, Duration::from_secs(3600));
        (dir, inner, cached)
    }

    #[tokio::test]
    async fn test_success_is_cached_by_normalized_query() {
        let found = vec![GeocodingCandidate {
            name: "Vijayawada, India".to_string(),
            latitude: 16.5062,
            longitude: 80.648,
        }];
        let (_dir, inner, cached) = setup(Ok(found.clone()));

        assert_eq!(cached.search("Vijayawada").await.unwrap(), found);
        assert_eq!(cached.search("  vijayawada ").await.unwrap(), found);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_match_is_not_cached() {
        let (_dir, inner, cached) = setup(Ok(vec![]));
        assert!(cached.search("nowhere").await.unwrap().is_empty());
        assert!(cached.search("nowhere").await.unwrap().is_empty());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let (_dir, inner, cached) = setup(Err(PipelineError::geocoding_unavailable("timeout")));
        assert!(cached.search("x").await.is_err());
        assert!(cached.search("x").await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
