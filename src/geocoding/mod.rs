//! Coordinate resolver
//!
//! Turns free-text location queries into a single best-guess coordinate pair.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cache::PersistentCache;
use crate::config::{GeocodingProvider, PanchangamConfig};
use crate::error::PipelineError;
use crate::models::{Coordinates, ResolvedLocation};

pub mod cached;
pub mod open_meteo;
pub mod opencage;

pub use cached::CachedGeocoder;
pub use open_meteo::OpenMeteoGeocoder;
pub use opencage::OpenCageGeocoder;

/// One match reported by a geocoding provider, unvalidated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingCandidate {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A geocoding backend
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Candidates for `query`, best first. An empty list means no match;
    /// transport failures are `GeocodingUnavailable`.
    async fn search(&self, query: &str) -> Result<Vec<GeocodingCandidate>, PipelineError>;
}

/// Build the configured geocoder, wrapped in the cache when one is given
pub fn geocoder_from_config(
    config: &PanchangamConfig,
    cache: Option<PersistentCache>,
) -> Result<Arc<dyn Geocoder>> {
    let provider: Arc<dyn Geocoder> = match config.geocoding.provider {
        GeocodingProvider::OpenCage => Arc::new(OpenCageGeocoder::new(&config.geocoding)?),
        GeocodingProvider::OpenMeteo => Arc::new(OpenMeteoGeocoder::new(&config.geocoding)?),
    };

    let geocoder: Arc<dyn Geocoder> = match cache {
        Some(cache) => Arc::new(CachedGeocoder::new(
            provider,
            cache,
            std::time::Duration::from_secs(u64::from(config.cache.ttl_hours) * 3600),
        )),
        None => provider,
    };
    Ok(geocoder)
}

/// Resolves location text to the first usable candidate
#[derive(Clone)]
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
}

impl LocationResolver {
    #[must_use]
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, text: &str) -> Result<ResolvedLocation, PipelineError> {
        let query = text.trim();
        if query.is_empty() {
            debug!("Empty location query");
            return Err(PipelineError::not_found(query));
        }

        let candidates = self.geocoder.search(query).await?;
        debug!("Geocoder returned {} candidates", candidates.len());

        for candidate in candidates {
            match Coordinates::new(candidate.latitude, candidate.longitude) {
                Ok(coordinates) => {
                    info!(
                        "Resolved '{}' to {} ({})",
                        query,
                        candidate.name,
                        coordinates.format_coordinates()
                    );
                    return Ok(ResolvedLocation::new(coordinates, candidate.name));
                }
                Err(e) => warn!("Skipping candidate '{}': {}", candidate.name, e),
            }
        }
        Err(PipelineError::not_found(query))
    }
}

/// Cache key for a query: lower-cased with whitespace collapsed
#[must_use]
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
