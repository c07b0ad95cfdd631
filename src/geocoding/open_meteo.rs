//! Open-Meteo geocoding (no API key required)

use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{Geocoder, GeocodingCandidate};
use crate::config::GeocodingConfig;
use crate::error::PipelineError;
use crate::http;

pub const DEFAULT_BASE_URL: &str = "https://geocoding-api.open-meteo.com";

/// Geocoding response from `OpenMeteo`
#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    admin1: Option<String>,
}

impl From<GeocodingResult> for GeocodingCandidate {
    fn from(result: GeocodingResult) -> Self {
        let name = [Some(result.name), result.admin1, result.country]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        GeocodingCandidate {
            name,
            latitude: result.latitude,
            longitude: result.longitude,
        }
    }
}

pub struct OpenMeteoGeocoder {
    client: ClientWithMiddleware,
    base_url: String,
    count: u32,
}

impl OpenMeteoGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let base_url = if config.base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            config.base_url.trim_end_matches('/')
        };
        Ok(Self {
            client: http::build_client(
                Duration::from_secs(config.timeout_seconds.into()),
                config.max_retries,
            )?,
            base_url: base_url.to_string(),
            count: config.max_results,
        })
    }

    fn url(&self, query: &str) -> String {
        format!(
            "{}/v1/search?name={}&count={}&language=en&format=json",
            self.base_url,
            urlencoding::encode(query),
            self.count
        )
    }
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<GeocodingCandidate>, PipelineError> {
        let url = self.url(query);
        debug!("Open-Meteo request URL: {}", url);
        let start_time = Instant::now();

        let response = self.client.get(&url).send().await.map_err(|e| {
            PipelineError::geocoding_unavailable(format!(
                "Open-Meteo request failed: {}",
                http::request_error(e)
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Open-Meteo answered HTTP {}", status);
            return Err(PipelineError::geocoding_unavailable(format!(
                "Open-Meteo answered HTTP {status}"
            )));
        }

        let body: GeocodingResponse = response.json().await.map_err(|e| {
            PipelineError::geocoding_unavailable(format!(
                "Failed to parse OpenMeteo geocoding response: {}",
                http::decode_error(e)
            ))
        })?;

        let candidates: Vec<GeocodingCandidate> = body
            .results
            .unwrap_or_default()
            .into_iter()
            .map(GeocodingCandidate::from)
            .collect();
        info!(
            "Open-Meteo returned {} results in {:.3}s",
            candidates.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_results_means_no_match() {
        let body: GeocodingResponse = serde_json::from_str(r#"{"generationtime_ms":0.5}"#).unwrap();
        assert!(body.results.is_none());
    }

    #[test]
    fn test_candidate_name_includes_region_and_country() {
        let body: GeocodingResponse = serde_json::from_str(
            r#"{"results":[{"id":1253184,"name":"Vijayawada","latitude":16.50745,"longitude":80.6466,
                "country":"India","admin1":"Andhra Pradesh","timezone":"Asia/Kolkata"}]}"#,
        )
        .unwrap();
        let candidate = GeocodingCandidate::from(body.results.unwrap().remove(0));
        assert_eq!(candidate.name, "Vijayawada, Andhra Pradesh, India");
        assert_eq!(candidate.latitude, 16.50745);
    }

    #[test]
    fn test_url() {
        let geocoder = OpenMeteoGeocoder::new(&GeocodingConfig::default()).unwrap();
        assert_eq!(
            geocoder.url("São Paulo"),
            "https://geocoding-api.open-meteo.com/v1/search?name=S%C3%A3o%20Paulo&count=1&language=en&format=json"
        );
    }
}
