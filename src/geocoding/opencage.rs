//! OpenCage forward geocoding

use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{Geocoder, GeocodingCandidate};
use crate::config::GeocodingConfig;
use crate::error::PipelineError;
use crate::http;

pub const DEFAULT_BASE_URL: &str = "https://api.opencagedata.com";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    results: Vec<ApiResult>,
    status: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    code: u16,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    geometry: Geometry,
    #[serde(default)]
    formatted: String,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    lat: f64,
    lng: f64,
}

pub struct OpenCageGeocoder {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    limit: u32,
}

impl OpenCageGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("OpenCage geocoding requires geocoding.api_key"))?;
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
            api_key,
            limit: config.max_results,
        })
    }

    fn url(&self, query: &str) -> String {
        format!(
            "{}/geocode/v1/json?q={}&key={}&limit={}&no_annotations=1",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.api_key),
            self.limit
        )
    }
}

#[async_trait]
impl Geocoder for OpenCageGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<GeocodingCandidate>, PipelineError> {
        let url = self.url(query);
        debug!("OpenCage request URL: {}", http::redact(&url));
        let start_time = Instant::now();

        let response = self.client.get(&url).send().await.map_err(|e| {
            PipelineError::geocoding_unavailable(format!(
                "OpenCage request failed: {}",
                http::request_error(e)
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("OpenCage answered HTTP {}", status);
            return Err(PipelineError::geocoding_unavailable(format!(
                "OpenCage answered HTTP {status}"
            )));
        }

        let body: ApiResponse = response.json().await.map_err(|e| {
            PipelineError::geocoding_unavailable(format!(
                "invalid OpenCage response: {}",
                http::decode_error(e)
            ))
        })?;
        let candidates = candidates(body)?;

        info!(
            "OpenCage returned {} results in {:.3}s",
            candidates.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(candidates)
    }
}

fn candidates(body: ApiResponse) -> Result<Vec<GeocodingCandidate>, PipelineError> {
    if let Some(status) = body.status
        && status.code != 200
    {
        return Err(PipelineError::geocoding_unavailable(format!(
            "OpenCage status {}: {}",
            status.code, status.message
        )));
    }
    Ok(body
        .results
        .into_iter()
        .map(|result| GeocodingCandidate {
            name: result.formatted,
            latitude: result.geometry.lat,
            longitude: result.geometry.lng,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GeocodingConfig {
        GeocodingConfig {
            api_key: Some("test-key-123".to_string()),
            ..GeocodingConfig::default()
        }
    }

    #[test]
    fn test_parse_results_in_provider_order() {
        let body: ApiResponse = serde_json::from_str(
            r#"{"results":[
                {"geometry":{"lat":16.5062,"lng":80.648},"formatted":"Vijayawada, Andhra Pradesh, India","confidence":5},
                {"geometry":{"lat":16.51,"lng":80.61},"formatted":"Vijayawada Rural"}
            ],"status":{"code":200,"message":"OK"},"total_results":2}"#,
        )
        .unwrap();
        let found = candidates(body).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "Vijayawada, Andhra Pradesh, India");
        assert_eq!(found[0].longitude, 80.648);
    }

    #[test]
    fn test_empty_results_are_no_match() {
        let body: ApiResponse = serde_json::from_str(
            r#"{"results":[],"status":{"code":200,"message":"OK"},"total_results":0}"#,
        )
        .unwrap();
        assert!(candidates(body).unwrap().is_empty());
    }

    #[test]
    fn test_error_status_is_unavailable() {
        let body: ApiResponse = serde_json::from_str(
            r#"{"results":[],"status":{"code":402,"message":"quota exceeded"}}"#,
        )
        .unwrap();
        let err = candidates(body).unwrap_err();
        assert!(matches!(err, PipelineError::GeocodingUnavailable { .. }));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_url_encodes_query() {
        let geocoder = OpenCageGeocoder::new(&config()).unwrap();
        assert_eq!(
            geocoder.url("Sri Kalahasti, AP"),
            "https://api.opencagedata.com/geocode/v1/json?q=Sri%20Kalahasti%2C%20AP&key=test-key-123&limit=1&no_annotations=1"
        );
    }

    #[tokio::test]
    async fn test_transport_error_does_not_leak_key() {
        let geocoder = OpenCageGeocoder::new(&GeocodingConfig {
            api_key: Some("SECRETKEY12345".to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 2,
            max_retries: 0,
            ..GeocodingConfig::default()
        })
        .unwrap();

        let err = geocoder.search("Vijayawada").await.unwrap_err();
        assert!(matches!(err, PipelineError::GeocodingUnavailable { .. }));
        assert!(!err.to_string().contains("SECRETKEY12345"), "leaked: {err}");
        assert!(!err.user_message().contains("SECRETKEY12345"));
    }

    #[test]
    fn test_missing_key_is_rejected() {
        assert!(OpenCageGeocoder::new(&GeocodingConfig::default()).is_err());
    }
}
