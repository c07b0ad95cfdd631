//! sunrise-sunset.org client

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{SolarDayEvents, SolarTimeSource};
use crate::config::SolarConfig;
use crate::error::PipelineError;
use crate::http;
use crate::models::Coordinates;

/// The API reports "no such event" with this instant
const POLAR_SENTINEL_SECONDS: i64 = 1;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    // An empty string when the status is not OK
    #[serde(default)]
    results: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResults {
    sunrise: String,
    sunset: String,
}

pub struct SunriseSunsetClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl SunriseSunsetClient {
    pub fn new(config: &SolarConfig) -> Result<Self> {
        let client = http::build_client(
            Duration::from_secs(config.timeout_seconds.into()),
            config.max_retries,
        )?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, coordinates: Coordinates, date: NaiveDate) -> String {
        format!(
            "{}/json?lat={}&lng={}&date={}&formatted=0",
            self.base_url,
            coordinates.latitude(),
            coordinates.longitude(),
            date.format("%Y-%m-%d")
        )
    }
}

#[async_trait]
impl SolarTimeSource for SunriseSunsetClient {
    async fn day_events(
        &self,
        coordinates: Coordinates,
        date: NaiveDate,
    ) -> Result<SolarDayEvents, PipelineError> {
        let url = self.url(coordinates, date);
        debug!("Sunrise-sunset request URL: {}", url);
        let start_time = Instant::now();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                PipelineError::service(format!(
                    "sunrise-sunset request failed: {}",
                    http::request_error(e)
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Sunrise-sunset API answered {} for {}", status, date);
            return Err(PipelineError::service(format!(
                "sunrise-sunset API answered HTTP {status}"
            )));
        }

        let body: ApiResponse = response.json().await.map_err(|e| {
            PipelineError::service(format!(
                "invalid sunrise-sunset response: {}",
                http::decode_error(e)
            ))
        })?;

        let events = parse_events(body, date)?;
        info!(
            "Retrieved solar events for {} in {:.3}s",
            date,
            start_time.elapsed().as_secs_f64()
        );
        Ok(events)
    }
}

fn parse_events(body: ApiResponse, date: NaiveDate) -> Result<SolarDayEvents, PipelineError> {
    if body.status != "OK" {
        return Err(PipelineError::service(format!(
            "sunrise-sunset API returned status {} for {date}",
            body.status
        )));
    }
    let results: ApiResults = serde_json::from_value(body.results).map_err(|e| {
        PipelineError::service(format!("sunrise-sunset response has no results: {e}"))
    })?;

    let sunrise = parse_instant(&results.sunrise, "sunrise", date)?;
    let sunset = parse_instant(&results.sunset, "sunset", date)?;
    Ok(SolarDayEvents { sunrise, sunset })
}

fn parse_instant(value: &str, event: &str, date: NaiveDate) -> Result<DateTime<Utc>, PipelineError> {
    let instant = DateTime::parse_from_rfc3339(value)
        .map_err(|e| PipelineError::service(format!("invalid {event} time '{value}': {e}")))?
        .with_timezone(&Utc);
    if instant.timestamp() <= POLAR_SENTINEL_SECONDS {
        return Err(PipelineError::service(format!(
            "there is no {event} on {date} at this latitude"
        )));
    }
    Ok(instant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn body(json: &str) -> ApiResponse {
        serde_json::from_str(json).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_parse_ok_response() {
        let events = parse_events(
            body(
                r#"{"results":{"sunrise":"2024-06-01T00:15:00+00:00","sunset":"2024-06-01T12:45:00+00:00","solar_noon":"2024-06-01T06:30:00+00:00","day_length":45000},"status":"OK","tzid":"UTC"}"#,
            ),
            date(),
        )
        .unwrap();
        assert_eq!(events.sunrise.hour(), 0);
        assert_eq!(events.sunrise.minute(), 15);
        assert_eq!(events.sunset.hour(), 12);
        assert_eq!(events.sunset.minute(), 45);
    }

    #[test]
    fn test_polar_sentinel_is_service_error() {
        let err = parse_events(
            body(
                r#"{"results":{"sunrise":"1970-01-01T00:00:01+00:00","sunset":"1970-01-01T00:00:01+00:00"},"status":"OK"}"#,
            ),
            date(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Service { .. }));
        assert!(err.to_string().contains("no sunrise"));
    }

    #[test]
    fn test_error_status_is_service_error() {
        let err = parse_events(body(r#"{"results":"","status":"INVALID_REQUEST"}"#), date())
            .unwrap_err();
        assert!(err.to_string().contains("INVALID_REQUEST"));
    }

    #[test]
    fn test_malformed_time_is_service_error() {
        let err = parse_events(
            body(r#"{"results":{"sunrise":"5:05:35 AM","sunset":"7:12:01 PM"},"status":"OK"}"#),
            date(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid sunrise time"));
    }

    #[test]
    fn test_request_url() {
        let client = SunriseSunsetClient::new(&SolarConfig::default()).unwrap();
        let coords = Coordinates::new(16.5, 80.625).unwrap();
        assert_eq!(
            client.url(coords, date()),
            "https://api.sunrise-sunset.org/json?lat=16.5&lng=80.625&date=2024-06-01&formatted=0"
        );
    }
}
