//! Solar time calculator
//!
//! Looks up UTC sunrise/sunset for the reference day and the day after, then
//! converts them into the configured local timezone.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, instrument};

use crate::config::{PanchangamConfig, SolarProvider};
use crate::error::PipelineError;
use crate::models::{Coordinates, SolarTimes};

pub mod offline;
pub mod sunrise_sunset;

pub use offline::OfflineSolarSource;
pub use sunrise_sunset::SunriseSunsetClient;

/// Sunrise and sunset of one day, in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolarDayEvents {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

/// Anything that can tell when the sun rises and sets on a given day
#[async_trait]
pub trait SolarTimeSource: Send + Sync {
    /// Events for `date`; days without a sunrise or sunset are `Service` errors
    async fn day_events(
        &self,
        coordinates: Coordinates,
        date: NaiveDate,
    ) -> Result<SolarDayEvents, PipelineError>;
}

/// Build the configured source
pub fn source_from_config(config: &PanchangamConfig) -> Result<Arc<dyn SolarTimeSource>> {
    let source: Arc<dyn SolarTimeSource> = match config.solar.provider {
        SolarProvider::SunriseSunset => Arc::new(SunriseSunsetClient::new(&config.solar)?),
        SolarProvider::Offline => Arc::new(OfflineSolarSource),
    };
    Ok(source)
}

/// Current civil date in `timezone`
#[must_use]
pub fn local_today(timezone: Tz) -> NaiveDate {
    Utc::now().with_timezone(&timezone).date_naive()
}

#[derive(Clone)]
pub struct SolarTimeCalculator {
    source: Arc<dyn SolarTimeSource>,
}

impl SolarTimeCalculator {
    #[must_use]
    pub fn new(source: Arc<dyn SolarTimeSource>) -> Self {
        Self { source }
    }

    /// Sunrise and sunset on `reference_date` and sunrise on the next day,
    /// as local wall-clock times in `timezone`
    #[instrument(skip(self), fields(coordinates = %coordinates.format_coordinates()))]
    pub async fn compute(
        &self,
        coordinates: Coordinates,
        timezone: Tz,
        reference_date: NaiveDate,
    ) -> Result<SolarTimes, PipelineError> {
        let next_date = reference_date
            .succ_opt()
            .ok_or_else(|| PipelineError::service(format!("no day after {reference_date}")))?;

        let (today, tomorrow) = futures::try_join!(
            self.source.day_events(coordinates, reference_date),
            self.source.day_events(coordinates, next_date),
        )?;
        debug!(?today, ?tomorrow, "Solar events in UTC");

        SolarTimes::new(
            today.sunrise.with_timezone(&timezone),
            today.sunset.with_timezone(&timezone),
            tomorrow.sunrise.with_timezone(&timezone),
        )
        .ok_or_else(|| {
            PipelineError::service(format!(
                "solar events for {reference_date} at {} are out of order",
                coordinates.format_coordinates()
            ))
        })
    }
}
