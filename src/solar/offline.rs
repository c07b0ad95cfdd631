//! Astronomical sunrise/sunset without any network access

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sunrise::{SolarDay, SolarEvent};

use super::{SolarDayEvents, SolarTimeSource};
use crate::error::PipelineError;
use crate::models::Coordinates;

/// Computes events locally with the `sunrise` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSolarSource;

#[async_trait]
impl SolarTimeSource for OfflineSolarSource {
    async fn day_events(
        &self,
        coordinates: Coordinates,
        date: NaiveDate,
    ) -> Result<SolarDayEvents, PipelineError> {
        let position = sunrise::Coordinates::new(coordinates.latitude(), coordinates.longitude())
            .ok_or_else(|| {
                PipelineError::service(format!(
                    "invalid coordinates: {}",
                    coordinates.format_coordinates()
                ))
            })?;

        let solar_day = SolarDay::new(position, date);
        let no_event = |event: &str| {
            PipelineError::service(format!("there is no {event} on {date} at this latitude"))
        };
        let sunrise = solar_day
            .event_time(SolarEvent::Sunrise)
            .ok_or_else(|| no_event("sunrise"))?;
        let sunset = solar_day
            .event_time(SolarEvent::Sunset)
            .ok_or_else(|| no_event("sunset"))?;

        ordered_events(sunrise, sunset, date)
    }
}

fn ordered_events(
    sunrise: DateTime<Utc>,
    sunset: DateTime<Utc>,
    date: NaiveDate,
) -> Result<SolarDayEvents, PipelineError> {
    if sunrise >= sunset {
        return Err(PipelineError::service(format!(
            "solar events out of order on {date}: sunrise {sunrise} is not before sunset {sunset}"
        )));
    }
    Ok(SolarDayEvents { sunrise, sunset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[tokio::test]
    async fn test_equator_has_twelve_hour_day() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let events = OfflineSolarSource
            .day_events(Coordinates::new(0.0, 0.0).unwrap(), date)
            .await
            .unwrap();

        let day_length = events.sunset - events.sunrise;
        assert!((day_length.num_minutes() - 12 * 60).abs() < 15);
        assert!((5..=6).contains(&events.sunrise.hour()));
    }

    #[test]
    fn test_reversed_events_are_reported_as_out_of_order() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let early = Utc.from_utc_datetime(&date.and_hms_opt(0, 15, 0).unwrap());
        let late = Utc.from_utc_datetime(&date.and_hms_opt(12, 45, 0).unwrap());

        let err = ordered_events(late, early, date).unwrap_err();
        assert!(matches!(err, PipelineError::Service { .. }));
        assert!(err.to_string().contains("out of order"));
        assert!(!err.to_string().contains("there is no"));

        let events = ordered_events(early, late, date).unwrap();
        assert_eq!(events.sunrise, early);
    }
}
