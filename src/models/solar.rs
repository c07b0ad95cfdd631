//! Local solar event times for one reference day

use chrono::{DateTime, Timelike};
use chrono_tz::Tz;

/// Wall-clock format written into the table cells
pub const CELL_TIME_FORMAT: &str = "%H:%M:%S";

/// Sunrise and sunset of the reference day plus sunrise of the next day,
/// in the configured local timezone and truncated to whole seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarTimes {
    sunrise_today: DateTime<Tz>,
    sunset_today: DateTime<Tz>,
    sunrise_tomorrow: DateTime<Tz>,
}

impl SolarTimes {
    /// Build from local instants. Returns `None` unless
    /// `sunrise_today < sunset_today < sunrise_tomorrow`.
    #[must_use]
    pub fn new(
        sunrise_today: DateTime<Tz>,
        sunset_today: DateTime<Tz>,
        sunrise_tomorrow: DateTime<Tz>,
    ) -> Option<Self> {
        let times = Self {
            sunrise_today: truncate_to_second(sunrise_today),
            sunset_today: truncate_to_second(sunset_today),
            sunrise_tomorrow: truncate_to_second(sunrise_tomorrow),
        };
        (times.sunrise_today < times.sunset_today && times.sunset_today < times.sunrise_tomorrow)
            .then_some(times)
    }

    #[must_use]
    pub fn sunrise_today(&self) -> DateTime<Tz> {
        self.sunrise_today
    }

    #[must_use]
    pub fn sunset_today(&self) -> DateTime<Tz> {
        self.sunset_today
    }

    #[must_use]
    pub fn sunrise_tomorrow(&self) -> DateTime<Tz> {
        self.sunrise_tomorrow
    }

    /// The three `HH:MM:SS` strings in cell order: sunrise today, sunset
    /// today, sunrise tomorrow
    #[must_use]
    pub fn cell_values(&self) -> [String; 3] {
        [
            self.sunrise_today.format(CELL_TIME_FORMAT).to_string(),
            self.sunset_today.format(CELL_TIME_FORMAT).to_string(),
            self.sunrise_tomorrow.format(CELL_TIME_FORMAT).to_string(),
        ]
    }

    /// One-line summary used as the photo caption
    #[must_use]
    pub fn summary(&self) -> String {
        let [sunrise, sunset, next_sunrise] = self.cell_values();
        format!("Sunrise {sunrise}, sunset {sunset}, tomorrow's sunrise {next_sunrise}")
    }
}

fn truncate_to_second(time: DateTime<Tz>) -> DateTime<Tz> {
    time.with_nanosecond(0).unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Asia::Kolkata;

    fn utc(h: u32, m: u32, s: u32, day: u32) -> DateTime<Tz> {
        Utc.with_ymd_and_hms(2024, 3, day, h, m, s)
            .unwrap()
            .with_timezone(&Kolkata)
    }

    #[test]
    fn test_cell_values_in_local_time() {
        let times = SolarTimes::new(utc(0, 15, 0, 10), utc(12, 45, 0, 10), utc(0, 14, 50, 11)).unwrap();
        assert_eq!(times.cell_values(), ["05:45:00", "18:15:00", "05:44:50"]);
    }

    #[test]
    fn test_sub_second_precision_is_truncated() {
        let sunrise = utc(0, 15, 0, 10) + chrono::Duration::milliseconds(999);
        let times = SolarTimes::new(sunrise, utc(12, 45, 0, 10), utc(0, 14, 50, 11)).unwrap();
        assert_eq!(times.sunrise_today().nanosecond(), 0);
        assert_eq!(times.cell_values()[0], "05:45:00");
    }

    #[test]
    fn test_out_of_order_times_rejected() {
        assert!(SolarTimes::new(utc(12, 45, 0, 10), utc(0, 15, 0, 10), utc(0, 14, 50, 11)).is_none());
        assert!(SolarTimes::new(utc(0, 15, 0, 10), utc(12, 45, 0, 10), utc(0, 14, 50, 10)).is_none());
    }

    #[test]
    fn test_summary_mentions_all_times() {
        let times = SolarTimes::new(utc(0, 15, 0, 10), utc(12, 45, 0, 10), utc(0, 14, 50, 11)).unwrap();
        let summary = times.summary();
        assert!(summary.contains("05:45:00"));
        assert!(summary.contains("18:15:00"));
        assert!(summary.contains("05:44:50"));
    }
}
