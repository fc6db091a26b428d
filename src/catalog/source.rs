//! Injectable holiday and sun-time sources.
//!
//! Production deployments back these traits with the Hebrew-calendar
//! service and an astronomical API; tests substitute recorded
//! implementations once at session scope. The engine itself carries no
//! mock branches.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use parking_lot::RwLock;

use crate::error::{EngineError, EngineResult};
use crate::models::Holiday;

/// Supplies holiday rows per calendar year.
pub trait HolidaySource: Send + Sync {
    /// Fetches every holiday row for a year.
    ///
    /// Implementations backed by an external API should bound the call
    /// with a timeout (10 seconds in production) and surface failures as
    /// [`EngineError::Transient`].
    fn fetch_holidays(&self, year: i32) -> EngineResult<Vec<Holiday>>;
}

/// Supplies sunrise/sunset for a date at a location.
pub trait SunSource: Send + Sync {
    /// Fetches `(sunrise, sunset)` for the date at the given position.
    ///
    /// Implementations backed by an external API should bound the call
    /// with a timeout (10 seconds in production) and surface failures as
    /// [`EngineError::Transient`].
    fn fetch_sun(
        &self,
        date: NaiveDate,
        latitude: f64,
        longitude: f64,
    ) -> EngineResult<(NaiveDateTime, NaiveDateTime)>;
}

/// Holiday source backed by a fixed set of rows.
///
/// Suitable for deployments that ship a vetted holiday table and for
/// test fixtures.
#[derive(Default)]
pub struct StaticHolidaySource {
    rows: RwLock<HashMap<i32, Vec<Holiday>>>,
}

impl StaticHolidaySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source preloaded with the given rows.
    pub fn with_rows(rows: Vec<Holiday>) -> Self {
        let source = Self::new();
        source.load(rows);
        source
    }

    /// Replaces the stored rows for the years present in `rows`.
    pub fn load(&self, rows: Vec<Holiday>) {
        use chrono::Datelike;
        let mut by_year = self.rows.write();
        for row in rows {
            by_year.entry(row.date.year()).or_default().push(row);
        }
    }
}

impl HolidaySource for StaticHolidaySource {
    fn fetch_holidays(&self, year: i32) -> EngineResult<Vec<Holiday>> {
        Ok(self.rows.read().get(&year).cloned().unwrap_or_default())
    }
}

/// Sun source returning the same local times for every date.
///
/// Deterministic by construction; used by fixtures and by deployments
/// that accept a flat seasonal approximation.
pub struct FixedSunSource {
    sunrise: NaiveTime,
    sunset: NaiveTime,
}

impl FixedSunSource {
    /// Creates a source with the given daily sunrise and sunset.
    pub fn new(sunrise: NaiveTime, sunset: NaiveTime) -> Self {
        Self { sunrise, sunset }
    }
}

impl SunSource for FixedSunSource {
    fn fetch_sun(
        &self,
        date: NaiveDate,
        _latitude: f64,
        _longitude: f64,
    ) -> EngineResult<(NaiveDateTime, NaiveDateTime)> {
        Ok((date.and_time(self.sunrise), date.and_time(self.sunset)))
    }
}

/// Sun source that always fails, for exercising the degraded path.
pub struct UnavailableSunSource;

impl SunSource for UnavailableSunSource {
    fn fetch_sun(
        &self,
        _date: NaiveDate,
        _latitude: f64,
        _longitude: f64,
    ) -> EngineResult<(NaiveDateTime, NaiveDateTime)> {
        Err(EngineError::Transient {
            subsystem: "sun_source".to_string(),
            message: "unavailable".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HolidayKind;

    #[test]
    fn test_static_source_returns_rows_for_year() {
        let source = StaticHolidaySource::with_rows(vec![Holiday {
            date: NaiveDate::from_ymd_opt(2025, 4, 13).unwrap(),
            name: "Passover".to_string(),
            kind: HolidayKind::Regular,
            start_time: None,
            end_time: None,
        }]);
        assert_eq!(source.fetch_holidays(2025).unwrap().len(), 1);
        assert!(source.fetch_holidays(2026).unwrap().is_empty());
    }

    #[test]
    fn test_fixed_sun_source_is_deterministic() {
        let source = FixedSunSource::new(
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        );
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let (sunrise, sunset) = source.fetch_sun(date, 32.08, 34.78).unwrap();
        assert_eq!(sunrise, date.and_hms_opt(6, 0, 0).unwrap());
        assert_eq!(sunset, date.and_hms_opt(18, 0, 0).unwrap());
    }

    #[test]
    fn test_unavailable_source_reports_transient() {
        let err = UnavailableSunSource
            .fetch_sun(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(), 0.0, 0.0)
            .unwrap_err();
        assert!(err.is_transient());
    }
}
