//! Time catalog: holiday metadata and sun times.
//!
//! The catalog answers two questions: what is special about a date
//! (holiday or Shabbat, with its precise window), and when does the sun
//! rise and set at a location. Answers are pure functions of their inputs
//! and flow through the versioned cache, so a schema change is invalidated
//! by a version bump rather than key pattern-matching.

mod shabbat;
mod source;

pub use shabbat::ShabbatWindow;
pub use source::{FixedSunSource, HolidaySource, StaticHolidaySource, SunSource, UnavailableSunSource};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::VersionedCache;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{Holiday, HolidayKind, SunTimes};

/// Holiday metadata for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolidayInfo {
    /// The kind of the entry.
    pub kind: HolidayKind,
    /// Holiday name.
    pub name: String,
    /// Precise window start, when known.
    pub start: Option<NaiveDateTime>,
    /// Precise window end, when known.
    pub end: Option<NaiveDateTime>,
}

/// Catalog of holidays and sun times.
///
/// Holiday rows are replaced wholesale by [`TimeCatalog::refresh_year`];
/// unknown dates fall through to astronomical Shabbat classification. Sun
/// lookups degrade to a deterministic fixed-offset-from-midday estimate
/// when the source fails, unless estimates are disabled.
pub struct TimeCatalog {
    holiday_source: Arc<dyn HolidaySource>,
    sun_source: Arc<dyn SunSource>,
    cache: Arc<VersionedCache>,
    config: EngineConfig,
    holidays: RwLock<HashMap<NaiveDate, Holiday>>,
    refresh_lock: Mutex<()>,
    estimates_enabled: bool,
}

impl TimeCatalog {
    /// Creates a catalog with estimates enabled.
    pub fn new(
        holiday_source: Arc<dyn HolidaySource>,
        sun_source: Arc<dyn SunSource>,
        cache: Arc<VersionedCache>,
        config: EngineConfig,
    ) -> Self {
        Self {
            holiday_source,
            sun_source,
            cache,
            config,
            holidays: RwLock::new(HashMap::new()),
            refresh_lock: Mutex::new(()),
            estimates_enabled: true,
        }
    }

    /// Disables the estimate fallback; sun lookups then fail with
    /// [`EngineError::TimeSourceUnavailable`] when live and cached values
    /// are both missing.
    pub fn with_estimates(mut self, enabled: bool) -> Self {
        self.estimates_enabled = enabled;
        self
    }

    /// Replaces the stored holiday rows for a year.
    ///
    /// Fetches the source rows, derives a Shabbat entry per Saturday with
    /// its computed window, and swaps the year's rows wholesale. An
    /// advisory lock serializes concurrent refreshes.
    pub fn refresh_year(&self, year: i32) -> EngineResult<usize> {
        let _guard = self.refresh_lock.lock();

        let mut rows = self.holiday_source.fetch_holidays(year)?;
        let mut saturday = NaiveDate::from_ymd_opt(year, 1, 1)
            .expect("January 1st always exists");
        while saturday.weekday() != Weekday::Sat {
            saturday = saturday.succ_opt().expect("dates continue");
        }
        while saturday.year() == year {
            if !rows.iter().any(|r| r.date == saturday) {
                let window = self.shabbat_window(saturday - Duration::days(1))?;
                rows.push(Holiday {
                    date: saturday,
                    name: "Shabbat".to_string(),
                    kind: HolidayKind::Shabbat,
                    start_time: Some(window.0.start),
                    end_time: Some(window.0.end),
                });
            }
            saturday += Duration::days(7);
        }

        let count = rows.len();
        let mut store = self.holidays.write();
        store.retain(|date, _| date.year() != year);
        for row in rows {
            store.insert(row.date, row);
        }
        info!(year, count, "holiday catalog refreshed");
        Ok(count)
    }

    /// Holiday metadata for a date, or `None` for a plain workday.
    ///
    /// Stored rows win; unknown Saturdays are classified astronomically
    /// as Shabbat with a computed window. Results are cached per date.
    pub fn holiday_info(&self, date: NaiveDate) -> EngineResult<Option<HolidayInfo>> {
        let key = format!("holiday:{date}");
        if let Some(cached) = self.cache.get::<Option<HolidayInfo>>(&key) {
            return Ok(cached);
        }

        let info = match self.holidays.read().get(&date) {
            Some(row) => Some(HolidayInfo {
                kind: row.kind,
                name: row.name.clone(),
                start: row.start_time,
                end: row.end_time,
            }),
            None if date.weekday() == Weekday::Sat => {
                let (window, _) = self.shabbat_window(date - Duration::days(1))?;
                Some(HolidayInfo {
                    kind: HolidayKind::Shabbat,
                    name: "Shabbat".to_string(),
                    start: Some(window.start),
                    end: Some(window.end),
                })
            }
            None => None,
        };

        let ttl = match self.config.cache.ttl_holidays_secs {
            0 => None,
            secs => Some(StdDuration::from_secs(secs)),
        };
        self.cache.set(&key, &info, ttl);
        Ok(info)
    }

    /// Batch variant of [`TimeCatalog::holiday_info`] over an inclusive
    /// date range.
    pub fn holidays_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<BTreeMap<NaiveDate, HolidayInfo>> {
        let mut map = BTreeMap::new();
        let mut date = start;
        while date <= end {
            if let Some(info) = self.holiday_info(date)? {
                map.insert(date, info);
            }
            date = date.succ_opt().expect("dates continue");
        }
        Ok(map)
    }

    /// Sunrise and sunset for a date at a location.
    ///
    /// Resolution order: cache, live source, deterministic estimate. The
    /// estimate places sunrise and sunset at fixed offsets from midday
    /// and marks the result `is_estimated`.
    pub fn sun_times(
        &self,
        date: NaiveDate,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> EngineResult<SunTimes> {
        let lat = latitude.unwrap_or(self.config.location.latitude);
        let lng = longitude.unwrap_or(self.config.location.longitude);
        let key = format!("sun:{date}:{lat:.2}:{lng:.2}");

        if let Some(cached) = self.cache.get::<SunTimes>(&key) {
            return Ok(cached);
        }

        match self.sun_source.fetch_sun(date, lat, lng) {
            Ok((sunrise, sunset)) => {
                let times = SunTimes {
                    date,
                    latitude: lat,
                    longitude: lng,
                    sunrise,
                    sunset,
                    is_estimated: false,
                };
                let ttl = match self.config.cache.ttl_sun_times_secs {
                    0 => None,
                    secs => Some(StdDuration::from_secs(secs)),
                };
                self.cache.set(&key, &times, ttl);
                Ok(times)
            }
            Err(err) if self.estimates_enabled => {
                warn!(%date, error = %err, "sun source failed, using estimate");
                Ok(self.estimate(date, lat, lng))
            }
            Err(_) => Err(EngineError::TimeSourceUnavailable { date }),
        }
    }

    /// The Shabbat window for the weekend starting on `friday`.
    ///
    /// Returns the window and whether any sunset in it was estimated.
    pub fn shabbat_window(&self, friday: NaiveDate) -> EngineResult<(ShabbatWindow, bool)> {
        let friday_sun = self.sun_times(friday, None, None)?;
        let saturday_sun = self.sun_times(friday + Duration::days(1), None, None)?;
        let window = ShabbatWindow::from_sunsets(
            friday_sun.sunset,
            saturday_sun.sunset,
            &self.config.sabbath,
        );
        Ok((window, friday_sun.is_estimated || saturday_sun.is_estimated))
    }

    /// Deterministic estimate: sunrise and sunset at fixed offsets from
    /// midday. Never cached, so a recovered source replaces it on the
    /// next call.
    fn estimate(&self, date: NaiveDate, latitude: f64, longitude: f64) -> SunTimes {
        let midday = date.and_hms_opt(12, 0, 0).expect("midday always exists");
        SunTimes {
            date,
            latitude,
            longitude,
            sunrise: midday - Duration::hours(6),
            sunset: midday + Duration::hours(6),
            is_estimated: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use chrono::NaiveTime;

    fn catalog_with(
        holidays: Vec<Holiday>,
        sunset: NaiveTime,
    ) -> TimeCatalog {
        let cache = Arc::new(VersionedCache::new(Arc::new(InMemoryCache::new()), 1));
        TimeCatalog::new(
            Arc::new(StaticHolidaySource::with_rows(holidays)),
            Arc::new(FixedSunSource::new(
                NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
                sunset,
            )),
            cache,
            EngineConfig::default(),
        )
    }

    fn sunset_19_18() -> NaiveTime {
        NaiveTime::from_hms_opt(19, 18, 0).unwrap()
    }

    #[test]
    fn test_stored_holiday_wins() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 13).unwrap();
        let catalog = catalog_with(
            vec![Holiday {
                date,
                name: "Passover".to_string(),
                kind: HolidayKind::Regular,
                start_time: None,
                end_time: None,
            }],
            sunset_19_18(),
        );
        catalog.refresh_year(2025).unwrap();

        let info = catalog.holiday_info(date).unwrap().unwrap();
        assert_eq!(info.kind, HolidayKind::Regular);
        assert_eq!(info.name, "Passover");
    }

    #[test]
    fn test_unknown_saturday_classified_as_shabbat() {
        let catalog = catalog_with(vec![], sunset_19_18());
        // 2025-03-15 is a Saturday; no refresh has run.
        let date = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let info = catalog.holiday_info(date).unwrap().unwrap();
        assert_eq!(info.kind, HolidayKind::Shabbat);
        // Friday sunset 19:18 minus the 18-minute candle offset.
        assert_eq!(
            info.start,
            NaiveDate::from_ymd_opt(2025, 3, 14)
                .unwrap()
                .and_hms_opt(19, 0, 0)
        );
    }

    #[test]
    fn test_weekday_without_row_is_plain() {
        let catalog = catalog_with(vec![], sunset_19_18());
        let date = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        assert_eq!(catalog.holiday_info(date).unwrap(), None);
    }

    #[test]
    fn test_refresh_derives_shabbat_rows() {
        let catalog = catalog_with(vec![], sunset_19_18());
        let count = catalog.refresh_year(2025).unwrap();
        // Every Saturday of 2025 gets a derived entry.
        assert_eq!(count, 52);
    }

    #[test]
    fn test_refresh_replaces_year_wholesale() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 13).unwrap();
        let catalog = catalog_with(
            vec![Holiday {
                date,
                name: "Passover".to_string(),
                kind: HolidayKind::Regular,
                start_time: None,
                end_time: None,
            }],
            sunset_19_18(),
        );
        let first = catalog.refresh_year(2025).unwrap();
        let second = catalog.refresh_year(2025).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sun_times_cached_per_location() {
        let catalog = catalog_with(vec![], sunset_19_18());
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let first = catalog.sun_times(date, None, None).unwrap();
        let second = catalog.sun_times(date, None, None).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_estimated);
    }

    #[test]
    fn test_sun_source_failure_degrades_to_estimate() {
        let cache = Arc::new(VersionedCache::new(Arc::new(InMemoryCache::new()), 1));
        let catalog = TimeCatalog::new(
            Arc::new(StaticHolidaySource::new()),
            Arc::new(UnavailableSunSource),
            cache,
            EngineConfig::default(),
        );
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let times = catalog.sun_times(date, None, None).unwrap();
        assert!(times.is_estimated);
        assert_eq!(times.sunrise, date.and_hms_opt(6, 0, 0).unwrap());
        assert_eq!(times.sunset, date.and_hms_opt(18, 0, 0).unwrap());
    }

    #[test]
    fn test_estimates_disabled_fails_hard() {
        let cache = Arc::new(VersionedCache::new(Arc::new(InMemoryCache::new()), 1));
        let catalog = TimeCatalog::new(
            Arc::new(StaticHolidaySource::new()),
            Arc::new(UnavailableSunSource),
            cache,
            EngineConfig::default(),
        )
        .with_estimates(false);
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let err = catalog.sun_times(date, None, None).unwrap_err();
        assert!(matches!(err, EngineError::TimeSourceUnavailable { .. }));
    }

    #[test]
    fn test_cached_sun_times_survive_source_outage() {
        let cache = Arc::new(VersionedCache::new(Arc::new(InMemoryCache::new()), 1));
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

        let healthy = TimeCatalog::new(
            Arc::new(StaticHolidaySource::new()),
            Arc::new(FixedSunSource::new(
                NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
                sunset_19_18(),
            )),
            Arc::new(VersionedCache::new(cache.client(), 1)),
            EngineConfig::default(),
        );
        healthy.sun_times(date, None, None).unwrap();

        let degraded = TimeCatalog::new(
            Arc::new(StaticHolidaySource::new()),
            Arc::new(UnavailableSunSource),
            Arc::new(VersionedCache::new(cache.client(), 1)),
            EngineConfig::default(),
        );
        let times = degraded.sun_times(date, None, None).unwrap();
        assert!(!times.is_estimated, "cache should serve the live value");
    }

    #[test]
    fn test_shabbat_window_uses_offsets() {
        let catalog = catalog_with(vec![], sunset_19_18());
        let friday = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let (window, estimated) = catalog.shabbat_window(friday).unwrap();
        assert!(!estimated);
        assert_eq!(window.start, friday.and_hms_opt(19, 0, 0).unwrap());
        assert_eq!(
            window.end,
            NaiveDate::from_ymd_opt(2025, 3, 15)
                .unwrap()
                .and_hms_opt(19, 58, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_holidays_in_range_collects_only_special_dates() {
        let catalog = catalog_with(vec![], sunset_19_18());
        let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 16).unwrap();
        let map = catalog.holidays_in_range(start, end).unwrap();
        // Only the Saturday in the range classifies.
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()));
    }
}
