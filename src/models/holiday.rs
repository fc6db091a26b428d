//! Holiday, sun-time, and compensatory-day models.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a catalog holiday entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayKind {
    /// A regular holiday date.
    Regular,
    /// A derived Shabbat entry, stored per Gregorian date.
    Shabbat,
    /// A special date (for example, a half-day holiday eve).
    Special,
}

/// A catalog holiday row.
///
/// Immutable after insert; a catalog refresh replaces the year wholesale.
/// Derived Shabbat entries carry the computed window (Friday sunset minus
/// the candle-lighting offset through Saturday sunset plus the havdalah
/// offset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    /// The Gregorian date of the entry.
    pub date: NaiveDate,
    /// Holiday name.
    pub name: String,
    /// Kind of entry.
    pub kind: HolidayKind,
    /// Precise window start, when known.
    pub start_time: Option<NaiveDateTime>,
    /// Precise window end, when known.
    pub end_time: Option<NaiveDateTime>,
}

/// Sunrise/sunset for a date at a location.
///
/// Cacheable indefinitely; the cache key rounds latitude and longitude to
/// two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    /// The date the times apply to.
    pub date: NaiveDate,
    /// Query latitude in degrees.
    pub latitude: f64,
    /// Query longitude in degrees.
    pub longitude: f64,
    /// Local sunrise.
    pub sunrise: NaiveDateTime,
    /// Local sunset.
    pub sunset: NaiveDateTime,
    /// True when the values are a deterministic estimate rather than a
    /// live or cached astronomical answer.
    pub is_estimated: bool,
}

/// Why a compensatory day was earned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompReason {
    /// Worked during Shabbat.
    Shabbat,
    /// Worked on a holiday.
    Holiday,
}

/// A compensatory day earned by working on Shabbat or a holiday.
///
/// Earned at most once per `(employee, date)` regardless of hours, and
/// immutable once used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensatoryDay {
    /// The employee who earned the credit.
    pub employee_id: Uuid,
    /// The worked date that earned the credit.
    pub earned_date: NaiveDate,
    /// Why the credit was earned.
    pub reason: CompReason,
    /// The date the credit was redeemed, if any.
    pub used_date: Option<NaiveDate>,
}

impl CompensatoryDay {
    /// Returns true once the credit has been redeemed.
    pub fn is_used(&self) -> bool {
        self.used_date.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holiday_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&HolidayKind::Shabbat).unwrap(),
            "\"shabbat\""
        );
        assert_eq!(
            serde_json::to_string(&HolidayKind::Regular).unwrap(),
            "\"regular\""
        );
    }

    #[test]
    fn test_comp_reason_serialization() {
        assert_eq!(
            serde_json::to_string(&CompReason::Shabbat).unwrap(),
            "\"shabbat\""
        );
        assert_eq!(
            serde_json::to_string(&CompReason::Holiday).unwrap(),
            "\"holiday\""
        );
    }

    #[test]
    fn test_compensatory_day_usage() {
        let mut day = CompensatoryDay {
            employee_id: Uuid::new_v4(),
            earned_date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            reason: CompReason::Shabbat,
            used_date: None,
        };
        assert!(!day.is_used());
        day.used_date = NaiveDate::from_ymd_opt(2025, 4, 1);
        assert!(day.is_used());
    }

    #[test]
    fn test_holiday_round_trip() {
        let holiday = Holiday {
            date: NaiveDate::from_ymd_opt(2025, 4, 13).unwrap(),
            name: "Passover".to_string(),
            kind: HolidayKind::Regular,
            start_time: None,
            end_time: None,
        };
        let json = serde_json::to_string(&holiday).unwrap();
        let back: Holiday = serde_json::from_str(&json).unwrap();
        assert_eq!(holiday, back);
    }
}
