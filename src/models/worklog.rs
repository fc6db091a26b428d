//! Work log (shift) model.
//!
//! A work log is the record of record for worked time: created open by a
//! check-in, closed by a check-out, and hidden by soft delete rather than
//! removed. Aggregates are derived and replaceable; work logs are not.

use chrono::{NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Maximum shift span in hours without an explicit acknowledgement.
pub const MAX_UNACKNOWLEDGED_HOURS: i64 = 26;

/// A geographic point recorded at check-in or check-out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// A shift record owned by an employee.
///
/// Lifecycle: created open (`check_out` unset) by check-in, closed by
/// check-out, optionally soft-deleted afterwards. Soft-deleted rows are
/// preserved but excluded from every default query.
///
/// # Example
///
/// ```
/// use worktime_engine::models::WorkLog;
/// use chrono::NaiveDate;
/// use uuid::Uuid;
///
/// let check_in = NaiveDate::from_ymd_opt(2025, 3, 10)
///     .unwrap()
///     .and_hms_opt(9, 0, 0)
///     .unwrap();
/// let log = WorkLog::open(Uuid::new_v4(), check_in, None);
/// assert!(log.is_open());
/// assert!(!log.is_deleted);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkLog {
    /// Unique identifier for the work log.
    pub id: Uuid,
    /// The employee the shift belongs to.
    pub employee_id: Uuid,
    /// Shift start.
    pub check_in: NaiveDateTime,
    /// Shift end; unset while the shift is open.
    pub check_out: Option<NaiveDateTime>,
    /// Location recorded at check-in.
    pub location_in: Option<GeoPoint>,
    /// Location recorded at check-out.
    pub location_out: Option<GeoPoint>,
    /// Whether an admin has approved the shift.
    pub approved: bool,
    /// Soft-delete flag; deleted rows are hidden from default queries.
    pub is_deleted: bool,
    /// When the row was soft-deleted.
    pub deleted_at: Option<NaiveDateTime>,
    /// Who soft-deleted the row.
    pub deleted_by: Option<Uuid>,
    /// Required for shifts longer than [`MAX_UNACKNOWLEDGED_HOURS`].
    pub long_shift_acknowledged: bool,
}

impl WorkLog {
    /// Creates a new open shift starting at `check_in`.
    pub fn open(employee_id: Uuid, check_in: NaiveDateTime, location: Option<GeoPoint>) -> Self {
        Self {
            id: Uuid::new_v4(),
            employee_id,
            check_in,
            check_out: None,
            location_in: location,
            location_out: None,
            approved: false,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            long_shift_acknowledged: false,
        }
    }

    /// Returns true while the shift has no check-out.
    pub fn is_open(&self) -> bool {
        self.check_out.is_none()
    }

    /// Worked hours for a closed shift, as a Decimal; `None` while open.
    pub fn duration_hours(&self) -> Option<Decimal> {
        self.check_out.map(|out| {
            let minutes = (out - self.check_in).num_minutes();
            Decimal::new(minutes, 0) / Decimal::new(60, 0)
        })
    }

    /// Returns true if the shift crosses a local-midnight boundary.
    pub fn spans_midnight(&self) -> bool {
        match self.check_out {
            Some(out) => {
                out.date() > self.check_in.date()
                    && !(out.date() == self.check_in.date().succ_opt().unwrap_or(out.date())
                        && out.hour() == 0
                        && out.minute() == 0
                        && out.second() == 0)
            }
            None => false,
        }
    }

    /// Validates the temporal invariants of a closed shift.
    ///
    /// `check_out` must be after `check_in`, and a span beyond
    /// [`MAX_UNACKNOWLEDGED_HOURS`] requires `long_shift_acknowledged`.
    pub fn validate(&self) -> EngineResult<()> {
        if let Some(out) = self.check_out {
            if out <= self.check_in {
                return Err(EngineError::Validation {
                    field: "check_out".to_string(),
                    message: "must be after check_in".to_string(),
                });
            }
            let hours = (out - self.check_in).num_hours();
            if hours > MAX_UNACKNOWLEDGED_HOURS && !self.long_shift_acknowledged {
                return Err(EngineError::Validation {
                    field: "check_out".to_string(),
                    message: format!(
                        "shift spans {hours}h, beyond {MAX_UNACKNOWLEDGED_HOURS}h; requires long_shift_acknowledged"
                    ),
                });
            }
        }
        Ok(())
    }

    /// Returns true if this row's interval overlaps `[start, end)`.
    ///
    /// An open shift is treated as extending to +∞.
    pub fn overlaps(&self, start: NaiveDateTime, end: Option<NaiveDateTime>) -> bool {
        intervals_overlap(self.check_in, self.check_out, start, end)
    }
}

/// Half-open interval overlap with open ends treated as +∞.
///
/// For a candidate `[a, b)` and an existing `[c, d)`, a conflict exists iff
/// `c < b` and (`d` unset or `d > a`).
pub fn intervals_overlap(
    a_start: NaiveDateTime,
    a_end: Option<NaiveDateTime>,
    b_start: NaiveDateTime,
    b_end: Option<NaiveDateTime>,
) -> bool {
    let a_before_b_end = match b_end {
        Some(end) => a_start < end,
        None => true,
    };
    let b_before_a_end = match a_end {
        Some(end) => b_start < end,
        None => true,
    };
    a_before_b_end && b_before_a_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn dt(date: (i32, u32, u32), h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn closed(check_in: NaiveDateTime, check_out: NaiveDateTime) -> WorkLog {
        let mut log = WorkLog::open(Uuid::new_v4(), check_in, None);
        log.check_out = Some(check_out);
        log
    }

    /// WL-001: 8 hour closed shift
    #[test]
    fn test_duration_of_closed_shift() {
        let log = closed(dt((2025, 3, 10), 9, 0), dt((2025, 3, 10), 17, 0));
        assert_eq!(log.duration_hours(), Some(Decimal::new(80, 1)));
    }

    /// WL-002: open shift has no duration
    #[test]
    fn test_open_shift_has_no_duration() {
        let log = WorkLog::open(Uuid::new_v4(), dt((2025, 3, 10), 9, 0), None);
        assert!(log.is_open());
        assert_eq!(log.duration_hours(), None);
    }

    /// WL-003: overnight shift spans midnight
    #[test]
    fn test_overnight_shift_spans_midnight() {
        let log = closed(dt((2025, 3, 14), 22, 0), dt((2025, 3, 15), 2, 0));
        assert!(log.spans_midnight());
    }

    #[test]
    fn test_shift_ending_exactly_at_midnight_does_not_span() {
        let log = closed(dt((2025, 3, 10), 18, 0), dt((2025, 3, 11), 0, 0));
        assert!(!log.spans_midnight());
    }

    #[test]
    fn test_validate_rejects_checkout_before_checkin() {
        let log = closed(dt((2025, 3, 10), 17, 0), dt((2025, 3, 10), 9, 0));
        assert!(log.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_checkout_equal_to_checkin() {
        let log = closed(dt((2025, 3, 10), 9, 0), dt((2025, 3, 10), 9, 0));
        assert!(log.validate().is_err());
    }

    #[test]
    fn test_long_shift_requires_acknowledgement() {
        let mut log = closed(dt((2025, 3, 10), 6, 0), dt((2025, 3, 11), 10, 0));
        let err = log.validate().unwrap_err();
        assert!(err.to_string().contains("long_shift_acknowledged"));

        log.long_shift_acknowledged = true;
        assert!(log.validate().is_ok());
    }

    #[test]
    fn test_26_hour_shift_needs_no_acknowledgement() {
        let log = closed(dt((2025, 3, 10), 6, 0), dt((2025, 3, 11), 8, 0));
        assert!(log.validate().is_ok());
    }

    #[test]
    fn test_overlap_with_closed_interval() {
        let log = closed(dt((2025, 3, 10), 8, 0), dt((2025, 3, 10), 16, 0));
        assert!(log.overlaps(dt((2025, 3, 10), 12, 0), Some(dt((2025, 3, 10), 18, 0))));
        assert!(!log.overlaps(dt((2025, 3, 10), 16, 0), Some(dt((2025, 3, 10), 18, 0))));
    }

    #[test]
    fn test_open_shift_overlaps_everything_after_start() {
        let log = WorkLog::open(Uuid::new_v4(), dt((2025, 3, 10), 8, 0), None);
        assert!(log.overlaps(dt((2025, 3, 12), 9, 0), Some(dt((2025, 3, 12), 17, 0))));
        assert!(!log.overlaps(dt((2025, 3, 9), 9, 0), Some(dt((2025, 3, 10), 8, 0))));
    }

    #[test]
    fn test_adjacent_intervals_do_not_overlap() {
        // Half-open semantics: [8,16) and [16,20) share only the boundary.
        assert!(!intervals_overlap(
            dt((2025, 3, 10), 8, 0),
            Some(dt((2025, 3, 10), 16, 0)),
            dt((2025, 3, 10), 16, 0),
            Some(dt((2025, 3, 10), 20, 0)),
        ));
    }

    #[test]
    fn test_serialization_round_trip() {
        let log = closed(dt((2025, 3, 10), 9, 0), dt((2025, 3, 10), 17, 0));
        let json = serde_json::to_string(&log).unwrap();
        let back: WorkLog = serde_json::from_str(&json).unwrap();
        assert_eq!(log, back);
    }

    proptest! {
        /// Overlap detection is symmetric for arbitrary interval pairs.
        #[test]
        fn prop_overlap_is_symmetric(
            a_start in 0i64..10_000,
            a_len in proptest::option::of(1i64..5_000),
            b_start in 0i64..10_000,
            b_len in proptest::option::of(1i64..5_000),
        ) {
            let base = dt((2025, 1, 1), 0, 0);
            let a0 = base + chrono::Duration::minutes(a_start);
            let a1 = a_len.map(|l| a0 + chrono::Duration::minutes(l));
            let b0 = base + chrono::Duration::minutes(b_start);
            let b1 = b_len.map(|l| b0 + chrono::Duration::minutes(l));
            prop_assert_eq!(
                intervals_overlap(a0, a1, b0, b1),
                intervals_overlap(b0, b1, a0, a1)
            );
        }

        /// An interval always overlaps itself.
        #[test]
        fn prop_interval_overlaps_itself(
            start in 0i64..10_000,
            len in 1i64..5_000,
        ) {
            let s = dt((2025, 1, 1), 0, 0) + chrono::Duration::minutes(start);
            let e = Some(s + chrono::Duration::minutes(len));
            prop_assert!(intervals_overlap(s, e, s, e));
        }
    }
}
