//! Payroll segment model.
//!
//! A segment is the transient unit of classified work produced by the
//! shift splitter: one contiguous span of a single date paying a single
//! rate class.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PayrollConfig;

/// Rate classification of a payroll segment.
///
/// Enum order is the tie-break order for segments that start at the same
/// instant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RateClass {
    /// Base-rate hours on a regular workday.
    Regular,
    /// Daily overtime tier 1.
    OvertimeT1,
    /// Daily overtime tier 2.
    OvertimeT2,
    /// Daily overtime tier 3.
    OvertimeT3,
    /// Daily overtime tier 4.
    OvertimeT4,
    /// Base-rate hours inside the Shabbat window on Shabbat day.
    SabbathBase,
    /// Shabbat hours in overtime tier 1.
    SabbathOt1,
    /// Shabbat hours in overtime tier 2 or beyond.
    SabbathOt2,
    /// Base-rate hours inside a holiday window.
    HolidayBase,
    /// Holiday hours in overtime tier 1.
    HolidayOt1,
    /// Holiday hours in overtime tier 2 or beyond.
    HolidayOt2,
    /// Friday-evening hours past the computed Shabbat start.
    FridayEvening,
}

impl RateClass {
    /// Pay multiplier for this class under the given configuration.
    ///
    /// Shabbat and holiday overtime layers additively above the premium
    /// base: tier 1 adds 0.25 and tier 2 adds 0.50 over the premium
    /// multiplier.
    pub fn multiplier(self, payroll: &PayrollConfig) -> Decimal {
        let one = Decimal::ONE;
        match self {
            RateClass::Regular => one,
            RateClass::OvertimeT1 => payroll.multiplier_t1,
            RateClass::OvertimeT2 => payroll.multiplier_t2,
            RateClass::OvertimeT3 => payroll.multiplier_t3,
            RateClass::OvertimeT4 => payroll.multiplier_t4,
            RateClass::SabbathBase | RateClass::FridayEvening | RateClass::HolidayBase => {
                payroll.sabbath_multiplier
            }
            RateClass::SabbathOt1 | RateClass::HolidayOt1 => {
                payroll.sabbath_multiplier + (payroll.multiplier_t1 - one)
            }
            RateClass::SabbathOt2 | RateClass::HolidayOt2 => {
                payroll.sabbath_multiplier + (payroll.multiplier_t2 - one)
            }
        }
    }

    /// Returns true for any overtime tier, premium or regular.
    pub fn is_overtime(self) -> bool {
        matches!(
            self,
            RateClass::OvertimeT1
                | RateClass::OvertimeT2
                | RateClass::OvertimeT3
                | RateClass::OvertimeT4
                | RateClass::SabbathOt1
                | RateClass::SabbathOt2
                | RateClass::HolidayOt1
                | RateClass::HolidayOt2
        )
    }

    /// Returns true for classes paid inside the Shabbat window.
    pub fn is_sabbath(self) -> bool {
        matches!(
            self,
            RateClass::SabbathBase
                | RateClass::SabbathOt1
                | RateClass::SabbathOt2
                | RateClass::FridayEvening
        )
    }

    /// Returns true for classes paid inside a holiday window.
    pub fn is_holiday(self) -> bool {
        matches!(
            self,
            RateClass::HolidayBase | RateClass::HolidayOt1 | RateClass::HolidayOt2
        )
    }
}

/// One contiguous classified span of worked time.
///
/// Produced by the shift splitter and consumed by the payroll strategy;
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollSegment {
    /// The employee the segment belongs to.
    pub employee_id: Uuid,
    /// The calendar date the segment falls on.
    pub date: NaiveDate,
    /// Rate classification.
    pub classification: RateClass,
    /// Segment start.
    pub start: NaiveDateTime,
    /// Segment end.
    pub end: NaiveDateTime,
    /// Worked hours in this segment.
    pub hours: Decimal,
    /// The hourly rate the segment is paid against.
    pub hourly_rate: Decimal,
    /// The multiplier applied to the rate.
    pub multiplier: Decimal,
}

impl PayrollSegment {
    /// Unrounded amount for this segment (`hours × rate × multiplier`).
    pub fn amount(&self) -> Decimal {
        self.hours * self.hourly_rate * self.multiplier
    }
}
