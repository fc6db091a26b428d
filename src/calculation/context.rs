//! Prefetched month context for pure payroll computation.
//!
//! The context gathers everything a strategy invocation needs from the
//! catalog up front (holiday windows, Shabbat windows, business-day
//! counts), so per-employee work is CPU-only and safe to parallelize.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};

use crate::catalog::{HolidayInfo, TimeCatalog};
use crate::error::EngineResult;
use crate::models::HolidayKind;

/// The kind of premium window an instant falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PremiumKind {
    /// Inside the Shabbat window.
    Sabbath,
    /// Inside a holiday window.
    Holiday,
}

/// A concrete premium window with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PremiumWindow {
    /// Whether this is a Shabbat or holiday window.
    pub kind: PremiumKind,
    /// Window start (inclusive).
    pub start: NaiveDateTime,
    /// Window end (exclusive).
    pub end: NaiveDateTime,
}

/// Everything a strategy needs to classify one month of shifts.
#[derive(Debug, Clone)]
pub struct MonthContext {
    /// Calculation year.
    pub year: i32,
    /// Calculation month (1–12).
    pub month: u32,
    /// Holiday metadata per date in the month.
    pub holidays: BTreeMap<NaiveDate, HolidayInfo>,
    /// Premium windows overlapping the month, Shabbat and holiday alike.
    pub windows: Vec<PremiumWindow>,
    /// Business days (Sunday–Thursday, non-holiday) in the month.
    pub business_days_in_month: u32,
    /// True when any window was computed from estimated sun times.
    pub degraded: bool,
}

impl MonthContext {
    /// First day of the month.
    pub fn month_start(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 1).expect("month start always exists")
    }

    /// Last day of the month.
    pub fn month_end(year: i32, month: u32) -> NaiveDate {
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        Self::month_start(next_year, next_month) - Duration::days(1)
    }

    /// Builds the context for one month from the catalog.
    ///
    /// Shabbat windows are collected for every weekend whose window can
    /// intersect the month, including the weekend straddling the month
    /// start.
    pub fn build(catalog: &TimeCatalog, year: i32, month: u32) -> EngineResult<Self> {
        let start = Self::month_start(year, month);
        let end = Self::month_end(year, month);

        let holidays = catalog.holidays_in_range(start, end)?;

        let mut windows = Vec::new();
        let mut degraded = false;

        // Holiday windows; derived Shabbat rows are covered by the
        // computed weekend windows below.
        for (date, info) in &holidays {
            if info.kind == HolidayKind::Shabbat {
                continue;
            }
            let window_start = info
                .start
                .unwrap_or_else(|| date.and_hms_opt(0, 0, 0).expect("midnight exists"));
            let window_end = info.end.unwrap_or_else(|| {
                (*date + Duration::days(1))
                    .and_hms_opt(0, 0, 0)
                    .expect("midnight exists")
            });
            windows.push(PremiumWindow {
                kind: PremiumKind::Holiday,
                start: window_start,
                end: window_end,
            });
        }

        // Weekend windows: from the Friday before the month starts
        // through the last Friday inside the month.
        let mut friday = start - Duration::days(7);
        while friday.weekday() != Weekday::Fri {
            friday = friday.succ_opt().expect("dates continue");
        }
        while friday <= end {
            let (window, estimated) = catalog.shabbat_window(friday)?;
            degraded |= estimated;
            if window.end > start.and_hms_opt(0, 0, 0).expect("midnight exists") {
                windows.push(PremiumWindow {
                    kind: PremiumKind::Sabbath,
                    start: window.start,
                    end: window.end,
                });
            }
            friday += Duration::days(7);
        }
        windows.sort_by_key(|w| w.start);

        let business_days_in_month = Self::count_business_days(start, end, &holidays);

        Ok(Self {
            year,
            month,
            holidays,
            windows,
            business_days_in_month,
            degraded,
        })
    }

    /// Builds a context directly from parts, for tests and fixtures.
    pub fn from_parts(
        year: i32,
        month: u32,
        holidays: BTreeMap<NaiveDate, HolidayInfo>,
        windows: Vec<PremiumWindow>,
    ) -> Self {
        let start = Self::month_start(year, month);
        let end = Self::month_end(year, month);
        let business_days_in_month = Self::count_business_days(start, end, &holidays);
        Self {
            year,
            month,
            holidays,
            windows,
            business_days_in_month,
            degraded: false,
        }
    }

    fn count_business_days(
        start: NaiveDate,
        end: NaiveDate,
        holidays: &BTreeMap<NaiveDate, HolidayInfo>,
    ) -> u32 {
        let mut count = 0;
        let mut date = start;
        while date <= end {
            if Self::is_business_weekday(date)
                && !holidays
                    .get(&date)
                    .is_some_and(|h| h.kind != HolidayKind::Shabbat)
            {
                count += 1;
            }
            date = date.succ_opt().expect("dates continue");
        }
        count
    }

    /// The Israeli business week runs Sunday through Thursday.
    pub fn is_business_weekday(date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Fri | Weekday::Sat)
    }

    /// Returns true if the date is a business day in this month's
    /// calendar (business weekday and not a holiday).
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        Self::is_business_weekday(date)
            && !self
                .holidays
                .get(&date)
                .is_some_and(|h| h.kind != HolidayKind::Shabbat)
    }

    /// The premium window containing an instant, if any.
    ///
    /// When a holiday window and the Shabbat window both contain the
    /// instant, the later-starting window wins.
    pub fn premium_window_at(&self, at: NaiveDateTime) -> Option<PremiumWindow> {
        self.windows
            .iter()
            .filter(|w| at >= w.start && at < w.end)
            .max_by_key(|w| w.start)
            .copied()
    }

    /// Every boundary (window start or end) strictly inside `[start, end)`.
    pub fn window_boundaries_within(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Vec<NaiveDateTime> {
        let mut boundaries: Vec<NaiveDateTime> = self
            .windows
            .iter()
            .flat_map(|w| [w.start, w.end])
            .filter(|b| *b > start && *b < end)
            .collect();
        boundaries.sort();
        boundaries.dedup();
        boundaries
    }
}
