//! Shift splitting.
//!
//! Converts one closed work log into a sequence of payroll segments:
//! first split at local-midnight boundaries so each piece carries a
//! single date, then at premium-window boundaries (Shabbat start and
//! end, holiday windows), and finally at the daily overtime thresholds
//! against the running daily total.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use rust_decimal::Decimal;

use crate::config::PayrollConfig;
use crate::models::{PayrollSegment, RateClass, WorkLog};

use super::context::{MonthContext, PremiumKind};
use super::tiers::OvertimeBands;

/// Running per-date worked-minute totals across the shifts of a month.
///
/// Overtime thresholds apply per workday, so a second shift on the same
/// date continues in the band where the first one stopped.
#[derive(Debug, Default)]
pub struct DayTally {
    minutes: HashMap<NaiveDate, i64>,
}

impl DayTally {
    /// An empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Minutes already worked on a date.
    pub fn minutes_on(&self, date: NaiveDate) -> i64 {
        self.minutes.get(&date).copied().unwrap_or(0)
    }

    /// Worked hours on a date, as a Decimal.
    pub fn hours_on(&self, date: NaiveDate) -> Decimal {
        Decimal::new(self.minutes_on(date), 0) / Decimal::new(60, 0)
    }

    /// All dates with worked time.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.minutes.keys().copied().collect();
        dates.sort();
        dates
    }

    fn add(&mut self, date: NaiveDate, minutes: i64) {
        *self.minutes.entry(date).or_insert(0) += minutes;
    }
}

/// Splits one closed work log into ordered, classified segments.
///
/// Open work logs produce no segments. Segments are emitted in ascending
/// time order with ties broken by classification enum order. When
/// `collapse_tiers` is set (legacy strategy), every overtime band maps
/// to tier 1.
pub fn split_shift(
    worklog: &WorkLog,
    hourly_rate: Decimal,
    ctx: &MonthContext,
    payroll: &PayrollConfig,
    collapse_tiers: bool,
    tally: &mut DayTally,
) -> Vec<PayrollSegment> {
    let Some(check_out) = worklog.check_out else {
        return Vec::new();
    };

    let bands = OvertimeBands::from_config(payroll);
    let mut segments = Vec::new();

    for (piece_start, piece_end) in day_pieces(worklog.check_in, check_out) {
        let date = piece_start.date();

        // Window boundaries further split the day piece.
        let mut cuts = vec![piece_start];
        cuts.extend(ctx.window_boundaries_within(piece_start, piece_end));
        cuts.push(piece_end);

        for pair in cuts.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let length_minutes = (end - start).num_minutes();
            if length_minutes == 0 {
                continue;
            }

            let window = ctx.premium_window_at(start).map(|w| w.kind);
            let mut cursor = start;
            for span in bands.split(tally.minutes_on(date), length_minutes) {
                let band = if collapse_tiers && span.band > 1 {
                    1
                } else {
                    span.band
                };
                let classification = classify(window, band, date.weekday());
                let segment_end = cursor + Duration::minutes(span.minutes);
                segments.push(PayrollSegment {
                    employee_id: worklog.employee_id,
                    date,
                    classification,
                    start: cursor,
                    end: segment_end,
                    hours: Decimal::new(span.minutes, 0) / Decimal::new(60, 0),
                    hourly_rate,
                    multiplier: classification.multiplier(payroll),
                });
                cursor = segment_end;
                tally.add(date, span.minutes);
            }
        }
    }

    segments.sort_by(|a, b| a.start.cmp(&b.start).then(a.classification.cmp(&b.classification)));
    segments
}

/// Splits `[start, end)` at local-midnight boundaries.
fn day_pieces(start: NaiveDateTime, end: NaiveDateTime) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let mut pieces = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let next_midnight = (cursor.date() + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .expect("midnight exists");
        let piece_end = end.min(next_midnight);
        pieces.push((cursor, piece_end));
        cursor = piece_end;
    }
    pieces
}

fn classify(window: Option<PremiumKind>, band: usize, weekday: Weekday) -> RateClass {
    match window {
        None => match band {
            0 => RateClass::Regular,
            1 => RateClass::OvertimeT1,
            2 => RateClass::OvertimeT2,
            3 => RateClass::OvertimeT3,
            _ => RateClass::OvertimeT4,
        },
        Some(PremiumKind::Sabbath) => match band {
            0 if weekday == Weekday::Fri => RateClass::FridayEvening,
            0 => RateClass::SabbathBase,
            1 => RateClass::SabbathOt1,
            _ => RateClass::SabbathOt2,
        },
        Some(PremiumKind::Holiday) => match band {
            0 => RateClass::HolidayBase,
            1 => RateClass::HolidayOt1,
            _ => RateClass::HolidayOt2,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::context::PremiumWindow;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn dt(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn march_context() -> MonthContext {
        let windows = [7, 14, 21, 28]
            .into_iter()
            .map(|friday| PremiumWindow {
                kind: PremiumKind::Sabbath,
                start: dt(friday, 19, 0),
                end: dt(friday + 1, 19, 58),
            })
            .collect();
        MonthContext::from_parts(2025, 3, BTreeMap::new(), windows)
    }

    fn closed_shift(check_in: NaiveDateTime, check_out: NaiveDateTime) -> WorkLog {
        WorkLog {
            check_out: Some(check_out),
            ..WorkLog::open(Uuid::new_v4(), check_in, None)
        }
    }

    fn rate() -> Decimal {
        Decimal::new(40, 0)
    }

    fn split(worklog: &WorkLog, ctx: &MonthContext, tally: &mut DayTally) -> Vec<PayrollSegment> {
        split_shift(
            worklog,
            rate(),
            ctx,
            &PayrollConfig::default(),
            false,
            tally,
        )
    }

    /// SS-001: plain weekday shift is one regular segment
    #[test]
    fn test_plain_weekday_shift() {
        let ctx = march_context();
        let shift = closed_shift(dt(10, 9, 0), dt(10, 17, 0));
        let segments = split(&shift, &ctx, &mut DayTally::new());

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].classification, RateClass::Regular);
        assert_eq!(segments[0].hours, Decimal::new(8, 0));
    }

    /// SS-002: exactly 8.6 hours produces zero overtime segments
    #[test]
    fn test_exact_threshold_no_overtime() {
        let ctx = march_context();
        let shift = closed_shift(dt(10, 6, 0), dt(10, 14, 36));
        let segments = split(&shift, &ctx, &mut DayTally::new());

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].classification, RateClass::Regular);
        assert_eq!(segments[0].hours, Decimal::new(86, 1));
    }

    /// SS-003: 13.2 hour weekday shift crosses three overtime tiers
    #[test]
    fn test_long_weekday_shift_tiers() {
        let ctx = march_context();
        let shift = closed_shift(dt(10, 6, 0), dt(10, 19, 12));
        let segments = split(&shift, &ctx, &mut DayTally::new());

        let expected: Vec<(RateClass, Decimal)> = vec![
            (RateClass::Regular, Decimal::new(86, 1)),
            (RateClass::OvertimeT1, Decimal::new(2, 0)),
            (RateClass::OvertimeT2, Decimal::new(2, 0)),
            (RateClass::OvertimeT3, Decimal::new(6, 1)),
        ];
        let actual: Vec<(RateClass, Decimal)> = segments
            .iter()
            .map(|s| (s.classification, s.hours))
            .collect();
        assert_eq!(actual, expected);
    }

    /// SS-004: Friday evening shift splits at Shabbat start and midnight
    #[test]
    fn test_friday_evening_into_shabbat() {
        let ctx = march_context();
        let shift = closed_shift(dt(14, 18, 0), dt(15, 2, 0));
        let segments = split(&shift, &ctx, &mut DayTally::new());

        let actual: Vec<(RateClass, Decimal)> = segments
            .iter()
            .map(|s| (s.classification, s.hours))
            .collect();
        assert_eq!(
            actual,
            vec![
                (RateClass::Regular, Decimal::new(1, 0)),
                (RateClass::FridayEvening, Decimal::new(5, 0)),
                (RateClass::SabbathBase, Decimal::new(2, 0)),
            ]
        );
        // The post-midnight piece carries the Saturday date.
        assert_eq!(
            segments[2].date,
            NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
        );
    }

    /// SS-005: late Friday shift is friday_evening before midnight and
    /// sabbath_base after
    #[test]
    fn test_late_friday_shift() {
        let ctx = march_context();
        let shift = closed_shift(dt(14, 22, 0), dt(15, 2, 0));
        let segments = split(&shift, &ctx, &mut DayTally::new());

        let actual: Vec<RateClass> = segments.iter().map(|s| s.classification).collect();
        assert_eq!(
            actual,
            vec![RateClass::FridayEvening, RateClass::SabbathBase]
        );
    }

    /// SS-006: long Shabbat shift layers overtime above the premium
    #[test]
    fn test_sabbath_overtime_layering() {
        let ctx = march_context();
        // Saturday 06:00 to 17:00: 11 hours inside the Shabbat window.
        let shift = closed_shift(dt(15, 6, 0), dt(15, 17, 0));
        let segments = split(&shift, &ctx, &mut DayTally::new());

        let actual: Vec<(RateClass, Decimal)> = segments
            .iter()
            .map(|s| (s.classification, s.hours))
            .collect();
        assert_eq!(
            actual,
            vec![
                (RateClass::SabbathBase, Decimal::new(86, 1)),
                (RateClass::SabbathOt1, Decimal::new(2, 0)),
                (RateClass::SabbathOt2, Decimal::new(4, 1)),
            ]
        );
    }

    #[test]
    fn test_second_shift_continues_daily_tally() {
        let ctx = march_context();
        let mut tally = DayTally::new();

        let morning = closed_shift(dt(10, 6, 0), dt(10, 12, 0));
        split(&morning, &ctx, &mut tally);

        // The afternoon shift starts with 6 hours already on the day.
        let afternoon = closed_shift(dt(10, 13, 0), dt(10, 17, 0));
        let segments = split(&afternoon, &ctx, &mut tally);

        let actual: Vec<(RateClass, Decimal)> = segments
            .iter()
            .map(|s| (s.classification, s.hours))
            .collect();
        assert_eq!(
            actual,
            vec![
                (RateClass::Regular, Decimal::new(26, 1)),
                (RateClass::OvertimeT1, Decimal::new(14, 1)),
            ]
        );
    }

    #[test]
    fn test_open_shift_produces_no_segments() {
        let ctx = march_context();
        let open = WorkLog::open(Uuid::new_v4(), dt(10, 9, 0), None);
        assert!(split(&open, &ctx, &mut DayTally::new()).is_empty());
    }

    #[test]
    fn test_holiday_window_classification() {
        let mut ctx = march_context();
        ctx.windows.push(PremiumWindow {
            kind: PremiumKind::Holiday,
            start: dt(12, 0, 0),
            end: dt(13, 0, 0),
        });
        ctx.windows.sort_by_key(|w| w.start);

        let shift = closed_shift(dt(12, 9, 0), dt(12, 19, 0));
        let segments = split(&shift, &ctx, &mut DayTally::new());

        let actual: Vec<(RateClass, Decimal)> = segments
            .iter()
            .map(|s| (s.classification, s.hours))
            .collect();
        assert_eq!(
            actual,
            vec![
                (RateClass::HolidayBase, Decimal::new(86, 1)),
                (RateClass::HolidayOt1, Decimal::new(14, 1)),
            ]
        );
    }

    #[test]
    fn test_legacy_collapse_maps_all_overtime_to_tier_one() {
        let ctx = march_context();
        let shift = closed_shift(dt(10, 6, 0), dt(10, 19, 12));
        let segments = split_shift(
            &shift,
            rate(),
            &ctx,
            &PayrollConfig::default(),
            true,
            &mut DayTally::new(),
        );

        let classes: Vec<RateClass> = segments.iter().map(|s| s.classification).collect();
        assert_eq!(
            classes,
            vec![
                RateClass::Regular,
                RateClass::OvertimeT1,
                RateClass::OvertimeT1,
                RateClass::OvertimeT1,
            ]
        );
    }

    #[test]
    fn test_segments_are_time_ordered_and_contiguous() {
        let ctx = march_context();
        let shift = closed_shift(dt(14, 18, 0), dt(15, 2, 0));
        let segments = split(&shift, &ctx, &mut DayTally::new());

        for pair in segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    proptest! {
        /// Splitting conserves the shift's total hours.
        #[test]
        fn prop_split_conserves_hours(
            start_hour in 0u32..23,
            length_minutes in 1i64..1200,
        ) {
            let ctx = march_context();
            let check_in = dt(10, start_hour, 0);
            let check_out = check_in + Duration::minutes(length_minutes);
            let shift = closed_shift(check_in, check_out);

            let segments = split(&shift, &ctx, &mut DayTally::new());
            let total: Decimal = segments.iter().map(|s| s.hours).sum();
            prop_assert_eq!(total, Decimal::new(length_minutes, 0) / Decimal::new(60, 0));
        }
    }
}
