//! Payroll strategy.
//!
//! Computes a [`PayrollResult`] for one employee and month from closed
//! work logs, the active salary, and the prefetched month context. The
//! computation is pure: given the same inputs it produces byte-equal
//! amounts, which is what makes bulk parallelism safe.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    round_money, CalculationType, CompReason, ComplianceWarning, DailyPayrollCalculation,
    DayBreakdown, Employee, HolidayKind, PayrollResult, PayrollSegment, RateBand, RateClass,
    RateLine, Salary, StrategyKind, WarningKind, WorkLog,
};

use super::context::MonthContext;
use super::splitter::{split_shift, DayTally};

/// Options for a strategy invocation.
#[derive(Debug, Clone, Copy)]
pub struct CalcOptions {
    /// Skip the per-day breakdown in the result.
    pub fast_mode: bool,
    /// Which strategy computes the result.
    pub strategy: StrategyKind,
}

impl Default for CalcOptions {
    fn default() -> Self {
        Self {
            fast_mode: false,
            strategy: StrategyKind::Enhanced,
        }
    }
}

/// How amounts are derived from classified segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayBasis {
    /// Every segment pays `hours × rate × multiplier`.
    Hourly,
    /// The prorated base is paid separately; segments contribute only
    /// the premium portion `hours × rate × (multiplier − 1)`.
    MonthlyPremium,
    /// Flat amount; segments contribute nothing.
    Flat,
}

/// Per-employee-month payroll computation.
pub struct PayrollStrategy<'a> {
    config: &'a EngineConfig,
    ctx: &'a MonthContext,
}

struct DayAgg {
    hours: Decimal,
    lines: BTreeMap<RateClass, (Decimal, Decimal)>,
    acknowledged: bool,
}

impl<'a> PayrollStrategy<'a> {
    /// Creates a strategy bound to a configuration and month context.
    pub fn new(config: &'a EngineConfig, ctx: &'a MonthContext) -> Self {
        Self { config, ctx }
    }

    /// Computes the month's result.
    ///
    /// An employee without work logs gets a zeroed result, not an error.
    /// Salary misconfiguration is fatal for the employee.
    pub fn calculate(
        &self,
        employee: &Employee,
        salary: &Salary,
        worklogs: &[WorkLog],
        options: &CalcOptions,
    ) -> EngineResult<PayrollResult> {
        self.calculate_with_rows(employee, salary, worklogs, options)
            .map(|(result, _)| result)
    }

    /// Computes the month's result together with the persisted daily
    /// rows, one per `(work_date, worklog)`.
    pub fn calculate_with_rows(
        &self,
        employee: &Employee,
        salary: &Salary,
        worklogs: &[WorkLog],
        options: &CalcOptions,
    ) -> EngineResult<(PayrollResult, Vec<DailyPayrollCalculation>)> {
        let mut warnings: Vec<ComplianceWarning> = Vec::new();
        for advisory in salary.validate()? {
            warnings.push(ComplianceWarning {
                kind: WarningKind::SalaryOutOfRange,
                message: advisory.message,
                date: None,
            });
        }

        let basis = self.pay_basis(salary);
        let rate = salary
            .effective_hourly_rate(self.config.payroll.standard_monthly_hours)
            .ok_or(EngineError::InvalidSalary {
                employee_id: employee.id,
                message: "no usable rate".to_string(),
            })?;

        let mut closed: Vec<&WorkLog> = worklogs
            .iter()
            .filter(|w| !w.is_deleted && !w.is_open())
            .collect();
        closed.sort_by_key(|w| w.check_in);

        if closed.is_empty() {
            let mut result = PayrollResult::zeroed(
                employee.id,
                self.ctx.year,
                self.ctx.month,
                salary.calculation_type,
                options.strategy,
            );
            result.business_days_in_month = self.ctx.business_days_in_month;
            result.hourly_rate_used = rate;
            result.warnings = warnings;
            result.degraded = self.ctx.degraded;
            return Ok((result, Vec::new()));
        }

        let collapse_tiers = options.strategy == StrategyKind::Legacy;
        let mut tally = DayTally::new();
        let mut days: BTreeMap<NaiveDate, DayAgg> = BTreeMap::new();
        let mut daily_rows: Vec<DailyPayrollCalculation> = Vec::new();
        let mut bands: BTreeMap<RateClass, (Decimal, Decimal)> = BTreeMap::new();

        for worklog in &closed {
            let segments = split_shift(
                worklog,
                rate,
                self.ctx,
                &self.config.payroll,
                collapse_tiers,
                &mut tally,
            );
            let mut per_date: BTreeMap<NaiveDate, Vec<&PayrollSegment>> = BTreeMap::new();
            for segment in &segments {
                per_date.entry(segment.date).or_default().push(segment);
            }

            for (date, date_segments) in per_date {
                let mut row_hours = Decimal::ZERO;
                let mut row_amount = Decimal::ZERO;
                let mut row_lines: Vec<RateLine> = Vec::new();

                for segment in date_segments {
                    let amount = self.segment_amount(segment, basis);
                    row_hours += segment.hours;
                    row_amount += amount;
                    row_lines.push(RateLine {
                        classification: segment.classification,
                        hours: segment.hours,
                        rate: segment.hourly_rate,
                        multiplier: segment.multiplier,
                        amount: round_money(amount),
                    });

                    let day = days.entry(date).or_insert_with(|| DayAgg {
                        hours: Decimal::ZERO,
                        lines: BTreeMap::new(),
                        acknowledged: false,
                    });
                    day.hours += segment.hours;
                    day.acknowledged |= worklog.long_shift_acknowledged;
                    let line = day
                        .lines
                        .entry(segment.classification)
                        .or_insert((Decimal::ZERO, Decimal::ZERO));
                    line.0 += segment.hours;
                    line.1 += amount;

                    let band = bands
                        .entry(segment.classification)
                        .or_insert((Decimal::ZERO, Decimal::ZERO));
                    band.0 += segment.hours;
                    band.1 += amount;
                }

                daily_rows.push(DailyPayrollCalculation {
                    employee_id: employee.id,
                    work_date: date,
                    worklog_id: worklog.id,
                    total_hours: row_hours,
                    gross_pay: round_money(row_amount),
                    lines: row_lines,
                    compensatory_earned: self.comp_reason_for(date).is_some(),
                });
            }
        }

        // Compliance warnings over the aggregated days and weeks.
        self.record_daily_warnings(&days, &mut warnings);
        self.record_weekly_warnings(&days, &mut warnings);
        if self.ctx.degraded {
            warnings.push(ComplianceWarning {
                kind: WarningKind::DegradedCatalog,
                message: "sun times estimated; catalog source unavailable".to_string(),
                date: None,
            });
        }

        let total_hours: Decimal = days.values().map(|d| d.hours).sum();
        let segment_total: Decimal = bands.values().map(|(_, amount)| *amount).sum();

        let worked_business_days = days
            .keys()
            .filter(|date| self.ctx.is_business_day(**date))
            .count() as u32;

        let (base_pay, total_pay) = match basis {
            PayBasis::Hourly => {
                let regular = bands
                    .get(&RateClass::Regular)
                    .map(|(_, amount)| *amount)
                    .unwrap_or(Decimal::ZERO);
                (round_money(regular), round_money(segment_total))
            }
            PayBasis::MonthlyPremium => {
                let base = salary.base_salary.unwrap_or(Decimal::ZERO)
                    * Decimal::from(worked_business_days)
                    / Decimal::from(self.ctx.business_days_in_month.max(1));
                (round_money(base), round_money(base + segment_total))
            }
            PayBasis::Flat => {
                let base = salary.base_salary.unwrap_or(Decimal::ZERO);
                (round_money(base), round_money(base))
            }
        };

        let comp_dates: Vec<(NaiveDate, CompReason)> = days
            .keys()
            .filter_map(|date| self.comp_reason_for(*date).map(|r| (*date, r)))
            .collect();
        let compensatory_earned = comp_dates.len() as u32;

        let day_breakdowns = if options.fast_mode {
            Vec::new()
        } else {
            days.iter()
                .map(|(date, agg)| DayBreakdown {
                    date: *date,
                    hours: agg.hours,
                    gross: round_money(agg.lines.values().map(|(_, amount)| *amount).sum()),
                    lines: agg
                        .lines
                        .iter()
                        .map(|(class, (hours, amount))| RateLine {
                            classification: *class,
                            hours: *hours,
                            rate,
                            multiplier: class.multiplier(&self.config.payroll),
                            amount: round_money(*amount),
                        })
                        .collect(),
                    compensatory: self.comp_reason_for(*date),
                })
                .collect()
        };

        let result = PayrollResult {
            employee_id: employee.id,
            year: self.ctx.year,
            month: self.ctx.month,
            calculation_type: salary.calculation_type,
            strategy: options.strategy,
            total_hours,
            regular: band_for(&bands, |c| c == RateClass::Regular),
            overtime: band_for(&bands, |c| {
                c.is_overtime() && !c.is_sabbath() && !c.is_holiday()
            }),
            sabbath: band_for(&bands, RateClass::is_sabbath),
            holiday: band_for(&bands, RateClass::is_holiday),
            base_pay,
            premium_pay: round_money(total_pay - base_pay),
            total_pay,
            hourly_rate_used: rate,
            worked_business_days,
            business_days_in_month: self.ctx.business_days_in_month,
            compensatory_earned,
            compensatory_balance: compensatory_earned,
            days: day_breakdowns,
            warnings,
            degraded: self.ctx.degraded,
        };

        Ok((result, daily_rows))
    }

    /// The distinct compensatory-day dates earned by the given daily
    /// rows, with their reasons. Works in fast mode too, where the
    /// result carries no day breakdown.
    pub fn compensatory_dates(
        &self,
        rows: &[DailyPayrollCalculation],
    ) -> Vec<(NaiveDate, CompReason)> {
        let mut dates: Vec<NaiveDate> = rows
            .iter()
            .filter(|r| r.compensatory_earned)
            .map(|r| r.work_date)
            .collect();
        dates.sort();
        dates.dedup();
        dates
            .into_iter()
            .filter_map(|date| self.comp_reason_for(date).map(|reason| (date, reason)))
            .collect()
    }

    fn pay_basis(&self, salary: &Salary) -> PayBasis {
        match salary.calculation_type {
            CalculationType::Hourly => PayBasis::Hourly,
            CalculationType::Monthly => PayBasis::MonthlyPremium,
            CalculationType::Project => {
                if salary.base_salary.is_some() {
                    PayBasis::Flat
                } else {
                    PayBasis::Hourly
                }
            }
        }
    }

    fn segment_amount(&self, segment: &PayrollSegment, basis: PayBasis) -> Decimal {
        match basis {
            PayBasis::Hourly => segment.amount(),
            PayBasis::MonthlyPremium => {
                segment.hours * segment.hourly_rate * (segment.multiplier - Decimal::ONE)
            }
            PayBasis::Flat => Decimal::ZERO,
        }
    }

    /// Shabbat days (Saturdays) and holiday dates earn a compensatory
    /// day; Friday-evening work does not.
    fn comp_reason_for(&self, date: NaiveDate) -> Option<CompReason> {
        if self
            .ctx
            .holidays
            .get(&date)
            .is_some_and(|h| h.kind != HolidayKind::Shabbat)
        {
            Some(CompReason::Holiday)
        } else if date.weekday() == Weekday::Sat {
            Some(CompReason::Shabbat)
        } else {
            None
        }
    }

    fn record_daily_warnings(
        &self,
        days: &BTreeMap<NaiveDate, DayAgg>,
        warnings: &mut Vec<ComplianceWarning>,
    ) {
        let payroll = &self.config.payroll;
        for (date, agg) in days {
            if agg.hours > payroll.daily_violation_hours && !agg.acknowledged {
                warnings.push(ComplianceWarning {
                    kind: WarningKind::UnacknowledgedLongShift,
                    message: format!(
                        "worked {} hours on {date} without long-shift acknowledgement",
                        agg.hours.normalize()
                    ),
                    date: Some(*date),
                });
            } else if agg.hours > payroll.daily_warning_hours {
                warnings.push(ComplianceWarning {
                    kind: WarningKind::DailyHoursExceeded,
                    message: format!(
                        "worked {} hours on {date}, exceeded {} hours",
                        agg.hours.normalize(),
                        payroll.daily_warning_hours.normalize()
                    ),
                    date: Some(*date),
                });
            }
        }
    }

    fn record_weekly_warnings(
        &self,
        days: &BTreeMap<NaiveDate, DayAgg>,
        warnings: &mut Vec<ComplianceWarning>,
    ) {
        let payroll = &self.config.payroll;
        let mut weekly_overtime: BTreeMap<(i32, u32), Decimal> = BTreeMap::new();
        for (date, agg) in days {
            let overtime: Decimal = agg
                .lines
                .iter()
                .filter(|(class, _)| class.is_overtime())
                .map(|(_, (hours, _))| *hours)
                .sum();
            if overtime > Decimal::ZERO {
                let week = date.iso_week();
                *weekly_overtime
                    .entry((week.year(), week.week()))
                    .or_insert(Decimal::ZERO) += overtime;
            }
        }
        for ((year, week), overtime) in weekly_overtime {
            if overtime > payroll.weekly_overtime_cap {
                warnings.push(ComplianceWarning {
                    kind: WarningKind::WeeklyOvertimeExceeded,
                    message: format!(
                        "{} overtime hours in week {week} of {year}, cap is {}",
                        overtime.normalize(),
                        payroll.weekly_overtime_cap.normalize()
                    ),
                    date: None,
                });
            }
        }
    }
}

/// Sums the hours and unrounded amounts of the classes selected by the
/// predicate into one band.
fn band_for(
    bands: &BTreeMap<RateClass, (Decimal, Decimal)>,
    predicate: fn(RateClass) -> bool,
) -> RateBand {
    let mut hours = Decimal::ZERO;
    let mut amount = Decimal::ZERO;
    for (class, (h, a)) in bands {
        if predicate(*class) {
            hours += *h;
            amount += *a;
        }
    }
    RateBand {
        hours,
        amount: round_money(amount),
    }
}
