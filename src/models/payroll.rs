//! Payroll result models.
//!
//! This module contains the transient [`PayrollResult`] contract returned
//! by a strategy invocation, the persisted daily and monthly aggregates
//! derived from it, and the bulk-run result aggregate.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::employee::CalculationType;
use super::holiday::CompReason;
use super::segment::RateClass;

/// Rounds a monetary value to two fractional digits, half-up.
///
/// Applied only at final amount assembly; intermediate arithmetic stays
/// unrounded.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Which payroll strategy computed a result.
///
/// Legacy strategy names are resolved at a single factory; removed names
/// map to [`StrategyKind::Enhanced`] with a deprecation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// The current strategy with full tier and premium support.
    Enhanced,
    /// The legacy strategy kept for historical recomputation.
    Legacy,
}

impl StrategyKind {
    /// Resolves a strategy name, mapping unknown or removed names to
    /// [`StrategyKind::Enhanced`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "enhanced" => StrategyKind::Enhanced,
            "legacy" => StrategyKind::Legacy,
            other => {
                tracing::warn!(strategy = other, "unknown strategy name, using enhanced");
                StrategyKind::Enhanced
            }
        }
    }
}

/// Kinds of compliance warnings a calculation can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A calendar day exceeded the warning threshold (default 12 hours).
    DailyHoursExceeded,
    /// A calendar day exceeded the violation threshold without the
    /// long-shift acknowledgement.
    UnacknowledgedLongShift,
    /// An ISO week exceeded the overtime cap (default 16 hours).
    WeeklyOvertimeExceeded,
    /// The salary value is outside the expected range.
    SalaryOutOfRange,
    /// Sun times were estimated because the catalog was unavailable.
    DegradedCatalog,
}

/// A compliance warning recorded during calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceWarning {
    /// The kind of warning.
    pub kind: WarningKind,
    /// Human-readable description.
    pub message: String,
    /// The date the warning refers to, when date-specific.
    pub date: Option<NaiveDate>,
}

/// Hours and amount for one classification group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBand {
    /// Total hours in the band.
    pub hours: Decimal,
    /// Rounded amount for the band.
    pub amount: Decimal,
}

impl RateBand {
    /// An empty band.
    pub fn zero() -> Self {
        Self {
            hours: Decimal::ZERO,
            amount: Decimal::ZERO,
        }
    }
}

/// A single classified pay line within a day breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLine {
    /// Rate classification.
    pub classification: RateClass,
    /// Hours in this line.
    pub hours: Decimal,
    /// The hourly rate applied.
    pub rate: Decimal,
    /// The multiplier applied.
    pub multiplier: Decimal,
    /// Rounded amount (`hours × rate × multiplier`).
    pub amount: Decimal,
}

/// Per-day breakdown of a monthly calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBreakdown {
    /// The calendar date.
    pub date: NaiveDate,
    /// Total hours worked on the date.
    pub hours: Decimal,
    /// Rounded gross pay for the date.
    pub gross: Decimal,
    /// Classified pay lines, in ascending time order.
    pub lines: Vec<RateLine>,
    /// A compensatory day earned on this date, if any.
    pub compensatory: Option<CompReason>,
}

/// The computed summary returned by a payroll strategy invocation.
///
/// Immutable; amounts are rounded to two decimals at assembly, hours are
/// exact decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollResult {
    /// The employee the result is for.
    pub employee_id: Uuid,
    /// Calculation year.
    pub year: i32,
    /// Calculation month (1–12).
    pub month: u32,
    /// The salary calculation type used.
    pub calculation_type: CalculationType,
    /// The strategy that produced the result.
    pub strategy: StrategyKind,
    /// Total worked hours in the month.
    pub total_hours: Decimal,
    /// Base-rate hours and amount.
    pub regular: RateBand,
    /// Overtime hours and amount (all tiers, regular days).
    pub overtime: RateBand,
    /// Shabbat-window hours and amount (including Friday evening).
    pub sabbath: RateBand,
    /// Holiday-window hours and amount.
    pub holiday: RateBand,
    /// Base pay: hourly base-rate amount, or the prorated monthly base.
    pub base_pay: Decimal,
    /// Premium pay above the base (overtime and window premiums).
    pub premium_pay: Decimal,
    /// Total gross pay for the month.
    pub total_pay: Decimal,
    /// The hourly rate used for premium calculations.
    pub hourly_rate_used: Decimal,
    /// Business days (Sunday–Thursday, non-holiday) the employee worked.
    pub worked_business_days: u32,
    /// Business days in the month.
    pub business_days_in_month: u32,
    /// Compensatory days earned this month.
    pub compensatory_earned: u32,
    /// Compensatory day balance after this month.
    pub compensatory_balance: u32,
    /// Per-day breakdown; empty when `fast_mode` was requested.
    pub days: Vec<DayBreakdown>,
    /// Compliance warnings recorded during calculation.
    pub warnings: Vec<ComplianceWarning>,
    /// True when the catalog degraded to estimated sun times.
    pub degraded: bool,
}

impl PayrollResult {
    /// A result with zero hours and amounts, used when the employee has
    /// no work logs for the month.
    pub fn zeroed(
        employee_id: Uuid,
        year: i32,
        month: u32,
        calculation_type: CalculationType,
        strategy: StrategyKind,
    ) -> Self {
        Self {
            employee_id,
            year,
            month,
            calculation_type,
            strategy,
            total_hours: Decimal::ZERO,
            regular: RateBand::zero(),
            overtime: RateBand::zero(),
            sabbath: RateBand::zero(),
            holiday: RateBand::zero(),
            base_pay: Decimal::ZERO,
            premium_pay: Decimal::ZERO,
            total_pay: Decimal::ZERO,
            hourly_rate_used: Decimal::ZERO,
            worked_business_days: 0,
            business_days_in_month: 0,
            compensatory_earned: 0,
            compensatory_balance: 0,
            days: Vec::new(),
            warnings: Vec::new(),
            degraded: false,
        }
    }
}

/// Persisted per-day aggregate, one row per `(employee, date, worklog)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPayrollCalculation {
    /// The employee.
    pub employee_id: Uuid,
    /// The worked date.
    pub work_date: NaiveDate,
    /// The source work log.
    pub worklog_id: Uuid,
    /// Total hours from the source work log on this date.
    pub total_hours: Decimal,
    /// Rounded gross pay for those hours.
    pub gross_pay: Decimal,
    /// Classified pay lines.
    pub lines: Vec<RateLine>,
    /// Whether a compensatory day was earned for this date.
    pub compensatory_earned: bool,
}

/// Persisted monthly aggregate, unique per `(employee, year, month)`.
///
/// Recomputable; upserts are last-writer-wins with `calculation_date`
/// recording the winner and `version` incrementing on each recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPayrollSummary {
    /// The employee.
    pub employee_id: Uuid,
    /// Calculation year.
    pub year: i32,
    /// Calculation month (1–12).
    pub month: u32,
    /// Total worked hours.
    pub total_hours: Decimal,
    /// Base-rate hours.
    pub regular_hours: Decimal,
    /// Overtime hours across all tiers.
    pub overtime_hours: Decimal,
    /// Shabbat-window hours.
    pub sabbath_hours: Decimal,
    /// Holiday-window hours.
    pub holiday_hours: Decimal,
    /// Total gross pay.
    pub total_pay: Decimal,
    /// Compensatory days earned in the month.
    pub compensatory_earned: u32,
    /// When this row was computed.
    pub calculation_date: DateTime<Utc>,
    /// Recompute counter.
    pub version: u32,
}

impl MonthlyPayrollSummary {
    /// Builds a version-1 summary from a strategy result.
    pub fn from_result(result: &PayrollResult) -> Self {
        Self {
            employee_id: result.employee_id,
            year: result.year,
            month: result.month,
            total_hours: result.total_hours,
            regular_hours: result.regular.hours,
            overtime_hours: result.overtime.hours,
            sabbath_hours: result.sabbath.hours,
            holiday_hours: result.holiday.hours,
            total_pay: result.total_pay,
            compensatory_earned: result.compensatory_earned,
            calculation_date: Utc::now(),
            version: 1,
        }
    }
}

/// A per-employee failure collected during a bulk run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    /// The employee whose calculation failed.
    pub employee_id: Uuid,
    /// The failure reason (for example, `deadline_exceeded`).
    pub reason: String,
}

/// Aggregate result of a bulk payroll run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResult {
    /// Number of employees computed successfully.
    pub successful: usize,
    /// Number of employees that failed.
    pub failed: usize,
    /// Number of results served from cache.
    pub cached_count: usize,
    /// The per-employee results.
    pub results: Vec<PayrollResult>,
    /// The collected failures.
    pub failures: Vec<BulkFailure>,
    /// Wall-clock duration of the run, in milliseconds.
    pub duration_ms: u64,
    /// Employees per second over the run.
    pub throughput: f64,
}
