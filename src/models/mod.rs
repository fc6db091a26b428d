//! Core data models for the work-time and payroll engine.
//!
//! This module contains all the domain models used throughout the engine.

mod employee;
mod holiday;
mod payroll;
mod segment;
mod worklog;

pub use employee::{CalculationType, Employee, Role, Salary, SalaryAdvisory};
pub use holiday::{CompReason, CompensatoryDay, Holiday, HolidayKind, SunTimes};
pub use payroll::{
    round_money, BulkFailure, BulkResult, ComplianceWarning, DailyPayrollCalculation,
    DayBreakdown, MonthlyPayrollSummary, PayrollResult, RateBand, RateLine, StrategyKind,
    WarningKind,
};
pub use segment::{PayrollSegment, RateClass};
pub use worklog::{intervals_overlap, GeoPoint, WorkLog, MAX_UNACKNOWLEDGED_HOURS};
