//! Employee and salary models.
//!
//! The engine reads employees from the users subsystem and never writes
//! them. A salary row carries the calculation type and exactly the rate
//! fields that type requires.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Role of a user within the organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full administrative access.
    Admin,
    /// Payroll review and approval access.
    Accountant,
    /// Regular employee.
    Employee,
}

/// How an employee's pay is calculated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationType {
    /// Paid per hour worked, with tiered overtime.
    Hourly,
    /// Fixed monthly salary, prorated by worked business days.
    Monthly,
    /// Project-based; flat monthly amount or hourly, per configuration.
    Project,
}

/// An employee subject to work-time tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Role within the organization.
    pub role: Role,
    /// Whether the employee is currently active.
    pub active: bool,
}

/// Advisory produced by salary validation for values that are permitted
/// but outside the expected range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryAdvisory {
    /// The field the advisory refers to.
    pub field: String,
    /// A description of why the value looks suspicious.
    pub message: String,
}

/// Expected hourly-rate range; values outside are flagged, not rejected.
const HOURLY_RANGE: (i64, i64) = (40, 200);
/// Expected monthly-salary range; values outside are flagged, not rejected.
const MONTHLY_RANGE: (i64, i64) = (9_000, 40_000);

/// Salary configuration for one employee.
///
/// At most one active row exists per employee. The calculation type
/// dictates which of `hourly_rate` and `base_salary` must be set:
/// hourly requires a rate, monthly requires a base salary, and project
/// requires exactly one of the two.
///
/// # Example
///
/// ```
/// use worktime_engine::models::{CalculationType, Salary};
/// use rust_decimal::Decimal;
/// use uuid::Uuid;
///
/// let salary = Salary {
///     employee_id: Uuid::new_v4(),
///     calculation_type: CalculationType::Hourly,
///     currency: "ILS".to_string(),
///     hourly_rate: Some(Decimal::new(4000, 2)),
///     base_salary: None,
///     active: true,
/// };
/// assert!(salary.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Salary {
    /// The employee this salary belongs to.
    pub employee_id: Uuid,
    /// How pay is calculated from this salary.
    pub calculation_type: CalculationType,
    /// ISO currency code.
    pub currency: String,
    /// Hourly rate; required for hourly, forbidden for monthly.
    pub hourly_rate: Option<Decimal>,
    /// Monthly base salary; required for monthly, forbidden for hourly.
    pub base_salary: Option<Decimal>,
    /// Whether this is the employee's active salary row.
    pub active: bool,
}

impl Salary {
    /// Validates the field/type pairing and returns range advisories.
    ///
    /// A mismatched configuration (for example, a monthly salary with an
    /// hourly rate set) is rejected. A project salary with both fields set
    /// is rejected rather than silently coerced. Values outside the
    /// expected ranges produce advisories without failing validation.
    pub fn validate(&self) -> EngineResult<Vec<SalaryAdvisory>> {
        let mut advisories = Vec::new();

        match self.calculation_type {
            CalculationType::Hourly => {
                if self.hourly_rate.is_none() {
                    return Err(self.invalid("hourly salary requires hourly_rate"));
                }
                if self.base_salary.is_some() {
                    return Err(self.invalid("hourly salary must not set base_salary"));
                }
            }
            CalculationType::Monthly => {
                if self.base_salary.is_none() {
                    return Err(self.invalid("monthly salary requires base_salary"));
                }
                if self.hourly_rate.is_some() {
                    return Err(self.invalid("monthly salary must not set hourly_rate"));
                }
            }
            CalculationType::Project => match (self.hourly_rate, self.base_salary) {
                (None, None) => {
                    return Err(self.invalid("project salary requires hourly_rate or base_salary"));
                }
                (Some(_), Some(_)) => {
                    return Err(self.invalid(
                        "project salary must set exactly one of hourly_rate and base_salary",
                    ));
                }
                _ => {}
            },
        }

        if let Some(rate) = self.hourly_rate {
            if rate < Decimal::from(HOURLY_RANGE.0) || rate > Decimal::from(HOURLY_RANGE.1) {
                advisories.push(SalaryAdvisory {
                    field: "hourly_rate".to_string(),
                    message: format!(
                        "hourly rate {rate} outside expected range {}..{}",
                        HOURLY_RANGE.0, HOURLY_RANGE.1
                    ),
                });
            }
        }
        if let Some(base) = self.base_salary {
            if base < Decimal::from(MONTHLY_RANGE.0) || base > Decimal::from(MONTHLY_RANGE.1) {
                advisories.push(SalaryAdvisory {
                    field: "base_salary".to_string(),
                    message: format!(
                        "base salary {base} outside expected range {}..{}",
                        MONTHLY_RANGE.0, MONTHLY_RANGE.1
                    ),
                });
            }
        }

        Ok(advisories)
    }

    /// The hourly rate used for premium calculations.
    ///
    /// Hourly and hourly-project salaries use their configured rate;
    /// monthly salaries derive `base_salary / standard_monthly_hours`.
    pub fn effective_hourly_rate(&self, standard_monthly_hours: Decimal) -> Option<Decimal> {
        match self.hourly_rate {
            Some(rate) => Some(rate),
            None => self.base_salary.map(|base| base / standard_monthly_hours),
        }
    }

    fn invalid(&self, message: &str) -> EngineError {
        EngineError::InvalidSalary {
            employee_id: self.employee_id,
            message: message.to_string(),
        }
    }
}
