//! Error types for the work-time and payroll engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all conditions that can occur during shift recording, payroll
//! calculation, caching, and background task execution.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// The main error type for the work-time and payroll engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use worktime_engine::error::EngineError;
/// use uuid::Uuid;
///
/// let error = EngineError::NoOpenShift {
///     employee_id: Uuid::nil(),
/// };
/// assert!(error.to_string().contains("no open shift"));
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid input rejected at the boundary.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        /// The field or entity that failed validation.
        field: String,
        /// A description of the validation failure.
        message: String,
    },

    /// The employee already has an open shift.
    #[error("Employee {employee_id} already has an open shift {worklog_id}")]
    OpenShiftExists {
        /// The employee that attempted to check in.
        employee_id: Uuid,
        /// The already-open shift.
        worklog_id: Uuid,
    },

    /// The candidate interval overlaps an existing non-deleted shift.
    #[error("Shift overlaps existing work log {conflict_id}")]
    OverlapConflict {
        /// The conflicting work log, returned for reconciliation.
        conflict_id: Uuid,
    },

    /// The employee has no open shift to close.
    #[error("Employee {employee_id} has no open shift")]
    NoOpenShift {
        /// The employee that attempted to check out.
        employee_id: Uuid,
    },

    /// The requested record does not exist.
    #[error("Work log {id} not found")]
    WorkLogNotFound {
        /// The missing work log id.
        id: Uuid,
    },

    /// The record was already soft-deleted; the call is an idempotent no-op.
    #[error("Work log {id} is already deleted")]
    AlreadyDeleted {
        /// The soft-deleted work log id.
        id: Uuid,
    },

    /// The employee has no active salary configuration.
    #[error("Employee {employee_id} has no active salary")]
    NoActiveSalary {
        /// The employee missing a salary row.
        employee_id: Uuid,
    },

    /// The employee is unknown to the directory.
    #[error("Employee {employee_id} not found")]
    EmployeeNotFound {
        /// The missing employee id.
        employee_id: Uuid,
    },

    /// Salary configuration is corrupt for the calculation type.
    #[error("Salary for employee {employee_id} is invalid: {message}")]
    InvalidSalary {
        /// The employee whose salary is misconfigured.
        employee_id: Uuid,
        /// A description of the misconfiguration.
        message: String,
    },

    /// Neither a live value nor a cached value is available for sun times
    /// and estimates are disabled.
    #[error("Time source unavailable for {date}")]
    TimeSourceUnavailable {
        /// The date the lookup was for.
        date: NaiveDate,
    },

    /// The bulk data-loading stage failed; no per-employee work ran.
    #[error("Bulk load failed: {message}")]
    BulkLoadFailed {
        /// A description of the load failure.
        message: String,
    },

    /// A task with the same idempotency key already completed within its TTL
    /// and the task was registered with strict duplicate handling.
    #[error("Task '{task}' already executed with key {key}")]
    DuplicateExecution {
        /// The task name.
        task: String,
        /// The idempotency key that matched.
        key: String,
    },

    /// A transient infrastructure failure (cache, store, external API).
    /// Retried by the task wrapper.
    #[error("Transient failure in {subsystem}: {message}")]
    Transient {
        /// The subsystem that failed.
        subsystem: String,
        /// A description of the failure.
        message: String,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed or failed validation.
    #[error("Invalid configuration '{path}': {message}")]
    ConfigInvalid {
        /// The path to the file that failed.
        path: String,
        /// A description of the problem.
        message: String,
    },
}

impl EngineError {
    /// Returns true if the error is transient and safe to retry.
    ///
    /// Only connection/timeout-class failures qualify; invariant violations
    /// and validation errors are never retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transient { .. })
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_conflict_displays_conflict_id() {
        let id = Uuid::nil();
        let error = EngineError::OverlapConflict { conflict_id: id };
        assert_eq!(
            error.to_string(),
            "Shift overlaps existing work log 00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_open_shift_exists_displays_both_ids() {
        let error = EngineError::OpenShiftExists {
            employee_id: Uuid::nil(),
            worklog_id: Uuid::nil(),
        };
        assert!(error.to_string().contains("already has an open shift"));
    }

    #[test]
    fn test_validation_displays_field_and_message() {
        let error = EngineError::Validation {
            field: "check_out".to_string(),
            message: "must be after check_in".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Validation failed for 'check_out': must be after check_in"
        );
    }

    #[test]
    fn test_transient_is_retryable() {
        let error = EngineError::Transient {
            subsystem: "cache".to_string(),
            message: "connection reset".to_string(),
        };
        assert!(error.is_transient());
    }

    #[test]
    fn test_invariant_violations_are_not_retryable() {
        let errors = vec![
            EngineError::OpenShiftExists {
                employee_id: Uuid::nil(),
                worklog_id: Uuid::nil(),
            },
            EngineError::OverlapConflict {
                conflict_id: Uuid::nil(),
            },
            EngineError::NoOpenShift {
                employee_id: Uuid::nil(),
            },
            EngineError::AlreadyDeleted { id: Uuid::nil() },
        ];
        for error in errors {
            assert!(!error.is_transient(), "{error} must not be transient");
        }
    }

    #[test]
    fn test_duplicate_execution_displays_task_and_key() {
        let error = EngineError::DuplicateExecution {
            task: "recalc_payroll".to_string(),
            key: "idempotent:recalc_payroll:abc123".to_string(),
        };
        assert!(error.to_string().contains("recalc_payroll"));
        assert!(error.to_string().contains("abc123"));
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_no_open_shift() -> EngineResult<()> {
            Err(EngineError::NoOpenShift {
                employee_id: Uuid::nil(),
            })
        }

        fn propagates_error() -> EngineResult<()> {
            returns_no_open_shift()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }
}
