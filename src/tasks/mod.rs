//! Background task primitives.
//!
//! Work-log writes never compute payroll inline; they enqueue tasks on
//! the [`TaskBus`], where handlers run wrapped in the
//! [`IdempotentTaskRunner`] and a bounded retry policy. A completed task
//! records its idempotency key so a redelivered duplicate is skipped
//! within the TTL; failures never set the key, so retries stay possible.

mod bus;
mod idempotent;
mod scheduler;

pub use bus::{RetryPolicy, TaskBus, TaskReport, TaskReportOutcome};
pub use idempotent::{IdempotentTaskRunner, TaskOptions, TaskOutcome};
pub use scheduler::{PayrollScheduler, RecalcRequest};

use crate::config::IdempotencyConfig;

/// Task name for the payroll recompute enqueued by shift writes.
pub const TASK_RECALC_PAYROLL: &str = "recalc_payroll";
/// Task name for critical alert notifications.
pub const TASK_CRITICAL_ALERT: &str = "critical_alert";
/// Task name for security report generation.
pub const TASK_SECURITY_REPORT: &str = "security_report";
/// Task name for the nightly cleanup job.
pub const TASK_NIGHTLY_CLEANUP: &str = "nightly_cleanup";

/// The idempotency options a task runs under, per configuration.
///
/// Cleanup runs once per local day; the other tasks key purely on their
/// arguments.
pub fn options_for(task: &str, config: &IdempotencyConfig) -> TaskOptions {
    let hours = match task {
        TASK_CRITICAL_ALERT => config.alert_ttl_hours,
        TASK_NIGHTLY_CLEANUP => config.cleanup_ttl_hours,
        TASK_RECALC_PAYROLL => config.payroll_ttl_hours,
        _ => config.default_ttl_hours,
    };
    TaskOptions {
        ttl: std::time::Duration::from_secs(hours * 3600),
        skip_on_duplicate: true,
        date_based: task == TASK_NIGHTLY_CLEANUP,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_use_per_task_ttls() {
        let config = IdempotencyConfig::default();
        assert_eq!(
            options_for(TASK_RECALC_PAYROLL, &config).ttl,
            std::time::Duration::from_secs(72 * 3600)
        );
        assert_eq!(
            options_for(TASK_NIGHTLY_CLEANUP, &config).ttl,
            std::time::Duration::from_secs(48 * 3600)
        );
        assert_eq!(
            options_for("anything_else", &config).ttl,
            std::time::Duration::from_secs(24 * 3600)
        );
    }

    #[test]
    fn test_cleanup_is_date_based() {
        let config = IdempotencyConfig::default();
        assert!(options_for(TASK_NIGHTLY_CLEANUP, &config).date_based);
        assert!(!options_for(TASK_RECALC_PAYROLL, &config).date_based);
    }
}
