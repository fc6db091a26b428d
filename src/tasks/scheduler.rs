//! Payroll recompute scheduling.
//!
//! A store hook that turns work-log writes into deferred recompute
//! tasks. The hook itself does no payroll work; it enqueues one
//! `recalc_payroll` task per affected `(employee, year, month)`.

use std::sync::Arc;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::models::WorkLog;
use crate::store::{StoreEvent, StoreHook};

use super::bus::TaskBus;
use super::TASK_RECALC_PAYROLL;

/// Arguments of a `recalc_payroll` task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalcRequest {
    /// The employee to recompute.
    pub employee_id: Uuid,
    /// Calculation year.
    pub year: i32,
    /// Calculation month (1–12).
    pub month: u32,
}

/// Store hook enqueueing payroll recomputes on work-log writes.
pub struct PayrollScheduler {
    bus: Arc<TaskBus>,
}

impl PayrollScheduler {
    /// Creates a scheduler publishing to the given bus.
    pub fn new(bus: Arc<TaskBus>) -> Self {
        Self { bus }
    }

    /// The distinct `(year, month)` pairs a work log touches: the
    /// check-in month, plus the check-out month when the shift spans a
    /// month boundary.
    fn affected_months(worklog: &WorkLog) -> Vec<(i32, u32)> {
        let mut months = vec![(worklog.check_in.year(), worklog.check_in.month())];
        if let Some(out) = worklog.check_out {
            let pair = (out.year(), out.month());
            if !months.contains(&pair) {
                months.push(pair);
            }
        }
        months
    }
}

impl StoreHook for PayrollScheduler {
    fn on_event(&self, event: &StoreEvent) {
        let worklog = event.worklog();
        for (year, month) in Self::affected_months(worklog) {
            self.bus.enqueue(
                TASK_RECALC_PAYROLL,
                json!(RecalcRequest {
                    employee_id: worklog.employee_id,
                    year,
                    month,
                }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryCache, VersionedCache};
    use crate::tasks::{IdempotentTaskRunner, RetryPolicy};
    use chrono::{NaiveDate, NaiveDateTime};

    fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn bus() -> Arc<TaskBus> {
        let cache = Arc::new(VersionedCache::new(Arc::new(InMemoryCache::new()), 1));
        Arc::new(TaskBus::new(
            IdempotentTaskRunner::new(cache),
            RetryPolicy::immediate(1),
        ))
    }

    #[test]
    fn test_close_enqueues_one_recalc() {
        let bus = bus();
        let scheduler = PayrollScheduler::new(Arc::clone(&bus));

        let mut worklog = WorkLog::open(Uuid::new_v4(), dt(2025, 3, 10, 9), None);
        worklog.check_out = Some(dt(2025, 3, 10, 17));
        scheduler.on_event(&StoreEvent::ShiftClosed { worklog });

        assert_eq!(bus.pending(), 1);
    }

    #[test]
    fn test_month_spanning_shift_enqueues_both_months() {
        let bus = bus();
        let scheduler = PayrollScheduler::new(Arc::clone(&bus));

        let mut worklog = WorkLog::open(Uuid::new_v4(), dt(2025, 3, 31, 22), None);
        worklog.check_out = Some(dt(2025, 4, 1, 3));
        scheduler.on_event(&StoreEvent::ShiftDeleted { worklog });

        assert_eq!(bus.pending(), 2);
    }

    #[test]
    fn test_open_event_uses_check_in_month() {
        let bus = bus();
        let scheduler = PayrollScheduler::new(Arc::clone(&bus));

        let worklog = WorkLog::open(Uuid::new_v4(), dt(2025, 3, 10, 9), None);
        scheduler.on_event(&StoreEvent::ShiftOpened { worklog });

        assert_eq!(bus.pending(), 1);
    }

    #[test]
    fn test_recalc_request_round_trip() {
        let request = RecalcRequest {
            employee_id: Uuid::nil(),
            year: 2025,
            month: 3,
        };
        let value = json!(request);
        let back: RecalcRequest = serde_json::from_value(value).unwrap();
        assert_eq!(request, back);
    }
}
