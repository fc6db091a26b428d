//! In-memory store implementation.
//!
//! Backs tests and single-process deployments. Work-log writes take one
//! write lock for both the invariant checks and the row mutation, which
//! gives the same guarantee a serializable transaction does: of two
//! concurrent conflicting writes, exactly one commits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    CompReason, CompensatoryDay, DailyPayrollCalculation, Employee, GeoPoint,
    MonthlyPayrollSummary, Salary, WorkLog,
};

use super::{
    EmployeeDirectory, PayrollArchive, StoreEvent, StoreHook, WorkLogStore, WriteOptions,
};

/// In-memory implementation of the full storage surface.
#[derive(Default)]
pub struct MemoryStore {
    worklogs: RwLock<Vec<WorkLog>>,
    employees: RwLock<HashMap<Uuid, Employee>>,
    salaries: RwLock<Vec<Salary>>,
    summaries: RwLock<HashMap<(Uuid, i32, u32), MonthlyPayrollSummary>>,
    daily: RwLock<HashMap<(Uuid, i32, u32), Vec<DailyPayrollCalculation>>>,
    comp_days: RwLock<Vec<CompensatoryDay>>,
    hooks: RwLock<Vec<Arc<dyn StoreHook>>>,
    queries: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn count_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    fn dispatch(&self, event: StoreEvent, options: &WriteOptions) {
        if options.bypass_hooks {
            return;
        }
        let hooks = self.hooks.read().clone();
        for hook in hooks {
            hook.on_event(&event);
        }
    }

    /// First non-deleted row of the employee conflicting with the
    /// candidate interval, excluding `exclude_id`.
    fn overlap_conflict(
        rows: &[WorkLog],
        employee_id: Uuid,
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
        exclude_id: Option<Uuid>,
    ) -> Option<Uuid> {
        rows.iter()
            .filter(|r| r.employee_id == employee_id && !r.is_deleted)
            .filter(|r| Some(r.id) != exclude_id)
            .find(|r| r.overlaps(start, end))
            .map(|r| r.id)
    }
}

impl WorkLogStore for MemoryStore {
    fn open_shift(
        &self,
        employee_id: Uuid,
        check_in: NaiveDateTime,
        location: Option<GeoPoint>,
        options: &WriteOptions,
    ) -> EngineResult<WorkLog> {
        self.count_query();
        let created = {
            let mut rows = self.worklogs.write();

            if let Some(open) = rows
                .iter()
                .find(|r| r.employee_id == employee_id && !r.is_deleted && r.is_open())
            {
                return Err(EngineError::OpenShiftExists {
                    employee_id,
                    worklog_id: open.id,
                });
            }
            if let Some(conflict_id) =
                Self::overlap_conflict(&rows, employee_id, check_in, None, None)
            {
                return Err(EngineError::OverlapConflict { conflict_id });
            }

            let log = WorkLog::open(employee_id, check_in, location);
            rows.push(log.clone());
            log
        };
        self.dispatch(
            StoreEvent::ShiftOpened {
                worklog: created.clone(),
            },
            options,
        );
        Ok(created)
    }

    fn close_shift(
        &self,
        employee_id: Uuid,
        check_out: NaiveDateTime,
        location: Option<GeoPoint>,
        options: &WriteOptions,
    ) -> EngineResult<WorkLog> {
        self.count_query();
        let closed = {
            let mut rows = self.worklogs.write();

            let index = rows
                .iter()
                .position(|r| r.employee_id == employee_id && !r.is_deleted && r.is_open())
                .ok_or(EngineError::NoOpenShift { employee_id })?;

            let mut candidate = rows[index].clone();
            candidate.check_out = Some(check_out);
            candidate.location_out = location;
            if !options.skip_validation {
                candidate.validate()?;
            }

            if let Some(conflict_id) = Self::overlap_conflict(
                &rows,
                employee_id,
                candidate.check_in,
                candidate.check_out,
                Some(candidate.id),
            ) {
                return Err(EngineError::OverlapConflict { conflict_id });
            }

            rows[index] = candidate.clone();
            candidate
        };
        self.dispatch(
            StoreEvent::ShiftClosed {
                worklog: closed.clone(),
            },
            options,
        );
        Ok(closed)
    }

    fn soft_delete(
        &self,
        id: Uuid,
        actor: Uuid,
        options: &WriteOptions,
    ) -> EngineResult<WorkLog> {
        self.count_query();
        let deleted = {
            let mut rows = self.worklogs.write();
            let row = rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(EngineError::WorkLogNotFound { id })?;
            if row.is_deleted {
                return Err(EngineError::AlreadyDeleted { id });
            }
            row.is_deleted = true;
            row.deleted_at = Some(Utc::now().naive_utc());
            row.deleted_by = Some(actor);
            row.clone()
        };
        self.dispatch(
            StoreEvent::ShiftDeleted {
                worklog: deleted.clone(),
            },
            options,
        );
        Ok(deleted)
    }

    fn find(&self, id: Uuid) -> EngineResult<WorkLog> {
        self.count_query();
        self.worklogs
            .read()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(EngineError::WorkLogNotFound { id })
    }

    fn list_open_shifts(&self, employee_id: Option<Uuid>) -> Vec<WorkLog> {
        self.count_query();
        self.worklogs
            .read()
            .iter()
            .filter(|r| !r.is_deleted && r.is_open())
            .filter(|r| employee_id.is_none_or(|id| r.employee_id == id))
            .cloned()
            .collect()
    }

    fn list_for_range(
        &self,
        employee_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Vec<WorkLog> {
        self.count_query();
        let mut logs: Vec<WorkLog> = self
            .worklogs
            .read()
            .iter()
            .filter(|r| r.employee_id == employee_id && !r.is_deleted)
            .filter(|r| r.overlaps(start, Some(end)))
            .cloned()
            .collect();
        logs.sort_by_key(|r| r.check_in);
        logs
    }

    fn list_for_range_bulk(
        &self,
        employee_ids: &[Uuid],
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> HashMap<Uuid, Vec<WorkLog>> {
        self.count_query();
        let mut map: HashMap<Uuid, Vec<WorkLog>> =
            employee_ids.iter().map(|id| (*id, Vec::new())).collect();
        for row in self.worklogs.read().iter() {
            if row.is_deleted || !row.overlaps(start, Some(end)) {
                continue;
            }
            if let Some(logs) = map.get_mut(&row.employee_id) {
                logs.push(row.clone());
            }
        }
        for logs in map.values_mut() {
            logs.sort_by_key(|r| r.check_in);
        }
        map
    }

    fn list_including_deleted(&self, employee_id: Uuid) -> Vec<WorkLog> {
        self.count_query();
        let mut logs: Vec<WorkLog> = self
            .worklogs
            .read()
            .iter()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect();
        logs.sort_by_key(|r| r.check_in);
        logs
    }

    fn bulk_create(&self, shifts: Vec<WorkLog>, options: &WriteOptions) -> EngineResult<usize> {
        self.count_query();
        let mut rows = self.worklogs.write();
        let mut accepted: Vec<WorkLog> = Vec::with_capacity(shifts.len());
        for shift in shifts {
            if !options.skip_validation {
                shift.validate()?;
                let conflict = Self::overlap_conflict(
                    &rows,
                    shift.employee_id,
                    shift.check_in,
                    shift.check_out,
                    Some(shift.id),
                )
                .or_else(|| {
                    Self::overlap_conflict(
                        &accepted,
                        shift.employee_id,
                        shift.check_in,
                        shift.check_out,
                        Some(shift.id),
                    )
                });
                if let Some(conflict_id) = conflict {
                    return Err(EngineError::OverlapConflict { conflict_id });
                }
            }
            accepted.push(shift);
        }
        let count = accepted.len();
        rows.extend(accepted);
        Ok(count)
    }

    fn sum_hours_for_range(
        &self,
        employee_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Decimal {
        self.count_query();
        let minutes: i64 = self
            .worklogs
            .read()
            .iter()
            .filter(|r| r.employee_id == employee_id && !r.is_deleted)
            .filter_map(|r| {
                let out = r.check_out?;
                let clipped_start = r.check_in.max(start);
                let clipped_end = out.min(end);
                (clipped_end > clipped_start)
                    .then(|| (clipped_end - clipped_start).num_minutes())
            })
            .sum();
        Decimal::new(minutes, 0) / Decimal::new(60, 0)
    }

    fn purge_soft_deleted(&self, older_than: NaiveDateTime) -> usize {
        self.count_query();
        let mut rows = self.worklogs.write();
        let before = rows.len();
        rows.retain(|r| !(r.is_deleted && r.deleted_at.is_some_and(|at| at < older_than)));
        before - rows.len()
    }

    fn register_hook(&self, hook: Arc<dyn StoreHook>) {
        self.hooks.write().push(hook);
    }

    fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}

impl EmployeeDirectory for MemoryStore {
    fn insert_employee(&self, employee: Employee) {
        self.employees.write().insert(employee.id, employee);
    }

    fn insert_salary(&self, salary: Salary) -> EngineResult<()> {
        salary.validate()?;
        let mut salaries = self.salaries.write();
        if salary.active
            && salaries
                .iter()
                .any(|s| s.employee_id == salary.employee_id && s.active)
        {
            return Err(EngineError::Validation {
                field: "salary.active".to_string(),
                message: format!(
                    "employee {} already has an active salary",
                    salary.employee_id
                ),
            });
        }
        salaries.push(salary);
        Ok(())
    }

    fn employee(&self, id: Uuid) -> EngineResult<Employee> {
        self.count_query();
        self.employees
            .read()
            .get(&id)
            .cloned()
            .ok_or(EngineError::EmployeeNotFound { employee_id: id })
    }

    fn active_salary(&self, employee_id: Uuid) -> EngineResult<Salary> {
        self.count_query();
        self.salaries
            .read()
            .iter()
            .find(|s| s.employee_id == employee_id && s.active)
            .cloned()
            .ok_or(EngineError::NoActiveSalary { employee_id })
    }

    fn employees_with_salaries(
        &self,
        ids: Option<&[Uuid]>,
    ) -> Vec<(Employee, Option<Salary>)> {
        self.count_query();
        let employees = self.employees.read();
        let salaries = self.salaries.read();
        let mut selected: Vec<Employee> = match ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| employees.get(id).cloned())
                .collect(),
            None => employees.values().filter(|e| e.active).cloned().collect(),
        };
        selected.sort_by_key(|e| e.id);
        selected
            .into_iter()
            .map(|employee| {
                let salary = salaries
                    .iter()
                    .find(|s| s.employee_id == employee.id && s.active)
                    .cloned();
                (employee, salary)
            })
            .collect()
    }
}

impl PayrollArchive for MemoryStore {
    fn upsert_monthly_summary(&self, mut summary: MonthlyPayrollSummary) -> MonthlyPayrollSummary {
        self.count_query();
        let key = (summary.employee_id, summary.year, summary.month);
        let mut summaries = self.summaries.write();
        if let Some(existing) = summaries.get(&key) {
            summary.version = existing.version + 1;
        }
        summaries.insert(key, summary.clone());
        summary
    }

    fn monthly_summaries(
        &self,
        employee_ids: &[Uuid],
        year: i32,
        month: u32,
    ) -> Vec<MonthlyPayrollSummary> {
        self.count_query();
        let summaries = self.summaries.read();
        employee_ids
            .iter()
            .filter_map(|id| summaries.get(&(*id, year, month)).cloned())
            .collect()
    }

    fn replace_daily_rows(
        &self,
        employee_id: Uuid,
        year: i32,
        month: u32,
        rows: Vec<DailyPayrollCalculation>,
    ) {
        self.count_query();
        self.daily
            .write()
            .insert((employee_id, year, month), rows);
    }

    fn daily_rows(
        &self,
        employee_id: Uuid,
        year: i32,
        month: u32,
    ) -> Vec<DailyPayrollCalculation> {
        self.count_query();
        self.daily
            .read()
            .get(&(employee_id, year, month))
            .cloned()
            .unwrap_or_default()
    }

    fn earn_compensatory_day(
        &self,
        employee_id: Uuid,
        earned_date: NaiveDate,
        reason: CompReason,
    ) -> bool {
        self.count_query();
        let mut days = self.comp_days.write();
        if days
            .iter()
            .any(|d| d.employee_id == employee_id && d.earned_date == earned_date)
        {
            return false;
        }
        days.push(CompensatoryDay {
            employee_id,
            earned_date,
            reason,
            used_date: None,
        });
        true
    }

    fn compensatory_balance(&self, employee_id: Uuid) -> u32 {
        self.count_query();
        self.comp_days
            .read()
            .iter()
            .filter(|d| d.employee_id == employee_id && !d.is_used())
            .count() as u32
    }

    fn compensatory_days(&self, employee_id: Uuid) -> Vec<CompensatoryDay> {
        self.count_query();
        self.comp_days
            .read()
            .iter()
            .filter(|d| d.employee_id == employee_id)
            .cloned()
            .collect()
    }
}
