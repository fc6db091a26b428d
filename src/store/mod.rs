//! Persistence boundary for work logs, employees, and payroll aggregates.
//!
//! The engine talks to storage through narrow traits so the backing
//! implementation (relational, document, or in-memory) stays swappable.
//! The deleted-row predicate is never hidden behind a default filter:
//! every accessor name states whether soft-deleted rows are included.

mod memory;

pub use memory::MemoryStore;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{
    CompReason, CompensatoryDay, DailyPayrollCalculation, Employee, GeoPoint,
    MonthlyPayrollSummary, Salary, WorkLog,
};

/// Options for write operations.
///
/// The bulk path sets `bypass_hooks` so post-write hooks do not enqueue a
/// recompute per row, and may set `skip_validation` when the caller
/// certifies clean data.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Skip post-write hook dispatch.
    pub bypass_hooks: bool,
    /// Skip per-row validation; the caller certifies the data.
    pub skip_validation: bool,
}

impl WriteOptions {
    /// Options used by the bulk import path.
    pub fn bulk() -> Self {
        Self {
            bypass_hooks: true,
            skip_validation: false,
        }
    }
}

/// A domain event emitted by the work-log store after a successful write.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// A shift was opened by check-in.
    ShiftOpened {
        /// The newly created work log.
        worklog: WorkLog,
    },
    /// A shift was closed by check-out.
    ShiftClosed {
        /// The closed work log.
        worklog: WorkLog,
    },
    /// A shift was soft-deleted.
    ShiftDeleted {
        /// The soft-deleted work log.
        worklog: WorkLog,
    },
}

impl StoreEvent {
    /// The work log the event refers to.
    pub fn worklog(&self) -> &WorkLog {
        match self {
            StoreEvent::ShiftOpened { worklog }
            | StoreEvent::ShiftClosed { worklog }
            | StoreEvent::ShiftDeleted { worklog } => worklog,
        }
    }
}

/// A post-write hook registered with the store.
///
/// Hooks run after the write commits and must not perform payroll work
/// inline; they enqueue deferred tasks instead.
pub trait StoreHook: Send + Sync {
    /// Called once per committed write, unless bypassed.
    fn on_event(&self, event: &StoreEvent);
}

/// Work-log persistence with soft delete and temporal invariants.
///
/// Implementations must run the overlap check and the row write under the
/// same transaction (or lock), so concurrent conflicting writes resolve
/// to exactly one winner.
pub trait WorkLogStore: Send + Sync {
    /// Opens a shift for an employee.
    ///
    /// Fails with `OpenShiftExists` if the employee already has an open
    /// shift, or `OverlapConflict` if the start falls inside an existing
    /// non-deleted shift.
    fn open_shift(
        &self,
        employee_id: Uuid,
        check_in: NaiveDateTime,
        location: Option<GeoPoint>,
        options: &WriteOptions,
    ) -> EngineResult<WorkLog>;

    /// Closes the employee's open shift.
    ///
    /// Fails with `NoOpenShift` when none is open, with a validation
    /// error when `check_out <= check_in` or the span exceeds the
    /// unacknowledged limit, and with `OverlapConflict` when the closed
    /// interval would overlap another shift.
    fn close_shift(
        &self,
        employee_id: Uuid,
        check_out: NaiveDateTime,
        location: Option<GeoPoint>,
        options: &WriteOptions,
    ) -> EngineResult<WorkLog>;

    /// Soft-deletes a work log. Idempotent: a second call returns
    /// `AlreadyDeleted` without writing.
    fn soft_delete(
        &self,
        id: Uuid,
        actor: Uuid,
        options: &WriteOptions,
    ) -> EngineResult<WorkLog>;

    /// Fetches a work log by id, whether deleted or not.
    fn find(&self, id: Uuid) -> EngineResult<WorkLog>;

    /// Lists open (not checked out), non-deleted shifts, optionally for
    /// one employee.
    fn list_open_shifts(&self, employee_id: Option<Uuid>) -> Vec<WorkLog>;

    /// Lists an employee's non-deleted shifts intersecting
    /// `[start, end)`.
    fn list_for_range(
        &self,
        employee_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Vec<WorkLog>;

    /// Range query over many employees in one logical round trip; used
    /// by the bulk loader.
    fn list_for_range_bulk(
        &self,
        employee_ids: &[Uuid],
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> HashMap<Uuid, Vec<WorkLog>>;

    /// Lists every shift for an employee including soft-deleted rows,
    /// for audit.
    fn list_including_deleted(&self, employee_id: Uuid) -> Vec<WorkLog>;

    /// Inserts many closed shifts in one logical round trip.
    fn bulk_create(&self, shifts: Vec<WorkLog>, options: &WriteOptions) -> EngineResult<usize>;

    /// Sums worked hours intersecting `[start, end)` for an employee,
    /// as a store-side aggregation.
    fn sum_hours_for_range(
        &self,
        employee_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Decimal;

    /// Hard-deletes soft-deleted rows older than the cutoff; the only
    /// path that removes rows. Returns the purged count.
    fn purge_soft_deleted(&self, older_than: NaiveDateTime) -> usize;

    /// Registers a post-write hook.
    fn register_hook(&self, hook: Arc<dyn StoreHook>);

    /// Number of logical queries issued so far; used by tests asserting
    /// round-trip budgets.
    fn query_count(&self) -> u64;
}

/// Read access to employees and their salary configuration.
pub trait EmployeeDirectory: Send + Sync {
    /// Adds an employee (owned by the users subsystem; exposed for
    /// wiring and tests).
    fn insert_employee(&self, employee: Employee);

    /// Adds a salary row; enforces at most one active row per employee.
    fn insert_salary(&self, salary: Salary) -> EngineResult<()>;

    /// Fetches an employee by id.
    fn employee(&self, id: Uuid) -> EngineResult<Employee>;

    /// Fetches the employee's active salary, or `NoActiveSalary`.
    fn active_salary(&self, employee_id: Uuid) -> EngineResult<Salary>;

    /// Employees joined with their active salary in one logical round
    /// trip. `None` selects all active employees.
    fn employees_with_salaries(
        &self,
        ids: Option<&[Uuid]>,
    ) -> Vec<(Employee, Option<Salary>)>;
}

/// Persisted payroll aggregates; the bulk service is the only writer.
pub trait PayrollArchive: Send + Sync {
    /// Upserts a monthly summary. Last writer wins; the stored version
    /// increments on every recompute.
    fn upsert_monthly_summary(&self, summary: MonthlyPayrollSummary) -> MonthlyPayrollSummary;

    /// Fetches summaries for the given employees and month in one
    /// logical round trip.
    fn monthly_summaries(
        &self,
        employee_ids: &[Uuid],
        year: i32,
        month: u32,
    ) -> Vec<MonthlyPayrollSummary>;

    /// Replaces the month's daily rows for one employee.
    fn replace_daily_rows(
        &self,
        employee_id: Uuid,
        year: i32,
        month: u32,
        rows: Vec<DailyPayrollCalculation>,
    );

    /// Fetches the month's daily rows for one employee.
    fn daily_rows(&self, employee_id: Uuid, year: i32, month: u32)
        -> Vec<DailyPayrollCalculation>;

    /// Records a compensatory day once per `(employee, date)`. Returns
    /// true when the credit is new.
    fn earn_compensatory_day(
        &self,
        employee_id: Uuid,
        earned_date: NaiveDate,
        reason: CompReason,
    ) -> bool;

    /// Unused compensatory-day balance for an employee.
    fn compensatory_balance(&self, employee_id: Uuid) -> u32;

    /// Every compensatory day for an employee.
    fn compensatory_days(&self, employee_id: Uuid) -> Vec<CompensatoryDay>;
}

/// The full storage surface the engine is wired against.
pub trait EngineStore: WorkLogStore + EmployeeDirectory + PayrollArchive {}

impl<T: WorkLogStore + EmployeeDirectory + PayrollArchive> EngineStore for T {}
