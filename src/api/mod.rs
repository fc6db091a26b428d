//! Transport-agnostic engine façade.
//!
//! The [`Engine`] wires the store, catalog, cache, and task bus together
//! and exposes the operations the surrounding transport (HTTP, CLI, RPC)
//! calls. Synchronous operations surface errors immediately; payroll
//! recompute is always deferred to the task bus and never blocks a
//! check-in or check-out response.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Utc};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::bulk::{BulkOptions, BulkPayrollService};
use crate::cache::VersionedCache;
use crate::calculation::CalcOptions;
use crate::catalog::TimeCatalog;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{BulkResult, GeoPoint, PayrollResult, WorkLog};
use crate::store::{EngineStore, WriteOptions};
use crate::tasks::{
    options_for, IdempotentTaskRunner, PayrollScheduler, RecalcRequest, RetryPolicy, TaskBus,
    TaskReport, TASK_NIGHTLY_CLEANUP, TASK_RECALC_PAYROLL,
};

/// Opaque biometric identification boundary.
///
/// The verifier maps an image to an employee id; the engine treats the
/// returned id exactly as if it came from an authenticated session.
pub trait BiometricVerifier: Send + Sync {
    /// Identifies the employee in the image, if any.
    fn identify(&self, image: &[u8]) -> Option<Uuid>;
}

/// The assembled engine.
pub struct Engine<S: EngineStore + 'static> {
    store: Arc<S>,
    bulk: Arc<BulkPayrollService<S>>,
    bus: Arc<TaskBus>,
}

impl<S: EngineStore + 'static> Engine<S> {
    /// Wires the engine: registers the payroll scheduler as a store hook
    /// and the recompute and nightly-cleanup handlers on the task bus.
    pub fn new(
        store: Arc<S>,
        catalog: Arc<TimeCatalog>,
        cache: Arc<VersionedCache>,
        config: Arc<EngineConfig>,
    ) -> Self {
        let bus = Arc::new(TaskBus::new(
            IdempotentTaskRunner::new(Arc::clone(&cache)),
            RetryPolicy::default(),
        ));
        store.register_hook(Arc::new(PayrollScheduler::new(Arc::clone(&bus))));

        let bulk = Arc::new(BulkPayrollService::new(
            Arc::clone(&store),
            catalog,
            cache,
            Arc::clone(&config),
        ));

        let recalc_bulk = Arc::clone(&bulk);
        bus.register(
            TASK_RECALC_PAYROLL,
            options_for(TASK_RECALC_PAYROLL, &config.idempotency),
            move |args| {
                let request: RecalcRequest =
                    serde_json::from_value(args.clone()).map_err(|err| EngineError::Validation {
                        field: "recalc_payroll.args".to_string(),
                        message: err.to_string(),
                    })?;
                let result = recalc_bulk.calculate_single(
                    request.employee_id,
                    request.year,
                    request.month,
                    &CalcOptions::default(),
                    true,
                    false,
                )?;
                Ok(json!({
                    "employee_id": result.employee_id,
                    "total_pay": result.total_pay,
                }))
            },
        );

        let cleanup_store = Arc::clone(&store);
        let retention_days = config.retention.soft_deleted_days;
        bus.register(
            TASK_NIGHTLY_CLEANUP,
            options_for(TASK_NIGHTLY_CLEANUP, &config.idempotency),
            move |_args| {
                let cutoff = Utc::now().naive_utc() - Duration::days(retention_days);
                let purged = cleanup_store.purge_soft_deleted(cutoff);
                info!(purged, "nightly cleanup finished");
                Ok(json!({ "purged": purged }))
            },
        );

        Self { store, bulk, bus }
    }

    /// Opens a shift for an employee at the given timestamp.
    pub fn check_in(
        &self,
        employee_id: Uuid,
        timestamp: NaiveDateTime,
        location: Option<GeoPoint>,
    ) -> EngineResult<WorkLog> {
        self.store.employee(employee_id)?;
        let worklog =
            self.store
                .open_shift(employee_id, timestamp, location, &WriteOptions::default())?;
        info!(employee = %employee_id, worklog = %worklog.id, "checked in");
        Ok(worklog)
    }

    /// Closes the employee's open shift at the given timestamp.
    pub fn check_out(
        &self,
        employee_id: Uuid,
        timestamp: NaiveDateTime,
        location: Option<GeoPoint>,
    ) -> EngineResult<WorkLog> {
        let worklog =
            self.store
                .close_shift(employee_id, timestamp, location, &WriteOptions::default())?;
        info!(employee = %employee_id, worklog = %worklog.id, "checked out");
        Ok(worklog)
    }

    /// Checks an employee in through the biometric boundary.
    pub fn check_in_by_face(
        &self,
        verifier: &dyn BiometricVerifier,
        image: &[u8],
        timestamp: NaiveDateTime,
        location: Option<GeoPoint>,
    ) -> EngineResult<WorkLog> {
        let employee_id = verifier.identify(image).ok_or(EngineError::Validation {
            field: "image".to_string(),
            message: "face not recognized".to_string(),
        })?;
        self.check_in(employee_id, timestamp, location)
    }

    /// Soft-deletes a work log on behalf of an actor.
    pub fn soft_delete_worklog(&self, id: Uuid, actor: Uuid) -> EngineResult<WorkLog> {
        self.store.soft_delete(id, actor, &WriteOptions::default())
    }

    /// Open shifts, optionally filtered to one employee.
    pub fn list_active_sessions(&self, employee_id: Option<Uuid>) -> Vec<WorkLog> {
        self.store.list_open_shifts(employee_id)
    }

    /// Computes one employee's month synchronously.
    pub fn calculate_payroll(
        &self,
        employee_id: Uuid,
        year: i32,
        month: u32,
        options: &CalcOptions,
    ) -> EngineResult<PayrollResult> {
        self.bulk
            .calculate_single(employee_id, year, month, options, true, false)
    }

    /// Runs the bulk calculation over many employees.
    pub fn bulk_calculate_payroll(
        &self,
        employee_ids: Option<&[Uuid]>,
        year: i32,
        month: u32,
        options: &BulkOptions,
    ) -> EngineResult<BulkResult> {
        self.bulk.run(employee_ids, year, month, options)
    }

    /// Cache-first monthly earnings view.
    ///
    /// A cache hit returns immediately; a miss computes, persists, and
    /// caches the result.
    pub fn earnings(&self, employee_id: Uuid, year: i32, month: u32) -> EngineResult<PayrollResult> {
        self.bulk
            .calculate_single(employee_id, year, month, &CalcOptions::default(), true, true)
    }

    /// Drains the task bus, executing deferred recomputes.
    pub fn run_pending_tasks(&self) -> Vec<TaskReport> {
        self.bus.run_pending()
    }

    /// Enqueues the nightly cleanup job.
    ///
    /// The handler hard-deletes soft-deleted work logs past the
    /// retention period. The task key is date-based, so repeated
    /// enqueues on the same local day execute the purge once.
    pub fn enqueue_nightly_cleanup(&self) {
        self.bus.enqueue(TASK_NIGHTLY_CLEANUP, json!({}));
    }

    /// The task bus, for registering additional handlers.
    pub fn bus(&self) -> &Arc<TaskBus> {
        &self.bus
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}
