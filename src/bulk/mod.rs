//! Bulk payroll calculation.
//!
//! Computes monthly results for many employees with a fixed, small number
//! of store round trips: one employees-with-salaries load, one month
//! work-log scan, and catalog lookups served from cache. Per-employee
//! work is pure CPU over the prefetched context, so batches at or above
//! the thread cutoff fan out across a worker pool.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::VersionedCache;
use crate::calculation::{CalcOptions, MonthContext, PayrollStrategy};
use crate::catalog::TimeCatalog;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    BulkFailure, BulkResult, DailyPayrollCalculation, Employee, MonthlyPayrollSummary,
    PayrollResult, Salary, StrategyKind, WorkLog,
};
use crate::store::EngineStore;

/// Flags controlling one bulk run.
#[derive(Debug, Clone)]
pub struct BulkOptions {
    /// Serve and store results through the versioned cache.
    pub use_cache: bool,
    /// Allow the worker pool for large batches. Tests and transactional
    /// callers must pass `false`.
    pub use_parallel: bool,
    /// Upsert monthly summaries and replace daily rows.
    pub save_to_db: bool,
    /// Delete matching cache keys before the run.
    pub invalidate_cache: bool,
    /// Skip per-day breakdowns in the results.
    pub fast_mode: bool,
    /// Strategy to compute with.
    pub strategy: StrategyKind,
    /// Employees per worker dispatch; `None` sizes chunks to the pool.
    pub batch_size: Option<usize>,
    /// Optional wall-clock budget; employees not reached are reported
    /// as `deadline_exceeded`.
    pub deadline: Option<Duration>,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            use_parallel: true,
            save_to_db: true,
            invalidate_cache: false,
            fast_mode: false,
            strategy: StrategyKind::Enhanced,
            batch_size: None,
            deadline: None,
        }
    }
}

/// Cache key for one employee-month result.
pub(crate) fn summary_key(employee_id: Uuid, year: i32, month: u32) -> String {
    format!("monthly_summary:{employee_id}:{year}:{month}")
}

enum Computed {
    Ok(Box<(PayrollResult, Vec<DailyPayrollCalculation>)>),
    Failed(BulkFailure),
}

/// Runs the payroll strategy over a set of employees for one month.
pub struct BulkPayrollService<S> {
    store: Arc<S>,
    catalog: Arc<TimeCatalog>,
    cache: Arc<VersionedCache>,
    config: Arc<EngineConfig>,
}

impl<S: EngineStore> BulkPayrollService<S> {
    /// Creates a service over the given store, catalog, and cache.
    pub fn new(
        store: Arc<S>,
        catalog: Arc<TimeCatalog>,
        cache: Arc<VersionedCache>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            store,
            catalog,
            cache,
            config,
        }
    }

    /// Computes results for the given employees (or all active ones) for
    /// one `(year, month)`.
    ///
    /// Per-employee failures are collected and the batch always
    /// completes; only a data-loading failure fails the whole run.
    pub fn run(
        &self,
        employee_ids: Option<&[Uuid]>,
        year: i32,
        month: u32,
        options: &BulkOptions,
    ) -> EngineResult<BulkResult> {
        let started = Instant::now();

        if options.invalidate_cache {
            match employee_ids {
                Some(ids) => {
                    for id in ids {
                        self.cache.delete(&summary_key(*id, year, month));
                    }
                }
                None => {
                    self.cache.delete_prefix("monthly_summary:");
                }
            }
        }

        // Load 1: employees joined with their active salary.
        let roster = self.store.employees_with_salaries(employee_ids);

        let mut results: Vec<PayrollResult> = Vec::new();
        let mut failures: Vec<BulkFailure> = Vec::new();
        let mut cached_count = 0usize;
        let mut to_compute: Vec<(Employee, Salary)> = Vec::new();

        for (employee, salary) in roster {
            if options.use_cache {
                if let Some(cached) =
                    self.cache.get::<PayrollResult>(&summary_key(employee.id, year, month))
                {
                    cached_count += 1;
                    results.push(cached);
                    continue;
                }
            }
            match salary {
                Some(salary) => to_compute.push((employee, salary)),
                None => failures.push(BulkFailure {
                    employee_id: employee.id,
                    reason: "no_active_salary".to_string(),
                }),
            }
        }

        if !to_compute.is_empty() {
            let ctx = MonthContext::build(&self.catalog, year, month).map_err(|err| {
                EngineError::BulkLoadFailed {
                    message: format!("month context: {err}"),
                }
            })?;

            // Load 2: every work log of the month for the employees
            // still to compute.
            let ids: Vec<Uuid> = to_compute.iter().map(|(e, _)| e.id).collect();
            let month_start = MonthContext::month_start(year, month)
                .and_hms_opt(0, 0, 0)
                .expect("midnight exists");
            let month_end = (MonthContext::month_end(year, month) + chrono::Duration::days(1))
                .and_hms_opt(0, 0, 0)
                .expect("midnight exists");
            let mut worklogs = self.store.list_for_range_bulk(&ids, month_start, month_end);

            let calc_options = CalcOptions {
                fast_mode: options.fast_mode,
                strategy: options.strategy,
            };
            let jobs: Vec<(Employee, Salary, Vec<WorkLog>)> = to_compute
                .into_iter()
                .map(|(employee, salary)| {
                    let logs = worklogs.remove(&employee.id).unwrap_or_default();
                    (employee, salary, logs)
                })
                .collect();

            let computed = self.compute_all(jobs, &ctx, &calc_options, options, started);

            for outcome in computed {
                match outcome {
                    Computed::Ok(boxed) => {
                        let (mut result, rows) = *boxed;
                        if options.save_to_db {
                            self.persist(&ctx, &mut result, rows);
                        }
                        if options.use_cache {
                            self.cache.set(
                                &summary_key(result.employee_id, year, month),
                                &result,
                                Some(Duration::from_secs(
                                    self.config.cache.ttl_monthly_summary_secs,
                                )),
                            );
                        }
                        results.push(result);
                    }
                    Computed::Failed(failure) => failures.push(failure),
                }
            }
        }

        let duration = started.elapsed();
        let successful = results.len();
        let throughput = if duration.as_secs_f64() > 0.0 {
            successful as f64 / duration.as_secs_f64()
        } else {
            successful as f64
        };
        info!(
            successful,
            failed = failures.len(),
            cached = cached_count,
            duration_ms = duration.as_millis() as u64,
            "bulk payroll run finished"
        );

        Ok(BulkResult {
            successful,
            failed: failures.len(),
            cached_count,
            results,
            failures,
            duration_ms: duration.as_millis() as u64,
            throughput,
        })
    }

    /// Computes one employee's month directly, with precise errors.
    ///
    /// Used by the synchronous `calculate` operation and the deferred
    /// recompute task. Serves the cache when allowed; persists and
    /// caches the fresh result otherwise.
    pub fn calculate_single(
        &self,
        employee_id: Uuid,
        year: i32,
        month: u32,
        calc_options: &CalcOptions,
        save_to_db: bool,
        use_cache: bool,
    ) -> EngineResult<PayrollResult> {
        if use_cache {
            if let Some(cached) = self.cache.get::<PayrollResult>(&summary_key(employee_id, year, month)) {
                return Ok(cached);
            }
        }

        let employee = self.store.employee(employee_id)?;
        let salary = self.store.active_salary(employee_id)?;
        let ctx = MonthContext::build(&self.catalog, year, month)?;

        let month_start = MonthContext::month_start(year, month)
            .and_hms_opt(0, 0, 0)
            .expect("midnight exists");
        let month_end = (MonthContext::month_end(year, month) + chrono::Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .expect("midnight exists");
        let logs = self.store.list_for_range(employee_id, month_start, month_end);

        let strategy = PayrollStrategy::new(&self.config, &ctx);
        let (mut result, rows) = strategy.calculate_with_rows(&employee, &salary, &logs, calc_options)?;
        if save_to_db {
            self.persist(&ctx, &mut result, rows);
        }
        if use_cache {
            self.cache.set(
                &summary_key(employee_id, year, month),
                &result,
                Some(Duration::from_secs(self.config.cache.ttl_monthly_summary_secs)),
            );
        }
        Ok(result)
    }

    /// Runs the per-employee computations, sequentially below the thread
    /// cutoff and on a bounded worker pool at or above it.
    fn compute_all(
        &self,
        jobs: Vec<(Employee, Salary, Vec<WorkLog>)>,
        ctx: &MonthContext,
        calc_options: &CalcOptions,
        options: &BulkOptions,
        started: Instant,
    ) -> Vec<Computed> {
        let strategy = PayrollStrategy::new(&self.config, ctx);
        let compute = |(employee, salary, logs): &(Employee, Salary, Vec<WorkLog>)| {
            if let Some(deadline) = options.deadline {
                if started.elapsed() > deadline {
                    return Computed::Failed(BulkFailure {
                        employee_id: employee.id,
                        reason: "deadline_exceeded".to_string(),
                    });
                }
            }
            match strategy.calculate_with_rows(employee, salary, logs, calc_options) {
                Ok(pair) => Computed::Ok(Box::new(pair)),
                Err(err) => {
                    warn!(employee = %employee.id, error = %err, "payroll calculation failed");
                    Computed::Failed(BulkFailure {
                        employee_id: employee.id,
                        reason: err.to_string(),
                    })
                }
            }
        };

        if options.use_parallel && jobs.len() >= self.config.bulk.thread_cutoff {
            let workers = self
                .config
                .bulk
                .max_workers
                .min(std::thread::available_parallelism().map_or(1, |n| n.get()));
            let chunk = options
                .batch_size
                .unwrap_or_else(|| jobs.len().div_ceil(workers))
                .max(1);
            match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
                Ok(pool) => pool.install(|| {
                    jobs.par_chunks(chunk)
                        .flat_map_iter(|chunk| chunk.iter().map(compute))
                        .collect()
                }),
                Err(err) => {
                    warn!(error = %err, "worker pool unavailable, running sequentially");
                    jobs.iter().map(compute).collect()
                }
            }
        } else {
            jobs.iter().map(compute).collect()
        }
    }

    /// Persists one employee's month: summary upsert, daily-row
    /// replacement, and idempotent compensatory-day credits.
    fn persist(
        &self,
        ctx: &MonthContext,
        result: &mut PayrollResult,
        rows: Vec<DailyPayrollCalculation>,
    ) {
        let strategy = PayrollStrategy::new(&self.config, ctx);
        for (date, reason) in strategy.compensatory_dates(&rows) {
            self.store.earn_compensatory_day(result.employee_id, date, reason);
        }
        result.compensatory_balance = self.store.compensatory_balance(result.employee_id);

        let summary = MonthlyPayrollSummary::from_result(result);
        self.store.upsert_monthly_summary(summary);
        self.store
            .replace_daily_rows(result.employee_id, result.year, result.month, rows);
    }
}
