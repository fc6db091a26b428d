//! In-process task bus.
//!
//! Producers enqueue `(task, args)` pairs; a drain pass executes the
//! registered handler for each, wrapped in the idempotent runner and a
//! bounded retry policy. Only transient failures are retried; invariant
//! violations and validation errors surface immediately.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::error::EngineResult;

use super::idempotent::{IdempotentTaskRunner, TaskOptions, TaskOutcome};

/// Handler signature: arguments in, JSON result out.
pub type TaskHandler = Arc<dyn Fn(&serde_json::Value) -> EngineResult<serde_json::Value> + Send + Sync>;

/// Bounded retry with exponential backoff for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// A policy without sleeps, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    fn execute(&self, handler: &TaskHandler, args: &serde_json::Value) -> EngineResult<serde_json::Value> {
        let mut attempt = 1;
        loop {
            match handler(args) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    warn!(attempt, error = %err, "transient task failure, retrying");
                    if !self.base_delay.is_zero() {
                        std::thread::sleep(self.base_delay * 2u32.pow(attempt - 1));
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// How one drained task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskReportOutcome {
    /// The handler ran to completion.
    Executed,
    /// A completed execution with the same key was found.
    Skipped,
    /// The handler failed terminally; the idempotency key was not set.
    Failed(String),
}

/// The record of one drained task.
#[derive(Debug, Clone)]
pub struct TaskReport {
    /// Task name.
    pub name: String,
    /// The arguments it ran with.
    pub args: serde_json::Value,
    /// How it ended.
    pub outcome: TaskReportOutcome,
}

struct QueuedTask {
    name: String,
    args: serde_json::Value,
}

/// In-process queue of deferred work with registered handlers.
pub struct TaskBus {
    queue: Mutex<VecDeque<QueuedTask>>,
    handlers: RwLock<HashMap<String, (TaskHandler, TaskOptions)>>,
    runner: IdempotentTaskRunner,
    retry: RetryPolicy,
}

impl TaskBus {
    /// Creates a bus with the given runner and retry policy.
    pub fn new(runner: IdempotentTaskRunner, retry: RetryPolicy) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            handlers: RwLock::new(HashMap::new()),
            runner,
            retry,
        }
    }

    /// Registers the handler and idempotency options for a task name.
    pub fn register<F>(&self, name: &str, options: TaskOptions, handler: F)
    where
        F: Fn(&serde_json::Value) -> EngineResult<serde_json::Value> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .insert(name.to_string(), (Arc::new(handler), options));
    }

    /// Enqueues a task for the next drain pass.
    pub fn enqueue(&self, name: &str, args: serde_json::Value) {
        self.queue.lock().push_back(QueuedTask {
            name: name.to_string(),
            args,
        });
    }

    /// Number of queued, not-yet-drained tasks.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Drains the queue, executing every task once, and reports each
    /// outcome. Terminal failures are logged and reported, never
    /// re-queued here; the idempotency key stays unset so a later
    /// enqueue can retry.
    pub fn run_pending(&self) -> Vec<TaskReport> {
        let drained: Vec<QueuedTask> = self.queue.lock().drain(..).collect();
        let mut reports = Vec::with_capacity(drained.len());

        for task in drained {
            let entry = self.handlers.read().get(&task.name).cloned();
            let outcome = match entry {
                None => TaskReportOutcome::Failed(format!("no handler for '{}'", task.name)),
                Some((handler, options)) => {
                    let result = self.runner.run(&task.name, &task.args, &options, || {
                        self.retry.execute(&handler, &task.args)
                    });
                    match result {
                        Ok(TaskOutcome::Executed(_)) => {
                            info!(task = %task.name, "task executed");
                            TaskReportOutcome::Executed
                        }
                        Ok(TaskOutcome::Skipped(_)) => TaskReportOutcome::Skipped,
                        Err(err) => {
                            warn!(task = %task.name, error = %err, "task failed");
                            TaskReportOutcome::Failed(err.to_string())
                        }
                    }
                }
            };
            reports.push(TaskReport {
                name: task.name,
                args: task.args,
                outcome,
            });
        }
        reports
    }
}
