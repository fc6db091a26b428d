//! Idempotent task execution.
//!
//! A task's idempotency key is derived from its name and a SHA-256 hash
//! of its arguments. The key is written to the versioned cache only on
//! successful completion, so a retry after a failure executes the body
//! again, while a duplicate delivery within the TTL does not.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::VersionedCache;
use crate::error::{EngineError, EngineResult};

/// Options controlling idempotent execution of one task.
#[derive(Debug, Clone)]
pub struct TaskOptions {
    /// How long a completed execution suppresses duplicates.
    pub ttl: Duration,
    /// Skip silently on duplicate (default) instead of raising
    /// [`EngineError::DuplicateExecution`].
    pub skip_on_duplicate: bool,
    /// Append the current local date to the key, for once-per-day tasks.
    pub date_based: bool,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 3600),
            skip_on_duplicate: true,
            date_based: false,
        }
    }
}

/// The outcome of an idempotent invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    /// The body ran and produced this value.
    Executed(T),
    /// A completed execution was found; this is its stored result.
    Skipped(serde_json::Value),
}

impl<T> TaskOutcome<T> {
    /// Returns true when the body actually ran.
    pub fn executed(&self) -> bool {
        matches!(self, TaskOutcome::Executed(_))
    }
}

/// Wraps task bodies so completed work is not re-executed within a TTL.
pub struct IdempotentTaskRunner {
    cache: Arc<VersionedCache>,
}

impl IdempotentTaskRunner {
    /// Creates a runner storing completion markers in the given cache.
    pub fn new(cache: Arc<VersionedCache>) -> Self {
        Self { cache }
    }

    /// Derives the idempotency key for a task and its arguments.
    ///
    /// Format: `idempotent:{task}:{sha256(args)[..16]}`, with the local
    /// date appended for date-based tasks.
    pub fn key(task: &str, args: &serde_json::Value, date_based: bool) -> String {
        let mut hasher = Sha256::new();
        hasher.update(args.to_string().as_bytes());
        let digest = hex::encode(hasher.finalize());
        let mut key = format!("idempotent:{task}:{}", &digest[..16]);
        if date_based {
            key.push(':');
            key.push_str(&chrono::Local::now().date_naive().to_string());
        }
        key
    }

    /// Runs the body unless a completed execution with the same key is
    /// stored.
    ///
    /// Failures propagate without setting the key, so a later retry can
    /// run the body again.
    pub fn run<T, F>(
        &self,
        task: &str,
        args: &serde_json::Value,
        options: &TaskOptions,
        body: F,
    ) -> EngineResult<TaskOutcome<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> EngineResult<T>,
    {
        let key = Self::key(task, args, options.date_based);

        if let Some(stored) = self.cache.get::<serde_json::Value>(&key) {
            if options.skip_on_duplicate {
                debug!(task, key, "duplicate task execution skipped");
                return Ok(TaskOutcome::Skipped(stored));
            }
            return Err(EngineError::DuplicateExecution {
                task: task.to_string(),
                key,
            });
        }

        let result = body()?;
        self.cache.set(&key, &result, Some(options.ttl));
        Ok(TaskOutcome::Executed(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn runner() -> IdempotentTaskRunner {
        IdempotentTaskRunner::new(Arc::new(VersionedCache::new(
            Arc::new(InMemoryCache::new()),
            1,
        )))
    }

    /// IT-001: same arguments execute the body exactly once
    #[test]
    fn test_duplicate_execution_skipped() {
        let runner = runner();
        let calls = AtomicU32::new(0);
        let args = json!({"employee": "a", "year": 2025, "month": 3});
        let options = TaskOptions::default();

        let body = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42u32)
        };
        let first = runner.run("recalc", &args, &options, body).unwrap();
        assert!(first.executed());

        let second = runner
            .run("recalc", &args, &options, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(42u32)
            })
            .unwrap();
        assert!(!second.executed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(second, TaskOutcome::Skipped(json!(42)));
    }

    /// IT-002: a failure never sets the key
    #[test]
    fn test_failure_allows_retry() {
        let runner = runner();
        let args = json!({"employee": "a"});
        let options = TaskOptions::default();

        let failed: EngineResult<TaskOutcome<u32>> =
            runner.run("recalc", &args, &options, || {
                Err(EngineError::Transient {
                    subsystem: "db".to_string(),
                    message: "connection dropped".to_string(),
                })
            });
        assert!(failed.is_err());

        let retried = runner.run("recalc", &args, &options, || Ok(7u32)).unwrap();
        assert!(retried.executed());
    }

    #[test]
    fn test_strict_mode_raises_on_duplicate() {
        let runner = runner();
        let args = json!({"report": "security"});
        let options = TaskOptions {
            skip_on_duplicate: false,
            ..TaskOptions::default()
        };

        runner.run("report", &args, &options, || Ok(1u32)).unwrap();
        let err = runner
            .run("report", &args, &options, || Ok(1u32))
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateExecution { .. }));
    }

    #[test]
    fn test_different_args_execute_independently() {
        let runner = runner();
        let options = TaskOptions::default();

        let a = runner
            .run("recalc", &json!({"month": 3}), &options, || Ok(1u32))
            .unwrap();
        let b = runner
            .run("recalc", &json!({"month": 4}), &options, || Ok(2u32))
            .unwrap();
        assert!(a.executed());
        assert!(b.executed());
    }

    #[test]
    fn test_key_format() {
        let args = json!({"employee": "a"});
        let key = IdempotentTaskRunner::key("recalc", &args, false);
        assert!(key.starts_with("idempotent:recalc:"));
        // task prefix, then a 16-hex-character digest.
        let digest = key.rsplit(':').next().unwrap();
        assert_eq!(digest.len(), 16);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_is_stable_for_equal_args() {
        let args = json!({"employee": "a", "month": 3});
        assert_eq!(
            IdempotentTaskRunner::key("recalc", &args, false),
            IdempotentTaskRunner::key("recalc", &args, false)
        );
    }

    #[test]
    fn test_date_based_key_carries_date() {
        let args = json!({});
        let key = IdempotentTaskRunner::key("cleanup", &args, true);
        let today = chrono::Local::now().date_naive().to_string();
        assert!(key.ends_with(&today));
    }

    #[test]
    fn test_expired_key_executes_again() {
        let runner = runner();
        let args = json!({"x": 1});
        let options = TaskOptions {
            ttl: Duration::ZERO,
            ..TaskOptions::default()
        };

        runner.run("recalc", &args, &options, || Ok(1u32)).unwrap();
        let second = runner.run("recalc", &args, &options, || Ok(2u32)).unwrap();
        assert!(second.executed());
    }
}
