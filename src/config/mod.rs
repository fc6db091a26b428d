//! Engine configuration.
//!
//! Configuration is loaded once at process startup from a YAML file and is
//! immutable afterwards. A `cache.version` bump is the supported way to
//! invalidate every cached entry without pattern deletion.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    BulkConfig, CacheConfig, EngineConfig, IdempotencyConfig, LocationConfig, OvertimeTiers,
    PayrollConfig, RetentionConfig, SabbathConfig,
};
