//! Configuration types for the work-time and payroll engine.
//!
//! These structures are deserialized from the `engine.yaml` configuration
//! file. Every section has statutory or operational defaults so a missing
//! file yields a fully working engine.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Cache namespace and TTL configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Integer appended to every cache key; bump to invalidate all entries.
    pub version: u32,
    /// Holiday cache TTL in seconds.
    pub ttl_holidays_secs: u64,
    /// Monthly summary cache TTL in seconds.
    pub ttl_monthly_summary_secs: u64,
    /// Sun-times cache TTL in seconds; zero means no expiry.
    pub ttl_sun_times_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: 1,
            ttl_holidays_secs: 7 * 24 * 3600,
            ttl_monthly_summary_secs: 3600,
            ttl_sun_times_secs: 0,
        }
    }
}

/// Daily overtime tier thresholds, in hours from the start of the workday.
///
/// Hours below `t1` are paid at the base rate; each threshold opens the
/// next tier.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OvertimeTiers {
    /// First overtime threshold (base rate below this).
    pub t1: Decimal,
    /// Second overtime threshold.
    pub t2: Decimal,
    /// Third overtime threshold.
    pub t3: Decimal,
    /// Fourth overtime threshold; also the daily violation boundary.
    pub t4: Decimal,
}

impl Default for OvertimeTiers {
    fn default() -> Self {
        Self {
            t1: Decimal::new(86, 1),
            t2: Decimal::new(106, 1),
            t3: Decimal::new(126, 1),
            t4: Decimal::new(160, 1),
        }
    }
}

/// Payroll calculation configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PayrollConfig {
    /// Daily overtime tier thresholds.
    pub overtime_tiers: OvertimeTiers,
    /// Multiplier for overtime tier 1.
    pub multiplier_t1: Decimal,
    /// Multiplier for overtime tier 2.
    pub multiplier_t2: Decimal,
    /// Multiplier for overtime tier 3.
    pub multiplier_t3: Decimal,
    /// Multiplier for overtime tier 4.
    pub multiplier_t4: Decimal,
    /// Base multiplier for hours inside Shabbat or holiday windows.
    pub sabbath_multiplier: Decimal,
    /// Maximum overtime hours per ISO week before a compliance warning.
    pub weekly_overtime_cap: Decimal,
    /// Statutory monthly hours used to derive an effective hourly rate for
    /// monthly-salary employees.
    pub standard_monthly_hours: Decimal,
    /// Daily hours that trigger a long-day warning.
    pub daily_warning_hours: Decimal,
    /// Daily hours beyond which `long_shift_acknowledged` is required.
    pub daily_violation_hours: Decimal,
}

impl Default for PayrollConfig {
    fn default() -> Self {
        Self {
            overtime_tiers: OvertimeTiers::default(),
            multiplier_t1: Decimal::new(125, 2),
            multiplier_t2: Decimal::new(150, 2),
            multiplier_t3: Decimal::new(175, 2),
            multiplier_t4: Decimal::new(200, 2),
            sabbath_multiplier: Decimal::new(150, 2),
            weekly_overtime_cap: Decimal::new(16, 0),
            standard_monthly_hours: Decimal::new(185, 0),
            daily_warning_hours: Decimal::new(12, 0),
            daily_violation_hours: Decimal::new(16, 0),
        }
    }
}

/// Shabbat window offsets.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SabbathConfig {
    /// Minutes before Friday sunset at which Shabbat begins.
    pub candle_offset_minutes: i64,
    /// Minutes after Saturday sunset at which Shabbat ends.
    pub havdalah_offset_minutes: i64,
}

impl Default for SabbathConfig {
    fn default() -> Self {
        Self {
            candle_offset_minutes: 18,
            havdalah_offset_minutes: 40,
        }
    }
}

/// Adaptive executor thresholds for bulk calculation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    /// Batches smaller than this run sequentially.
    pub thread_cutoff: usize,
    /// Batches at or beyond this would use process workers where the
    /// runtime supports them; the in-process pool serves them otherwise.
    pub process_cutoff: usize,
    /// Upper bound on worker threads.
    pub max_workers: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            thread_cutoff: 10,
            process_cutoff: 50,
            max_workers: 8,
        }
    }
}

/// Idempotent task TTLs, in hours.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdempotencyConfig {
    /// Default TTL for tasks without an override.
    pub default_ttl_hours: u64,
    /// TTL for critical alert notifications.
    pub alert_ttl_hours: u64,
    /// TTL for nightly cleanup jobs.
    pub cleanup_ttl_hours: u64,
    /// TTL for payroll recompute tasks.
    pub payroll_ttl_hours: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            default_ttl_hours: 24,
            alert_ttl_hours: 24,
            cleanup_ttl_hours: 48,
            payroll_ttl_hours: 72,
        }
    }
}

/// Retention policy for soft-deleted rows.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Days a soft-deleted work log is kept before the purge job may
    /// hard-delete it.
    pub soft_deleted_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            soft_deleted_days: 365,
        }
    }
}

/// Default location for sun-time queries without an explicit position.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Default latitude in degrees.
    pub latitude: f64,
    /// Default longitude in degrees.
    pub longitude: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: 32.08,
            longitude: 34.78,
        }
    }
}

/// The complete engine configuration.
///
/// # Example
///
/// ```
/// use worktime_engine::config::EngineConfig;
/// use rust_decimal::Decimal;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.cache.version, 1);
/// assert_eq!(config.payroll.overtime_tiers.t1, Decimal::new(86, 1));
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cache namespace and TTLs.
    pub cache: CacheConfig,
    /// Payroll thresholds and multipliers.
    pub payroll: PayrollConfig,
    /// Shabbat window offsets.
    pub sabbath: SabbathConfig,
    /// Bulk executor thresholds.
    pub bulk: BulkConfig,
    /// Idempotent task TTLs.
    pub idempotency: IdempotencyConfig,
    /// Soft-delete retention policy.
    pub retention: RetentionConfig,
    /// Default query location.
    pub location: LocationConfig,
}

impl EngineConfig {
    /// Validates cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        let tiers = &self.payroll.overtime_tiers;
        if !(tiers.t1 < tiers.t2 && tiers.t2 < tiers.t3 && tiers.t3 < tiers.t4) {
            return Err("overtime tier thresholds must be strictly increasing".to_string());
        }
        let one = Decimal::ONE;
        for (name, m) in [
            ("multiplier_t1", self.payroll.multiplier_t1),
            ("multiplier_t2", self.payroll.multiplier_t2),
            ("multiplier_t3", self.payroll.multiplier_t3),
            ("multiplier_t4", self.payroll.multiplier_t4),
            ("sabbath_multiplier", self.payroll.sabbath_multiplier),
        ] {
            if m < one {
                return Err(format!("{name} must be at least 1.00"));
            }
        }
        if self.payroll.standard_monthly_hours <= Decimal::ZERO {
            return Err("standard_monthly_hours must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_tier_thresholds() {
        let tiers = OvertimeTiers::default();
        assert_eq!(tiers.t1, Decimal::new(86, 1));
        assert_eq!(tiers.t2, Decimal::new(106, 1));
        assert_eq!(tiers.t3, Decimal::new(126, 1));
        assert_eq!(tiers.t4, Decimal::new(160, 1));
    }

    #[test]
    fn test_non_increasing_thresholds_rejected() {
        let mut config = EngineConfig::default();
        config.payroll.overtime_tiers.t2 = Decimal::new(80, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sub_unit_multiplier_rejected() {
        let mut config = EngineConfig::default();
        config.payroll.multiplier_t1 = Decimal::new(90, 2);
        let err = config.validate().unwrap_err();
        assert!(err.contains("multiplier_t1"));
    }

    #[test]
    fn test_zero_standard_hours_rejected() {
        let mut config = EngineConfig::default();
        config.payroll.standard_monthly_hours = Decimal::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_section_defaults() {
        let yaml = r#"
cache:
  version: 7
payroll:
  weekly_overtime_cap: "20"
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.cache.version, 7);
        assert_eq!(config.cache.ttl_holidays_secs, 7 * 24 * 3600);
        assert_eq!(config.payroll.weekly_overtime_cap, Decimal::new(20, 0));
        assert_eq!(config.payroll.standard_monthly_hours, Decimal::new(185, 0));
        assert_eq!(config.sabbath.candle_offset_minutes, 18);
    }

    #[test]
    fn test_default_shabbat_offsets() {
        let sabbath = SabbathConfig::default();
        assert_eq!(sabbath.candle_offset_minutes, 18);
        assert_eq!(sabbath.havdalah_offset_minutes, 40);
    }

    #[test]
    fn test_default_idempotency_ttls() {
        let idem = IdempotencyConfig::default();
        assert_eq!(idem.default_ttl_hours, 24);
        assert_eq!(idem.cleanup_ttl_hours, 48);
        assert_eq!(idem.payroll_ttl_hours, 72);
    }
}
