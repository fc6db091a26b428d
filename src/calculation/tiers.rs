//! Daily overtime tier bands.
//!
//! A workday is divided into bands by the configured thresholds: hours
//! below the first threshold pay the base rate, and each threshold opens
//! the next tier. The walk is position-aware, so a shift that starts
//! after earlier shifts on the same day continues from the accumulated
//! daily total rather than restarting at zero.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::config::PayrollConfig;

/// A contiguous span of minutes inside one overtime band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandSpan {
    /// Band index: 0 is base rate, 1–4 are overtime tiers.
    pub band: usize,
    /// Minutes spent in the band.
    pub minutes: i64,
}

/// The configured tier thresholds, in minutes from the start of the
/// workday.
#[derive(Debug, Clone, Copy)]
pub struct OvertimeBands {
    thresholds: [i64; 4],
}

impl OvertimeBands {
    /// Builds the bands from the payroll configuration.
    pub fn from_config(payroll: &PayrollConfig) -> Self {
        let to_minutes = |hours: Decimal| -> i64 {
            (hours * Decimal::from(60))
                .round()
                .to_i64()
                .unwrap_or(i64::MAX)
        };
        let tiers = &payroll.overtime_tiers;
        Self {
            thresholds: [
                to_minutes(tiers.t1),
                to_minutes(tiers.t2),
                to_minutes(tiers.t3),
                to_minutes(tiers.t4),
            ],
        }
    }

    /// The band index at a given accumulated daily minute count.
    pub fn band_at(&self, minutes: i64) -> usize {
        self.thresholds
            .iter()
            .position(|t| minutes < *t)
            .unwrap_or(self.thresholds.len())
    }

    /// Splits a span of `length_minutes` starting at daily offset
    /// `start_minutes` into per-band spans, in band order.
    pub fn split(&self, start_minutes: i64, length_minutes: i64) -> Vec<BandSpan> {
        let mut spans = Vec::new();
        let mut position = start_minutes;
        let mut remaining = length_minutes;

        while remaining > 0 {
            let band = self.band_at(position);
            let take = match self.thresholds.get(band) {
                Some(end) => remaining.min(end - position),
                None => remaining,
            };
            spans.push(BandSpan {
                band,
                minutes: take,
            });
            position += take;
            remaining -= take;
        }
        spans
    }
}
