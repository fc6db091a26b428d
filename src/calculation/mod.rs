//! Calculation logic for the work-time and payroll engine.
//!
//! This module contains the shift splitter, the daily overtime tier
//! bands, the prefetched month context, and the payroll strategy that
//! assembles a monthly result from classified segments.

mod context;
mod splitter;
mod strategy;
mod tiers;

pub use context::{MonthContext, PremiumKind, PremiumWindow};
pub use splitter::{split_shift, DayTally};
pub use strategy::{CalcOptions, PayrollStrategy};
pub use tiers::{BandSpan, OvertimeBands};
