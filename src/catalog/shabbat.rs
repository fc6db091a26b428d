//! Shabbat window computation.
//!
//! Shabbat runs from Friday sunset minus the candle-lighting offset to
//! Saturday sunset plus the havdalah offset. The offsets come from
//! configuration (defaults 18 and 40 minutes).

use chrono::{Duration, NaiveDateTime};

use crate::config::SabbathConfig;

/// A computed Shabbat window for one weekend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShabbatWindow {
    /// Shabbat start: Friday sunset minus the candle-lighting offset.
    pub start: NaiveDateTime,
    /// Shabbat end: Saturday sunset plus the havdalah offset.
    pub end: NaiveDateTime,
}

impl ShabbatWindow {
    /// Computes the window from the two sunsets and the configured
    /// offsets.
    pub fn from_sunsets(
        friday_sunset: NaiveDateTime,
        saturday_sunset: NaiveDateTime,
        config: &SabbathConfig,
    ) -> Self {
        Self {
            start: friday_sunset - Duration::minutes(config.candle_offset_minutes),
            end: saturday_sunset + Duration::minutes(config.havdalah_offset_minutes),
        }
    }

    /// Returns true if the instant falls inside the window.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.start && at < self.end
    }
}
