//! Daily good-for-day expiry schedule.
//!
//! The expiry worker (see [`crate::engine`]) wakes once per trading day
//! at a configured local wall-clock instant and sweeps every resting
//! `GoodForDay` order. This module owns the configuration and the
//! instant arithmetic; both are pure and clock-free so the boundary
//! cases (day rollover, DST transitions) are testable.

use chrono::{DateTime, LocalResult, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::ExpiryError;

/// Engine configuration. Only the expiry schedule is configurable.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// IANA name of the zone the expiry instant is computed in.
    pub expiry_zone: String,
    /// Local wall-clock time of the daily sweep.
    pub expiry_time: NaiveTime,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            expiry_zone: "America/New_York".to_string(),
            expiry_time: session_close(),
        }
    }
}

/// 16:00, the equity session close.
pub fn session_close() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default()
}

/// A resolved expiry schedule: zone plus local fire time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ExpirySchedule {
    tz: Tz,
    time: NaiveTime,
}

impl ExpirySchedule {
    /// Resolve the configured zone against the bundled tz database. An
    /// unknown zone is fatal for the worker and reported to the host.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ExpiryError> {
        let tz = config
            .expiry_zone
            .parse::<Tz>()
            .map_err(|_| ExpiryError::TimezoneUnavailable(config.expiry_zone.clone()))?;
        Ok(ExpirySchedule {
            tz,
            time: config.expiry_time,
        })
    }

    /// Next instant at which the local wall clock reads the fire time.
    /// If `now` is at or past today's occurrence, the next calendar day
    /// is used.
    pub fn next_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_now = now.with_timezone(&self.tz);
        let mut date = local_now.date_naive();
        if local_now.time() >= self.time {
            date = match date.succ_opt() {
                Some(next) => next,
                None => return now,
            };
        }
        loop {
            match self.tz.from_local_datetime(&date.and_time(self.time)) {
                LocalResult::Single(instant) => return instant.with_timezone(&Utc),
                // Fall-back transition: the wall-clock time occurs twice;
                // the first occurrence closes the session.
                LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
                // Spring-forward gap: that wall-clock time never occurs.
                LocalResult::None => {
                    date = match date.succ_opt() {
                        Some(next) => next,
                        None => return now,
                    };
                }
            }
        }
    }
}
