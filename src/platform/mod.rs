//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Wall-clock time (used for timestamps, expiry and date rules)
//! - Opening the cookie/LocalStorage backing stores

use std::cell::Cell;

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::WizardConfig;
use crate::store::BackingStore;

/// Source of "now" for everything that stamps or compares dates
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date of `now`
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Milliseconds since the Unix epoch, the unit controllers tick in
    fn now_ms(&self) -> u64 {
        self.now().timestamp_millis().max(0) as u64
    }
}

/// Real time (chrono uses `Date.now()` on wasm via `wasmbind`)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Cell::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now.set(self.now.get() + chrono::Duration::milliseconds(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Open the (primary, secondary) backing stores for this platform.
///
/// Browser: `document.cookie` then LocalStorage. Native: an in-memory cookie
/// jar then an in-memory map, which is enough for the demo binary.
#[cfg(target_arch = "wasm32")]
pub fn open_stores(config: &WizardConfig) -> (Box<dyn BackingStore>, Box<dyn BackingStore>) {
    use crate::store::{DocumentCookies, LocalStorage};

    (
        Box::new(DocumentCookies::new(config.cookie_capacity)),
        Box::new(LocalStorage::new()),
    )
}

#[cfg(not(target_arch = "wasm32"))]
pub fn open_stores(config: &WizardConfig) -> (Box<dyn BackingStore>, Box<dyn BackingStore>) {
    use crate::store::{CookieJar, MemoryStore};

    (
        Box::new(CookieJar::with_capacity(config.cookie_capacity)),
        Box::new(MemoryStore::new()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let start = DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let clock = ManualClock::new(start);
        let before = clock.now_ms();
        clock.advance_ms(1500);
        assert_eq!(clock.now_ms() - before, 1500);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    }
}
