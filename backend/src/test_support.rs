//! Test utilities for the backend crate.
//!
//! Only compiled for unit tests.

use std::sync::Mutex;

use chrono::{DateTime, Local, Utc};
use mockable::Clock;

/// Clock whose current instant is set explicitly by the test.
#[derive(Debug)]
pub struct MutableClock {
    now: Mutex<DateTime<Utc>>,
}

impl MutableClock {
    /// Clock frozen at an RFC 3339 instant.
    pub fn at(rfc3339: &str) -> Self {
        let now = DateTime::parse_from_rfc3339(rfc3339)
            .expect("valid RFC 3339 instant")
            .with_timezone(&Utc);
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock lock") = now;
    }

    /// Current frozen instant.
    pub fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.now().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.now()
    }
}
