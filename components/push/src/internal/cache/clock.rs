/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

/// Wall-clock seconds used to age cache entries.
pub trait Clock: Send + Sync + 'static {
    fn now_epoch_seconds(&self) -> i64;
}

/// The system clock.
pub struct CacheClock;

impl Clock for CacheClock {
    fn now_epoch_seconds(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[cfg(test)]
pub use self::testing::TestClock;
