/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::sync::atomic::{AtomicI64, Ordering};

/// Boolean rate limiter with normal (non-atomic) semantics, used to pace a
/// single-threaded background task such as the heartbeat or eviction sweep.
#[repr(transparent)]
pub struct IntervalGate<const FREQ_MS: i64>(i64);

impl<const FREQ_MS: i64> Default for IntervalGate<FREQ_MS> {
    #[inline(always)]
    fn default() -> Self {
        Self(0)
    }
}

impl<const FREQ_MS: i64> IntervalGate<FREQ_MS> {
    #[inline(always)]
    pub fn new(initial_ts: i64) -> Self {
        Self(initial_ts)
    }

    #[inline(always)]
    pub fn gate(&mut self, time: i64) -> bool {
        if (time - self.0) >= FREQ_MS {
            self.0 = time;
            true
        } else {
            false
        }
    }
}

/// Boolean rate limiter with atomic semantics, safe to share across tasks
/// servicing independent mesh contexts.
#[repr(transparent)]
pub struct AtomicIntervalGate<const FREQ_MS: i64>(AtomicI64);

impl<const FREQ_MS: i64> Default for AtomicIntervalGate<FREQ_MS> {
    #[inline(always)]
    fn default() -> Self {
        Self(AtomicI64::new(0))
    }
}

impl<const FREQ_MS: i64> AtomicIntervalGate<FREQ_MS> {
    #[inline(always)]
    pub fn new(initial_ts: i64) -> Self {
        Self(AtomicI64::new(initial_ts))
    }

    #[inline(always)]
    pub fn gate(&self, time: i64) -> bool {
        let prev = self.0.load(Ordering::Acquire);
        if (time - prev) < FREQ_MS {
            false
        } else {
            self.0.store(time, Ordering::Release);
            true
        }
    }
}

unsafe impl<const FREQ_MS: i64> Send for AtomicIntervalGate<FREQ_MS> {}
unsafe impl<const FREQ_MS: i64> Sync for AtomicIntervalGate<FREQ_MS> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gates_at_interval() {
        let mut g = IntervalGate::<1000>::new(0);
        assert!(!g.gate(500));
        assert!(g.gate(1000));
        assert!(!g.gate(1999));
        assert!(g.gate(2000));
    }
}
