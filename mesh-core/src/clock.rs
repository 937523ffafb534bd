/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Monotonic clock injection and node identity.

/// Opaque 64-bit node identifier, compared only by value equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct NodeId(pub u64);

impl NodeId {
    #[inline(always)]
    pub fn equals(&self, other: &NodeId) -> bool {
        self.0 == other.0
    }
}

impl From<u64> for NodeId {
    #[inline(always)]
    fn from(v: u64) -> Self {
        NodeId(v)
    }
}

/// Supplies the routing core with monotonic milliseconds. Implementations
/// back this with whatever the host platform offers (`Instant`, an RTC tick
/// counter, a fake clock in tests); the core never calls into the OS clock
/// directly so that table logic stays deterministic under test.
pub trait Clock {
    /// Monotonically non-decreasing milliseconds since an arbitrary epoch.
    fn now_ms(&self) -> i64;
}

/// A clock driven entirely by test code; never advances on its own.
#[cfg(test)]
pub struct FakeClock(std::cell::Cell<i64>);

#[cfg(test)]
impl FakeClock {
    pub fn new(start_ms: i64) -> Self {
        Self(std::cell::Cell::new(start_ms))
    }

    pub fn advance(&self, delta_ms: i64) {
        self.0.set(self.0.get() + delta_ms);
    }
}

#[cfg(test)]
impl Clock for FakeClock {
    fn now_ms(&self) -> i64 {
        self.0.get()
    }
}
