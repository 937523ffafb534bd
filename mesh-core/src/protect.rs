/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Per-node sliding window of recently observed sequence numbers
//! (replay/duplicate/stale protection).

use crate::error::{MeshError, Result};

/// Sequence numbers are a 5-bit counter; the upper 3 bits are reserved and
/// any observed value above this is a protocol violation.
pub const SEQNO_MAX: u8 = 23;
/// Sentinel marking a cache slot (or the window itself) as never populated.
pub const SEQNO_INVALID: u8 = 0xFF;

pub const DEFAULT_EXPECTED_RANGE: u8 = 10;
pub const DEFAULT_MAX_AGE_MS: i64 = 3_000;

/// Ring of the last `C` observed sequence numbers for one remote node.
#[derive(Clone, Debug)]
pub struct ProtectWindow<const C: usize> {
    cache: [u8; C],
    last_idx: u8,
    last_seen_time: i64,
    expected_range: u8,
    max_age_ms: i64,
}

impl<const C: usize> ProtectWindow<C> {
    /// A node-table slot that holds no window at all: `last_idx` is placed
    /// out of range so [`Self::is_empty`] holds. This is the representation
    /// of an unused (freed) node-table entry.
    pub fn unused() -> Self {
        Self {
            cache: [SEQNO_INVALID; C],
            last_idx: C as u8,
            last_seen_time: 0,
            expected_range: DEFAULT_EXPECTED_RANGE,
            max_age_ms: DEFAULT_MAX_AGE_MS,
        }
    }

    /// A window for a freshly created node entry: occupied, but no
    /// sequence number has been observed yet.
    pub fn phantom() -> Self {
        Self { last_idx: 0, last_seen_time: 0, ..Self::unused() }
    }

    pub fn with_tunables(expected_range: u8, max_age_ms: i64) -> Self {
        Self { expected_range, max_age_ms, ..Self::unused() }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        (self.last_idx as usize) >= C
    }

    #[inline(always)]
    pub fn last_seen_time(&self) -> i64 {
        self.last_seen_time
    }

    /// Stamps the last-seen time without admitting a new sequence number,
    /// used to keep a router's eviction priority fresh from the traffic it
    /// forwards on behalf of others.
    #[inline(always)]
    pub fn touch_last_seen(&mut self, now_ms: i64) {
        self.last_seen_time = now_ms;
    }

    fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.last_seen_time
    }

    /// The most recently accepted sequence number, if the window is
    /// populated and not stale.
    pub fn latest(&self, now_ms: i64) -> Result<u8> {
        if self.is_empty() {
            return Err(MeshError::NotAvailable);
        }
        if self.age_ms(now_ms) > self.max_age_ms {
            return Err(MeshError::TimedOut);
        }
        let v = self.cache[self.last_idx as usize];
        if v == SEQNO_INVALID {
            // phantom node: occupies a slot but has never seen a statement
            return Err(MeshError::NotAvailable);
        }
        if v > SEQNO_MAX {
            return Err(MeshError::Fault);
        }
        Ok(v)
    }

    /// Distance travelled forward from `from` to `to` on the 24-point circle.
    fn forward_distance(from: u8, to: u8) -> u8 {
        let span = SEQNO_MAX as u16 + 1;
        (((to as u16 + span) - from as u16) % span) as u8
    }

    /// Whether `seqno` lies in the circular arc `[last - range, last + range]`.
    fn in_expected_range(last: u8, seqno: u8, range: u8) -> bool {
        let span = SEQNO_MAX as i32 + 1;
        let low = (last as i32 - range as i32).rem_euclid(span) as u8;
        Self::forward_distance(low, seqno) as u16 <= (2 * range as u16)
    }

    /// Admits `seqno` into the window, rejecting replays and out-of-range
    /// jumps, and resetting a stale window so a long-silent node can rejoin.
    pub fn update(&mut self, seqno: u8, now_ms: i64) -> Result<()> {
        match self.latest(now_ms) {
            Ok(last) => {
                if !Self::in_expected_range(last, seqno, self.expected_range) {
                    return Err(MeshError::Invalid);
                }
                if self.cache.contains(&seqno) {
                    return Err(MeshError::AlreadyPresent);
                }
            }
            Err(MeshError::TimedOut) => {
                self.cache = [SEQNO_INVALID; C];
            }
            Err(MeshError::NotAvailable) => {}
            Err(e) => return Err(e),
        }
        let next_idx = if self.is_empty() { 0 } else { (self.last_idx as usize + 1) % C };
        self.cache[next_idx] = seqno;
        self.last_idx = next_idx as u8;
        self.last_seen_time = now_ms;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seqno_wrap_accepts_forward_progress() {
        let mut w: ProtectWindow<8> = ProtectWindow::unused();
        assert!(w.update(22, 0).is_ok());
        assert!(w.update(23, 1).is_ok());
        assert!(w.update(0, 2).is_ok());
        assert!(w.update(1, 3).is_ok());
    }

    #[test]
    fn seqno_far_jump_is_out_of_range() {
        let mut w: ProtectWindow<8> = ProtectWindow::unused();
        w.update(22, 0).unwrap();
        assert_eq!(w.update(11, 1), Err(MeshError::Invalid));
    }

    #[test]
    fn stale_window_resets_on_next_update() {
        let mut w: ProtectWindow<8> = ProtectWindow::unused();
        w.update(5, 0).unwrap();
        // older than max age: any seqno accepted
        assert!(w.update(17, DEFAULT_MAX_AGE_MS + 1).is_ok());
    }

    #[test]
    fn duplicate_seqno_is_rejected_without_mutating_last_idx() {
        let mut w: ProtectWindow<8> = ProtectWindow::unused();
        w.update(5, 0).unwrap();
        let idx_before = w.last_idx;
        assert_eq!(w.update(5, 1), Err(MeshError::AlreadyPresent));
        assert_eq!(w.last_idx, idx_before);
    }
}
