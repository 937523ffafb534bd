/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The buffer lifecycle state machine, CAS-guarded so `init`/`start`/`stop`
//! can be called from whatever thread owns the device hooks without an
//! external lock.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BufferState {
    None = 0,
    Init = 1,
    Ready = 2,
    Start = 3,
    Running = 4,
    Stop = 5,
    Suspended = 6,
}

impl BufferState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => BufferState::None,
            1 => BufferState::Init,
            2 => BufferState::Ready,
            3 => BufferState::Start,
            4 => BufferState::Running,
            5 => BufferState::Stop,
            6 => BufferState::Suspended,
            _ => unreachable!("buffer state byte out of range"),
        }
    }
}

pub struct AtomicBufferState(AtomicU8);

impl AtomicBufferState {
    pub fn new(initial: BufferState) -> Self {
        Self(AtomicU8::new(initial as u8))
    }

    #[inline(always)]
    pub fn load(&self) -> BufferState {
        BufferState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline(always)]
    fn store(&self, s: BufferState) {
        self.0.store(s as u8, Ordering::Release);
    }

    /// Transitions `from -> to` iff currently in `from`; mirrors the
    /// compare-and-swap guard every lifecycle entry point performs before
    /// touching device hooks.
    pub fn transition(&self, from: BufferState, to: BufferState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Transitions out of any of `from` into `to`, used by `stop()` which
    /// accepts either `Running` or `Start` as its source state.
    pub fn transition_any(&self, from: &[BufferState], to: BufferState) -> bool {
        for &f in from {
            if self.transition(f, to) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarded_transition_only_succeeds_from_expected_state() {
        let s = AtomicBufferState::new(BufferState::None);
        assert!(!s.transition(BufferState::Ready, BufferState::Start));
        assert!(s.transition(BufferState::None, BufferState::Init));
        assert_eq!(s.load(), BufferState::Init);
    }

    #[test]
    fn transition_any_accepts_multiple_sources() {
        let s = AtomicBufferState::new(BufferState::Start);
        assert!(s.transition_any(&[BufferState::Running, BufferState::Start], BufferState::Stop));
        assert_eq!(s.load(), BufferState::Stop);
    }
}
