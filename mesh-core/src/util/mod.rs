/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod gate;

/// Returns a `[START..START+LEN]` sub-slice as a fixed-size array reference.
#[inline(always)]
pub fn byte_array_range<const A: usize, const START: usize, const LEN: usize>(a: &[u8; A]) -> &[u8; LEN] {
    assert!(START + LEN <= A);
    unsafe { &*a.as_ptr().add(START).cast::<[u8; LEN]>() }
}
