/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Port identity and the throughput probe used by best-next-hop selection.

/// Index into the node's fixed port array.
pub type PortId = u8;

/// Sentinel throughput value meaning "unused slot" in a path entry.
pub const THROUGHPUT_UNUSED: u8 = 0xFF;

/// A transport endpoint the routing core can address by `PortId`.
///
/// Everything about actually moving bytes (open/close/send/receive) is an
/// external collaborator out of scope here; the core only needs to know how
/// fast a direct link currently looks, for best-next-hop comparisons and the
/// hop-penalty calculation in originator updates.
pub trait Port {
    /// Current observed throughput of this port's direct link, in whatever
    /// data-rate code the host assigns (0xFF is reserved and must not be
    /// returned by a real port).
    fn transmit_throughput(&self) -> u8;
}

/// Validates that `port_id` indexes a port actually present in `ports`.
#[inline(always)]
pub fn validate_port_id(ports: &[&dyn Port], port_id: PortId) -> bool {
    (port_id as usize) < ports.len()
}
