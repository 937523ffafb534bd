/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The concrete wiring a running service supplies to the otherwise
//! environment-agnostic routing core: a monotonic clock, a transmit port,
//! and the RBBQ buffers that carry wire traffic between nodes.

use std::sync::Arc;
use std::time::Instant;

use mesh_core::port::Port;
use mesh_rbbq::{LoopbackTransport, Rbbq};

/// Const-generic bounds mirroring the protocol's compile-time defaults:
/// two path references per node, an eight-entry sequence-number cache.
pub const NODE_PATHS_MAX: usize = 2;
pub const SEQNO_CACHE_SIZE: usize = 8;

pub type Table = mesh_core::NodeTable<NODE_PATHS_MAX, SEQNO_CACHE_SIZE>;

/// Wall-clock-backed [`mesh_core::Clock`], monotonic from process start.
pub struct SystemClock(Instant);

impl SystemClock {
    pub fn new() -> Self {
        Self(Instant::now())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl mesh_core::Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        self.0.elapsed().as_millis() as i64
    }
}

/// A single loopback transmit port, used until a real link-layer device is
/// wired in; throughput is fixed, matching a well-provisioned link.
pub struct LoopbackPort {
    throughput: u8,
}

impl LoopbackPort {
    pub fn new(throughput: u8) -> Self {
        Self { throughput }
    }
}

impl Port for LoopbackPort {
    fn transmit_throughput(&self) -> u8 {
        self.throughput
    }
}

/// The single trait a concrete service implements to supply everything the
/// generic routing core and RBBQ layer need from their environment: a
/// clock, transmit ports, and the buffer used to move wire frames. Mirrors
/// the teacher's split `NodeInterface`/`SwitchInterface` injection, folded
/// into one trait since this service has only one host role to play.
pub trait MeshHostInterface {
    fn clock(&self) -> &dyn mesh_core::Clock;
    fn ports(&self) -> Vec<&dyn Port>;
    fn buffer(&self) -> &Rbbq<LoopbackTransport>;
}

/// Everything one running mesh node needs: its routing table, clock, and
/// the buffer it sends protocol frames on.
pub struct MeshHost {
    pub clock: SystemClock,
    pub table: Table,
    pub port: LoopbackPort,
    pub buffer: Arc<Rbbq<LoopbackTransport>>,
}

impl MeshHost {
    pub fn new(local_node_id: mesh_core::NodeId, node_count: usize, buffer: Arc<Rbbq<LoopbackTransport>>) -> Self {
        Self { clock: SystemClock::new(), table: Table::new(node_count, local_node_id), port: LoopbackPort::new(100), buffer }
    }
}

impl MeshHostInterface for MeshHost {
    fn clock(&self) -> &dyn mesh_core::Clock {
        &self.clock
    }

    fn ports(&self) -> Vec<&dyn Port> {
        vec![&self.port]
    }

    fn buffer(&self) -> &Rbbq<LoopbackTransport> {
        &self.buffer
    }
}
