/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Directory of remote nodes: the orchestrator that ties identity,
//! protection windows, and the path table together into heartbeat and
//! originator statement handling, best-next-hop lookup, and LRU eviction.

use crate::clock::NodeId;
use crate::error::{MeshError, Result};
use crate::path::{PathEntry, PathTable, PATH_REF_EMPTY};
use crate::port::{Port, PortId, THROUGHPUT_UNUSED};
use crate::protect::ProtectWindow;
use crate::PROTOCOL_VERSION;

/// `paths_refs[NODE_PATHS_BEST]` is reserved for the current best-next-hop.
pub const NODE_PATHS_BEST: usize = 0;
/// 32-bit sentinel meaning "no name mapping known yet".
pub const NAME_MAPPING_ID_INVALID: u32 = u32::MAX;

#[derive(Clone)]
struct Node<const P: usize, const C: usize> {
    node_id: NodeId,
    name_mapping_id: u32,
    protect: ProtectWindow<C>,
    paths_refs: [u16; P],
}

impl<const P: usize, const C: usize> Node<P, C> {
    fn unused() -> Self {
        Self { node_id: NodeId(0), name_mapping_id: NAME_MAPPING_ID_INVALID, protect: ProtectWindow::unused(), paths_refs: [PATH_REF_EMPTY; P] }
    }

    #[inline(always)]
    fn is_empty(&self) -> bool {
        self.protect.is_empty()
    }
}

/// A bounded, single-context directory of remote nodes.
///
/// `N` is the node-table capacity (also the path-table capacity, since each
/// path belongs to exactly one node), `P` the number of path references a
/// node may hold, and `C` the protection-window cache size.
pub struct NodeTable<const P: usize, const C: usize> {
    local_node_id: NodeId,
    nodes: Vec<Node<P, C>>,
    paths: PathTable,
}

impl<const P: usize, const C: usize> NodeTable<P, C> {
    pub fn new(capacity: usize, local_node_id: NodeId) -> Self {
        assert!(capacity > 0, "node table capacity must be non-zero");
        Self { local_node_id, nodes: (0..capacity).map(|_| Node::unused()).collect(), paths: PathTable::new(capacity) }
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    fn find(&self, node_id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| !n.is_empty() && n.node_id.equals(&node_id))
    }

    /// Non-allocating lookup: `NotFound` instead of creating a phantom entry.
    pub fn node_lookup(&self, node_id: NodeId) -> Result<u16> {
        self.find(node_id).map(|i| i as u16).ok_or(MeshError::NotFound)
    }

    /// Finds `node_id`, or creates a phantom entry for it, evicting the
    /// least-recently-seen node if the table is full.
    pub fn node_get(&mut self, node_id: NodeId) -> u16 {
        if let Some(idx) = self.find(node_id) {
            return idx as u16;
        }
        let idx = match self.nodes.iter().position(Node::is_empty) {
            Some(i) => i,
            None => {
                let victim = self.node_evict();
                self.node_free(victim);
                victim as usize
            }
        };
        self.nodes[idx] = Node { node_id, name_mapping_id: NAME_MAPPING_ID_INVALID, protect: ProtectWindow::phantom(), paths_refs: [PATH_REF_EMPTY; P] };
        idx as u16
    }

    /// Releases a node's path slots (cascading to orphan any originator that
    /// routed through it) and marks the slot free.
    pub fn node_free(&mut self, node_idx: u16) {
        let node_idx = node_idx as usize;
        let refs = self.nodes[node_idx].paths_refs;

        for &path_idx in refs.iter() {
            if path_idx == PATH_REF_EMPTY {
                continue;
            }
            if let PathEntry::Neighbour { .. } = self.paths.get(path_idx) {
                self.orphan_originators_routed_through(node_idx);
            }
            self.paths.free(path_idx);
        }

        self.nodes[node_idx].protect = ProtectWindow::unused();
    }

    /// For every other node with an originator path whose router is
    /// `router_node_idx`, clears the reference and frees the path slot.
    fn orphan_originators_routed_through(&mut self, router_node_idx: usize) {
        for other_idx in 0..self.nodes.len() {
            if other_idx == router_node_idx || self.nodes[other_idx].is_empty() {
                continue;
            }
            for ref_i in 0..P {
                let path_idx = self.nodes[other_idx].paths_refs[ref_i];
                if path_idx == PATH_REF_EMPTY {
                    continue;
                }
                if let PathEntry::Originator { router_idx, .. } = self.paths.get(path_idx) {
                    if router_idx as usize == router_node_idx {
                        self.nodes[other_idx].paths_refs[ref_i] = PATH_REF_EMPTY;
                        self.paths.free(path_idx);
                        if ref_i == NODE_PATHS_BEST {
                            log::debug!("best next hop of node index {} orphaned", other_idx);
                        }
                    }
                }
            }
        }
    }

    /// Selects the node with the smallest `last_seen_time` for eviction.
    /// Only valid to call when the table is known to be full.
    pub fn node_evict(&mut self) -> u16 {
        self.nodes
            .iter()
            .enumerate()
            .min_by_key(|(_, n)| n.protect.last_seen_time())
            .map(|(i, _)| i as u16)
            .expect("node table has non-zero capacity")
    }

    /// Resolves the current best-next-hop path for `node_idx`.
    pub fn best_next_hop(&self, node_idx: u16, ports: &[&dyn Port]) -> Result<(u16, u8)> {
        let best_path = self.nodes[node_idx as usize].paths_refs[NODE_PATHS_BEST];
        if best_path == PATH_REF_EMPTY {
            return Err(MeshError::NoLink);
        }
        match self.paths.get(best_path) {
            PathEntry::Neighbour { port_id, .. } => {
                let throughput = ports.get(port_id as usize).ok_or(MeshError::Fault)?.transmit_throughput();
                Ok((node_idx, throughput))
            }
            PathEntry::Originator { router_idx, throughput } => Ok((router_idx, throughput)),
            PathEntry::Free => Err(MeshError::Fault),
        }
    }

    /// Swaps BEST to `candidate_path_idx` if it beats the current BEST's
    /// throughput, mirroring the rule shared by neighbour- and
    /// originator-update.
    fn maybe_promote_best(&mut self, node_idx: u16, candidate_path_idx: u16, candidate_throughput: u8, ports: &[&dyn Port]) {
        let refs = &mut self.nodes[node_idx as usize].paths_refs;
        let best_path = refs[NODE_PATHS_BEST];

        if best_path == candidate_path_idx {
            return;
        }

        let current_best_throughput = if best_path == PATH_REF_EMPTY {
            None
        } else {
            match self.paths.get(best_path) {
                PathEntry::Neighbour { port_id, .. } => ports.get(port_id as usize).map(|p| p.transmit_throughput()),
                PathEntry::Originator { throughput, .. } => Some(throughput),
                PathEntry::Free => None,
            }
        };

        let promote = match current_best_throughput {
            None => true,
            Some(cur) => candidate_throughput > cur,
        };
        if !promote {
            return;
        }

        if let Some(alt_i) = refs.iter().position(|&r| r == candidate_path_idx) {
            refs.swap(NODE_PATHS_BEST, alt_i);
        }
    }

    /// Applies a heartbeat statement from a directly reachable neighbour.
    pub fn neighbour_update(&mut self, seqno: u8, node_id: NodeId, version: u8, period_s: u8, name_mapping_id: u32, port_id: PortId, ports: &[&dyn Port], now_ms: i64) -> Result<()> {
        if version != PROTOCOL_VERSION {
            log::debug!("dropping heartbeat with unsupported version {}", version);
            return Ok(());
        }
        if node_id.equals(&self.local_node_id) {
            log::debug!("dropping self-originated heartbeat");
            return Ok(());
        }
        if !crate::port::validate_port_id(ports, port_id) {
            return Err(MeshError::Invalid);
        }

        let node_idx = self.node_get(node_id);
        let (path_idx, _created) = self.paths.get_neighbour(&mut self.nodes[node_idx as usize].paths_refs, port_id)?;

        // The protection-window result is intentionally ignored here: even
        // an out-of-range seqno still updates the neighbour's fields and
        // best-next-hop below. Originator updates do not share this quirk.
        let _ = self.nodes[node_idx as usize].protect.update(seqno, now_ms);

        self.nodes[node_idx as usize].name_mapping_id = name_mapping_id;
        self.paths.set_neighbour_heartbeat_period(path_idx, period_s);

        let throughput = ports.get(port_id as usize).map(|p| p.transmit_throughput()).unwrap_or(THROUGHPUT_UNUSED);
        self.maybe_promote_best(node_idx, path_idx, throughput, ports);
        Ok(())
    }

    /// Applies a re-announcement of `node_id`, reachable via `router_node_id`.
    #[allow(clippy::too_many_arguments)]
    pub fn originator_update(
        &mut self,
        seqno: u8,
        node_id: NodeId,
        version: u8,
        _age_ms: u32,
        name_mapping_id: u32,
        router_node_id: NodeId,
        throughput: u8,
        port_id: PortId,
        ports: &[&dyn Port],
        now_ms: i64,
    ) -> Result<()> {
        if version != PROTOCOL_VERSION {
            log::debug!("dropping originator statement with unsupported version {}", version);
            return Ok(());
        }
        if node_id.equals(&self.local_node_id) || router_node_id.equals(&self.local_node_id) {
            log::debug!("dropping self-referential originator statement");
            return Ok(());
        }
        if router_node_id.equals(&node_id) {
            log::debug!("dropping self-routed originator statement");
            return Ok(());
        }
        if !crate::port::validate_port_id(ports, port_id) {
            return Err(MeshError::Invalid);
        }

        let router_idx = self.node_get(router_node_id);
        let (_router_path, _) = self.paths.get_neighbour(&mut self.nodes[router_idx as usize].paths_refs, port_id)?;
        let router_link_throughput = ports.get(port_id as usize).map(|p| p.transmit_throughput()).unwrap_or(THROUGHPUT_UNUSED);

        let node_idx = self.node_get(node_id);
        let originator_path = self.paths.get_originator(&mut self.nodes[node_idx as usize].paths_refs, router_idx);

        match self.nodes[node_idx as usize].protect.update(seqno, now_ms) {
            Ok(()) => {}
            Err(MeshError::AlreadyPresent) => {
                let (_, current_best_throughput) = self.best_next_hop(node_idx, ports).unwrap_or((node_idx, 0));
                if throughput <= current_best_throughput {
                    return Ok(());
                }
            }
            Err(MeshError::Invalid) => {
                log::debug!("dropping originator statement with out-of-range seqno");
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        // Both the router and the originator are live participants in this
        // statement, even when the originator's own sequence number was a
        // duplicate: stamp both so neither is mistakenly picked as the LRU
        // eviction victim.
        self.nodes[router_idx as usize].protect.touch_last_seen(now_ms);
        self.nodes[node_idx as usize].protect.touch_last_seen(now_ms);
        self.nodes[node_idx as usize].name_mapping_id = name_mapping_id;

        let path_idx = originator_path?.0;
        let mut effective_throughput = throughput.min(router_link_throughput);
        if node_idx != router_idx && effective_throughput > 1 {
            effective_throughput -= 1;
        }
        self.paths.set_originator_throughput(path_idx, effective_throughput);
        self.maybe_promote_best(node_idx, path_idx, effective_throughput, ports);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPort(u8);
    impl Port for FixedPort {
        fn transmit_throughput(&self) -> u8 {
            self.0
        }
    }

    #[test]
    fn get_then_lookup_returns_same_index() {
        let mut t: NodeTable<2, 8> = NodeTable::new(4, NodeId(1));
        let a = NodeId(2);
        let idx = t.node_get(a);
        assert_eq!(t.node_lookup(a).unwrap(), idx);
    }

    #[test]
    fn free_then_get_reassigns_phantom_state() {
        let mut t: NodeTable<2, 8> = NodeTable::new(4, NodeId(1));
        let a = NodeId(2);
        let idx = t.node_get(a);
        t.node_free(idx);
        assert_eq!(t.node_lookup(a), Err(MeshError::NotFound));
        let idx2 = t.node_get(a);
        assert_eq!(t.node_lookup(a).unwrap(), idx2);
    }

    #[test]
    fn neighbour_heartbeat_becomes_best_next_hop() {
        let mut t: NodeTable<2, 8> = NodeTable::new(4, NodeId(1));
        let ports: Vec<&dyn Port> = vec![&FixedPort(10)];
        t.neighbour_update(0, NodeId(2), 0, 5, 0xAA, 0, &ports, 1000).unwrap();
        let idx = t.node_lookup(NodeId(2)).unwrap();
        let (hop, throughput) = t.best_next_hop(idx, &ports).unwrap();
        assert_eq!(hop, idx);
        assert_eq!(throughput, 10);
    }

    #[test]
    fn eviction_cascade_orphans_dependent_originator() {
        let mut t: NodeTable<2, 8> = NodeTable::new(2, NodeId(1));
        let ports: Vec<&dyn Port> = vec![&FixedPort(10)];

        t.neighbour_update(0, NodeId(2), 0, 5, 0, 0, &ports, 0).unwrap();
        let router_idx = t.node_lookup(NodeId(2)).unwrap();
        t.originator_update(0, NodeId(3), 0, 0, 0, NodeId(2), 5, 0, &ports, 10).unwrap();
        let far_idx = t.node_lookup(NodeId(3)).unwrap();
        assert_eq!(t.best_next_hop(far_idx, &ports).unwrap().0, router_idx);

        // table capacity is 2 and both slots are full (router + far node);
        // getting a third node must evict the oldest (the router, seen at
        // time 0) and cascade into the originator that used it.
        t.node_get(NodeId(4));

        assert_eq!(t.node_lookup(NodeId(2)), Err(MeshError::NotFound));
        assert_eq!(t.best_next_hop(far_idx, &ports), Err(MeshError::NoLink));
    }
}
