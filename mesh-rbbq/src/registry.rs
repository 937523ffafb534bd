/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Named lookup of live buffers, replacing the original's intrusive
//! singly-linked list with a concurrent map owned by the hosting context.

use std::sync::Arc;

use dashmap::DashMap;
use mesh_core::error::{MeshError, Result};

use crate::device::Device;
use crate::rbbq::Rbbq;

pub struct Registry<D: Device> {
    buffers: DashMap<String, Arc<Rbbq<D>>>,
}

impl<D: Device> Registry<D> {
    pub fn new() -> Self {
        Self { buffers: DashMap::new() }
    }

    /// Registers a buffer under its own name, rejecting a duplicate name
    /// the way the original's binding registration does.
    pub fn register(&self, buffer: Arc<Rbbq<D>>) -> Result<()> {
        let name = buffer.name().to_string();
        if self.buffers.contains_key(&name) {
            return Err(MeshError::AlreadyPresent);
        }
        self.buffers.insert(name, buffer);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<Rbbq<D>>> {
        self.buffers.get(name).map(|e| e.value().clone()).ok_or(MeshError::NotFound)
    }

    pub fn unregister(&self, name: &str) -> Result<()> {
        self.buffers.remove(name).map(|_| ()).ok_or(MeshError::NotFound)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

impl<D: Device> Default for Registry<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::LoopbackTransport;

    #[test]
    fn duplicate_name_registration_is_rejected() {
        let registry: Registry<LoopbackTransport> = Registry::new();
        let (a, _b) = LoopbackTransport::pair(32);
        let buf = Arc::new(Rbbq::new("shared", a));
        registry.register(buf.clone()).unwrap();
        assert_eq!(registry.register(buf).unwrap_err(), MeshError::AlreadyPresent);
    }

    #[test]
    fn unregister_then_lookup_fails() {
        let registry: Registry<LoopbackTransport> = Registry::new();
        let (a, _b) = LoopbackTransport::pair(32);
        registry.register(Arc::new(Rbbq::new("ch0", a))).unwrap();
        registry.unregister("ch0").unwrap();
        assert_eq!(registry.get("ch0").unwrap_err(), MeshError::NotFound);
    }
}
