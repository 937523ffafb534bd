/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The device hook a concrete transport supplies: ownership of the raw
//! tx/rx byte regions and the signalling primitives that wake a peer.
//!
//! Mirroring the split between the generic ring-buffer logic and the
//! device-specific byte storage, a [`Device`] owns the memory; [`crate::Rbbq`]
//! never allocates or addresses raw bytes itself.

use mesh_core::error::Result;

use crate::control::ControlRecord;

pub trait Device: Send + Sync {
    fn tx_capacity(&self) -> usize;
    fn rx_capacity(&self) -> usize;

    /// One-time setup, called while the buffer is in `Init`.
    fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Called on `start()`/resume from `Suspended`.
    fn start(&self) -> Result<()> {
        Ok(())
    }

    /// Called on `stop()`.
    fn stop(&self) -> Result<()> {
        Ok(())
    }

    /// Periodic upkeep hook, called from [`crate::Rbbq::monitor`].
    fn monitor(&self) -> Result<()> {
        Ok(())
    }

    fn write_tx(&self, offset: usize, bytes: &[u8]);
    fn read_rx(&self, offset: usize, out: &mut [u8]);

    /// The last control record this side published, read back from the
    /// start of the peer's rx region (our tx region, from the peer's view).
    fn peer_control(&self) -> ControlRecord;

    /// Publishes this side's write/watermark indices and raises the
    /// transmit signal the peer waits on.
    fn transmit(&self, write_idx: u16, watermark_idx: u16) -> Result<()>;

    /// Publishes this side's consumed read index and raises the receive
    /// signal the peer waits on.
    fn receive(&self, read_idx: u16) -> Result<()>;
}

/// In-process loopback transport over two `Arc`-shared heap regions, used
/// for tests and a runnable two-node demo. Not zero-copy shared memory: a
/// real device would map a physically shared region instead of allocating
/// two independent `Vec<u8>`s.
pub mod loopback {
    use std::sync::atomic::{AtomicU16, Ordering};
    use std::sync::{Arc, Condvar, Mutex};

    use super::*;

    struct Shared {
        data: Mutex<Vec<u8>>,
        write_idx: AtomicU16,
        watermark_idx: AtomicU16,
        read_idx: AtomicU16,
        signal: Condvar,
        signal_lock: Mutex<u64>,
    }

    impl Shared {
        fn new(capacity: usize) -> Self {
            Self {
                data: Mutex::new(vec![0u8; capacity]),
                write_idx: AtomicU16::new(0),
                watermark_idx: AtomicU16::new(0),
                read_idx: AtomicU16::new(0),
                signal: Condvar::new(),
                signal_lock: Mutex::new(0),
            }
        }

        fn bump_and_wake(&self) {
            let mut g = self.signal_lock.lock().unwrap();
            *g = g.wrapping_add(1);
            self.signal.notify_all();
        }
    }

    /// One endpoint of a loopback pair. `tx` is the region this endpoint
    /// writes, `rx` is the peer's region this endpoint reads.
    pub struct LoopbackTransport {
        tx: Arc<Shared>,
        rx: Arc<Shared>,
    }

    impl LoopbackTransport {
        /// Builds both ends of a connected pair, each with `capacity` bytes
        /// of payload region per direction.
        pub fn pair(capacity: usize) -> (LoopbackTransport, LoopbackTransport) {
            let a = Arc::new(Shared::new(capacity));
            let b = Arc::new(Shared::new(capacity));
            (LoopbackTransport { tx: a.clone(), rx: b.clone() }, LoopbackTransport { tx: b, rx: a })
        }
    }

    impl Device for LoopbackTransport {
        fn tx_capacity(&self) -> usize {
            self.tx.data.lock().unwrap().len()
        }

        fn rx_capacity(&self) -> usize {
            self.rx.data.lock().unwrap().len()
        }

        fn write_tx(&self, offset: usize, bytes: &[u8]) {
            let mut d = self.tx.data.lock().unwrap();
            d[offset..offset + bytes.len()].copy_from_slice(bytes);
        }

        fn read_rx(&self, offset: usize, out: &mut [u8]) {
            let d = self.rx.data.lock().unwrap();
            out.copy_from_slice(&d[offset..offset + out.len()]);
        }

        fn peer_control(&self) -> ControlRecord {
            ControlRecord {
                this_write_idx: self.rx.write_idx.load(Ordering::Acquire),
                this_watermark_idx: self.rx.watermark_idx.load(Ordering::Acquire),
                other_read_idx: self.rx.read_idx.load(Ordering::Acquire),
            }
        }

        fn transmit(&self, write_idx: u16, watermark_idx: u16) -> Result<()> {
            self.tx.write_idx.store(write_idx, Ordering::Release);
            self.tx.watermark_idx.store(watermark_idx, Ordering::Release);
            self.tx.bump_and_wake();
            Ok(())
        }

        fn receive(&self, read_idx: u16) -> Result<()> {
            self.tx.read_idx.store(read_idx, Ordering::Release);
            self.tx.bump_and_wake();
            Ok(())
        }
    }
}

pub use loopback::LoopbackTransport;
