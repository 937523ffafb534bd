/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod control;
pub mod device;
pub mod message;
pub mod rbbq;
pub mod registry;
pub mod state;

pub use control::ControlRecord;
pub use device::{Device, LoopbackTransport};
pub use message::MessageHeader;
pub use rbbq::{AllocHandle, ReceivedMessage, Rbbq};
pub use registry::Registry;
pub use state::BufferState;

pub use mesh_core::error::{MeshError, Result};
